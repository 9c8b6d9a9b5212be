//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mailsandbox.
//
// Mailsandbox is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailsandbox is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailsandbox. If not, see <http://www.gnu.org/licenses/>.

use super::defs::*;
use crate::store::folder::FlagMode;
use crate::store::model::MessageFlags;
use crate::support::error::ProtocolError;

/// `STORE <set> [+|-]FLAGS[.SILENT] <flags>`
///
/// The resulting flags reach the client through this session's own folder
/// listener, as a `FETCH` reported with the other pending changes. `.SILENT`
/// makes that listener the one excluded from notification.
pub(super) fn cmd_store(req: &mut Request<'_>) -> CmdResult {
    let set = p::sequence_set(req.lexer)?;
    let directive = p::atom(req.lexer)?;
    let (mode, silent) = parse_directive(&directive)?;
    let flags = p::flag_list(req.lexer)?;
    req.lexer.eol()?;

    // \Recent is managed by the server alone
    let flags = MessageFlags::from_flags(&flags) - MessageFlags::RECENT;

    let selected = selected!(req)?;
    if selected.is_read_only() {
        return req.fail(None, READ_ONLY);
    }

    let silent = if silent {
        Some(selected.listener())
    } else {
        None
    };
    for (_, uid) in resolve_set(selected, &set, req.use_uid)? {
        selected
            .folder()
            .update_flags(mode, flags, uid, silent, req.use_uid)?;
    }

    req.complete()
}

fn parse_directive(directive: &str) -> Result<(FlagMode, bool), ProtocolError> {
    let upper = directive.to_ascii_uppercase();
    let (mode, rest) = if upper.starts_with('+') {
        (FlagMode::Add, &upper[1..])
    } else if upper.starts_with('-') {
        (FlagMode::Remove, &upper[1..])
    } else {
        (FlagMode::Replace, &upper[..])
    };

    match rest {
        "FLAGS" => Ok((mode, false)),
        "FLAGS.SILENT" => Ok((mode, true)),
        _ => Err(ProtocolError::syntax(format!(
            "Invalid Store Directive: '{}'",
            directive
        ))),
    }
}
