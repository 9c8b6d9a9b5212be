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

use log::info;

use super::defs::*;
use crate::support::error::ProtocolError;

pub(super) fn cmd_capability(req: &mut Request<'_>) -> CmdResult {
    req.lexer.eol()?;
    req.response
        .command_response("CAPABILITY", capability_data().as_bytes())?;
    req.complete()
}

/// NOOP and CHECK: nothing to do beyond reporting pending changes.
pub(super) fn cmd_noop(req: &mut Request<'_>) -> CmdResult {
    req.lexer.eol()?;
    req.complete()
}

pub(super) fn cmd_logout(req: &mut Request<'_>) -> CmdResult {
    req.lexer.eol()?;
    req.response.bye_response("IMAP4rev1 Server logging out")?;
    req.session.logout();
    info!("{} Logged out", req.session.log_prefix());
    req.complete()
}

/// `UID <command> <args>`: run a UID-capable command with message sets
/// naming UIDs.
pub(super) fn cmd_uid(req: &mut Request<'_>) -> CmdResult {
    let name = p::atom(req.lexer)?;
    let sub = match req.registry.lookup(&name) {
        Some(sub) if sub.uid_enabled => *sub,
        _ => {
            return Err(ProtocolError::syntax(format!(
                "Invalid UID command: '{}'",
                name
            ))
            .into())
        }
    };

    req.command = sub;
    req.use_uid = true;
    (sub.handler)(req)
}
