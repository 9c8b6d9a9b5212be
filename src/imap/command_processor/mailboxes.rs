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

use std::io;

use super::defs::*;
use crate::imap::lex::LexWriter;
use crate::store::folder::MailFolder;
use crate::store::mailbox_store::HIERARCHY_DELIMITER;
use crate::store::model::PERMANENT_FLAGS;
use crate::support::error::ProtocolError;

pub(super) fn cmd_select(req: &mut Request<'_>) -> CmdResult {
    select(req, false)
}

pub(super) fn cmd_examine(req: &mut Request<'_>) -> CmdResult {
    select(req, true)
}

fn select(req: &mut Request<'_>, read_only: bool) -> CmdResult {
    let name = p::mailbox(req.lexer)?;
    req.lexer.eol()?;

    req.session.deselect();
    let login = login!(req)?.to_owned();
    let folder = match req.session.host().folder(&login, &name)? {
        Some(folder) if folder.is_selectable() => folder,
        _ => return req.fail(None, NO_SUCH_MAILBOX),
    };
    req.session.set_selected(folder, read_only);

    let selected = selected!(req)?;
    let r = req.response;
    r.flags_response(PERMANENT_FLAGS)?;
    r.exists_response(selected.message_count())?;
    r.recent_response(selected.recent_count(true)?)?;
    r.ok_response(
        Some(&format!("UIDVALIDITY {}", selected.uid_validity())),
        "",
    )?;
    r.ok_response(Some(&format!("UIDNEXT {}", selected.uid_next())), "")?;
    match selected.first_unseen() {
        Some(msn) => r.ok_response(
            Some(&format!("UNSEEN {}", msn)),
            &format!("Message {} is first unseen", msn),
        )?,
        None => r.ok_response(None, "No messages unseen")?,
    }
    r.permanent_flags_response()?;

    req.complete_with(if read_only { "READ-ONLY" } else { "READ-WRITE" })
}

pub(super) fn cmd_create(req: &mut Request<'_>) -> CmdResult {
    let name = p::mailbox(req.lexer)?;
    req.lexer.eol()?;

    // A trailing delimiter only declares the intent to create children
    let name = name.trim_end_matches(HIERARCHY_DELIMITER);
    let login = login!(req)?.to_owned();
    req.session.host().create_mailbox(&login, name)?;
    req.complete()
}

pub(super) fn cmd_delete(req: &mut Request<'_>) -> CmdResult {
    let name = p::mailbox(req.lexer)?;
    req.lexer.eol()?;

    let login = login!(req)?.to_owned();
    let qualified = req.session.host().qualified_name(&login, &name);
    if req
        .session
        .selected()
        .map_or(false, |s| s.full_name() == qualified)
    {
        req.session.deselect();
    }

    req.session.host().delete_mailbox(&login, &name)?;
    req.complete()
}

pub(super) fn cmd_rename(req: &mut Request<'_>) -> CmdResult {
    let old = p::mailbox(req.lexer)?;
    let new = p::mailbox(req.lexer)?;
    req.lexer.eol()?;

    let login = login!(req)?.to_owned();
    req.session.host().rename_mailbox(&login, &old, &new)?;
    req.complete()
}

pub(super) fn cmd_subscribe(req: &mut Request<'_>) -> CmdResult {
    let name = p::mailbox(req.lexer)?;
    req.lexer.eol()?;

    let login = login!(req)?.to_owned();
    req.session.host().subscribe(&login, &name)?;
    req.complete()
}

pub(super) fn cmd_unsubscribe(req: &mut Request<'_>) -> CmdResult {
    let name = p::mailbox(req.lexer)?;
    req.lexer.eol()?;

    let login = login!(req)?.to_owned();
    req.session.host().unsubscribe(&login, &name)?;
    req.complete()
}

pub(super) fn cmd_list(req: &mut Request<'_>) -> CmdResult {
    list(req, false)
}

pub(super) fn cmd_lsub(req: &mut Request<'_>) -> CmdResult {
    list(req, true)
}

fn list(req: &mut Request<'_>, subscribed_only: bool) -> CmdResult {
    let reference = p::mailbox(req.lexer)?;
    let pattern = p::list_mailbox(req.lexer)?;
    req.lexer.eol()?;

    let command = req.command.name;

    // An empty pattern asks for the hierarchy delimiter and the root of
    // the reference
    if pattern.is_empty() {
        let root = if reference.starts_with('#') {
            reference
                .split(HIERARCHY_DELIMITER)
                .next()
                .unwrap_or_default()
                .to_owned()
        } else {
            String::new()
        };
        req.response
            .command_response(command, &list_line(true, &root)?)?;
        return req.complete();
    }

    let combined = if pattern.starts_with('#') || reference.is_empty() {
        pattern
    } else if reference.ends_with(HIERARCHY_DELIMITER) {
        format!("{}{}", reference, pattern)
    } else {
        format!("{}{}{}", reference, HIERARCHY_DELIMITER, pattern)
    };

    let login = login!(req)?.to_owned();
    let host = req.session.host();
    for folder in host.list_mailboxes(&login, &combined, subscribed_only)? {
        let name = host.client_name(&login, &folder.full_name());
        req.response.command_response(
            command,
            &list_line(!folder.is_selectable(), &name)?,
        )?;
    }

    req.complete()
}

fn list_line(noselect: bool, name: &str) -> io::Result<Vec<u8>> {
    let mut l = LexWriter::new(Vec::new());
    l.verbatim(if noselect { "(\\Noselect)" } else { "()" })?;
    l.verbatim(&format!(" \"{}\" ", HIERARCHY_DELIMITER))?;
    l.mailbox(name)?;
    Ok(l.into_inner())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StatusItem {
    Messages,
    Recent,
    UidNext,
    UidValidity,
    Unseen,
}

impl StatusItem {
    fn parse(name: &str) -> Result<Self, ProtocolError> {
        match &name.to_ascii_uppercase()[..] {
            "MESSAGES" => Ok(StatusItem::Messages),
            "RECENT" => Ok(StatusItem::Recent),
            "UIDNEXT" => Ok(StatusItem::UidNext),
            "UIDVALIDITY" => Ok(StatusItem::UidValidity),
            "UNSEEN" => Ok(StatusItem::Unseen),
            _ => Err(ProtocolError::syntax(format!(
                "Unknown status data item: '{}'",
                name
            ))),
        }
    }

    fn name(self) -> &'static str {
        match self {
            StatusItem::Messages => "MESSAGES",
            StatusItem::Recent => "RECENT",
            StatusItem::UidNext => "UIDNEXT",
            StatusItem::UidValidity => "UIDVALIDITY",
            StatusItem::Unseen => "UNSEEN",
        }
    }
}

fn status_items(req: &mut Request<'_>) -> Result<Vec<StatusItem>, ProtocolError> {
    if b'(' != req.lexer.next_word_char()? {
        return Err(ProtocolError::syntax("Expected:'(' for status items."));
    }
    req.lexer.consume()?;

    let mut items = Vec::new();
    loop {
        if b')' == req.lexer.next_word_char()? {
            req.lexer.consume()?;
            break;
        }
        items.push(StatusItem::parse(&p::atom_only(req.lexer)?)?);
    }

    if items.is_empty() {
        return Err(ProtocolError::syntax("No status data items given."));
    }
    Ok(items)
}

pub(super) fn cmd_status(req: &mut Request<'_>) -> CmdResult {
    let name = p::mailbox(req.lexer)?;
    let items = status_items(req)?;
    req.lexer.eol()?;

    let login = login!(req)?.to_owned();
    let folder = match req.session.host().folder(&login, &name)? {
        Some(folder) if folder.is_selectable() => folder,
        _ => return req.fail(None, NO_SUCH_MAILBOX),
    };

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let value = match item {
            StatusItem::Messages => folder.message_count() as u64,
            StatusItem::Recent => folder.recent_count(false)? as u64,
            StatusItem::UidNext => folder.uid_next(),
            StatusItem::UidValidity => u64::from(folder.uid_validity()),
            StatusItem::Unseen => folder.unseen_count() as u64,
        };
        values.push(format!("{} {}", item.name(), value));
    }

    let mut l = LexWriter::new(Vec::new());
    l.mailbox(&name)?;
    l.verbatim(&format!(" ({})", values.join(" ")))?;
    req.response.command_response("STATUS", &l.into_inner())?;

    req.complete()
}
