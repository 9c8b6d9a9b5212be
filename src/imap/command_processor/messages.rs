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

use std::sync::Arc;

use chrono::prelude::*;
use log::warn;

use super::defs::*;
use crate::store::folder::Folder;
use crate::store::message::Message;
use crate::store::model::{IdRange, MessageFlags};
use crate::support::error::{Error, ProtocolError};

pub(super) fn cmd_append(req: &mut Request<'_>) -> CmdResult {
    let name = p::mailbox(req.lexer)?;

    let mut ch = req.lexer.next_word_char()?;
    let flags = if b'(' == ch {
        let flags = p::flag_list(req.lexer)?;
        ch = req.lexer.next_word_char()?;
        MessageFlags::from_flags(&flags)
    } else {
        MessageFlags::empty()
    };

    let received_at = if b'"' == ch {
        let date = p::date_time(req.lexer)?;
        ch = req.lexer.next_word_char()?;
        date.with_timezone(&Utc)
    } else {
        Utc::now()
    };

    if b'{' != ch {
        return Err(ProtocolError::syntax("Expected message literal.").into());
    }
    let data = p::literal(req.lexer)?;
    req.lexer.eol()?;

    let login = login!(req)?.to_owned();
    let folder = match req.session.host().folder(&login, &name)? {
        Some(folder) if folder.is_selectable() => folder,
        _ => return req.fail(Some("TRYCREATE"), NO_SUCH_MAILBOX),
    };

    let uid = folder.append(&Message::new(data), flags, received_at)?;
    let code = format!("APPENDUID {} {}", folder.uid_validity(), uid);
    req.complete_with(&code)
}

pub(super) fn cmd_close(req: &mut Request<'_>) -> CmdResult {
    req.lexer.eol()?;

    {
        let selected = selected!(req)?;
        if !selected.is_read_only() {
            if let Err(e) = selected.folder().expunge(None) {
                warn!(
                    "{} Implicit EXPUNGE failed: {}",
                    req.session.log_prefix(),
                    e
                );
                return Err(e);
            }
        }
    }

    req.session.deselect();
    req.complete()
}

pub(super) fn cmd_unselect(req: &mut Request<'_>) -> CmdResult {
    req.lexer.eol()?;
    req.session.deselect();
    req.complete()
}

/// `EXPUNGE`, or `UID EXPUNGE <set>` which only removes deleted messages
/// within the set.
pub(super) fn cmd_expunge(req: &mut Request<'_>) -> CmdResult {
    let set = if req.use_uid {
        Some(p::sequence_set(req.lexer)?)
    } else {
        None
    };
    req.lexer.eol()?;

    let selected = selected!(req)?;
    if selected.is_read_only() {
        return req.fail(None, READ_ONLY);
    }

    match set {
        None => selected.folder().expunge(None)?,
        Some(set) => {
            let ranges = resolve_set(selected, &set, true)?
                .into_iter()
                .map(|(_, uid)| IdRange::single(uid))
                .collect::<Vec<_>>();
            selected.folder().expunge(Some(&ranges))?
        }
    };

    req.complete()
}

pub(super) fn cmd_copy(req: &mut Request<'_>) -> CmdResult {
    let (set, target) = parse_copy(req)?;
    let target = match target {
        Some(target) => target,
        None => return req.fail(Some("TRYCREATE"), NO_SUCH_MAILBOX),
    };

    let code = {
        let selected = selected!(req)?;
        let messages = resolve_set(selected, &set, req.use_uid)?;
        copy_messages(selected.folder(), &target, &messages)?
    };

    match code {
        Some(code) => req.complete_with(&code),
        None => req.complete(),
    }
}

/// `MOVE`: copy, then silently flag the originals `\Deleted` and expunge
/// exactly those.
pub(super) fn cmd_move(req: &mut Request<'_>) -> CmdResult {
    let (set, target) = parse_copy(req)?;
    let target = match target {
        Some(target) => target,
        None => return req.fail(Some("TRYCREATE"), NO_SUCH_MAILBOX),
    };

    let selected = selected!(req)?;
    if selected.is_read_only() {
        return req.fail(None, READ_ONLY);
    }

    let messages = resolve_set(selected, &set, req.use_uid)?;
    let source = selected.folder();
    let code = copy_messages(source, &target, &messages)?;

    let mut moved = Vec::with_capacity(messages.len());
    for &(_, uid) in &messages {
        source.set_flags(
            MessageFlags::DELETED,
            true,
            uid,
            Some(selected.listener()),
            false,
        )?;
        moved.push(IdRange::single(uid));
    }
    source.expunge(Some(&moved))?;

    if let Some(code) = code {
        req.response.ok_response(Some(&code), "")?;
    }
    req.complete()
}

fn parse_copy(
    req: &mut Request<'_>,
) -> Result<(p::SequenceSet, Option<Arc<Folder>>), Error> {
    let set = p::sequence_set(req.lexer)?;
    let name = p::mailbox(req.lexer)?;
    req.lexer.eol()?;

    let login = login!(req)?.to_owned();
    let target = req
        .session
        .host()
        .folder(&login, &name)?
        .filter(|f| f.is_selectable());
    Ok((set, target))
}

/// Copy `messages` from `source` to `target`, returning the COPYUID
/// response code if anything was copied.
fn copy_messages(
    source: &Folder,
    target: &Folder,
    messages: &[(u32, u64)],
) -> Result<Option<String>, Error> {
    if messages.is_empty() {
        return Ok(None);
    }

    let mut from = Vec::with_capacity(messages.len());
    let mut to = Vec::with_capacity(messages.len());
    for &(_, uid) in messages {
        to.push(source.copy_message(uid, target)?);
        from.push(uid);
    }

    Ok(Some(format!(
        "COPYUID {} {} {}",
        target.uid_validity(),
        uid_set_text(&from),
        uid_set_text(&to)
    )))
}

/// Format ascending UIDs compactly, e.g. `1:3,7`.
fn uid_set_text(uids: &[u64]) -> String {
    let mut ranges: Vec<(u64, u64)> = Vec::new();
    for &uid in uids {
        if let Some(last) = ranges.last_mut() {
            if last.1 + 1 == uid {
                last.1 = uid;
                continue;
            }
        }
        ranges.push((uid, uid));
    }

    ranges
        .into_iter()
        .map(|(low, high)| {
            if low == high {
                low.to_string()
            } else {
                format!("{}:{}", low, high)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
