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

//! The SEARCH command.
//!
//! The search program is parsed into a `SearchKey` tree up front and then
//! evaluated against every message of the folder in turn.

use chrono::prelude::*;

use super::defs::*;
use crate::imap::command_parser::SequenceSet;
use crate::imap::request_lexer::RequestLexer;
use crate::store::folder::MailFolder;
use crate::store::message::StoredMessage;
use crate::store::model::{set_includes, IdRange, MessageFlags};
use crate::support::error::ProtocolError;

#[derive(Clone, Debug, PartialEq, Eq)]
enum SearchKey {
    And(Vec<SearchKey>),
    Or(Box<SearchKey>, Box<SearchKey>),
    Not(Box<SearchKey>),
    /// All the flags set.
    Flags(MessageFlags),
    /// None of the flags set.
    NotFlags(MessageFlags),
    /// \Recent and not \Seen.
    New,
    /// Keywords cannot be stored, so no message ever has one.
    Keyword(String),
    Header(String, String),
    Body(String),
    Text(String),
    Larger(u64),
    Smaller(u64),
    Before(NaiveDate),
    On(NaiveDate),
    Since(NaiveDate),
    SentBefore(NaiveDate),
    SentOn(NaiveDate),
    SentSince(NaiveDate),
    Uid(SequenceSet),
    Seq(SequenceSet),
}

/// Sequence sets resolved against the folder, for evaluation.
struct Context {
    largest_uid: u64,
    largest_msn: u64,
}

pub(super) fn cmd_search(req: &mut Request<'_>) -> CmdResult {
    let (charset, key) = search_program(req.lexer)?;
    req.lexer.eol()?;

    if let Some(charset) = charset {
        if !charset.eq_ignore_ascii_case("UTF-8")
            && !charset.eq_ignore_ascii_case("US-ASCII")
        {
            return req.fail(Some("BADCHARSET"), "Unsupported charset");
        }
    }

    let selected = selected!(req)?;
    let context = Context {
        largest_uid: selected.message_uids().last().copied().unwrap_or(0),
        largest_msn: u64::from(
            selected.correct_for_expunged(selected.message_count() as u32),
        ),
    };

    let uids = selected.folder().search(|msn, message| {
        let msn = selected.correct_for_expunged(msn);
        key.matches(&context, msn, message)
    })?;

    let mut results = Vec::with_capacity(uids.len());
    for uid in uids {
        if req.use_uid {
            results.push(uid.to_string());
        } else {
            results.push(selected.msn(uid)?.to_string());
        }
    }

    req.response
        .command_response("SEARCH", results.join(" ").as_bytes())?;
    req.complete()
}

impl SearchKey {
    fn matches(&self, cx: &Context, msn: u32, stored: &StoredMessage) -> bool {
        let message = &stored.message;
        match *self {
            SearchKey::And(ref keys) => {
                keys.iter().all(|k| k.matches(cx, msn, stored))
            }
            SearchKey::Or(ref a, ref b) => {
                a.matches(cx, msn, stored) || b.matches(cx, msn, stored)
            }
            SearchKey::Not(ref k) => !k.matches(cx, msn, stored),
            SearchKey::Flags(flags) => stored.flags.contains(flags),
            SearchKey::NotFlags(flags) => !stored.flags.intersects(flags),
            SearchKey::New => {
                stored.flags.contains(MessageFlags::RECENT)
                    && !stored.flags.contains(MessageFlags::SEEN)
            }
            SearchKey::Keyword(_) => false,
            SearchKey::Header(ref name, ref value) => {
                message.header(name).map_or(false, |v| contains(&v, value))
            }
            SearchKey::Body(ref text) => {
                contains(&String::from_utf8_lossy(message.body()), text)
            }
            SearchKey::Text(ref text) => {
                contains(&String::from_utf8_lossy(message.raw()), text)
            }
            SearchKey::Larger(size) => message.size() as u64 > size,
            SearchKey::Smaller(size) => (message.size() as u64) < size,
            SearchKey::Before(date) => internal_date(stored) < date,
            SearchKey::On(date) => internal_date(stored) == date,
            SearchKey::Since(date) => internal_date(stored) >= date,
            SearchKey::SentBefore(date) => {
                sent_date(stored).map_or(false, |d| d < date)
            }
            SearchKey::SentOn(date) => {
                sent_date(stored).map_or(false, |d| d == date)
            }
            SearchKey::SentSince(date) => {
                sent_date(stored).map_or(false, |d| d >= date)
            }
            SearchKey::Uid(ref set) => {
                in_set(set, cx.largest_uid, stored.uid)
            }
            SearchKey::Seq(ref set) => {
                in_set(set, cx.largest_msn, u64::from(msn))
            }
        }
    }
}

fn in_set(set: &SequenceSet, largest: u64, id: u64) -> bool {
    let ranges: Vec<IdRange> = set.resolve(largest);
    set_includes(&ranges, id)
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn internal_date(stored: &StoredMessage) -> NaiveDate {
    stored.received_at.naive_utc().date()
}

fn sent_date(stored: &StoredMessage) -> Option<NaiveDate> {
    stored.message.sent_date().map(|d| d.naive_local().date())
}

/// `[CHARSET <charset>] <key>+`
fn search_program(
    lx: &mut RequestLexer,
) -> Result<(Option<String>, SearchKey), ProtocolError> {
    let mut charset = None;
    let mut keys = Vec::new();

    if is_named_key(lx.next_word_char()?) {
        let name = p::atom_only(lx)?.to_ascii_uppercase();
        if "CHARSET" == name {
            charset = Some(p::astring(lx)?);
        } else {
            keys.push(named_key(lx, &name)?);
        }
    } else {
        keys.push(search_key(lx)?);
    }

    while !lx.at_eol()? {
        keys.push(search_key(lx)?);
    }

    if keys.is_empty() {
        return Err(ProtocolError::syntax("Missing search key."));
    }
    Ok((charset, SearchKey::And(keys)))
}

fn is_named_key(ch: u8) -> bool {
    ch.is_ascii_alphabetic()
}

fn search_key(lx: &mut RequestLexer) -> Result<SearchKey, ProtocolError> {
    let ch = lx.next_word_char()?;
    if b'(' == ch {
        lx.consume()?;
        let mut keys = Vec::new();
        loop {
            if b')' == lx.next_word_char()? {
                lx.consume()?;
                break;
            }
            keys.push(search_key(lx)?);
        }
        if keys.is_empty() {
            return Err(ProtocolError::syntax("Empty search key list."));
        }
        Ok(SearchKey::And(keys))
    } else if ch.is_ascii_digit() || b'*' == ch {
        Ok(SearchKey::Seq(p::sequence_set(lx)?))
    } else {
        let name = p::atom_only(lx)?.to_ascii_uppercase();
        named_key(lx, &name)
    }
}

fn named_key(
    lx: &mut RequestLexer,
    name: &str,
) -> Result<SearchKey, ProtocolError> {
    use self::SearchKey::*;

    let header = |lx: &mut RequestLexer, field: &str| {
        Ok(Header(field.to_owned(), p::astring(lx)?))
    };

    match name {
        "ALL" => Ok(And(vec![])),
        "ANSWERED" => Ok(Flags(MessageFlags::ANSWERED)),
        "DELETED" => Ok(Flags(MessageFlags::DELETED)),
        "DRAFT" => Ok(Flags(MessageFlags::DRAFT)),
        "FLAGGED" => Ok(Flags(MessageFlags::FLAGGED)),
        "RECENT" => Ok(Flags(MessageFlags::RECENT)),
        "SEEN" => Ok(Flags(MessageFlags::SEEN)),
        "UNANSWERED" => Ok(NotFlags(MessageFlags::ANSWERED)),
        "UNDELETED" => Ok(NotFlags(MessageFlags::DELETED)),
        "UNDRAFT" => Ok(NotFlags(MessageFlags::DRAFT)),
        "UNFLAGGED" => Ok(NotFlags(MessageFlags::FLAGGED)),
        "UNSEEN" => Ok(NotFlags(MessageFlags::SEEN)),
        "NEW" => Ok(New),
        "OLD" => Ok(NotFlags(MessageFlags::RECENT)),
        "KEYWORD" => Ok(Keyword(p::atom(lx)?)),
        "UNKEYWORD" => Ok(Not(Box::new(Keyword(p::atom(lx)?)))),
        "SUBJECT" => header(lx, "Subject"),
        "FROM" => header(lx, "From"),
        "TO" => header(lx, "To"),
        "CC" => header(lx, "Cc"),
        "BCC" => header(lx, "Bcc"),
        "HEADER" => {
            let field = p::astring(lx)?;
            Ok(Header(field, p::astring(lx)?))
        }
        "BODY" => Ok(Body(p::astring(lx)?)),
        "TEXT" => Ok(Text(p::astring(lx)?)),
        "LARGER" => Ok(Larger(p::number(lx)?)),
        "SMALLER" => Ok(Smaller(p::number(lx)?)),
        "BEFORE" => Ok(Before(p::date(lx)?)),
        "ON" => Ok(On(p::date(lx)?)),
        "SINCE" => Ok(Since(p::date(lx)?)),
        "SENTBEFORE" => Ok(SentBefore(p::date(lx)?)),
        "SENTON" => Ok(SentOn(p::date(lx)?)),
        "SENTSINCE" => Ok(SentSince(p::date(lx)?)),
        "UID" => Ok(Uid(p::sequence_set(lx)?)),
        "NOT" => Ok(Not(Box::new(search_key(lx)?))),
        "OR" => {
            let a = search_key(lx)?;
            let b = search_key(lx)?;
            Ok(Or(Box::new(a), Box::new(b)))
        }
        _ => Err(ProtocolError::syntax(format!(
            "Invalid search key: {}",
            name
        ))),
    }
}
