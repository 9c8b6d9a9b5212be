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

//! The FETCH command.
//!
//! Only the parts of a message which need no MIME parsing are available:
//! the flags and metadata, the whole message, its header (optionally
//! filtered by field name) and its text. ENVELOPE, BODYSTRUCTURE and
//! numbered body parts are rejected as invalid attributes.

use std::io;

use super::defs::*;
use crate::imap::lex::LexWriter;
use crate::imap::request_lexer::RequestLexer;
use crate::imap::session_folder::SessionFolder;
use crate::store::folder::MailFolder;
use crate::store::message::StoredMessage;
use crate::store::model::MessageFlags;
use crate::support::error::{Error, ProtocolError};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Section {
    Full,
    Header,
    HeaderFields(Vec<String>),
    HeaderFieldsNot(Vec<String>),
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct BodyItem {
    /// The name of the item in the response, e.g. `RFC822.HEADER` or
    /// `BODY[TEXT]<0>`.
    label: String,
    section: Section,
    /// `(start, length)`; no length means to the end.
    partial: Option<(u64, Option<u64>)>,
    peek: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct FetchRequest {
    flags: bool,
    internal_date: bool,
    size: bool,
    uid: bool,
    bodies: Vec<BodyItem>,
}

pub(super) fn cmd_fetch(req: &mut Request<'_>) -> CmdResult {
    let set = p::sequence_set(req.lexer)?;
    let mut request = fetch_items(req.lexer)?;
    req.lexer.eol()?;

    if req.use_uid {
        request.uid = true;
    }

    let selected = selected!(req)?;
    for (msn, uid) in resolve_set(selected, &set, req.use_uid)? {
        let data = fetch_message(selected, uid, &request)?;
        req.response.fetch_response(msn, &data)?;
    }

    req.complete()
}

fn fetch_message(
    selected: &SessionFolder,
    uid: u64,
    request: &FetchRequest,
) -> Result<Vec<u8>, Error> {
    let mut stored = selected.message(uid)?;

    let sets_seen = !selected.is_read_only()
        && !stored.flags.contains(MessageFlags::SEEN)
        && request.bodies.iter().any(|b| !b.peek);
    if sets_seen {
        // Silent for this session since the FLAGS item reports it
        stored.flags = selected.folder().set_flags(
            MessageFlags::SEEN,
            true,
            uid,
            Some(selected.listener()),
            false,
        )?;
    }

    Ok(format_fetch(&stored, request, sets_seen)?)
}

fn format_fetch(
    stored: &StoredMessage,
    request: &FetchRequest,
    force_flags: bool,
) -> io::Result<Vec<u8>> {
    let mut l = LexWriter::new(Vec::new());
    let mut first = true;
    let mut sep = |l: &mut LexWriter<Vec<u8>>| {
        if first {
            first = false;
            Ok(())
        } else {
            l.verbatim(" ")
        }
    };

    if request.flags || force_flags {
        sep(&mut l)?;
        l.verbatim("FLAGS ")?;
        l.flags(stored.flags)?;
    }
    if request.internal_date {
        sep(&mut l)?;
        l.verbatim("INTERNALDATE ")?;
        l.datetime(&stored.received_at)?;
    }
    if request.size {
        sep(&mut l)?;
        l.verbatim("RFC822.SIZE ")?;
        l.num(stored.message.size() as u64)?;
    }
    if request.uid {
        sep(&mut l)?;
        l.verbatim("UID ")?;
        l.num(stored.uid)?;
    }

    for body in &request.bodies {
        sep(&mut l)?;
        l.verbatim(&body.label)?;
        l.verbatim(" ")?;
        let content = section_content(stored, &body.section);
        l.literal(partial(&content, body.partial))?;
    }

    Ok(l.into_inner())
}

fn section_content(stored: &StoredMessage, section: &Section) -> Vec<u8> {
    let message = &stored.message;
    match *section {
        Section::Full => message.raw().to_vec(),
        Section::Header => message.header_block().to_vec(),
        Section::HeaderFields(ref names) => message.filtered_header_block(
            |name| names.iter().any(|n| n.eq_ignore_ascii_case(name)),
        ),
        Section::HeaderFieldsNot(ref names) => message.filtered_header_block(
            |name| !names.iter().any(|n| n.eq_ignore_ascii_case(name)),
        ),
        Section::Text => message.body().to_vec(),
    }
}

/// Apply a `<start.length>` partial, clamped to the data available.
fn partial(data: &[u8], range: Option<(u64, Option<u64>)>) -> &[u8] {
    let (start, length) = match range {
        None => return data,
        Some(range) => range,
    };

    let start = (start as usize).min(data.len());
    let end = match length {
        Some(length) => start.saturating_add(length as usize).min(data.len()),
        None => data.len(),
    };
    &data[start..end]
}

fn fetch_items(lx: &mut RequestLexer) -> Result<FetchRequest, ProtocolError> {
    let mut request = FetchRequest::default();
    if b'(' == lx.next_word_char()? {
        lx.consume()?;
        loop {
            if b')' == lx.next_word_char()? {
                lx.consume()?;
                break;
            }
            fetch_item(lx, &mut request)?;
        }
    } else {
        fetch_item(lx, &mut request)?;
    }
    Ok(request)
}

fn fetch_item(
    lx: &mut RequestLexer,
    request: &mut FetchRequest,
) -> Result<(), ProtocolError> {
    let name = p::atom_only(lx)?.to_ascii_uppercase();
    let has_section = b'[' == lx.peek()?;
    let simple_body = |label: &str, section: Section, peek: bool| BodyItem {
        label: label.to_owned(),
        section,
        partial: None,
        peek,
    };

    match &name[..] {
        "FLAGS" => request.flags = true,
        "INTERNALDATE" => request.internal_date = true,
        "RFC822.SIZE" => request.size = true,
        "UID" => request.uid = true,
        "FAST" => {
            request.flags = true;
            request.internal_date = true;
            request.size = true;
        }
        "RFC822" => request
            .bodies
            .push(simple_body("RFC822", Section::Full, false)),
        "RFC822.HEADER" => request
            .bodies
            .push(simple_body("RFC822.HEADER", Section::Header, true)),
        "RFC822.TEXT" => request
            .bodies
            .push(simple_body("RFC822.TEXT", Section::Text, false)),
        "BODY" | "BODY.PEEK" if has_section => {
            let (text, section) = section(lx)?;
            let partial = partial_spec(lx)?;
            let mut label = format!("BODY[{}]", text);
            if let Some((start, _)) = partial {
                label.push_str(&format!("<{}>", start));
            }
            request.bodies.push(BodyItem {
                label,
                section,
                partial,
                peek: "BODY.PEEK" == name,
            });
        }
        _ => {
            return Err(ProtocolError::syntax(format!(
                "Invalid fetch attribute: {}",
                name
            )))
        }
    }

    Ok(())
}

/// `[section]`, returning the section text to echo and its meaning.
fn section(lx: &mut RequestLexer) -> Result<(String, Section), ProtocolError> {
    lx.consume_char(b'[')?;

    let mut name = Vec::new();
    loop {
        let ch = lx.peek()?;
        if matches!(ch, b']' | b' ' | b'\r' | b'\n') {
            break;
        }
        name.push(ch);
        lx.consume()?;
    }
    let name = String::from_utf8_lossy(&name).to_ascii_uppercase();

    let (text, section) = match &name[..] {
        "" => (name.clone(), Section::Full),
        "HEADER" => (name.clone(), Section::Header),
        "TEXT" => (name.clone(), Section::Text),
        "HEADER.FIELDS" | "HEADER.FIELDS.NOT" => {
            let fields = header_list(lx)?;
            let text = format!("{} ({})", name, fields.join(" "));
            if "HEADER.FIELDS" == name {
                (text, Section::HeaderFields(fields))
            } else {
                (text, Section::HeaderFieldsNot(fields))
            }
        }
        _ => {
            return Err(ProtocolError::syntax(format!(
                "Invalid section: {}",
                name
            )))
        }
    };

    lx.consume_char(b']')?;
    Ok((text, section))
}

fn header_list(lx: &mut RequestLexer) -> Result<Vec<String>, ProtocolError> {
    if b'(' != lx.next_word_char()? {
        return Err(ProtocolError::syntax("Expected header field list."));
    }
    lx.consume()?;

    let mut fields = Vec::new();
    loop {
        let ch = lx.next_word_char()?;
        if b')' == ch {
            lx.consume()?;
            break;
        }

        let field = if b'"' == ch {
            p::quoted(lx)?
        } else {
            p::atom_only(lx)?
        };
        if field.is_empty() {
            return Err(ProtocolError::syntax(format!(
                "Invalid character: '{}'",
                ch as char
            )));
        }
        fields.push(field);
    }

    Ok(fields)
}

/// `<length>` or `<start.length>`.
///
/// A lone number is the length of a partial starting at 0.
fn partial_spec(
    lx: &mut RequestLexer,
) -> Result<Option<(u64, Option<u64>)>, ProtocolError> {
    if b'<' != lx.peek()? {
        return Ok(None);
    }
    lx.consume()?;

    let first = digits(lx)?;
    let ret = if b'.' == lx.peek()? {
        lx.consume()?;
        (first, Some(digits(lx)?))
    } else {
        (0, Some(first))
    };
    lx.consume_char(b'>')?;
    Ok(Some(ret))
}

fn digits(lx: &mut RequestLexer) -> Result<u64, ProtocolError> {
    let mut text = String::new();
    while lx.peek()?.is_ascii_digit() {
        text.push(lx.consume()? as char);
    }
    text.parse::<u64>()
        .map_err(|_| ProtocolError::syntax("Invalid partial range."))
}
