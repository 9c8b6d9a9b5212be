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

use std::borrow::Cow;
use std::str;

use chrono::prelude::*;
use lazy_static::lazy_static;
use regex::bytes::Regex;

use super::model::MessageFlags;

/// The header carrying the UID inside each stored message file, so that the
/// UID can be recovered from the message alone.
pub const UID_HEADER: &str = "X-GreenMail-UID";

lazy_static! {
    static ref UID_HEADER_LINE: Regex =
        Regex::new(r"(?mi)^X-GreenMail-UID:[^\n]*\n").unwrap();
}

/// An RFC 822 message, treated as opaque bytes apart from header lookup.
///
/// No MIME structure is interpreted. Header values are unfolded but encoded
/// words are left as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    raw: Vec<u8>,
    /// Offset of the first byte of the body, i.e., just past the blank line
    /// ending the header block, or `raw.len()` if there is no body.
    body_start: usize,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Message({} bytes, subject={:?})",
            self.raw.len(),
            self.header("Subject")
        )
    }
}

impl Message {
    pub fn new(raw: Vec<u8>) -> Self {
        let body_start = find_body_start(&raw);
        Message { raw, body_start }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// The header block, including the blank line which terminates it.
    pub fn header_block(&self) -> &[u8] {
        &self.raw[..self.body_start]
    }

    pub fn body(&self) -> &[u8] {
        &self.raw[self.body_start..]
    }

    /// Iterate over `(name, unfolded value)` pairs in header order.
    pub fn header_fields(&self) -> HeaderFields<'_> {
        HeaderFields {
            rest: self.header_block(),
        }
    }

    /// Look up the first header with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.header_fields()
            .find(|&(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// The raw lines of the header fields whose names satisfy `pred`,
    /// followed by the terminating blank line.
    pub fn filtered_header_block(
        &self,
        mut pred: impl FnMut(&str) -> bool,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        let mut rest = self.header_block();
        while let Some((name, line, tail)) = next_field(rest) {
            if pred(name) {
                out.extend_from_slice(line);
            }
            rest = tail;
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    /// The parsed `Date` header, if present and well-formed.
    pub fn sent_date(&self) -> Option<DateTime<FixedOffset>> {
        self.header("Date")
            .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
    }

    /// Return a copy of this message whose first header is the UID header
    /// with the given value. Any existing UID header is removed.
    pub fn with_uid_header(&self, uid: u64) -> Message {
        let stripped =
            UID_HEADER_LINE.replace_all(self.header_block(), &b""[..]);
        let mut raw = Vec::with_capacity(self.raw.len() + 32);
        raw.extend_from_slice(
            format!("{}: {}\r\n", UID_HEADER, uid).as_bytes(),
        );
        raw.extend_from_slice(&stripped);
        raw.extend_from_slice(self.body());
        Message::new(raw)
    }

    /// The UID recorded in the UID header, if any.
    pub fn embedded_uid(&self) -> Option<u64> {
        self.header(UID_HEADER).and_then(|v| v.trim().parse().ok())
    }
}

fn find_body_start(raw: &[u8]) -> usize {
    // A header block which is immediately empty is legal: the message then
    // starts with its blank line.
    if raw.starts_with(b"\r\n") {
        return 2;
    } else if raw.starts_with(b"\n") {
        return 1;
    }

    let mut prev_nl = None;
    for nl in memchr::memchr_iter(b'\n', raw) {
        if let Some(prev) = prev_nl {
            let between = &raw[prev + 1..nl];
            if between.is_empty() || between == b"\r" {
                return nl + 1;
            }
        }
        prev_nl = Some(nl);
    }

    raw.len()
}

/// Split the next header field off `block`.
///
/// Returns the field name, the raw field including continuation lines and
/// line ending, and the remainder.
fn next_field(block: &[u8]) -> Option<(&str, &[u8], &[u8])> {
    if block.is_empty() || block == b"\r\n" || block == b"\n" {
        return None;
    }

    let mut end = 0;
    loop {
        match memchr::memchr(b'\n', &block[end..]) {
            None => {
                end = block.len();
                break;
            }
            Some(ix) => {
                end += ix + 1;
                match block.get(end) {
                    Some(&b' ') | Some(&b'\t') => continue,
                    _ => break,
                }
            }
        }
    }

    let line = &block[..end];
    let name = memchr::memchr(b':', line)
        .and_then(|colon| str::from_utf8(&line[..colon]).ok())
        .unwrap_or("")
        .trim();
    Some((name, line, &block[end..]))
}

pub struct HeaderFields<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for HeaderFields<'a> {
    type Item = (&'a str, String);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (name, line, rest) = next_field(self.rest)?;
            self.rest = rest;
            if name.is_empty() {
                continue;
            }

            let value = match memchr::memchr(b':', line) {
                Some(colon) => &line[colon + 1..],
                None => continue,
            };
            return Some((name, unfold(value).into_owned()));
        }
    }
}

fn unfold(value: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(value);
    if !text.contains('\n') {
        return Cow::Owned(text.trim().to_owned());
    }

    let mut out = String::with_capacity(text.len());
    for line in text.split('\n') {
        out.push_str(line.trim_end_matches('\r'));
    }
    Cow::Owned(out.trim().to_owned())
}

/// A message as held by a folder.
#[derive(Clone, Debug)]
pub struct StoredMessage {
    pub uid: u64,
    pub flags: MessageFlags,
    pub received_at: DateTime<Utc>,
    pub message: Message,
}
