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

//! IMAP's "modified UTF-7" for mailbox names on the wire (RFC 3501 §5.1.3).
//!
//! Names are stored as UTF-8. They are decoded as they come in and encoded
//! on the way out, so clients which do not know about the encoding and just
//! use ASCII names see no difference.
//!
//! Printable ASCII other than `&` represents itself. `&-` is a literal `&`.
//! Anything else is UTF-16BE, base64-encoded with `,` in place of `/` and
//! without padding, between `&` and `-`.

use std::borrow::Cow;

/// Decode a mailbox name as received from the client.
///
/// Decoding is permissive: a malformed shift sequence is passed through
/// literally rather than rejected.
pub fn decode(wire: &str) -> Cow<'_, str> {
    if !wire.contains('&') {
        return Cow::Borrowed(wire);
    }

    let mut out = String::with_capacity(wire.len());
    let mut rest = wire;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let end = after
            .find(|c: char| !is_base64_char(c))
            .unwrap_or_else(|| after.len());

        if 0 == end {
            out.push('&');
            rest = after.strip_prefix('-').unwrap_or(after);
            continue;
        }

        match decode_utf16(&after[..end]) {
            Some(text) => {
                out.push_str(&text);
                rest = after[end..].strip_prefix('-').unwrap_or(&after[end..]);
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Encode a stored mailbox name for sending to the client.
pub fn encode(name: &str) -> Cow<'_, str> {
    if name.bytes().all(|b| is_direct(b) && b'&' != b) {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() * 2);
    let mut pending = String::new();
    for ch in name.chars() {
        if ch.is_ascii() && is_direct(ch as u8) {
            flush_encoded(&mut out, &mut pending);
            if '&' == ch {
                out.push_str("&-");
            } else {
                out.push(ch);
            }
        } else {
            pending.push(ch);
        }
    }
    flush_encoded(&mut out, &mut pending);
    Cow::Owned(out)
}

fn flush_encoded(out: &mut String, pending: &mut String) {
    if pending.is_empty() {
        return;
    }

    let mut utf16 = Vec::with_capacity(pending.len() * 2);
    for unit in pending.encode_utf16() {
        utf16.extend_from_slice(&unit.to_be_bytes());
    }
    out.push('&');
    out.push_str(&base64::encode_config(&utf16, base64::IMAP_MUTF7));
    out.push('-');
    pending.clear();
}

fn decode_utf16(encoded: &str) -> Option<String> {
    let bytes = base64::decode_config(encoded, base64::IMAP_MUTF7).ok()?;
    if 0 != bytes.len() % 2 {
        return None;
    }
    let units = bytes
        .chunks(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect::<Vec<_>>();
    String::from_utf16(&units).ok()
}

fn is_direct(b: u8) -> bool {
    (b' '..0x7F).contains(&b)
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || '+' == c || ',' == c
}
