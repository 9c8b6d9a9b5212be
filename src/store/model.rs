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

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::support::error::ProtocolError;

/// A message flag, as sent over the wire.
///
/// The `Display` format of this type is the exact string that is sent over
/// the wire. `FromStr` does the reverse conversion, and also understands
/// non-standard casing of the system flags.
#[derive(Clone)]
pub enum Flag {
    Answered,
    Deleted,
    Draft,
    Flagged,
    Recent,
    Seen,
    Keyword(String),
}

impl Flag {
    /// The bit used for this flag in the persisted bitset, if any.
    ///
    /// Keywords cannot be persisted.
    pub fn system_bit(&self) -> Option<MessageFlags> {
        match *self {
            Flag::Answered => Some(MessageFlags::ANSWERED),
            Flag::Deleted => Some(MessageFlags::DELETED),
            Flag::Draft => Some(MessageFlags::DRAFT),
            Flag::Flagged => Some(MessageFlags::FLAGGED),
            Flag::Recent => Some(MessageFlags::RECENT),
            Flag::Seen => Some(MessageFlags::SEEN),
            Flag::Keyword(..) => None,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Flag::Answered => write!(f, "\\Answered"),
            Flag::Deleted => write!(f, "\\Deleted"),
            Flag::Draft => write!(f, "\\Draft"),
            Flag::Flagged => write!(f, "\\Flagged"),
            Flag::Recent => write!(f, "\\Recent"),
            Flag::Seen => write!(f, "\\Seen"),
            Flag::Keyword(ref kw) => write!(f, "{}", kw),
        }
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <Flag as fmt::Display>::fmt(self, f)
    }
}

impl FromStr for Flag {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, ProtocolError> {
        if s.eq_ignore_ascii_case("\\answered") {
            Ok(Flag::Answered)
        } else if s.eq_ignore_ascii_case("\\deleted") {
            Ok(Flag::Deleted)
        } else if s.eq_ignore_ascii_case("\\draft") {
            Ok(Flag::Draft)
        } else if s.eq_ignore_ascii_case("\\flagged") {
            Ok(Flag::Flagged)
        } else if s.eq_ignore_ascii_case("\\recent") {
            Ok(Flag::Recent)
        } else if s.eq_ignore_ascii_case("\\seen") {
            Ok(Flag::Seen)
        } else if s.len() > 1
            && s.starts_with('\\')
            && s[1..].bytes().all(is_atom_char)
        {
            // Unknown backslash flags are user flags like any keyword
            Ok(Flag::Keyword(s.to_owned()))
        } else if !s.is_empty() && s.bytes().all(is_atom_char) {
            Ok(Flag::Keyword(s.to_owned()))
        } else {
            Err(ProtocolError::syntax(format!("Invalid keyword: {}", s)))
        }
    }
}

pub fn is_atom_char(ch: u8) -> bool {
    match ch {
        0..=b' ' => false,
        127..=255 => false,
        b'(' | b')' | b'{' | b'*' | b'%' | b'\\' | b'"' | b']' => false,
        _ => true,
    }
}

impl PartialEq for Flag {
    fn eq(&self, other: &Flag) -> bool {
        match (self, other) {
            (&Flag::Keyword(ref a), &Flag::Keyword(ref b)) => {
                a.eq_ignore_ascii_case(b)
            }
            (a, b) => {
                a.system_bit().is_some() && a.system_bit() == b.system_bit()
            }
        }
    }
}

impl Eq for Flag {}

bitflags! {
    /// The persisted form of a message's flags.
    ///
    /// The bit values are part of the on-disk format of the message entries
    /// file and must never change.
    pub struct MessageFlags: u32 {
        const ANSWERED = 1;
        const DELETED = 2;
        const DRAFT = 4;
        const FLAGGED = 8;
        const RECENT = 16;
        const SEEN = 32;
    }
}

/// The flags a client may change, as advertised in PERMANENTFLAGS.
pub const PERMANENT_FLAGS: MessageFlags = MessageFlags {
    bits: MessageFlags::ANSWERED.bits
        | MessageFlags::DELETED.bits
        | MessageFlags::DRAFT.bits
        | MessageFlags::FLAGGED.bits
        | MessageFlags::SEEN.bits,
};

const DISPLAY_ORDER: [(MessageFlags, Flag); 6] = [
    (MessageFlags::ANSWERED, Flag::Answered),
    (MessageFlags::DELETED, Flag::Deleted),
    (MessageFlags::DRAFT, Flag::Draft),
    (MessageFlags::FLAGGED, Flag::Flagged),
    (MessageFlags::RECENT, Flag::Recent),
    (MessageFlags::SEEN, Flag::Seen),
];

impl MessageFlags {
    /// Convert a list of flags to the bitset.
    ///
    /// Keywords have no bit and are silently dropped.
    pub fn from_flags<'a>(flags: impl IntoIterator<Item = &'a Flag>) -> Self {
        flags
            .into_iter()
            .filter_map(Flag::system_bit)
            .fold(MessageFlags::empty(), |a, b| a | b)
    }

    pub fn to_flags(self) -> Vec<Flag> {
        DISPLAY_ORDER
            .iter()
            .filter(|&&(bit, _)| self.contains(bit))
            .map(|&(_, ref flag)| flag.clone())
            .collect()
    }

    /// Decode a bitset read from disk, ignoring unknown bits.
    pub fn from_persisted(bits: i32) -> Self {
        MessageFlags::from_bits_truncate(bits as u32)
    }

    pub fn to_persisted(self) -> i32 {
        self.bits() as i32
    }
}

/// Formats as a parenthesised IMAP flag list, e.g. `(\Deleted \Seen)`.
impl fmt::Display for MessageFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        let mut first = true;
        for flag in self.to_flags() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}", flag)?;
        }
        write!(f, ")")
    }
}

/// An inclusive range of UIDs or message sequence numbers.
///
/// `*` in a message set has already been resolved to a concrete value by
/// the time a range is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdRange {
    pub low: u64,
    pub high: u64,
}

impl IdRange {
    /// Build a range from two endpoints given in either order.
    pub fn new(a: u64, b: u64) -> Self {
        IdRange {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn single(id: u64) -> Self {
        IdRange { low: id, high: id }
    }

    pub fn includes(&self, id: u64) -> bool {
        id >= self.low && id <= self.high
    }
}

/// Whether any range of the set includes `id`.
pub fn set_includes(set: &[IdRange], id: u64) -> bool {
    set.iter().any(|r| r.includes(id))
}
