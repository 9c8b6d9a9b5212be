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

//! Grammar primitives of IMAP requests, read directly off a `RequestLexer`.
//!
//! Each function consumes exactly the production it names, leaving the
//! lexer positioned on whatever follows. Leading spaces are skipped where
//! the production is a "word".
//!
//! Small self-contained productions (dates, message sets) are first read as
//! a whole word and then handed to `nom`.

use chrono::prelude::*;
use nom::{
    branch::alt,
    bytes::complete::{tag as nom_tag, take_while_m_n},
    character::complete::{char as nom_char, digit1},
    combinator::{all_consuming, map, map_res, opt},
    multi::separated_nonempty_list,
    sequence::{preceded, tuple},
    IResult,
};

use super::mailbox_name;
use super::request_lexer::RequestLexer;
use crate::account::host::INBOX_NAME;
use crate::store::model::{Flag, IdRange};
use crate::support::error::ProtocolError;

type PResult<T> = Result<T, ProtocolError>;

/// The largest literal, and so the largest message, a client may send.
pub const MAX_LITERAL: u64 = 64 * 1024 * 1024;

fn is_ctl(ch: u8) -> bool {
    ch < 0x20 || 0x7F == ch
}

fn is_whitespace(ch: u8) -> bool {
    b' ' == ch || b'\n' == ch || b'\r' == ch || b'\t' == ch
}

/// `ATOM-CHAR`.
fn is_atom_char(ch: u8) -> bool {
    ch.is_ascii()
        && !is_ctl(ch)
        && !matches!(ch, b'(' | b')' | b'{' | b' ' | b'%' | b'*' | b'"' | b'\\')
}

fn is_tag_char(ch: u8) -> bool {
    b'+' != ch && is_atom_char(ch)
}

fn is_message_set_char(ch: u8) -> bool {
    ch.is_ascii_digit() || b':' == ch || b'*' == ch || b',' == ch
}

/// Consume a word made of bytes satisfying `valid`, ending at whitespace.
///
/// Any other byte is an error.
fn word(lx: &mut RequestLexer, valid: impl Fn(u8) -> bool) -> PResult<String> {
    let mut out = Vec::new();
    let mut ch = lx.next_word_char()?;
    while !is_whitespace(ch) {
        if !valid(ch) {
            return Err(ProtocolError::syntax(format!(
                "Invalid character: '{}'",
                ch as char
            )));
        }
        out.push(ch);
        lx.consume()?;
        ch = lx.peek()?;
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Consume a word made of bytes satisfying `valid`, stopping at the first
/// byte which does not.
fn word_only(
    lx: &mut RequestLexer,
    valid: impl Fn(u8) -> bool,
) -> PResult<String> {
    let mut out = Vec::new();
    let mut ch = lx.next_word_char()?;
    while !is_whitespace(ch) && valid(ch) {
        out.push(ch);
        lx.consume()?;
        ch = lx.peek()?;
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

pub fn tag(lx: &mut RequestLexer) -> PResult<String> {
    let tag = word(lx, is_tag_char)?;
    if tag.is_empty() {
        return Err(ProtocolError::syntax("Missing tag."));
    }
    Ok(tag)
}

pub fn atom(lx: &mut RequestLexer) -> PResult<String> {
    word(lx, is_atom_char)
}

/// An atom which ends at the first non-atom byte instead of failing there.
///
/// Used where an atom may be directly followed by `(`, `[`, or `)`.
pub fn atom_only(lx: &mut RequestLexer) -> PResult<String> {
    word_only(lx, |ch| is_atom_char(ch) && b'[' != ch && b']' != ch)
}

/// `astring`: an atom, a quoted string, or a literal.
pub fn astring(lx: &mut RequestLexer) -> PResult<String> {
    Ok(String::from_utf8_lossy(&astring_bytes(lx)?).into_owned())
}

/// Like `astring`, but returns literals without any text conversion.
pub fn astring_bytes(lx: &mut RequestLexer) -> PResult<Vec<u8>> {
    match lx.next_word_char()? {
        b'"' => Ok(quoted(lx)?.into_bytes()),
        b'{' => literal(lx),
        _ => Ok(atom(lx)?.into_bytes()),
    }
}

/// `nstring`: a string or `NIL`.
pub fn nstring(lx: &mut RequestLexer) -> PResult<Option<String>> {
    match lx.next_word_char()? {
        b'"' => Ok(Some(quoted(lx)?)),
        b'{' => Ok(Some(String::from_utf8_lossy(&literal(lx)?).into_owned())),
        _ => {
            let value = atom(lx)?;
            if "NIL" == value {
                Ok(None)
            } else {
                Err(ProtocolError::syntax(
                    "Invalid nstring value: valid values are '\"...\"', \
                     '{12} CRLF *CHAR8', and 'NIL'.",
                ))
            }
        }
    }
}

/// A mailbox name.
///
/// Any case variant of INBOX becomes the canonical `INBOX`; other names are
/// decoded from modified UTF-7.
pub fn mailbox(lx: &mut RequestLexer) -> PResult<String> {
    let name = astring(lx)?;
    if name.eq_ignore_ascii_case(INBOX_NAME) {
        Ok(INBOX_NAME.to_owned())
    } else {
        Ok(mailbox_name::decode(&name).into_owned())
    }
}

/// A LIST/LSUB pattern: a mailbox name whose atom form may also contain the
/// `*` and `%` wildcards.
pub fn list_mailbox(lx: &mut RequestLexer) -> PResult<String> {
    let name = match lx.next_word_char()? {
        b'"' => quoted(lx)?,
        b'{' => String::from_utf8_lossy(&literal(lx)?).into_owned(),
        _ => word(lx, |ch| is_atom_char(ch) || b'*' == ch || b'%' == ch)?,
    };
    Ok(mailbox_name::decode(&name).into_owned())
}

/// A quoted string. Only `"` and `\` may be escaped.
pub fn quoted(lx: &mut RequestLexer) -> PResult<String> {
    lx.consume_char(b'"')?;
    let mut out = Vec::new();
    loop {
        let mut ch = lx.peek()?;
        if b'"' == ch {
            break;
        }
        if b'\r' == ch || b'\n' == ch {
            return Err(ProtocolError::syntax("Unterminated quoted string."));
        }

        if b'\\' == ch {
            lx.consume()?;
            ch = lx.peek()?;
            if b'"' != ch && b'\\' != ch {
                return Err(ProtocolError::syntax(format!(
                    "Invalid escaped character in quote: '{}'",
                    ch as char
                )));
            }
        }

        out.push(ch);
        lx.consume()?;
    }
    lx.consume_char(b'"')?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// A literal, `{n}` or `{n+}` followed by CRLF and `n` bytes.
///
/// The synchronising form asks the client for the data before reading it.
/// A length over `MAX_LITERAL` is fatal, since the data that follows
/// cannot be skipped reliably.
pub fn literal(lx: &mut RequestLexer) -> PResult<Vec<u8>> {
    lx.consume_char(b'{')?;
    let mut digits = String::new();
    loop {
        match lx.peek()? {
            b'}' | b'+' => break,
            ch if ch.is_ascii_digit() => {
                digits.push(ch as char);
                lx.consume()?;
            }
            ch => {
                return Err(ProtocolError::syntax(format!(
                    "Invalid character in literal length: '{}'",
                    ch as char
                )))
            }
        }
    }

    let synchronizing = if b'+' == lx.peek()? {
        lx.consume()?;
        false
    } else {
        true
    };
    lx.consume_char(b'}')?;
    lx.consume_crlf()?;

    if digits.is_empty() {
        return Err(ProtocolError::syntax("Invalid literal length."));
    }
    // Too many digits to parse is too large all the same
    let len = digits.parse::<u64>().unwrap_or(u64::MAX);
    if len > MAX_LITERAL {
        return Err(ProtocolError::LiteralTooLarge(len));
    }

    if synchronizing {
        lx.request_continuation()?;
    }
    lx.read_exact(len as usize)
}

pub fn number(lx: &mut RequestLexer) -> PResult<u64> {
    let digits = word(lx, |ch| ch.is_ascii_digit())?;
    digits
        .parse()
        .map_err(|_| ProtocolError::syntax(format!("Invalid number: {}", digits)))
}

pub fn nz_number(lx: &mut RequestLexer) -> PResult<u64> {
    let n = number(lx)?;
    if 0 == n {
        return Err(ProtocolError::syntax("Zero value not permitted."));
    }
    Ok(n)
}

/// A parenthesised flag list, or a bare sequence of flags up to the end of
/// the line.
pub fn flag_list(lx: &mut RequestLexer) -> PResult<Vec<Flag>> {
    let parenthesised = b'(' == lx.next_word_char()?;
    if parenthesised {
        lx.consume()?;
    }

    let mut flags = Vec::new();
    loop {
        let mut ch = lx.peek()?;
        while b' ' == ch {
            lx.consume()?;
            ch = lx.peek()?;
        }

        if parenthesised && b')' == ch {
            lx.consume()?;
            break;
        }
        if b'\r' == ch || b'\n' == ch {
            if parenthesised {
                return Err(ProtocolError::syntax("Unterminated flag list."));
            }
            break;
        }

        let mut text = Vec::new();
        while !is_whitespace(ch) && b')' != ch && b'(' != ch {
            text.push(ch);
            lx.consume()?;
            ch = lx.peek()?;
        }
        if text.is_empty() {
            return Err(ProtocolError::syntax(format!(
                "Invalid character: '{}'",
                ch as char
            )));
        }
        flags.push(String::from_utf8_lossy(&text).parse::<Flag>()?);
    }

    Ok(flags)
}

/// A date as used in SEARCH, e.g. `1-Feb-2020`, optionally quoted.
pub fn date(lx: &mut RequestLexer) -> PResult<NaiveDate> {
    let text = if b'"' == lx.next_word_char()? {
        quoted(lx)?
    } else {
        atom_only(lx)?
    };

    let result = all_consuming(parse_date)(&text)
        .map(|(_, d)| d)
        .map_err(|_| {
            ProtocolError::syntax(format!(
                "Invalid date format <{}>, should comply to dd-MMM-yyyy",
                text
            ))
        });
    result
}

/// A quoted date-time, e.g. `"17-Jul-1996 02:44:25 -0700"`.
pub fn date_time(lx: &mut RequestLexer) -> PResult<DateTime<FixedOffset>> {
    if b'"' != lx.next_word_char()? {
        return Err(ProtocolError::syntax("DateTime values must be quoted."));
    }
    let text = quoted(lx)?;

    let result = all_consuming(parse_date_time)(&text)
        .map(|(_, dt)| dt)
        .map_err(|_| {
            ProtocolError::syntax(format!(
                "Invalid date format <{}>, should comply to \
                 dd-MMM-yyyy hh:mm:ss Z",
                text
            ))
        });
    result
}

/// A message set, such as `1,3:5,7:*`.
pub fn sequence_set(lx: &mut RequestLexer) -> PResult<SequenceSet> {
    let text = word_only(lx, is_message_set_char)?;
    parse_sequence_set(&text)
}

pub fn parse_sequence_set(text: &str) -> PResult<SequenceSet> {
    all_consuming(seq_set)(text)
        .map(|(_, ranges)| SequenceSet(ranges))
        .map_err(|_| {
            ProtocolError::syntax(format!("Invalid message set: {}", text))
        })
}

/// One end of a message set range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqBound {
    Value(u64),
    /// `*`, the largest value in use.
    Largest,
}

impl SeqBound {
    fn resolve(self, largest: u64) -> u64 {
        match self {
            SeqBound::Value(v) => v,
            SeqBound::Largest => largest,
        }
    }
}

/// A parsed message set, not yet tied to a mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceSet(pub Vec<(SeqBound, SeqBound)>);

impl SequenceSet {
    /// Turn the set into concrete ranges, with `*` standing for `largest`.
    pub fn resolve(&self, largest: u64) -> Vec<IdRange> {
        self.0
            .iter()
            .map(|&(a, b)| IdRange::new(a.resolve(largest), b.resolve(largest)))
            .collect()
    }
}

fn seq_bound(i: &str) -> IResult<&str, SeqBound> {
    alt((
        map(nom_char('*'), |_| SeqBound::Largest),
        map_res(digit1, |s: &str| s.parse::<u64>().map(SeqBound::Value)),
    ))(i)
}

fn seq_range(i: &str) -> IResult<&str, (SeqBound, SeqBound)> {
    map(
        tuple((seq_bound, opt(preceded(nom_char(':'), seq_bound)))),
        |(a, b)| (a, b.unwrap_or(a)),
    )(i)
}

fn seq_set(i: &str) -> IResult<&str, Vec<(SeqBound, SeqBound)>> {
    separated_nonempty_list(nom_char(','), seq_range)(i)
}

fn fixed_digits(
    min: usize,
    max: usize,
) -> impl Fn(&str) -> IResult<&str, u32> {
    move |i| {
        map_res(take_while_m_n(min, max, |c: char| c.is_ascii_digit()), |s: &str| {
            s.parse::<u32>()
        })(i)
    }
}

fn month(i: &str) -> IResult<&str, u32> {
    map_res(
        take_while_m_n(3, 3, |c: char| c.is_ascii_alphabetic()),
        |s: &str| {
            const MONTHS: [&str; 12] = [
                "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep",
                "oct", "nov", "dec",
            ];
            MONTHS
                .iter()
                .position(|m| m.eq_ignore_ascii_case(s))
                .map(|ix| ix as u32 + 1)
                .ok_or(())
        },
    )(i)
}

fn parse_date(i: &str) -> IResult<&str, NaiveDate> {
    map_res(
        tuple((
            fixed_digits(1, 2),
            nom_char('-'),
            month,
            nom_char('-'),
            fixed_digits(4, 4),
        )),
        |(day, _, month, _, year)| {
            NaiveDate::from_ymd_opt(year as i32, month, day).ok_or(())
        },
    )(i)
}

fn parse_date_time(i: &str) -> IResult<&str, DateTime<FixedOffset>> {
    map_res(
        tuple((
            opt(nom_char(' ')),
            parse_date,
            nom_char(' '),
            fixed_digits(2, 2),
            nom_char(':'),
            fixed_digits(2, 2),
            nom_char(':'),
            fixed_digits(2, 2),
            nom_char(' '),
            alt((nom_tag("+"), nom_tag("-"))),
            fixed_digits(2, 2),
            fixed_digits(2, 2),
        )),
        |(_, date, _, h, _, m, _, s, _, sign, zh, zm)| {
            let offset_secs = (zh * 3600 + zm * 60) as i32;
            let offset = if "-" == sign {
                FixedOffset::west_opt(offset_secs)
            } else {
                FixedOffset::east_opt(offset_secs)
            }
            .ok_or(())?;
            let naive = date.and_hms_opt(h, m, s).ok_or(())?;
            offset.from_local_datetime(&naive).single().ok_or(())
        },
    )(i)
}
