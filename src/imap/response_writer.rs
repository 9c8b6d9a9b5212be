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

use std::io::{self, Write};

use super::lex::LexWriter;
use super::request_lexer::SharedWriter;
use crate::store::model::{MessageFlags, PERMANENT_FLAGS};
use crate::support::error::ProtocolError;

const UNTAGGED: &str = "*";

/// Writes response lines for one request.
///
/// Every line is assembled in memory first and then written and flushed as
/// a whole, so lines from different writers sharing the connection never
/// interleave. A failed write means the client is gone and is reported as a
/// fatal `ProtocolError`.
pub struct ImapResponse {
    write: SharedWriter,
    tag: String,
}

impl ImapResponse {
    pub fn new(write: SharedWriter) -> Self {
        ImapResponse {
            write,
            tag: UNTAGGED.to_owned(),
        }
    }

    pub fn set_tag(&mut self, tag: &str) {
        self.tag = tag.to_owned();
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `tag OK [code] NAME completed.`
    pub fn command_complete(
        &self,
        command: &str,
        code: Option<&str>,
    ) -> Result<(), ProtocolError> {
        self.line(true, |l| {
            l.verbatim(" OK")?;
            response_code(l, code)?;
            l.verbatim(" ")?;
            l.verbatim(command)?;
            l.verbatim(" completed.")
        })
    }

    /// `tag NO [code] NAME failed. reason`
    pub fn command_failed(
        &self,
        command: &str,
        code: Option<&str>,
        reason: &str,
    ) -> Result<(), ProtocolError> {
        self.line(true, |l| {
            l.verbatim(" NO")?;
            response_code(l, code)?;
            l.verbatim(" ")?;
            l.verbatim(command)?;
            l.verbatim(" failed.")?;
            message(l, reason)
        })
    }

    /// `tag BAD message`
    pub fn command_error(&self, msg: &str) -> Result<(), ProtocolError> {
        self.line(true, |l| {
            l.verbatim(" BAD")?;
            message(l, msg)
        })
    }

    /// `tag NO message`, without a command name.
    pub fn tagged_no(&self, msg: &str) -> Result<(), ProtocolError> {
        self.line(true, |l| {
            l.verbatim(" NO")?;
            message(l, msg)
        })
    }

    /// `* BAD message`
    pub fn bad_response(&self, msg: &str) -> Result<(), ProtocolError> {
        self.line(false, |l| {
            l.verbatim(" BAD")?;
            message(l, msg)
        })
    }

    /// `* OK [code] message`
    pub fn ok_response(
        &self,
        code: Option<&str>,
        msg: &str,
    ) -> Result<(), ProtocolError> {
        self.line(false, |l| {
            l.verbatim(" OK")?;
            response_code(l, code)?;
            message(l, msg)
        })
    }

    pub fn flags_response(
        &self,
        flags: MessageFlags,
    ) -> Result<(), ProtocolError> {
        self.line(false, |l| {
            l.verbatim(" FLAGS ")?;
            l.flags(flags)
        })
    }

    pub fn permanent_flags_response(&self) -> Result<(), ProtocolError> {
        self.ok_response(
            Some(&format!("PERMANENTFLAGS {}", PERMANENT_FLAGS)),
            "",
        )
    }

    pub fn exists_response(&self, count: usize) -> Result<(), ProtocolError> {
        self.line(false, |l| l.verbatim(&format!(" {} EXISTS", count)))
    }

    pub fn recent_response(&self, count: usize) -> Result<(), ProtocolError> {
        self.line(false, |l| l.verbatim(&format!(" {} RECENT", count)))
    }

    pub fn expunge_response(&self, msn: u32) -> Result<(), ProtocolError> {
        self.line(false, |l| l.verbatim(&format!(" {} EXPUNGE", msn)))
    }

    /// `* msn FETCH (data)`, where `data` may contain literals.
    pub fn fetch_response(
        &self,
        msn: u32,
        data: &[u8],
    ) -> Result<(), ProtocolError> {
        self.line(false, |l| {
            l.verbatim(&format!(" {} FETCH (", msn))?;
            l.verbatim_bytes(data)?;
            l.verbatim(")")
        })
    }

    /// `* NAME data`, for command-specific untagged data.
    pub fn command_response(
        &self,
        command: &str,
        data: &[u8],
    ) -> Result<(), ProtocolError> {
        self.line(false, |l| {
            l.verbatim(" ")?;
            l.verbatim(command)?;
            if !data.is_empty() {
                l.verbatim(" ")?;
                l.verbatim_bytes(data)?;
            }
            Ok(())
        })
    }

    pub fn untagged_response(&self, msg: &str) -> Result<(), ProtocolError> {
        self.line(false, |l| message(l, msg))
    }

    pub fn bye_response(&self, msg: &str) -> Result<(), ProtocolError> {
        self.line(false, |l| {
            l.verbatim(" BYE")?;
            message(l, msg)
        })
    }

    /// A bare continuation request carrying no data.
    pub fn continuation(&self) -> Result<(), ProtocolError> {
        let mut w = self.write.lock().unwrap();
        w.write_all(b"+ \r\n")?;
        w.flush()?;
        Ok(())
    }

    fn line(
        &self,
        tagged: bool,
        f: impl FnOnce(&mut LexWriter<Vec<u8>>) -> io::Result<()>,
    ) -> Result<(), ProtocolError> {
        let mut l = LexWriter::new(Vec::new());
        l.verbatim(if tagged { &self.tag } else { UNTAGGED })?;
        f(&mut l)?;
        l.verbatim("\r\n")?;

        let mut w = self.write.lock().unwrap();
        w.write_all(&l.into_inner())?;
        w.flush()?;
        Ok(())
    }
}

fn response_code(
    l: &mut LexWriter<Vec<u8>>,
    code: Option<&str>,
) -> io::Result<()> {
    if let Some(code) = code {
        l.verbatim(" [")?;
        l.verbatim(code)?;
        l.verbatim("]")?;
    }
    Ok(())
}

fn message(l: &mut LexWriter<Vec<u8>>, msg: &str) -> io::Result<()> {
    if !msg.is_empty() {
        l.verbatim(" ")?;
        l.verbatim(msg)?;
    }
    Ok(())
}
