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

use std::io::{self, BufRead, Read, Write};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::support::error::ProtocolError;

/// The shared output half of a connection.
///
/// Both the lexer (for continuation requests) and the response writer need
/// to write, so the writer lives behind a mutex.
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// The continuation request sent before reading a synchronising literal.
pub const CONTINUATION: &[u8] = b"+ OK\r\n";

/// Byte-oriented reader over the request stream with one byte of lookahead.
///
/// `peek` returns the same byte until `consume` is called, which lets the
/// parser test a byte and decide what to do without re-reading the stream.
/// Reaching the end of the stream while a byte is needed is an error, never
/// a silent EOF.
pub struct RequestLexer {
    read: Box<dyn BufRead + Send>,
    write: SharedWriter,
    peeked: Option<u8>,
    /// The text received on the current line, for debug logging.
    line: Vec<u8>,
}

impl RequestLexer {
    pub fn new(read: Box<dyn BufRead + Send>, write: SharedWriter) -> Self {
        RequestLexer {
            read,
            write,
            peeked: None,
            line: Vec::new(),
        }
    }

    /// Return the next byte without consuming it.
    pub fn peek(&mut self) -> Result<u8, ProtocolError> {
        if let Some(ch) = self.peeked {
            return Ok(ch);
        }

        let ch = {
            let buf = loop {
                match self.read.fill_buf() {
                    Ok(buf) => break buf,
                    Err(e) if io::ErrorKind::Interrupted == e.kind() => {
                        continue
                    }
                    Err(e) => return Err(e.into()),
                }
            };
            match buf.first() {
                Some(&ch) => ch,
                None => {
                    self.dump_line();
                    return Err(ProtocolError::EndOfStream);
                }
            }
        };
        self.read.consume(1);

        self.line.push(ch);
        self.peeked = Some(ch);
        Ok(ch)
    }

    /// Return the next byte and move past it.
    pub fn consume(&mut self) -> Result<u8, ProtocolError> {
        let ch = self.peek()?;
        self.peeked = None;
        Ok(ch)
    }

    /// Consume one byte, which must be `expected`.
    pub fn consume_char(&mut self, expected: u8) -> Result<(), ProtocolError> {
        let ch = self.consume()?;
        if expected != ch {
            return Err(ProtocolError::syntax(format!(
                "Expected:'{}' found:'{}'",
                expected as char, ch as char
            )));
        }
        Ok(())
    }

    /// Skip spaces and return the first byte of the next word.
    ///
    /// Running into the end of the line is an error since callers only do
    /// this when an argument is required.
    pub fn next_word_char(&mut self) -> Result<u8, ProtocolError> {
        let mut ch = self.peek()?;
        while b' ' == ch {
            self.consume()?;
            ch = self.peek()?;
        }

        if b'\r' == ch || b'\n' == ch {
            return Err(ProtocolError::syntax("Missing argument."));
        }

        Ok(ch)
    }

    /// Whether the rest of the line, ignoring spaces, is empty.
    ///
    /// Used for optional trailing arguments.
    pub fn at_eol(&mut self) -> Result<bool, ProtocolError> {
        let mut ch = self.peek()?;
        while b' ' == ch {
            self.consume()?;
            ch = self.peek()?;
        }
        Ok(b'\r' == ch || b'\n' == ch)
    }

    /// Require that nothing but spaces remains before the end of the line.
    ///
    /// The LF is left unconsumed; `consume_line` moves past it.
    pub fn eol(&mut self) -> Result<(), ProtocolError> {
        let mut ch = self.peek()?;
        while b' ' == ch {
            self.consume()?;
            ch = self.peek()?;
        }

        if b'\r' == ch {
            self.consume()?;
            ch = self.peek()?;
        }

        if b'\n' != ch {
            return Err(ProtocolError::syntax(format!(
                "Expected end-of-line, found more character(s): {}",
                ch as char
            )));
        }

        Ok(())
    }

    /// Consume everything up to and including the next LF.
    pub fn consume_line(&mut self) -> Result<(), ProtocolError> {
        while b'\n' != self.consume()? {}
        self.dump_line();
        Ok(())
    }

    /// Consume a CRLF or bare LF.
    pub fn consume_crlf(&mut self) -> Result<(), ProtocolError> {
        if b'\n' != self.peek()? {
            self.consume_char(b'\r')?;
        }
        self.consume_char(b'\n')
    }

    /// Read exactly `len` bytes, blocking until they have all arrived.
    ///
    /// The buffer only grows as data arrives, so a client announcing more
    /// than it sends costs nothing. The stream closing first is an error.
    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        let mut data = Vec::new();
        if len > 0 {
            if let Some(ch) = self.peeked.take() {
                data.push(ch);
            }
        }

        let remaining = (len - data.len()) as u64;
        self.read.by_ref().take(remaining).read_to_end(&mut data)?;
        if data.len() != len {
            return Err(ProtocolError::UnexpectedEof);
        }

        self.line
            .extend_from_slice(format!("<{} bytes>", len).as_bytes());
        Ok(data)
    }

    /// Ask the client to send the rest of the command.
    pub fn request_continuation(&mut self) -> Result<(), ProtocolError> {
        let mut w = self.write.lock().unwrap();
        w.write_all(CONTINUATION)?;
        w.flush()?;
        Ok(())
    }

    /// Read a full line of raw text, without its line ending.
    ///
    /// Used for the client's side of AUTHENTICATE exchanges.
    pub fn read_line(&mut self) -> Result<String, ProtocolError> {
        let mut line = Vec::new();
        loop {
            match self.consume()? {
                b'\n' => break,
                ch => line.push(ch),
            }
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        self.dump_line();
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn dump_line(&mut self) {
        if !self.line.is_empty() {
            debug!(
                "IMAP line received: <{}>",
                String::from_utf8_lossy(&self.line)
                    .replace('\r', "\\r")
                    .replace('\n', "\\n")
            );
            self.line.clear();
        }
    }
}
