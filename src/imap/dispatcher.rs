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

//! Turns one request line into a call of the right command handler.
//!
//! The set of commands is an explicit `CommandRegistry` built when the
//! server starts and shared read-only by every connection. Each entry says
//! which session states the command is valid in; the dispatcher enforces
//! that before the handler runs, and maps whatever the handler returns to
//! the wire:
//!
//! - grammar errors become `tag BAD <reason> Command should be '...'`
//! - folder and authorization errors become `tag NO NAME failed. <reason>`
//! - store errors and broken streams are returned to the caller, which
//!   ends the connection

use std::collections::HashMap;

use log::error;

use super::command_parser;
use super::request_lexer::RequestLexer;
use super::response_writer::ImapResponse;
use super::session::{Session, SessionState};
use crate::support::error::{Error, ProtocolError};

pub type CmdResult = Result<(), Error>;

/// A command implementation.
///
/// The handler is positioned just after the command name. It must parse
/// all its arguments up to the end of the line before acting, and write
/// its own tagged completion on success.
pub type Handler = fn(&mut Request<'_>) -> CmdResult;

/// The states in which a command is valid.
pub const ANY_STATE: &[SessionState] = &[
    SessionState::NonAuthenticated,
    SessionState::Authenticated,
    SessionState::Selected,
];
pub const NON_AUTHENTICATED: &[SessionState] = &[SessionState::NonAuthenticated];
pub const AUTHENTICATED: &[SessionState] =
    &[SessionState::Authenticated, SessionState::Selected];
pub const SELECTED: &[SessionState] = &[SessionState::Selected];

pub const PROTOCOL_ERROR: &str =
    "Protocol Error: Was expecting <tag SPACE command [arguments]>";

#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    /// Argument synopsis, shown to the client after a syntax error.
    pub args: &'static str,
    pub states: &'static [SessionState],
    /// Whether the command may follow `UID`.
    pub uid_enabled: bool,
    pub handler: Handler,
}

impl CommandSpec {
    fn usage(&self) -> String {
        if self.args.is_empty() {
            format!("Command should be '<tag> {}'", self.name)
        } else {
            format!("Command should be '<tag> {} {}'", self.name, self.args)
        }
    }
}

/// The commands a server understands, keyed by upper-case name.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full standard command set.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for spec in super::command_processor::STANDARD_COMMANDS {
            registry.register(*spec);
        }
        registry
    }

    /// Add or replace a command.
    pub fn register(&mut self, spec: CommandSpec) {
        self.commands.insert(spec.name, spec);
    }

    /// Find the command called `name`, in any case.
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(&name.to_ascii_uppercase()[..])
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Everything a handler works with.
pub struct Request<'a> {
    pub lexer: &'a mut RequestLexer,
    pub response: &'a ImapResponse,
    pub session: &'a mut Session,
    pub registry: &'a CommandRegistry,
    /// The command being executed. `UID` replaces this with its
    /// subcommand.
    pub command: CommandSpec,
    pub use_uid: bool,
    /// Set by handlers which read past the end of the request line
    /// themselves, such as AUTHENTICATE.
    pub line_consumed: bool,
}

impl Request<'_> {
    /// Report pending changes, then `tag OK NAME completed.`
    pub fn complete(&mut self) -> CmdResult {
        self.unsolicited(self.omit_expunged())?;
        self.response.command_complete(self.command.name, None)?;
        Ok(())
    }

    /// Report pending changes, then `tag OK [code] NAME completed.`
    pub fn complete_with(&mut self, code: &str) -> CmdResult {
        self.unsolicited(self.omit_expunged())?;
        self.response.command_complete(self.command.name, Some(code))?;
        Ok(())
    }

    /// FETCH, STORE and SEARCH by sequence number must not be followed by
    /// EXPUNGE responses, which would renumber the messages they reported.
    pub fn omit_expunged(&self) -> bool {
        !self.use_uid && matches!(self.command.name, "FETCH" | "STORE" | "SEARCH")
    }

    /// `tag NO [code] NAME failed. reason`
    pub fn fail(&self, code: Option<&str>, reason: &str) -> CmdResult {
        self.response
            .command_failed(self.command.name, code, reason)?;
        Ok(())
    }

    /// Report pending changes to the selected folder, if any.
    pub fn unsolicited(&mut self, omit_expunged: bool) -> CmdResult {
        self.session.unsolicited_responses(self.response, omit_expunged)
    }
}

/// The login of the session's user.
///
/// These are macros instead of methods on `Request` since a method would
/// borrow the whole request rather than just the session.
macro_rules! login {
    ($req:expr) => {
        $req.session.login()
    };
}

macro_rules! selected {
    ($req:expr) => {
        $req.session.selected().ok_or_else(|| {
            crate::support::error::Error::from(
                crate::support::error::ProtocolError::syntax(
                    "No mailbox selected.",
                ),
            )
        })
    };
}

/// Read and execute one request.
///
/// Returns `Ok(false)` if the client closed the connection cleanly between
/// requests. Errors returned are fatal for the connection.
pub fn handle_request(
    lexer: &mut RequestLexer,
    response: &mut ImapResponse,
    session: &mut Session,
    registry: &CommandRegistry,
) -> Result<bool, Error> {
    match lexer.peek() {
        Ok(_) => (),
        Err(ProtocolError::EndOfStream) => return Ok(false),
        Err(e) => return Err(e.into()),
    }

    response.set_tag("*");
    let tag = match command_parser::tag(lexer) {
        Ok(tag) => tag,
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(_) => {
            response.bad_response(PROTOCOL_ERROR)?;
            lexer.consume_line()?;
            return Ok(true);
        }
    };
    response.set_tag(&tag);

    let name = match command_parser::atom(lexer) {
        Ok(name) => name,
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(_) => {
            response.command_error(PROTOCOL_ERROR)?;
            lexer.consume_line()?;
            return Ok(true);
        }
    };

    let spec = match registry.lookup(&name) {
        Some(&spec) => spec,
        None => {
            response.command_error("Invalid command.")?;
            lexer.consume_line()?;
            return Ok(true);
        }
    };

    if !spec.states.contains(&session.state()) {
        response.tagged_no("Command not valid in this state")?;
        lexer.consume_line()?;
        return Ok(true);
    }

    let mut request = Request {
        lexer,
        response,
        session,
        registry,
        command: spec,
        use_uid: false,
        line_consumed: false,
    };
    let result = (spec.handler)(&mut request);
    let Request {
        lexer,
        response,
        session,
        command,
        line_consumed,
        ..
    } = request;

    match result {
        Ok(()) => (),
        Err(Error::Protocol(e)) if e.is_fatal() => return Err(e.into()),
        Err(Error::Protocol(e)) => {
            response.command_error(&format!("{} {}", e, command.usage()))?;
        }
        Err(Error::Folder(e)) => {
            response.command_failed(command.name, None, &e.to_string())?;
        }
        Err(Error::Authorization(e)) => {
            response.command_failed(command.name, None, &e.to_string())?;
        }
        Err(e @ Error::Store(_)) => {
            error!("{} {} failed: {}", session.log_prefix(), command.name, e);
            return Err(e);
        }
    }

    if !line_consumed {
        lexer.consume_line()?;
    }
    Ok(true)
}
