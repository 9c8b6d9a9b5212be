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

//! The IMAP protocol engine.
//!
//! A connection reads requests through `RequestLexer`, which `command_parser`
//! turns into arguments. `dispatcher` checks each command against the
//! `Session` state and hands it to its handler in `command_processor`, and
//! responses go back out through `ImapResponse`.

pub mod command_parser;
#[macro_use]
pub mod dispatcher;
pub mod command_processor;
pub mod lex;
pub mod mailbox_name;
pub mod request_lexer;
pub mod response_writer;
pub mod server;
pub mod session;
pub mod session_folder;

#[cfg(test)]
mod integration_tests;
