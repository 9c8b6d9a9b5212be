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
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed wire input.
///
/// Grammar violations are recoverable: the session answers BAD and discards
/// the rest of the line. Stream failures are not, since there is nothing
/// left to resynchronise with.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("End of stream")]
    EndOfStream,
    #[error("Unexpected end of stream.")]
    UnexpectedEof,
    #[error("{0}")]
    Syntax(Cow<'static, str>),
    #[error("Literal of {0} bytes exceeds the size limit.")]
    LiteralTooLarge(u64),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ProtocolError {
    pub fn syntax(message: impl Into<Cow<'static, str>>) -> Self {
        ProtocolError::Syntax(message.into())
    }

    /// Whether the connection can no longer be used after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(*self, ProtocolError::Syntax(..))
    }
}

/// A mailbox-level failure which the client is told about with NO.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FolderError {
    #[error("No such mailbox: {0}")]
    NoSuchMailbox(String),
    #[error("Mailbox already exists.")]
    MailboxExists,
    #[error("Mailbox is not selectable: {0}")]
    NotSelectable(String),
    #[error("Can't delete a non-selectable mailbox with children.")]
    HasChildren,
    #[error("Cannot create mailbox at namespace level.")]
    NamespaceLevel,
    #[error("Invalid namespace.")]
    InvalidNamespace,
    #[error("Wildcards are only allowed at the end of a pattern: {0}")]
    BadWildcard(String),
    #[error("Invalid mailbox name: {0}")]
    BadName(String),
    #[error("No message with UID {0}")]
    NoSuchMessage(u64),
    #[error("Mailbox was deleted")]
    MailboxDeleted,
    #[error("Mailbox is read-only")]
    ReadOnly,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error(
        "Authorization error: Lacking permissions to perform requested \
         operation."
    )]
    LackingPermissions,
    #[error("Invalid login/password")]
    BadCredentials,
    #[error("User already exists: {0}")]
    UserExists(String),
}

/// Failure of the persistent store itself.
///
/// These are never reported to the client as ordinary command failures; the
/// operation that hit one is aborted along with the connection.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("PID file {} already exists; another process may be using \
             this store. Delete it manually if that is not the case.",
            .0.display())]
    PidFileExists(PathBuf),
    #[error("Corrupt message entries file {}: {}", .path.display(), .reason)]
    CorruptEntries { path: PathBuf, reason: &'static str },
    #[error("Corrupt settings file {}", .0.display())]
    CorruptSettings(PathBuf),
    #[error("Message {uid} has no backing data")]
    MissingMessage { uid: u64 },
    #[error("Store has been closed")]
    Closed,
    #[error("Bad configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Folder(#[from] FolderError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Store(StoreError::Io(e))
    }
}
