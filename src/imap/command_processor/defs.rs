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

use crate::imap::command_parser::SequenceSet;
use crate::imap::session_folder::SessionFolder;
use crate::store::folder::MailFolder;
use crate::store::model::set_includes;
use crate::support::error::{Error, FolderError};

pub(super) use crate::imap::command_parser as p;
pub(super) use crate::imap::dispatcher::{CmdResult, Request};

pub static CAPABILITIES: &[&str] = &[
    "IMAP4rev1",
    "LITERAL+",
    "UIDPLUS",
    "SASL-IR",
    "AUTH=PLAIN",
    "MOVE",
    "UNSELECT",
];

/// The text of the CAPABILITY response.
pub fn capability_data() -> String {
    CAPABILITIES.join(" ")
}

pub(super) const READ_ONLY: &str = "Mailbox selected read only.";
pub(super) const NO_SUCH_MAILBOX: &str = "No such mailbox";

/// Resolve a message set against the selected folder.
///
/// Returns `(sequence number, UID)` pairs in folder order. The sequence
/// numbers are the ones the client knows, which still count expunged
/// messages it has not been told about. Members of the set which name no
/// message are ignored.
pub(super) fn resolve_set(
    selected: &SessionFolder,
    set: &SequenceSet,
    use_uid: bool,
) -> Result<Vec<(u32, u64)>, Error> {
    let mut messages = Vec::new();
    for uid in selected.message_uids() {
        match selected.msn(uid) {
            Ok(msn) => messages.push((msn, uid)),
            // Expunged by someone else since the UIDs were read
            Err(FolderError::NoSuchMessage(_)) => (),
            Err(e) => return Err(e.into()),
        }
    }

    let largest = messages
        .last()
        .map(|&(msn, uid)| if use_uid { uid } else { u64::from(msn) })
        .unwrap_or(0);
    let ranges = set.resolve(largest);

    messages.retain(|&(msn, uid)| {
        set_includes(&ranges, if use_uid { uid } else { u64::from(msn) })
    });
    Ok(messages)
}
