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

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::prelude::*;
use log::{debug, info};

use super::message::Message;
use super::message_entries::{Locator, LocatorKind, MessageEntry};
use crate::support::error::StoreError;
use crate::support::file_ops::{self, IgnoreKinds, ReadUninterruptibly};
use crate::support::system_config::StorageLayout;

/// Name of the shared message file in the mbox layout.
pub const MBOX_FILE: &str = "messages.mbox";

/// How message content is kept within a folder directory.
///
/// Implementations do not lock anything themselves; the owning folder's
/// message lock serialises all calls for one directory.
pub trait MessageStorage: fmt::Debug + Send + Sync {
    fn kind(&self) -> LocatorKind;

    /// Store `message` and return where it was put.
    fn add(
        &self,
        dir: &Path,
        uid: u64,
        received_at: DateTime<Utc>,
        message: &Message,
    ) -> Result<Locator, StoreError>;

    fn retrieve(
        &self,
        dir: &Path,
        entry: &MessageEntry,
    ) -> Result<Message, StoreError>;

    /// Release the storage of one expunged message.
    fn remove(&self, dir: &Path, entry: &MessageEntry)
        -> Result<(), StoreError>;

    /// Reconcile freshly loaded entries with what actually exists on disk.
    ///
    /// Returns whether `entries` was changed.
    fn cleanup_after_loading(
        &self,
        dir: &Path,
        entries: &mut Vec<MessageEntry>,
    ) -> Result<bool, StoreError>;
}

pub fn for_layout(layout: StorageLayout) -> Arc<dyn MessageStorage> {
    match layout {
        StorageLayout::Eml => Arc::new(EmlFiles),
        StorageLayout::Mbox => Arc::new(MboxFile),
    }
}

/// One `<uid>.eml` file per message, carrying the UID header.
#[derive(Debug, Clone, Copy)]
pub struct EmlFiles;

impl MessageStorage for EmlFiles {
    fn kind(&self) -> LocatorKind {
        LocatorKind::File
    }

    fn add(
        &self,
        dir: &Path,
        uid: u64,
        _received_at: DateTime<Utc>,
        message: &Message,
    ) -> Result<Locator, StoreError> {
        let locator = Locator::for_uid_file(uid);
        if let Locator::File(ref name) = locator {
            let with_uid = message.with_uid_header(uid);
            file_ops::spit(dir.join(name), with_uid.raw())?;
        }
        Ok(locator)
    }

    fn retrieve(
        &self,
        dir: &Path,
        entry: &MessageEntry,
    ) -> Result<Message, StoreError> {
        match entry.locator {
            Locator::File(ref name) => match file_ops::slurp_opt(dir.join(name))? {
                Some(data) => Ok(Message::new(data)),
                None => Err(StoreError::MissingMessage { uid: entry.uid }),
            },
            Locator::Mbox { .. } => {
                Err(StoreError::MissingMessage { uid: entry.uid })
            }
        }
    }

    fn remove(
        &self,
        dir: &Path,
        entry: &MessageEntry,
    ) -> Result<(), StoreError> {
        if let Locator::File(ref name) = entry.locator {
            fs::remove_file(dir.join(name)).ignore_not_found()?;
        }
        Ok(())
    }

    fn cleanup_after_loading(
        &self,
        dir: &Path,
        entries: &mut Vec<MessageEntry>,
    ) -> Result<bool, StoreError> {
        let mut present = HashSet::new();
        for dirent in fs::read_dir(dir)? {
            let dirent = dirent?;
            if let Some(uid) = dirent
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(".eml"))
                .and_then(|uid| uid.parse::<u64>().ok())
            {
                present.insert(uid);
            }
        }

        let before = entries.len();
        entries.retain(|e| {
            let keep = present.contains(&e.uid);
            if !keep {
                debug!(
                    "{}: dropping entry for UID {} since its file is gone",
                    dir.display(),
                    e.uid
                );
            }
            keep
        });

        let dropped = before - entries.len();
        if dropped > 0 {
            info!(
                "{}: dropped {} entries whose message files no longer exist",
                dir.display(),
                dropped
            );
        }
        Ok(dropped > 0)
    }
}

/// All messages of a folder appended to one mbox file.
///
/// Each message is framed as a `From ` line, the message, and an empty
/// line; the entry records the byte range of the whole frame. Expunged
/// messages are not compacted away.
#[derive(Debug, Clone, Copy)]
pub struct MboxFile;

impl MessageStorage for MboxFile {
    fn kind(&self) -> LocatorKind {
        LocatorKind::Mbox
    }

    fn add(
        &self,
        dir: &Path,
        _uid: u64,
        received_at: DateTime<Utc>,
        message: &Message,
    ) -> Result<Locator, StoreError> {
        let mut frame = format!(
            "From {} {}\n",
            envelope_sender(message),
            received_at.format("%a %b %e %H:%M:%S %Y")
        )
        .into_bytes();
        frame.extend_from_slice(message.raw());
        frame.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(MBOX_FILE))?;
        let offset = file.seek(SeekFrom::End(0))?;
        file.write_all(&frame)?;
        file.sync_data()?;

        Ok(Locator::Mbox {
            offset,
            len: frame.len() as u32,
        })
    }

    fn retrieve(
        &self,
        dir: &Path,
        entry: &MessageEntry,
    ) -> Result<Message, StoreError> {
        let (offset, len) = match entry.locator {
            Locator::Mbox { offset, len } => (offset, len as usize),
            Locator::File(..) => {
                return Err(StoreError::MissingMessage { uid: entry.uid })
            }
        };

        let mut file = fs::File::open(dir.join(MBOX_FILE))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut frame = vec![0u8; len];
        let nread = Read::by_ref(&mut file).read_uninterruptibly(&mut frame)?;
        if nread != len {
            return Err(StoreError::MissingMessage { uid: entry.uid });
        }

        let from_end = match memchr::memchr(b'\n', &frame) {
            Some(ix) if frame.starts_with(b"From ") => ix + 1,
            _ => return Err(StoreError::MissingMessage { uid: entry.uid }),
        };
        // Drop the empty line closing the frame
        let body_end = frame.len().saturating_sub(1).max(from_end);
        Ok(Message::new(frame[from_end..body_end].to_vec()))
    }

    fn remove(
        &self,
        _dir: &Path,
        _entry: &MessageEntry,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn cleanup_after_loading(
        &self,
        _dir: &Path,
        _entries: &mut Vec<MessageEntry>,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }
}

/// The address put on the `From ` line: the bare address of the `From`
/// header, or `-` if there is nothing usable.
fn envelope_sender(message: &Message) -> String {
    let from = match message.header("From") {
        Some(from) => from,
        None => return "-".to_owned(),
    };

    let addr = match (from.rfind('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => &from[start + 1..end],
        _ => from.trim(),
    };

    if addr.is_empty() || addr.contains(char::is_whitespace) {
        "-".to_owned()
    } else {
        addr.to_owned()
    }
}
