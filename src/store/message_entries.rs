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

use std::fs;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::prelude::*;
use log::info;

use super::model::MessageFlags;
use crate::support::error::StoreError;
use crate::support::file_ops::{self, IgnoreKinds};

/// Name of the per-folder file holding the message list.
pub const ENTRIES_FILE: &str = "greenmail.messageEntries.binary";

/// Size of one record in the current layout:
/// `{msgNum:i32, uid:i64, flags:i32, receivedAtMillis:i64,
///   positionInMbox:i64, lenInMbox:i32}`.
pub const RECORD_SIZE: usize = 36;

/// Where a message's content lives within its folder directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    /// A file of its own, named by UID.
    File(String),
    /// A byte range of the folder's shared mbox file.
    Mbox { offset: u64, len: u32 },
}

impl Locator {
    pub fn for_uid_file(uid: u64) -> Self {
        Locator::File(format!("{}.eml", uid))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocatorKind {
    File,
    Mbox,
}

/// One stored message, as recorded in the entries file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEntry {
    pub msg_num: u32,
    pub uid: u64,
    pub flags: MessageFlags,
    pub received_at: DateTime<Utc>,
    pub locator: Locator,
}

/// The on-disk formats the entries file may be found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    /// Headerless 36-byte records, read until EOF.
    Current,
    /// A 4-byte count followed by `{msgNum, uid, flags}` records.
    LegacyShort,
    /// A 4-byte count followed by `{msgNum, uid, flags, receivedAt}`.
    LegacyDated,
}

/// The fixed-width record log of one folder.
///
/// All new writes use the current layout. Files in either legacy layout are
/// read and immediately rewritten in the current one, so that single-record
/// rewrites can always address record `i` at offset `i * RECORD_SIZE`.
///
/// The file is opened and closed within each call, never held between
/// calls. Callers serialise access through the folder lock.
#[derive(Debug)]
pub struct MessageEntryStore {
    path: PathBuf,
    kind: LocatorKind,
}

impl MessageEntryStore {
    pub fn new(dir: &Path, kind: LocatorKind) -> Self {
        MessageEntryStore {
            path: dir.join(ENTRIES_FILE),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries. A missing file is an empty folder.
    pub fn load(&self) -> Result<Vec<MessageEntry>, StoreError> {
        let data = match file_ops::slurp_opt(&self.path)? {
            Some(data) => data,
            None => return Ok(vec![]),
        };

        let layout = detect_layout(&data).ok_or_else(|| {
            StoreError::CorruptEntries {
                path: self.path.clone(),
                reason: "length matches no known record layout",
            }
        })?;

        let mut r = Cursor::new(&data[..]);
        let count = match layout {
            Layout::Current => data.len() / RECORD_SIZE,
            Layout::LegacyShort | Layout::LegacyDated => {
                r.read_i32::<BigEndian>()? as usize
            }
        };

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let msg_num = r.read_i32::<BigEndian>()?;
            let uid = r.read_i64::<BigEndian>()?;
            let flags = MessageFlags::from_persisted(r.read_i32::<BigEndian>()?);
            let received_millis = match layout {
                Layout::LegacyShort => 0,
                _ => r.read_i64::<BigEndian>()?,
            };
            let (offset, len) = match layout {
                Layout::Current => {
                    (r.read_i64::<BigEndian>()?, r.read_i32::<BigEndian>()?)
                }
                _ => (0, 0),
            };

            if msg_num < 1 || uid < 1 || offset < 0 || len < 0 {
                return Err(StoreError::CorruptEntries {
                    path: self.path.clone(),
                    reason: "negative or zero field in record",
                });
            }

            let received_at = Utc
                .timestamp_millis_opt(received_millis)
                .single()
                .ok_or_else(|| StoreError::CorruptEntries {
                    path: self.path.clone(),
                    reason: "received date out of range",
                })?;

            let uid = uid as u64;
            entries.push(MessageEntry {
                msg_num: msg_num as u32,
                uid,
                flags,
                received_at,
                locator: match self.kind {
                    LocatorKind::File => Locator::for_uid_file(uid),
                    LocatorKind::Mbox => Locator::Mbox {
                        offset: offset as u64,
                        len: len as u32,
                    },
                },
            });
        }

        if Layout::Current != layout {
            info!(
                "Migrating {} from legacy layout ({} entries)",
                self.path.display(),
                entries.len()
            );
            self.write_all(&entries)?;
        }

        Ok(entries)
    }

    /// Replace the whole file with `entries`.
    pub fn write_all(&self, entries: &[MessageEntry]) -> Result<(), StoreError> {
        let mut data = Vec::with_capacity(entries.len() * RECORD_SIZE);
        for entry in entries {
            encode(&mut data, entry)?;
        }
        file_ops::spit(&self.path, &data)?;
        Ok(())
    }

    /// Rewrite only the record at `index`.
    ///
    /// `index` may equal the current record count, which appends.
    pub fn write_one(
        &self,
        index: usize,
        entry: &MessageEntry,
    ) -> Result<(), StoreError> {
        let mut data = Vec::with_capacity(RECORD_SIZE);
        encode(&mut data, entry)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.path)?;
        file.seek(SeekFrom::Start((index * RECORD_SIZE) as u64))?;
        file.write_all(&data)?;
        file.sync_data()?;
        Ok(())
    }

    /// Remove the file entirely.
    pub fn delete(&self) -> Result<(), StoreError> {
        fs::remove_file(&self.path).ignore_not_found()?;
        Ok(())
    }
}

fn encode(dst: &mut Vec<u8>, entry: &MessageEntry) -> Result<(), StoreError> {
    let (offset, len) = match entry.locator {
        Locator::File(..) => (0, 0),
        Locator::Mbox { offset, len } => (offset as i64, len as i32),
    };

    // New fields may only ever be appended to the record.
    dst.write_i32::<BigEndian>(entry.msg_num as i32)?;
    dst.write_i64::<BigEndian>(entry.uid as i64)?;
    dst.write_i32::<BigEndian>(entry.flags.to_persisted())?;
    dst.write_i64::<BigEndian>(entry.received_at.timestamp_millis())?;
    dst.write_i64::<BigEndian>(offset)?;
    dst.write_i32::<BigEndian>(len)?;
    Ok(())
}

fn detect_layout(data: &[u8]) -> Option<Layout> {
    if data.is_empty() {
        return Some(Layout::Current);
    }
    if data.len() < 4 {
        return None;
    }

    let first = Cursor::new(data).read_i32::<BigEndian>().ok()?;
    // A current-layout file starts with the msgNum of the first message,
    // which is always 1.
    if 0 == data.len() % RECORD_SIZE && 1 == first {
        return Some(Layout::Current);
    }

    if first >= 0 {
        let count = first as usize;
        if data.len() == 4 + count * 16 {
            return Some(Layout::LegacyShort);
        }
        if data.len() == 4 + count * 24 {
            return Some(Layout::LegacyDated);
        }
    }

    if 0 == data.len() % RECORD_SIZE {
        Some(Layout::Current)
    } else {
        None
    }
}
