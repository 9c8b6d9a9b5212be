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

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use crate::support::error::StoreError;
use crate::support::file_ops;

/// Name of the file, at the store root, holding the persisted upper bound.
pub const SETTINGS_FILE: &str = "greenmail.filestore.binary";

/// How many UIDs are reserved with each write of the settings file.
pub const UID_BATCH_SIZE: u64 = 1000;

/// Hands out UIDs for every folder of one store.
///
/// UIDs are reserved in batches: the exclusive upper bound of the current
/// batch is written to disk before any UID of the batch is handed out, so
/// after a crash the next process starts at or above that bound and never
/// reuses a UID. At most one batch is wasted per crash.
///
/// The file holds exactly one big-endian 64-bit integer.
#[derive(Debug)]
pub struct UidAllocator {
    path: PathBuf,
    state: Mutex<State>,
}

#[derive(Debug, Clone, Copy)]
struct State {
    next: u64,
    upper_bound: u64,
    closed: bool,
}

impl UidAllocator {
    /// Open the allocator for the store at `root`.
    ///
    /// With no settings file, allocation starts at 1. Otherwise it starts at
    /// the persisted bound. Either way a fresh batch is reserved right away.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let path = root.join(SETTINGS_FILE);
        let next = match file_ops::slurp_opt(&path)? {
            None => 1,
            Some(data) => {
                if data.len() != 8 {
                    return Err(StoreError::CorruptSettings(path));
                }
                let persisted = Cursor::new(data).read_i64::<BigEndian>()?;
                if persisted < 1 {
                    return Err(StoreError::CorruptSettings(path));
                }
                persisted as u64
            }
        };

        let state = State {
            next,
            upper_bound: next + UID_BATCH_SIZE,
            closed: false,
        };
        write_bound(&path, state.upper_bound)?;
        debug!(
            "UID allocator at {} starts at {}, reserved below {}",
            path.display(),
            state.next,
            state.upper_bound
        );

        Ok(UidAllocator {
            path,
            state: Mutex::new(state),
        })
    }

    /// Allocate the next UID.
    ///
    /// If this exhausts the current batch, the next batch is reserved on
    /// disk before returning. A failure to do so leaves the allocator
    /// unchanged and fails the allocation.
    pub fn next_uid(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(StoreError::Closed);
        }

        let uid = state.next;
        let mut new_state = *state;
        new_state.next += 1;
        if new_state.next >= new_state.upper_bound {
            new_state.upper_bound = new_state.next + UID_BATCH_SIZE;
            write_bound(&self.path, new_state.upper_bound)?;
            debug!(
                "UID allocator at {} reserved below {}",
                self.path.display(),
                new_state.upper_bound
            );
        }

        *state = new_state;
        Ok(uid)
    }

    /// The UID the next call to `next_uid` will return.
    pub fn peek_next(&self) -> u64 {
        self.state.lock().unwrap().next
    }

    /// Shrink the persisted bound to the next UID and stop allocating.
    ///
    /// The next process then continues exactly where this one stopped
    /// instead of skipping the rest of the batch. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Ok(());
        }

        write_bound(&self.path, state.next)?;
        state.upper_bound = state.next;
        state.closed = true;
        Ok(())
    }
}

fn write_bound(path: &Path, bound: u64) -> Result<(), StoreError> {
    let mut data = Vec::with_capacity(8);
    data.write_i64::<BigEndian>(bound as i64)?;
    file_ops::spit(path, &data)?;
    Ok(())
}
