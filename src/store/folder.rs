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

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::prelude::*;
use log::{info, warn};

use super::message::{Message, StoredMessage};
use super::message_entries::{MessageEntry, MessageEntryStore};
use super::message_storage::MessageStorage;
use super::model::{set_includes, IdRange, MessageFlags};
use super::uid_allocator::UidAllocator;
use crate::support::error::{Error, FolderError, StoreError};
use crate::support::file_ops::{self, IgnoreKinds};

/// Name of the per-folder settings file, holding the selectable flag.
pub const SETTINGS_FILE: &str = "greenmail.mailbox.binary";

/// The UIDVALIDITY of every folder.
///
/// UIDs are never reused within a store, so there is never a reason to
/// invalidate them.
pub const UID_VALIDITY: u32 = 42;

/// Receives notification of changes made to a folder.
///
/// Callbacks are invoked while the folder's message lock is held, in the
/// order the changes were committed. Implementations must therefore not
/// call back into the folder.
pub trait FolderListener: Send + Sync {
    fn added(&self, msg_num: u32);
    fn expunged(&self, msg_num: u32);
    fn flags_updated(&self, msg_num: u32, flags: MessageFlags, uid: Option<u64>);
    fn mailbox_deleted(&self);
}

/// One node of the mailbox hierarchy.
///
/// There is at most one `Folder` per mailbox at a time (see
/// `MailboxStore`), so every session viewing a mailbox shares this state.
/// All reads and writes of the message list happen under `state`.
/// `listeners` is only ever held long enough to copy the list out.
pub struct Folder {
    allocator: Arc<UidAllocator>,
    storage: Arc<dyn MessageStorage>,
    state: Mutex<FolderState>,
    listeners: Mutex<Vec<Arc<dyn FolderListener>>>,
    /// Milliseconds since the epoch of the last access through any method.
    last_access: AtomicI64,
}

struct FolderState {
    dir: PathBuf,
    full_name: String,
    selectable: bool,
    deleted: bool,
    entries: Vec<MessageEntry>,
    entry_store: MessageEntryStore,
}

impl fmt::Debug for Folder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Folder({})", self.full_name())
    }
}

/// The flag-change operations of `Folder::update_flags`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagMode {
    Add,
    Remove,
    Replace,
}

impl Folder {
    /// Open the folder stored in `dir`, creating its settings if absent.
    ///
    /// `selectable` is only used if the folder has no settings file yet.
    pub fn open(
        dir: PathBuf,
        full_name: String,
        selectable: bool,
        allocator: Arc<UidAllocator>,
        storage: Arc<dyn MessageStorage>,
    ) -> Result<Self, StoreError> {
        let settings_path = dir.join(SETTINGS_FILE);
        let selectable = match file_ops::slurp_opt(&settings_path)? {
            Some(data) if 1 == data.len() => 0 != data[0],
            Some(_) => return Err(StoreError::CorruptSettings(settings_path)),
            None => {
                file_ops::spit(&settings_path, &[selectable as u8])?;
                selectable
            }
        };

        let entry_store = MessageEntryStore::new(&dir, storage.kind());
        let mut entries = entry_store.load()?;
        if storage.cleanup_after_loading(&dir, &mut entries)? {
            renumber(&mut entries);
            entry_store.write_all(&entries)?;
        }

        Ok(Folder {
            allocator,
            storage,
            state: Mutex::new(FolderState {
                dir,
                full_name,
                selectable,
                deleted: false,
                entries,
                entry_store,
            }),
            listeners: Mutex::new(vec![]),
            last_access: AtomicI64::new(Utc::now().timestamp_millis()),
        })
    }

    fn touch(&self) {
        self.last_access
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// When this folder was last used, in milliseconds since the epoch.
    pub fn last_access_millis(&self) -> i64 {
        self.last_access.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FolderState> {
        self.touch();
        self.state.lock().unwrap()
    }

    /// The absolute, dot-delimited name, e.g. `#mail.azure.INBOX`.
    pub fn full_name(&self) -> String {
        self.state.lock().unwrap().full_name.clone()
    }

    /// The last segment of the full name.
    pub fn name(&self) -> String {
        let full_name = self.full_name();
        match full_name.rfind(super::mailbox_store::HIERARCHY_DELIMITER) {
            Some(ix) => full_name[ix + 1..].to_owned(),
            None => full_name,
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.state.lock().unwrap().dir.clone()
    }

    pub fn is_selectable(&self) -> bool {
        self.lock().selectable
    }

    pub fn set_selectable(&self, selectable: bool) -> Result<(), Error> {
        let mut state = self.lock();
        file_ops::spit(state.dir.join(SETTINGS_FILE), &[selectable as u8])?;
        state.selectable = selectable;
        Ok(())
    }

    pub fn uid_validity(&self) -> u32 {
        UID_VALIDITY
    }

    /// A lower bound on the UID the next appended message will get.
    pub fn uid_next(&self) -> u64 {
        self.allocator.peek_next()
    }

    pub fn message_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Run `f` with the current message count while holding the message
    /// lock, so that no change can happen or be notified meanwhile.
    pub fn with_message_count<T>(&self, f: impl FnOnce(usize) -> T) -> T {
        let state = self.lock();
        f(state.entries.len())
    }

    /// Count the messages flagged `\Recent`.
    ///
    /// If `reset` is set, the flag is then cleared from all of them.
    pub fn recent_count(&self, reset: bool) -> Result<usize, Error> {
        let mut state = self.lock();
        let count = state
            .entries
            .iter()
            .filter(|e| e.flags.contains(MessageFlags::RECENT))
            .count();

        if reset && count > 0 {
            for entry in &mut state.entries {
                entry.flags.remove(MessageFlags::RECENT);
            }
            state.entry_store.write_all(&state.entries)?;
        }

        Ok(count)
    }

    pub fn unseen_count(&self) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|e| !e.flags.contains(MessageFlags::SEEN))
            .count()
    }

    /// The sequence number of the first message without `\Seen`.
    pub fn first_unseen(&self) -> Option<u32> {
        self.lock()
            .entries
            .iter()
            .find(|e| !e.flags.contains(MessageFlags::SEEN))
            .map(|e| e.msg_num)
    }

    pub fn msn(&self, uid: u64) -> Result<u32, FolderError> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.uid == uid)
            .map(|e| e.msg_num)
            .ok_or(FolderError::NoSuchMessage(uid))
    }

    pub fn message_uids(&self) -> Vec<u64> {
        self.lock().entries.iter().map(|e| e.uid).collect()
    }

    /// A snapshot of the message list without any message content.
    pub fn entries(&self) -> Vec<MessageEntry> {
        self.lock().entries.clone()
    }

    pub fn message(&self, uid: u64) -> Result<StoredMessage, Error> {
        let state = self.lock();
        let entry = state
            .entries
            .iter()
            .find(|e| e.uid == uid)
            .ok_or(FolderError::NoSuchMessage(uid))?;
        Ok(self.load(&state.dir, entry)?)
    }

    /// Load every message, in folder order.
    pub fn messages(&self) -> Result<Vec<StoredMessage>, Error> {
        let state = self.lock();
        let mut ret = Vec::with_capacity(state.entries.len());
        for entry in &state.entries {
            ret.push(self.load(&state.dir, entry)?);
        }
        Ok(ret)
    }

    fn load(
        &self,
        dir: &Path,
        entry: &MessageEntry,
    ) -> Result<StoredMessage, StoreError> {
        Ok(StoredMessage {
            uid: entry.uid,
            flags: entry.flags,
            received_at: entry.received_at,
            message: self.storage.retrieve(dir, entry)?,
        })
    }

    /// Add a message to the end of the folder, returning its new UID.
    ///
    /// The message is always flagged `\Recent` in addition to `flags`.
    pub fn append(
        &self,
        message: &Message,
        flags: MessageFlags,
        received_at: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let mut state = self.lock();
        if state.deleted {
            return Err(FolderError::MailboxDeleted.into());
        }
        if !state.selectable {
            return Err(
                FolderError::NotSelectable(state.full_name.clone()).into()
            );
        }

        let uid = self.allocator.next_uid()?;
        let locator =
            self.storage.add(&state.dir, uid, received_at, message)?;
        let index = state.entries.len();
        let entry = MessageEntry {
            msg_num: index as u32 + 1,
            uid,
            flags: flags | MessageFlags::RECENT,
            received_at,
            locator,
        };
        state.entry_store.write_one(index, &entry)?;
        let msg_num = entry.msg_num;
        state.entries.push(entry);

        self.notify(|l| l.added(msg_num));
        Ok(uid)
    }

    /// Add (`add == true`) or remove `flags` on the message with `uid`.
    ///
    /// Only that message's record is rewritten on disk. Every listener
    /// except `silent` is told about the resulting flags; the UID is
    /// included in the notification if `notify_uid` is set.
    pub fn set_flags(
        &self,
        flags: MessageFlags,
        add: bool,
        uid: u64,
        silent: Option<&Arc<dyn FolderListener>>,
        notify_uid: bool,
    ) -> Result<MessageFlags, Error> {
        let mode = if add { FlagMode::Add } else { FlagMode::Remove };
        self.update_flags(mode, flags, uid, silent, notify_uid)
    }

    /// Replace all flags of the message with `uid` by `flags`.
    ///
    /// `\Recent` is not under client control and is left as it is.
    pub fn replace_flags(
        &self,
        flags: MessageFlags,
        uid: u64,
        silent: Option<&Arc<dyn FolderListener>>,
        notify_uid: bool,
    ) -> Result<MessageFlags, Error> {
        self.update_flags(FlagMode::Replace, flags, uid, silent, notify_uid)
    }

    pub fn update_flags(
        &self,
        mode: FlagMode,
        flags: MessageFlags,
        uid: u64,
        silent: Option<&Arc<dyn FolderListener>>,
        notify_uid: bool,
    ) -> Result<MessageFlags, Error> {
        let mut state = self.lock();
        // Linear in the folder size, like everything else here.
        let index = state
            .entries
            .iter()
            .position(|e| e.uid == uid)
            .ok_or(FolderError::NoSuchMessage(uid))?;

        let mut entry = state.entries[index].clone();
        match mode {
            FlagMode::Add => entry.flags.insert(flags),
            FlagMode::Remove => entry.flags.remove(flags),
            FlagMode::Replace => {
                entry.flags = flags | (entry.flags & MessageFlags::RECENT)
            }
        }
        state.entry_store.write_one(index, &entry)?;

        let (msg_num, new_flags) = (entry.msg_num, entry.flags);
        state.entries[index] = entry;

        let silent = silent.map(listener_addr);
        let uid = if notify_uid { Some(uid) } else { None };
        self.notify(|l| {
            if Some(listener_addr(l)) != silent {
                l.flags_updated(msg_num, new_flags, uid);
            }
        });

        Ok(new_flags)
    }

    /// Permanently remove every message flagged `\Deleted`, optionally only
    /// those whose UID falls in `uid_ranges`.
    ///
    /// The survivors are renumbered densely from 1. Listeners are told of
    /// each removal using the original sequence numbers, highest first, so
    /// that each notification is valid at the time the client sees it.
    ///
    /// Returns the UIDs removed.
    pub fn expunge(
        &self,
        uid_ranges: Option<&[IdRange]>,
    ) -> Result<Vec<u64>, Error> {
        let mut state = self.lock();

        let (removed, mut kept): (Vec<MessageEntry>, Vec<MessageEntry>) =
            state.entries.iter().cloned().partition(|e| {
                e.flags.contains(MessageFlags::DELETED)
                    && uid_ranges.map_or(true, |r| set_includes(r, e.uid))
            });

        if removed.is_empty() {
            return Ok(vec![]);
        }

        renumber(&mut kept);
        state.entry_store.write_all(&kept)?;
        state.entries = kept;

        for entry in &removed {
            if let Err(e) = self.storage.remove(&state.dir, entry) {
                // The entry is gone, so the content is unreachable anyway
                warn!(
                    "{}: failed to remove content of UID {}: {}",
                    state.full_name, entry.uid, e
                );
            }
        }

        for entry in removed.iter().rev() {
            self.notify(|l| l.expunged(entry.msg_num));
        }

        Ok(removed.into_iter().map(|e| e.uid).collect())
    }

    /// Return the UIDs of all messages satisfying `predicate`, in folder
    /// order.
    ///
    /// Every message is loaded and tested; there is no index.
    pub fn search(
        &self,
        mut predicate: impl FnMut(u32, &StoredMessage) -> bool,
    ) -> Result<Vec<u64>, Error> {
        let state = self.lock();
        let mut ret = Vec::new();
        for entry in &state.entries {
            let message = self.load(&state.dir, entry)?;
            if predicate(entry.msg_num, &message) {
                ret.push(entry.uid);
            }
        }
        Ok(ret)
    }

    /// Append a copy of the message with `uid` to `target`, returning the
    /// UID of the copy.
    ///
    /// The copy keeps flags and internal date. Any embedded UID header is
    /// replaced by the storage. Only one folder lock is held at a time.
    pub fn copy_message(&self, uid: u64, target: &Folder) -> Result<u64, Error> {
        let stored = self.message(uid)?;
        target.append(&stored.message, stored.flags, stored.received_at)
    }

    /// Remove every message, notifying listeners as for an expunge.
    pub fn delete_all_messages(&self) -> Result<(), Error> {
        let mut state = self.lock();
        self.remove_all(&mut state)?;
        Ok(())
    }

    /// Remove every message and make the folder non-selectable in one step,
    /// so that no append lands in between.
    pub(super) fn retire(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        file_ops::spit(state.dir.join(SETTINGS_FILE), &[0])?;
        state.selectable = false;
        self.remove_all(&mut state)
    }

    /// Tell every listener that this folder is going away.
    #[cfg(test)]
    pub fn signal_deletion(&self) {
        let _state = self.lock();
        self.notify(|l| l.mailbox_deleted());
    }

    fn remove_all(&self, state: &mut FolderState) -> Result<(), StoreError> {
        let removed = std::mem::take(&mut state.entries);
        state.entry_store.write_all(&[])?;
        for entry in &removed {
            if let Err(e) = self.storage.remove(&state.dir, entry) {
                warn!(
                    "{}: failed to remove content of UID {}: {}",
                    state.full_name, entry.uid, e
                );
            }
        }
        for entry in removed.iter().rev() {
            self.notify(|l| l.expunged(entry.msg_num));
        }
        Ok(())
    }

    pub fn add_listener(&self, listener: Arc<dyn FolderListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn FolderListener>) {
        let addr = listener_addr(listener);
        self.listeners
            .lock()
            .unwrap()
            .retain(|l| listener_addr(l) != addr);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Remove this folder with all its messages and on-disk state.
    ///
    /// Listeners see every message expunged and then the deletion itself.
    /// The caller must have verified that it has no children. Any session
    /// still holding the folder sees `MailboxDeleted` on append.
    pub(super) fn destroy(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.deleted = true;
        self.remove_all(&mut state)?;
        self.notify(|l| l.mailbox_deleted());
        state.entry_store.delete()?;
        fs::remove_dir_all(&state.dir).ignore_not_found()?;
        info!("Deleted mailbox {}", state.full_name);
        Ok(())
    }

    /// Update the location after the directory was moved.
    pub(super) fn relocate(&self, dir: PathBuf, full_name: String) {
        let mut state = self.lock();
        state.entry_store = MessageEntryStore::new(&dir, self.storage.kind());
        state.dir = dir;
        state.full_name = full_name;
    }

    /// Run `f` on each listener.
    ///
    /// The listener list is copied out first so that its lock is not held
    /// during the callbacks. Callers hold the message lock, which orders
    /// notifications.
    fn notify(&self, f: impl Fn(&Arc<dyn FolderListener>)) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in &listeners {
            f(listener);
        }
    }
}

/// The read side of a mailbox, shared by `Folder` and the per-session views
/// wrapping it.
///
/// Sequence numbers returned through this trait are in the numbering the
/// viewer currently knows about.
pub trait MailFolder {
    fn full_name(&self) -> String;
    fn is_selectable(&self) -> bool;
    fn uid_validity(&self) -> u32;
    fn uid_next(&self) -> u64;
    fn message_count(&self) -> usize;
    fn recent_count(&self, reset: bool) -> Result<usize, Error>;
    fn unseen_count(&self) -> usize;
    fn first_unseen(&self) -> Option<u32>;
    fn msn(&self, uid: u64) -> Result<u32, FolderError>;
    fn message_uids(&self) -> Vec<u64>;
    fn message(&self, uid: u64) -> Result<StoredMessage, Error>;
}

impl MailFolder for Folder {
    fn full_name(&self) -> String {
        Folder::full_name(self)
    }

    fn is_selectable(&self) -> bool {
        Folder::is_selectable(self)
    }

    fn uid_validity(&self) -> u32 {
        Folder::uid_validity(self)
    }

    fn uid_next(&self) -> u64 {
        Folder::uid_next(self)
    }

    fn message_count(&self) -> usize {
        Folder::message_count(self)
    }

    fn recent_count(&self, reset: bool) -> Result<usize, Error> {
        Folder::recent_count(self, reset)
    }

    fn unseen_count(&self) -> usize {
        Folder::unseen_count(self)
    }

    fn first_unseen(&self) -> Option<u32> {
        Folder::first_unseen(self)
    }

    fn msn(&self, uid: u64) -> Result<u32, FolderError> {
        Folder::msn(self, uid)
    }

    fn message_uids(&self) -> Vec<u64> {
        Folder::message_uids(self)
    }

    fn message(&self, uid: u64) -> Result<StoredMessage, Error> {
        Folder::message(self, uid)
    }
}

fn renumber(entries: &mut [MessageEntry]) {
    for (ix, entry) in entries.iter_mut().enumerate() {
        entry.msg_num = ix as u32 + 1;
    }
}

/// Identity of a listener, ignoring the vtable part of the fat pointer.
fn listener_addr(listener: &Arc<dyn FolderListener>) -> *const u8 {
    Arc::as_ptr(listener) as *const u8
}
