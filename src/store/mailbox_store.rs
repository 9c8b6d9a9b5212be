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

use std::collections::HashMap;
use std::fs;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::prelude::*;
use log::{debug, error, info};

use super::folder::Folder;
use super::message_storage::{self, MessageStorage};
use super::uid_allocator::UidAllocator;
use crate::support::error::{Error, FolderError, StoreError};
use crate::support::file_ops::{ErrorTransforms, IgnoreKinds};
use crate::support::safe_name::is_safe_name;
use crate::support::system_config::StorageLayout;

/// Separates the segments of a full mailbox name.
pub const HIERARCHY_DELIMITER: char = '.';

/// The name of the root of the mail namespace.
pub const NAMESPACE_ROOT: &str = "#mail";

/// Name of the file, at the store root, guarding against concurrent use.
pub const PID_FILE: &str = "greenmail.pid";

/// How long a folder may go unused before it is dropped from the cache.
pub const IDLE_EVICTION_MILLIS: i64 = 12 * 60 * 60 * 1000;

/// The hierarchical namespace of folders under one store root.
///
/// Every folder is a directory; its children are its subdirectories. A
/// full name such as `#mail.azure.INBOX` maps to the directory
/// `<root>/#mail/azure/INBOX`.
///
/// At most one `Folder` exists per full name at any time. The cache holding
/// them is guarded by a single mutex covering lookup, insertion, and
/// eviction, and folders are opened while it is held.
pub struct MailboxStore {
    root: PathBuf,
    allocator: Arc<UidAllocator>,
    storage: Arc<dyn MessageStorage>,
    cache: Mutex<HashMap<String, Arc<Folder>>>,
    closed: AtomicBool,
}

impl fmt::Debug for MailboxStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl MailboxStore {
    /// Open the store at `root`, creating it if needed.
    ///
    /// Fails with `PidFileExists` if the PID file is present, which means
    /// either another process has the store open or a previous one did not
    /// shut down cleanly. Either way a human needs to look at it.
    pub fn open(
        root: &Path,
        layout: StorageLayout,
    ) -> Result<Self, StoreError> {
        fs::create_dir_all(root)?;

        let pid_path = root.join(PID_FILE);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&pid_path)
        {
            Ok(mut f) => {
                writeln!(f, "{}", nix::unistd::getpid())?;
                f.sync_all()?;
            }
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                return Err(StoreError::PidFileExists(pid_path));
            }
            Err(e) => return Err(e.into()),
        }

        let allocator = match UidAllocator::open(root) {
            Ok(a) => Arc::new(a),
            Err(e) => {
                let _ = fs::remove_file(&pid_path);
                return Err(e);
            }
        };

        let store = MailboxStore {
            root: root.to_owned(),
            allocator,
            storage: message_storage::for_layout(layout),
            cache: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        };

        fs::create_dir_all(store.dir_for(NAMESPACE_ROOT))?;
        // Opening the root fixes it as non-selectable on first use
        store.lookup(NAMESPACE_ROOT, Some(false))?;
        info!("Opened mailbox store at {}", root.display());

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uid_next(&self) -> u64 {
        self.allocator.peek_next()
    }

    /// The root of the mail namespace.
    pub fn namespace_root(&self) -> Result<Arc<Folder>, StoreError> {
        self.lookup(NAMESPACE_ROOT, Some(false))?
            .ok_or(StoreError::Closed)
    }

    /// Return the folder with the given full name, if it exists.
    ///
    /// Never creates anything on disk.
    pub fn get(
        &self,
        full_name: &str,
    ) -> Result<Option<Arc<Folder>>, StoreError> {
        self.lookup(full_name, None)
    }

    pub fn get_child(
        &self,
        parent: &Folder,
        name: &str,
    ) -> Result<Option<Arc<Folder>>, StoreError> {
        self.get(&child_name(&parent.full_name(), name))
    }

    /// Create the child `name` of `parent`, or return it if it already
    /// exists.
    pub fn create(
        &self,
        parent: &Folder,
        name: &str,
        selectable: bool,
    ) -> Result<Arc<Folder>, Error> {
        if !is_safe_name(name) {
            return Err(FolderError::BadName(name.to_owned()).into());
        }

        let full_name = child_name(&parent.full_name(), name);
        let mut cache = self.cache.lock().unwrap();
        if let Some(existing) = cache.get(&full_name) {
            return Ok(Arc::clone(existing));
        }

        let dir = self.dir_for(&full_name);
        fs::create_dir(&dir)
            .ignore_already_exists()
            .on_not_found(FolderError::NoSuchMailbox(parent.full_name()))?;
        let folder = Arc::new(self.open_folder(dir, &full_name, selectable)?);
        cache.insert(full_name.clone(), Arc::clone(&folder));
        debug!("Created mailbox {}", full_name);
        Ok(folder)
    }

    /// The direct children of `parent`, sorted by name.
    pub fn children(
        &self,
        parent: &Folder,
    ) -> Result<Vec<Arc<Folder>>, StoreError> {
        let parent_name = parent.full_name();
        let mut ret = Vec::new();
        for name in self.child_names(&parent_name)? {
            if let Some(child) = self.get(&child_name(&parent_name, &name))? {
                ret.push(child);
            }
        }
        Ok(ret)
    }

    pub fn has_children(&self, parent: &Folder) -> Result<bool, StoreError> {
        Ok(!self.child_names(&parent.full_name())?.is_empty())
    }

    /// Find all folders matching `pattern`, a full name which may end with
    /// a wildcard.
    ///
    /// `%` matches the children of the pattern's parent whose names start
    /// with the text before it; `*` matches the same children and,
    /// recursively, all their descendants. Without a wildcard the pattern
    /// names at most one folder.
    pub fn list(&self, pattern: &str) -> Result<Vec<Arc<Folder>>, Error> {
        let wildcard_pos = pattern.find(|c| c == '*' || c == '%');
        let wildcard = match wildcard_pos {
            None => {
                return Ok(self.get(pattern)?.into_iter().collect());
            }
            Some(ix) if ix + 1 == pattern.len() => pattern.as_bytes()[ix],
            Some(_) => {
                return Err(FolderError::BadWildcard(pattern.to_owned()).into())
            }
        };

        let stem = &pattern[..pattern.len() - 1];
        let (parent_name, prefix) = match stem.rfind(HIERARCHY_DELIMITER) {
            Some(ix) => (&stem[..ix], &stem[ix + 1..]),
            // Matching top-level names means matching the root itself
            None => {
                return Ok(if NAMESPACE_ROOT.starts_with(stem) {
                    let root = self.namespace_root()?;
                    let mut ret = vec![Arc::clone(&root)];
                    if b'*' == wildcard {
                        self.collect_descendants(&root, &mut ret)?;
                    }
                    ret
                } else {
                    vec![]
                });
            }
        };

        let parent = match self.get(parent_name)? {
            Some(parent) => parent,
            None => return Ok(vec![]),
        };

        let mut ret = Vec::new();
        for child in self.children(&parent)? {
            if child.name().starts_with(prefix) {
                ret.push(Arc::clone(&child));
                if b'*' == wildcard {
                    self.collect_descendants(&child, &mut ret)?;
                }
            }
        }
        Ok(ret)
    }

    fn collect_descendants(
        &self,
        folder: &Folder,
        dst: &mut Vec<Arc<Folder>>,
    ) -> Result<(), StoreError> {
        for child in self.children(folder)? {
            dst.push(Arc::clone(&child));
            self.collect_descendants(&child, dst)?;
        }
        Ok(())
    }

    /// Remove `folder` with every message in it.
    ///
    /// A folder with children cannot go away. If it is selectable it is
    /// emptied and made non-selectable instead and `Ok(false)` is returned;
    /// otherwise this fails with `HasChildren`.
    ///
    /// The cache lock is held from the children check to the removal, so a
    /// concurrent `create` of a child either is seen by the check or fails
    /// to find its parent.
    pub fn delete(&self, folder: &Folder) -> Result<bool, Error> {
        let full_name = folder.full_name();
        if NAMESPACE_ROOT == full_name {
            return Err(FolderError::NamespaceLevel.into());
        }

        let mut cache = self.cache.lock().unwrap();
        if self.has_children(folder)? {
            if !folder.is_selectable() {
                return Err(FolderError::HasChildren.into());
            }
            folder.retire()?;
            return Ok(false);
        }

        folder.destroy()?;
        cache.remove(&full_name);
        Ok(true)
    }

    /// Move `folder`, with all its descendants, to be the child `new_name`
    /// of `new_parent`.
    ///
    /// Cached folders of the subtree are relocated in place, so sessions
    /// holding them are unaffected.
    pub fn rename(
        &self,
        folder: &Folder,
        new_parent: &Folder,
        new_name: &str,
    ) -> Result<Arc<Folder>, Error> {
        if !is_safe_name(new_name) {
            return Err(FolderError::BadName(new_name.to_owned()).into());
        }

        let old_full = folder.full_name();
        let new_full = child_name(&new_parent.full_name(), new_name);
        let subtree_prefix = format!("{}{}", old_full, HIERARCHY_DELIMITER);
        if new_full == old_full || new_full.starts_with(&subtree_prefix) {
            return Err(FolderError::BadName(new_full).into());
        }

        let mut cache = self.cache.lock().unwrap();
        let new_dir = self.dir_for(&new_full);
        if cache.contains_key(&new_full) || new_dir.exists() {
            return Err(FolderError::MailboxExists.into());
        }

        fs::rename(self.dir_for(&old_full), &new_dir)?;

        let moved = cache
            .keys()
            .filter(|k| **k == old_full || k.starts_with(&subtree_prefix))
            .cloned()
            .collect::<Vec<_>>();
        for old_key in moved {
            if let Some(cached) = cache.remove(&old_key) {
                let new_key =
                    format!("{}{}", new_full, &old_key[old_full.len()..]);
                cached.relocate(self.dir_for(&new_key), new_key.clone());
                cache.insert(new_key, cached);
            }
        }
        drop(cache);

        info!("Renamed mailbox {} to {}", old_full, new_full);
        self.get(&new_full)?
            .ok_or_else(|| FolderError::NoSuchMailbox(new_full).into())
    }

    /// Flush the UID allocator and release the PID file.
    ///
    /// Further appends fail. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.allocator.close()?;
        fs::remove_file(self.root.join(PID_FILE)).ignore_not_found()?;
        info!("Closed mailbox store at {}", self.root.display());
        Ok(())
    }

    fn lookup(
        &self,
        full_name: &str,
        create_selectable: Option<bool>,
    ) -> Result<Option<Arc<Folder>>, StoreError> {
        let mut cache = self.cache.lock().unwrap();
        evict_idle(&mut cache, Utc::now().timestamp_millis());

        if let Some(folder) = cache.get(full_name) {
            return Ok(Some(Arc::clone(folder)));
        }

        if !is_valid_full_name(full_name) {
            return Ok(None);
        }

        let dir = self.dir_for(full_name);
        if !dir.is_dir() {
            return Ok(None);
        }

        let folder = Arc::new(self.open_folder(
            dir,
            full_name,
            create_selectable.unwrap_or(true),
        )?);
        cache.insert(full_name.to_owned(), Arc::clone(&folder));
        Ok(Some(folder))
    }

    fn open_folder(
        &self,
        dir: PathBuf,
        full_name: &str,
        selectable: bool,
    ) -> Result<Folder, StoreError> {
        Folder::open(
            dir,
            full_name.to_owned(),
            selectable,
            Arc::clone(&self.allocator),
            Arc::clone(&self.storage),
        )
    }

    fn dir_for(&self, full_name: &str) -> PathBuf {
        let mut dir = self.root.clone();
        for segment in full_name.split(HIERARCHY_DELIMITER) {
            dir.push(segment);
        }
        dir
    }

    fn child_names(
        &self,
        parent_name: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let entries = match fs::read_dir(self.dir_for(parent_name)) {
            Ok(entries) => entries,
            Err(e) if io::ErrorKind::NotFound == e.kind() => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_safe_name(name) {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Drop for MailboxStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close store at {}: {}", self.root.display(), e);
        }
    }
}

pub fn child_name(parent: &str, name: &str) -> String {
    format!("{}{}{}", parent, HIERARCHY_DELIMITER, name)
}

fn is_valid_full_name(full_name: &str) -> bool {
    let mut segments = full_name.split(HIERARCHY_DELIMITER);
    Some(NAMESPACE_ROOT) == segments.next() && segments.all(is_safe_name)
}

/// Drop folders unused for the idle period from the cache.
///
/// A folder still referenced outside the cache is kept regardless, since
/// dropping it would let a second instance for the same name come into
/// existence.
fn evict_idle(cache: &mut HashMap<String, Arc<Folder>>, now_millis: i64) {
    cache.retain(|name, folder| {
        let keep = Arc::strong_count(folder) > 1
            || NAMESPACE_ROOT == name
            || now_millis - folder.last_access_millis()
                <= IDLE_EVICTION_MILLIS;
        if !keep {
            debug!("Evicting idle mailbox {} from cache", name);
        }
        keep
    });
}
