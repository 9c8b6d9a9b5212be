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

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::store::folder::{Folder, FolderListener, MailFolder};
use crate::store::message::StoredMessage;
use crate::store::model::MessageFlags;
use crate::support::error::{Error, FolderError};

/// A pending `FETCH (FLAGS ...)` notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagUpdate {
    pub msn: u32,
    pub uid: Option<u64>,
    pub flags: MessageFlags,
}

/// Everything one session has yet to be told about its selected folder.
///
/// Reported in the order expunges, size, flag updates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Unsolicited {
    /// Sequence numbers in the order they must be reported.
    pub expunged: Vec<u32>,
    /// `(EXISTS, RECENT)` if the message count changed.
    pub size: Option<(usize, usize)>,
    pub flag_updates: Vec<FlagUpdate>,
}

#[derive(Default)]
struct Pending {
    size_changed: bool,
    expunged: Vec<u32>,
    /// At most one update per sequence number; later updates replace
    /// earlier ones.
    modified_flags: BTreeMap<u32, FlagUpdate>,
}

/// The listener half of a `SessionFolder`, registered with the folder.
///
/// Callbacks arrive on whichever thread changed the folder, so everything
/// is kept under one mutex and taken out in one piece.
#[derive(Default)]
struct SessionEvents {
    pending: Mutex<Pending>,
    deleted: AtomicBool,
}

impl FolderListener for SessionEvents {
    fn added(&self, _msg_num: u32) {
        self.pending.lock().unwrap().size_changed = true;
    }

    fn expunged(&self, msg_num: u32) {
        self.pending.lock().unwrap().expunged.push(msg_num);
    }

    fn flags_updated(&self, msg_num: u32, flags: MessageFlags, uid: Option<u64>) {
        self.pending.lock().unwrap().modified_flags.insert(
            msg_num,
            FlagUpdate {
                msn: msg_num,
                uid,
                flags,
            },
        );
    }

    fn mailbox_deleted(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }
}

/// One session's view of its selected folder.
///
/// Changes made to the folder by anyone, this session included, are
/// buffered here until the session reports them to its client. Until the
/// client has been told about an expunge, it still counts the expunged
/// message, so sequence numbers read through this view are shifted to
/// match.
pub struct SessionFolder {
    folder: Arc<Folder>,
    events: Arc<SessionEvents>,
    listener: Arc<dyn FolderListener>,
    read_only: bool,
}

impl SessionFolder {
    /// Start viewing `folder`. Buffering begins immediately.
    pub fn new(folder: Arc<Folder>, read_only: bool) -> Self {
        let events = Arc::new(SessionEvents::default());
        let listener: Arc<dyn FolderListener> = Arc::clone(&events) as _;
        folder.add_listener(Arc::clone(&listener));
        SessionFolder {
            folder,
            events,
            listener,
            read_only,
        }
    }

    pub fn folder(&self) -> &Arc<Folder> {
        &self.folder
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The identity to pass to `Folder` to suppress notifications to this
    /// session, as for `.SILENT` stores.
    pub fn listener(&self) -> &Arc<dyn FolderListener> {
        &self.listener
    }

    /// Whether the underlying mailbox has been deleted.
    pub fn is_deleted(&self) -> bool {
        self.events.deleted.load(Ordering::SeqCst)
    }

    /// Take everything pending, leaving the buffers empty.
    ///
    /// With `omit_expunged`, expunges stay buffered (and sequence numbers
    /// stay corrected for them) until a later drain.
    ///
    /// The EXISTS count is the one the client holds once the returned
    /// expunges have been reported, so it includes every message whose
    /// expunge is still buffered.
    pub fn drain_unsolicited(
        &self,
        omit_expunged: bool,
    ) -> Result<Unsolicited, Error> {
        let (exists, size_changed, flag_updates, expunged) =
            self.folder.with_message_count(|count| {
                let mut pending = self.events.pending.lock().unwrap();
                let size_changed =
                    std::mem::replace(&mut pending.size_changed, false);
                let flag_updates = std::mem::take(&mut pending.modified_flags)
                    .into_iter()
                    .map(|(_, u)| u)
                    .collect::<Vec<_>>();
                let expunged = if omit_expunged {
                    vec![]
                } else {
                    std::mem::take(&mut pending.expunged)
                };
                let exists = count + pending.expunged.len();
                (exists, size_changed, flag_updates, expunged)
            });

        let size = if size_changed {
            Some((exists, self.folder.recent_count(!self.read_only)?))
        } else {
            None
        };

        Ok(Unsolicited {
            size,
            flag_updates,
            expunged,
        })
    }

    /// Convert a sequence number in the folder's current numbering into the
    /// one the client knows about.
    ///
    /// Each expunge the client has not been told about yet and which was at
    /// or before the message moves it one position later.
    pub fn correct_for_expunged(&self, absolute: u32) -> u32 {
        let mut expunged = self.events.pending.lock().unwrap().expunged.clone();
        expunged.sort_unstable();
        let mut corrected = absolute;
        for msn in expunged {
            if msn <= corrected {
                corrected += 1;
            }
        }
        corrected
    }

    pub fn has_pending_expunges(&self) -> bool {
        !self.events.pending.lock().unwrap().expunged.is_empty()
    }
}

impl MailFolder for SessionFolder {
    fn full_name(&self) -> String {
        self.folder.full_name()
    }

    fn is_selectable(&self) -> bool {
        self.folder.is_selectable()
    }

    fn uid_validity(&self) -> u32 {
        self.folder.uid_validity()
    }

    fn uid_next(&self) -> u64 {
        self.folder.uid_next()
    }

    fn message_count(&self) -> usize {
        self.folder.message_count()
    }

    fn recent_count(&self, reset: bool) -> Result<usize, Error> {
        self.folder.recent_count(reset && !self.read_only)
    }

    fn unseen_count(&self) -> usize {
        self.folder.unseen_count()
    }

    fn first_unseen(&self) -> Option<u32> {
        self.folder
            .first_unseen()
            .map(|msn| self.correct_for_expunged(msn))
    }

    fn msn(&self, uid: u64) -> Result<u32, FolderError> {
        self.folder.msn(uid).map(|msn| self.correct_for_expunged(msn))
    }

    fn message_uids(&self) -> Vec<u64> {
        self.folder.message_uids()
    }

    fn message(&self, uid: u64) -> Result<StoredMessage, Error> {
        self.folder.message(uid)
    }
}

impl Drop for SessionFolder {
    fn drop(&mut self) {
        self.folder.remove_listener(&self.listener);
    }
}
