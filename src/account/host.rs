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

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use log::info;

use super::user_manager::{normalise, User, UserManager};
use crate::store::folder::Folder;
use crate::store::mailbox_store::{
    MailboxStore, HIERARCHY_DELIMITER, NAMESPACE_ROOT,
};
use crate::support::error::{AuthorizationError, Error, FolderError};
use crate::support::safe_name::login_segment;
use crate::support::system_config::SystemConfig;

/// The canonical name of every user's inbox.
pub const INBOX_NAME: &str = "INBOX";

/// Ties users to their part of the mailbox store.
///
/// Each user owns the namespace `#mail.<login>`, whose `INBOX` child is
/// created along with the account. Mailbox names given by clients are
/// relative to that namespace unless they start with `#`.
///
/// Subscriptions live only in memory.
pub struct MailHost {
    store: MailboxStore,
    users: UserManager,
    subscriptions: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl MailHost {
    pub fn new(store: MailboxStore, users: UserManager) -> Self {
        MailHost {
            store,
            users,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Open the store and user list described by `config`, and make sure
    /// every configured account exists with its mailbox tree.
    pub fn open(config: &SystemConfig) -> Result<Arc<Self>, Error> {
        let store = MailboxStore::open(&config.store.root, config.store.layout)?;
        let users =
            UserManager::open(&config.store.root, config.users.auth_required)?;
        let host = Arc::new(MailHost::new(store, users));

        host.users.ensure_accounts(&config.users.account)?;
        for user in host.users.list() {
            host.create_private_mail_account(&user.login)?;
        }

        Ok(host)
    }

    pub fn store(&self) -> &MailboxStore {
        &self.store
    }

    pub fn users(&self) -> &UserManager {
        &self.users
    }

    /// Create a user along with their mailbox tree.
    pub fn create_user(
        &self,
        login: &str,
        email: &str,
        password: &str,
    ) -> Result<User, Error> {
        let user = self.users.create(login, email, password)?;
        self.create_private_mail_account(&user.login)?;
        Ok(user)
    }

    /// Verify credentials, returning the user on success.
    ///
    /// If authentication is not required, an unknown login is turned into
    /// a new user with the given password.
    pub fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<User, Error> {
        if self.users.test(login, password) {
            let user = self
                .users
                .get(login)
                .ok_or(AuthorizationError::BadCredentials)?;
            self.create_private_mail_account(&user.login)?;
            return Ok(user);
        }

        if !self.users.auth_required() && self.users.get(login).is_none() {
            info!("Auto-creating user {}", normalise(login));
            return self.create_user(login, login, password);
        }

        Err(AuthorizationError::BadCredentials.into())
    }

    /// Create the namespace root and INBOX of `login` if missing.
    pub fn create_private_mail_account(&self, login: &str) -> Result<(), Error> {
        let root = self.store.namespace_root()?;
        let user_root =
            self.store.create(&root, &login_segment(login), false)?;
        self.store.create(&user_root, INBOX_NAME, true)?;
        Ok(())
    }

    /// The full name of the namespace root of `login`.
    pub fn user_namespace(&self, login: &str) -> String {
        format!("{}{}{}", NAMESPACE_ROOT, HIERARCHY_DELIMITER, login_segment(login))
    }

    /// Convert a client-supplied mailbox name into a full name.
    pub fn qualified_name(&self, login: &str, mailbox: &str) -> String {
        let namespace = self.user_namespace(login);
        if mailbox.eq_ignore_ascii_case(INBOX_NAME) {
            format!("{}{}{}", namespace, HIERARCHY_DELIMITER, INBOX_NAME)
        } else if mailbox.starts_with('#') {
            mailbox.to_owned()
        } else if mailbox.is_empty() {
            namespace
        } else {
            format!("{}{}{}", namespace, HIERARCHY_DELIMITER, mailbox)
        }
    }

    /// The inverse of `qualified_name` for names inside the user's own
    /// namespace; other names are returned unchanged.
    pub fn client_name(&self, login: &str, full_name: &str) -> String {
        let prefix = format!("{}{}", self.user_namespace(login), HIERARCHY_DELIMITER);
        if full_name.starts_with(&prefix) {
            full_name[prefix.len()..].to_owned()
        } else if full_name == self.user_namespace(login) {
            String::new()
        } else {
            full_name.to_owned()
        }
    }

    pub fn folder(
        &self,
        login: &str,
        mailbox: &str,
    ) -> Result<Option<Arc<Folder>>, Error> {
        Ok(self.store.get(&self.qualified_name(login, mailbox))?)
    }

    pub fn existing_folder(
        &self,
        login: &str,
        mailbox: &str,
    ) -> Result<Arc<Folder>, Error> {
        self.folder(login, mailbox)?
            .ok_or_else(|| FolderError::NoSuchMailbox(mailbox.to_owned()).into())
    }

    pub fn inbox(&self, login: &str) -> Result<Arc<Folder>, Error> {
        self.existing_folder(login, INBOX_NAME)
    }

    /// Create a mailbox, along with any missing levels above it.
    ///
    /// The intermediate levels are not selectable; only the last is.
    pub fn create_mailbox(
        &self,
        login: &str,
        mailbox: &str,
    ) -> Result<Arc<Folder>, Error> {
        let qualified = self.qualified_name(login, mailbox);
        if self.store.get(&qualified)?.is_some() {
            return Err(FolderError::MailboxExists.into());
        }
        self.create_path(&qualified)
    }

    fn create_path(&self, qualified: &str) -> Result<Arc<Folder>, Error> {
        let segments = qualified
            .split(HIERARCHY_DELIMITER)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        if segments.len() < 2 {
            return Err(FolderError::NamespaceLevel.into());
        }
        if NAMESPACE_ROOT != segments[0] {
            return Err(FolderError::InvalidNamespace.into());
        }

        let mut folder = self.store.namespace_root()?;
        for (ix, &segment) in segments.iter().enumerate().skip(1) {
            folder = match self.store.get_child(&folder, segment)? {
                Some(child) => child,
                None => self.store.create(
                    &folder,
                    segment,
                    ix + 1 == segments.len(),
                )?,
            };
        }
        Ok(folder)
    }

    /// Delete a mailbox.
    ///
    /// A mailbox with children cannot actually go away; if it is selectable
    /// it is emptied and made non-selectable instead.
    pub fn delete_mailbox(&self, login: &str, mailbox: &str) -> Result<(), Error> {
        let folder = self.existing_folder(login, mailbox)?;
        if self.store.delete(&folder)? {
            self.forget_subscriptions(&folder.full_name());
        }
        Ok(())
    }

    /// Rename a mailbox.
    ///
    /// Renaming INBOX creates the new mailbox, copies every message into
    /// it, and empties INBOX; INBOX and its children stay where they are.
    /// Any other mailbox is moved with its whole subtree.
    pub fn rename_mailbox(
        &self,
        login: &str,
        old: &str,
        new: &str,
    ) -> Result<(), Error> {
        let existing = self.existing_folder(login, old)?;
        let new_qualified = self.qualified_name(login, new);

        if self.qualified_name(login, INBOX_NAME) == existing.full_name() {
            let target = self.create_mailbox(login, new)?;
            for uid in existing.message_uids() {
                existing.copy_message(uid, &target)?;
            }
            existing.delete_all_messages()?;
            return Ok(());
        }

        if self.store.get(&new_qualified)?.is_some() {
            return Err(FolderError::MailboxExists.into());
        }

        let (parent_name, new_name) = match new_qualified.rfind(HIERARCHY_DELIMITER) {
            Some(ix) => (&new_qualified[..ix], &new_qualified[ix + 1..]),
            None => return Err(FolderError::NamespaceLevel.into()),
        };
        let parent = match self.store.get(parent_name)? {
            Some(parent) => parent,
            None => {
                let parent = self.create_path(parent_name)?;
                parent.set_selectable(false)?;
                parent
            }
        };

        self.store.rename(&existing, &parent, new_name)?;
        Ok(())
    }

    /// List the mailboxes matching `pattern`, which is relative to the
    /// user's namespace like any other mailbox name.
    pub fn list_mailboxes(
        &self,
        login: &str,
        pattern: &str,
        subscribed_only: bool,
    ) -> Result<Vec<Arc<Folder>>, Error> {
        let mut folders = self.store.list(&self.qualified_name(login, pattern))?;
        if subscribed_only {
            let subscriptions = self.subscriptions.lock().unwrap();
            let mine = subscriptions.get(&normalise(login));
            folders.retain(|f| mine.map_or(false, |s| s.contains(&f.full_name())));
        }
        Ok(folders)
    }

    pub fn subscribe(&self, login: &str, mailbox: &str) -> Result<(), Error> {
        let folder = self.existing_folder(login, mailbox)?;
        self.subscriptions
            .lock()
            .unwrap()
            .entry(normalise(login))
            .or_default()
            .insert(folder.full_name());
        Ok(())
    }

    pub fn unsubscribe(&self, login: &str, mailbox: &str) -> Result<(), Error> {
        let qualified = self.qualified_name(login, mailbox);
        if let Some(subs) =
            self.subscriptions.lock().unwrap().get_mut(&normalise(login))
        {
            subs.remove(&qualified);
        }
        Ok(())
    }

    fn forget_subscriptions(&self, full_name: &str) {
        for subs in self.subscriptions.lock().unwrap().values_mut() {
            subs.remove(full_name);
        }
    }

    /// Every message in the store, across all users.
    pub fn all_messages(
        &self,
    ) -> Result<Vec<crate::store::message::StoredMessage>, Error> {
        let mut ret = Vec::new();
        for folder in self.store.list(&format!("{}*", NAMESPACE_ROOT))? {
            ret.extend(folder.messages()?);
        }
        Ok(ret)
    }

    pub fn close(&self) -> Result<(), Error> {
        self.store.close()?;
        Ok(())
    }
}
