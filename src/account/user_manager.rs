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
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::info;
use serde::{Deserialize, Serialize};

use crate::support::error::{AuthorizationError, Error, StoreError};
use crate::support::file_ops;
use crate::support::system_config::AccountConfig;

/// Name of the file, at the store root, listing all users.
pub const USER_LIST_FILE: &str = "userlist";

/// One user known to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserList {
    #[serde(default, rename = "user")]
    users: Vec<User>,
}

/// The set of users, keyed by normalised login.
///
/// Logins and email addresses are compared after trimming and lower-casing.
/// The list is rewritten in full on every change.
#[derive(Debug)]
pub struct UserManager {
    path: PathBuf,
    auth_required: bool,
    users: Mutex<BTreeMap<String, User>>,
}

pub fn normalise(s: &str) -> String {
    s.trim().to_lowercase()
}

impl UserManager {
    /// Load the user list from the store at `root`, if there is one.
    pub fn open(root: &Path, auth_required: bool) -> Result<Self, StoreError> {
        let path = root.join(USER_LIST_FILE);
        let list = match file_ops::slurp_opt(&path)? {
            None => UserList::default(),
            Some(data) => std::str::from_utf8(&data)
                .ok()
                .and_then(|s| toml::from_str::<UserList>(s).ok())
                .ok_or_else(|| StoreError::CorruptSettings(path.clone()))?,
        };

        let users = list
            .users
            .into_iter()
            .map(|u| (normalise(&u.login), u))
            .collect();

        Ok(UserManager {
            path,
            auth_required,
            users: Mutex::new(users),
        })
    }

    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    /// Add a user. Fails if the login is already taken.
    pub fn create(
        &self,
        login: &str,
        email: &str,
        password: &str,
    ) -> Result<User, Error> {
        let key = normalise(login);
        let mut users = self.users.lock().unwrap();
        if key.is_empty() || users.contains_key(&key) {
            return Err(AuthorizationError::UserExists(login.to_owned()).into());
        }

        let user = User {
            login: key.clone(),
            email: normalise(email),
            password: password.to_owned(),
        };
        users.insert(key, user.clone());
        self.save(&users)?;
        info!("Created user {}", user.login);
        Ok(user)
    }

    /// Add every configured account which does not exist yet.
    pub fn ensure_accounts(
        &self,
        accounts: &[AccountConfig],
    ) -> Result<Vec<User>, Error> {
        let mut created = Vec::new();
        for account in accounts {
            if self.get(&account.login).is_none() {
                let email = account
                    .email
                    .clone()
                    .unwrap_or_else(|| account.login.clone());
                created.push(self.create(
                    &account.login,
                    &email,
                    &account.password,
                )?);
            }
        }
        Ok(created)
    }

    pub fn delete(&self, login: &str) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let removed = users.remove(&normalise(login));
        if removed.is_some() {
            self.save(&users)?;
        }
        Ok(removed)
    }

    pub fn get(&self, login: &str) -> Option<User> {
        self.users.lock().unwrap().get(&normalise(login)).cloned()
    }

    pub fn get_by_email(&self, email: &str) -> Option<User> {
        let email = normalise(email);
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn list(&self) -> Vec<User> {
        self.users.lock().unwrap().values().cloned().collect()
    }

    /// Check a login/password pair.
    ///
    /// When authentication is not required, any password is accepted for an
    /// existing user; callers create unknown users themselves.
    pub fn test(&self, login: &str, password: &str) -> bool {
        match self.get(login) {
            Some(user) => !self.auth_required || user.password == password,
            None => false,
        }
    }

    fn save(&self, users: &BTreeMap<String, User>) -> Result<(), StoreError> {
        let list = UserList {
            users: users.values().cloned().collect(),
        };
        let text = toml::to_string(&list)
            .map_err(|e| StoreError::Config(e.to_string()))?;
        file_ops::spit(&self.path, text.as_bytes())?;
        Ok(())
    }
}
