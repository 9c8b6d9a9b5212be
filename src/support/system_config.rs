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
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::StoreError;

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Configuration for the IMAP listener.
    #[serde(default)]
    pub imap: ImapConfig,

    /// Where and how mailboxes are stored.
    #[serde(default)]
    pub store: StoreConfig,

    /// User accounts and authentication.
    #[serde(default)]
    pub users: UsersConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ImapConfig {
    /// The address to listen on.
    pub host: String,
    /// The TCP port to listen on. 0 picks any free port.
    pub port: u16,
    /// Text sent in the untagged OK greeting.
    pub greeting: String,
}

impl Default for ImapConfig {
    fn default() -> Self {
        ImapConfig {
            host: "127.0.0.1".to_owned(),
            port: 3143,
            greeting: "Mailsandbox IMAP4rev1 Server ready".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLayout {
    /// One `<uid>.eml` file per message.
    Eml,
    /// All messages of a mailbox in one `messages.mbox` file.
    Mbox,
}

impl Default for StorageLayout {
    fn default() -> Self {
        StorageLayout::Eml
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// The root directory of the mailbox store.
    ///
    /// Relative paths are resolved against the directory containing the
    /// configuration file.
    pub root: PathBuf,
    /// How message content is laid out within each mailbox directory.
    pub layout: StorageLayout,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: "mailstore".into(),
            layout: StorageLayout::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UsersConfig {
    /// If false, any login succeeds and unknown users are created on the
    /// fly with the password they presented.
    pub auth_required: bool,
    /// Accounts which are created at startup if they do not exist yet.
    pub account: Vec<AccountConfig>,
}

impl Default for UsersConfig {
    fn default() -> Self {
        UsersConfig {
            auth_required: true,
            account: vec![],
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccountConfig {
    pub login: String,
    pub password: String,
    /// Defaults to the login name.
    #[serde(default)]
    pub email: Option<String>,
}

impl SystemConfig {
    /// Load the configuration from `path`.
    ///
    /// A relative store root is made relative to the directory containing
    /// the file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path)?;
        let mut config: SystemConfig = toml::from_str(&text)
            .map_err(|e| StoreError::Config(e.to_string()))?;

        if config.store.root.is_relative() {
            if let Some(parent) = path.parent() {
                config.store.root = parent.join(&config.store.root);
            }
        }

        Ok(config)
    }
}
