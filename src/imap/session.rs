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

use std::sync::Arc;

use log::info;

use super::response_writer::ImapResponse;
use super::session_folder::SessionFolder;
use crate::account::host::MailHost;
use crate::account::user_manager::User;
use crate::store::folder::{Folder, MailFolder};
use crate::support::error::{AuthorizationError, Error};
use crate::support::log_prefix::LogPrefix;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    NonAuthenticated,
    Authenticated,
    Selected,
    Logout,
}

/// The state of one IMAP connection.
///
/// ```text
/// NonAuthenticated --login--> Authenticated --select--> Selected
///                             Authenticated <--close--- Selected
/// (any) --logout--> Logout
/// ```
pub struct Session {
    host: Arc<MailHost>,
    log_prefix: LogPrefix,
    state: SessionState,
    user: Option<User>,
    selected: Option<SessionFolder>,
    /// Set when the connection must be closed after the current command,
    /// with the text of the BYE to send.
    close_reason: Option<String>,
}

impl Session {
    pub fn new(host: Arc<MailHost>, log_prefix: LogPrefix) -> Self {
        Session {
            host,
            log_prefix,
            state: SessionState::NonAuthenticated,
            user: None,
            selected: None,
            close_reason: None,
        }
    }

    pub fn host(&self) -> &Arc<MailHost> {
        &self.host
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The login of the authenticated user.
    pub fn login(&self) -> Result<&str, Error> {
        self.user
            .as_ref()
            .map(|u| &u.login[..])
            .ok_or_else(|| AuthorizationError::LackingPermissions.into())
    }

    pub fn set_authenticated(&mut self, user: User) {
        info!("{} Logged in as {}", self.log_prefix, user.login);
        self.log_prefix.set_user(user.login.clone());
        self.user = Some(user);
        self.state = SessionState::Authenticated;
    }

    /// Select `folder`, implicitly deselecting any current selection.
    ///
    /// No expunge happens on the implicit deselect.
    pub fn set_selected(&mut self, folder: Arc<Folder>, read_only: bool) {
        self.deselect();
        self.selected = Some(SessionFolder::new(folder, read_only));
        self.state = SessionState::Selected;
    }

    /// Drop the current selection, if any, returning to Authenticated.
    pub fn deselect(&mut self) {
        self.selected = None;
        if SessionState::Selected == self.state {
            self.state = SessionState::Authenticated;
        }
    }

    pub fn selected(&self) -> Option<&SessionFolder> {
        self.selected.as_ref()
    }

    pub fn logout(&mut self) {
        self.selected = None;
        self.state = SessionState::Logout;
    }

    /// Ask for the connection to be closed once the current command is done.
    pub fn close_connection(&mut self, bye: String) {
        self.selected = None;
        self.state = SessionState::Logout;
        self.close_reason = Some(bye);
    }

    pub fn take_close_reason(&mut self) -> Option<String> {
        self.close_reason.take()
    }

    /// Report pending changes to the selected folder.
    ///
    /// The order is expunges, then EXISTS/RECENT, then flag changes.
    /// Expunges are left pending with `omit_expunged`, which FETCH, STORE
    /// and SEARCH use since the client cannot cope with sequence numbers
    /// changing under them.
    ///
    /// If the selected folder has been deleted, the connection is scheduled
    /// for closing instead.
    pub fn unsolicited_responses(
        &mut self,
        response: &ImapResponse,
        omit_expunged: bool,
    ) -> Result<(), Error> {
        let selected = match self.selected {
            Some(ref selected) => selected,
            None => return Ok(()),
        };

        if selected.is_deleted() {
            let bye = format!("Mailbox {} has been deleted", selected.full_name());
            self.close_connection(bye);
            return Ok(());
        }

        let pending = selected.drain_unsolicited(omit_expunged)?;
        for msn in pending.expunged {
            response.expunge_response(msn)?;
        }

        if let Some((exists, recent)) = pending.size {
            response.exists_response(exists)?;
            response.recent_response(recent)?;
        }

        for update in pending.flag_updates {
            let mut data = format!("FLAGS {}", update.flags);
            if let Some(uid) = update.uid {
                data.push_str(&format!(" UID {}", uid));
            }
            response.fetch_response(update.msn, data.as_bytes())?;
        }

        Ok(())
    }
}
