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

use crate::account::host::MailHost;
use crate::support::error::{AuthorizationError, Error, StoreError};
use crate::support::system_config::SystemConfig;

use super::main::UserAddSubcommand;

fn open_host(config: &SystemConfig) -> std::sync::Arc<MailHost> {
    match MailHost::open(config) {
        Ok(host) => host,
        Err(Error::Store(e @ StoreError::PidFileExists(_))) => {
            die!(EX_TEMPFAIL, "{}", e)
        }
        Err(e) => die!(
            EX_IOERR,
            "Unable to open store at '{}': {}",
            config.store.root.display(),
            e
        ),
    }
}

fn close_host(host: &MailHost) {
    if let Err(e) = host.close() {
        die!(EX_IOERR, "Error closing store: {}", e);
    }
}

pub(super) fn add(config: SystemConfig, cmd: UserAddSubcommand) {
    let host = open_host(&config);
    let email = cmd.email.as_deref().unwrap_or(&cmd.login);

    let result = host.create_user(&cmd.login, email, &cmd.password);
    close_host(&host);

    match result {
        Ok(user) => println!("Created user {} <{}>", user.login, user.email),
        Err(Error::Authorization(AuthorizationError::UserExists(login))) => {
            die!(EX_CANTCREAT, "User '{}' already exists", login)
        }
        Err(e) => die!(EX_SOFTWARE, "Error creating user: {}", e),
    }
}

pub(super) fn list(config: SystemConfig) {
    let host = open_host(&config);
    for user in host.users().list() {
        println!("{}\t{}", user.login, user.email);
    }
    close_host(&host);
}
