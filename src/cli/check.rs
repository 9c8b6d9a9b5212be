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

use crate::store::mailbox_store::MailboxStore;
use crate::support::error::StoreError;
use crate::support::system_config::StorageLayout;

use super::main::CheckSubcommand;

pub(super) fn check(cmd: CheckSubcommand) {
    if !cmd.root.is_dir() {
        die!(EX_NOINPUT, "'{}' is not a directory", cmd.root.display());
    }

    let layout = if cmd.mbox {
        StorageLayout::Mbox
    } else {
        StorageLayout::Eml
    };

    let store = match MailboxStore::open(&cmd.root, layout) {
        Ok(store) => store,
        Err(e @ StoreError::PidFileExists(_)) => die!(EX_TEMPFAIL, "{}", e),
        Err(e) => die!(EX_IOERR, "Unable to open store: {}", e),
    };

    let folders = match store.list("*") {
        Ok(folders) => folders,
        Err(e) => {
            let _ = store.close();
            die!(EX_IOERR, "Unable to list folders: {}", e)
        }
    };

    let mut messages = 0;
    for folder in &folders {
        let count = folder.message_count();
        messages += count;
        if folder.is_selectable() {
            println!("{}\t{} message(s)", folder.full_name(), count);
        } else {
            println!("{}\t(not selectable)", folder.full_name());
        }
    }
    println!(
        "{} folder(s), {} message(s), next UID {}",
        folders.len(),
        messages,
        store.uid_next()
    );

    if let Err(e) = store.close() {
        die!(EX_IOERR, "Error closing store: {}", e);
    }
}
