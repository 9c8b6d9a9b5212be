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

//! Implements the IMAP commands themselves.
//!
//! Each submodule holds the handlers of one family of commands. The table
//! at the bottom of this file ties them to their names and the session
//! states they are valid in; `CommandRegistry::standard()` is built from it.

mod auth;
mod commands;
mod defs;
mod fetch;
mod flags;
mod mailboxes;
mod messages;
mod search;

pub use self::defs::{capability_data, CAPABILITIES};

use super::dispatcher::{
    CommandSpec, ANY_STATE, AUTHENTICATED, NON_AUTHENTICATED, SELECTED,
};

macro_rules! command {
    ($name:expr, $args:expr, $states:expr, $handler:expr) => {
        command!($name, $args, $states, false, $handler)
    };
    ($name:expr, $args:expr, $states:expr, $uid:expr, $handler:expr) => {
        CommandSpec {
            name: $name,
            args: $args,
            states: $states,
            uid_enabled: $uid,
            handler: $handler,
        }
    };
}

pub(super) static STANDARD_COMMANDS: &[CommandSpec] = &[
    command!("CAPABILITY", "", ANY_STATE, commands::cmd_capability),
    command!("NOOP", "", ANY_STATE, commands::cmd_noop),
    command!("LOGOUT", "", ANY_STATE, commands::cmd_logout),
    command!(
        "LOGIN",
        "<username> <password>",
        NON_AUTHENTICATED,
        auth::cmd_login
    ),
    command!(
        "AUTHENTICATE",
        "<auth_type> [<initial_response>]",
        NON_AUTHENTICATED,
        auth::cmd_authenticate
    ),
    command!("SELECT", "<mailbox>", AUTHENTICATED, mailboxes::cmd_select),
    command!("EXAMINE", "<mailbox>", AUTHENTICATED, mailboxes::cmd_examine),
    command!("CREATE", "<mailbox>", AUTHENTICATED, mailboxes::cmd_create),
    command!("DELETE", "<mailbox>", AUTHENTICATED, mailboxes::cmd_delete),
    command!(
        "RENAME",
        "existing-mailbox-name new-mailbox-name",
        AUTHENTICATED,
        mailboxes::cmd_rename
    ),
    command!(
        "SUBSCRIBE",
        "<mailbox>",
        AUTHENTICATED,
        mailboxes::cmd_subscribe
    ),
    command!(
        "UNSUBSCRIBE",
        "<mailbox>",
        AUTHENTICATED,
        mailboxes::cmd_unsubscribe
    ),
    command!(
        "LIST",
        "<reference-name> <mailbox-name-with-wildcards>",
        AUTHENTICATED,
        mailboxes::cmd_list
    ),
    command!(
        "LSUB",
        "<reference-name> <mailbox-name-with-wildcards>",
        AUTHENTICATED,
        mailboxes::cmd_lsub
    ),
    command!(
        "STATUS",
        "<mailbox> ( <status-data-item>+ )",
        AUTHENTICATED,
        mailboxes::cmd_status
    ),
    command!(
        "APPEND",
        "<mailbox> [<flag_list>] [<date_time>] literal",
        AUTHENTICATED,
        messages::cmd_append
    ),
    command!("CHECK", "", SELECTED, commands::cmd_noop),
    command!("CLOSE", "", SELECTED, messages::cmd_close),
    command!("UNSELECT", "", SELECTED, messages::cmd_unselect),
    command!("EXPUNGE", "", SELECTED, true, messages::cmd_expunge),
    command!(
        "SEARCH",
        "<search term>",
        SELECTED,
        true,
        search::cmd_search
    ),
    command!(
        "FETCH",
        "<message-set> <fetch-profile>",
        SELECTED,
        true,
        fetch::cmd_fetch
    ),
    command!(
        "STORE",
        "<Message-set> ['+'|'-']FLAG[.SILENT] <flag-list>",
        SELECTED,
        true,
        flags::cmd_store
    ),
    command!(
        "COPY",
        "<message-set> <mailbox>",
        SELECTED,
        true,
        messages::cmd_copy
    ),
    command!(
        "MOVE",
        "<message-set> <mailbox>",
        SELECTED,
        true,
        messages::cmd_move
    ),
    command!(
        "UID",
        "<fetch-command>|<store-command>|<copy-command>|<move-command>|\
         <search-command>|<expunge-command>",
        SELECTED,
        commands::cmd_uid
    ),
];
