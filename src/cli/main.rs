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

use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::support::system_config::SystemConfig;

const DEFAULT_CONFIG: &str = "mailsandbox.toml";

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Run the IMAP server until interrupted.
    ///
    /// The server listens on the configured address and handles each
    /// connection on its own thread. SIGINT or SIGTERM stops it cleanly,
    /// disconnecting every client and releasing the store.
    Serve(ServeSubcommand),
    /// Manage user accounts.
    User(UserSubcommand),
    /// Open a store, report the folders and messages it holds, and close it
    /// again.
    ///
    /// This fails if another process has the store open.
    Check(CheckSubcommand),
}

#[derive(StructOpt, Default)]
pub(super) struct CommonOptions {
    /// The configuration file [default: mailsandbox.toml, if it exists]
    #[structopt(long, parse(from_os_str))]
    pub(super) config: Option<PathBuf>,

    /// The store root directory, overriding the configuration.
    #[structopt(long, parse(from_os_str))]
    pub(super) root: Option<PathBuf>,
}

#[derive(StructOpt)]
pub(super) struct ServeSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// The port to listen on, overriding the configuration. 0 picks any
    /// free port.
    #[structopt(long)]
    pub(super) port: Option<u16>,
}

#[derive(StructOpt)]
enum UserSubcommand {
    /// Create a new user account along with its INBOX.
    Add(UserAddSubcommand),
    /// List the user accounts.
    List(CommonOptions),
}

#[derive(StructOpt)]
pub(super) struct UserAddSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// The e-mail address of the user [default: the login name]
    #[structopt(long)]
    pub(super) email: Option<String>,

    /// The login name of the new user.
    pub(super) login: String,

    /// The password of the new user.
    pub(super) password: String,
}

#[derive(StructOpt)]
pub(super) struct CheckSubcommand {
    /// The store uses the mbox layout instead of one file per message.
    #[structopt(long)]
    pub(super) mbox: bool,

    /// The store root directory.
    #[structopt(parse(from_os_str))]
    pub(super) root: PathBuf,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => die!(EX_USAGE, "{}", e.message),
    });

    match cmd {
        Command::Serve(cmd) => {
            let (mut config, config_path) = load_config(&cmd.common);
            if let Some(port) = cmd.port {
                config.imap.port = port;
            }
            super::serve::init_logging(config_path.as_deref());
            super::serve::serve(config);
        }
        Command::User(UserSubcommand::Add(cmd)) => {
            let (config, _) = load_config(&cmd.common);
            super::user::add(config, cmd);
        }
        Command::User(UserSubcommand::List(common)) => {
            let (config, _) = load_config(&common);
            super::user::list(config);
        }
        Command::Check(cmd) => super::check::check(cmd),
    }
}

/// Read the configuration selected by `common`, applying its overrides.
///
/// Returns the path the configuration was read from, if any.
fn load_config(common: &CommonOptions) -> (SystemConfig, Option<PathBuf>) {
    let path = match common.config {
        Some(ref path) => Some(path.clone()),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            Some(PathBuf::from(DEFAULT_CONFIG))
        }
        None => None,
    };

    let mut config = match path {
        Some(ref path) => SystemConfig::load(path).unwrap_or_else(|e| {
            die!(EX_CONFIG, "Error in config file '{}': {}", path.display(), e)
        }),
        None => SystemConfig::default(),
    };

    if let Some(ref root) = common.root {
        config.store.root = root.clone();
    }

    (config, path)
}
