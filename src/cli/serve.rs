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

use std::path::Path;

use log::{info, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use nix::sys::signal::{SigSet, Signal};

use crate::account::host::MailHost;
use crate::imap::server::ImapServer;
use crate::support::error::{Error, StoreError};
use crate::support::system_config::SystemConfig;

const LOG_CONFIG: &str = "logging.toml";

/// Set up logging for the server.
///
/// `logging.toml` next to the configuration file, if there is one, is a
/// log4rs configuration. Otherwise, everything at INFO and above goes to
/// standard error.
pub(super) fn init_logging(config_path: Option<&Path>) {
    let log_config_file = config_path
        .and_then(Path::parent)
        .map(|dir| dir.join(LOG_CONFIG))
        .filter(|path| path.is_file());

    if let Some(log_config_file) = log_config_file {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::file::Deserializers::default(),
        ) {
            die!(
                EX_CONFIG,
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
        }
        return;
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}][{t}] {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info));

    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                die!(EX_SOFTWARE, "Failed to initialise logging: {}", e);
            }
        }
        Err(e) => die!(EX_SOFTWARE, "Bad built-in logging config: {}", e),
    }
}

/// Run the IMAP server until SIGINT or SIGTERM.
pub(super) fn serve(config: SystemConfig) {
    // Blocked before any threads start so that they all inherit the mask and
    // the signals can only be taken by `wait` below
    let mut signals = SigSet::empty();
    signals.add(Signal::SIGINT);
    signals.add(Signal::SIGTERM);
    if let Err(e) = signals.thread_block() {
        fatal!(EX_OSERR, "Unable to block termination signals: {}", e);
    }

    let host = match MailHost::open(&config) {
        Ok(host) => host,
        Err(e) => fatal!(
            EX_TEMPFAIL,
            "Unable to open store at '{}': {}",
            config.store.root.display(),
            e
        ),
    };

    let server = match ImapServer::start(&config, host) {
        Ok(server) => server,
        Err(Error::Store(StoreError::Io(e))) => fatal!(
            EX_OSERR,
            "Unable to listen on {}:{}: {}",
            config.imap.host,
            config.imap.port,
            e
        ),
        Err(e) => fatal!(EX_SOFTWARE, "Unable to start server: {}", e),
    };

    match signals.wait() {
        Ok(signal) => info!("Received {:?}, shutting down", signal),
        Err(e) => fatal!(EX_OSERR, "Failed waiting for signals: {}", e),
    }

    if let Err(e) = server.stop() {
        fatal!(EX_IOERR, "Error shutting down: {}", e);
    }
}
