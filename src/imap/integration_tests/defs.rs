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

use std::io::{self, BufRead, Read, Write};
use std::sync::{Arc, Mutex, Weak};

use lazy_static::lazy_static;
use regex::Regex;
use tempfile::TempDir;

use crate::account::host::MailHost;
use crate::account::user_manager::UserManager;
use crate::imap::dispatcher::CommandRegistry;
use crate::imap::server::Server;
use crate::store::mailbox_store::MailboxStore;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::StorageLayout;

pub const GREETING: &str = "Mailsandbox test server ready";

lazy_static! {
    static ref SYSTEM: Mutex<Weak<System>> = Mutex::new(Weak::new());
    static ref LITERAL_AT_EOL: regex::bytes::Regex =
        regex::bytes::Regex::new(r"\{([0-9]+)\}\r\n$").unwrap();
}

struct System {
    host: Arc<MailHost>,
    registry: Arc<CommandRegistry>,
    // Dropped last
    _root: TempDir,
}

#[derive(Clone)]
pub struct Setup {
    system: Arc<System>,
}

/// Set up (or join) the shared store, where user `azure` has password
/// `hunter2`.
pub fn set_up() -> Setup {
    crate::init_test_log();

    let mut lock = SYSTEM.lock().unwrap();

    if let Some(system) = lock.upgrade() {
        return Setup { system };
    }

    let system = Arc::new(new_system(true));
    *lock = Arc::downgrade(&system);
    Setup { system }
}

/// Set up a private store which lets anyone log in.
pub fn set_up_open() -> Setup {
    crate::init_test_log();
    Setup {
        system: Arc::new(new_system(false)),
    }
}

fn new_system(auth_required: bool) -> System {
    let root = TempDir::new().unwrap();
    let store = MailboxStore::open(root.path(), StorageLayout::Eml).unwrap();
    let users = UserManager::open(root.path(), auth_required).unwrap();
    let host = Arc::new(MailHost::new(store, users));
    host.create_user("azure", "azure@example.com", "hunter2")
        .unwrap();

    System {
        host,
        registry: Arc::new(CommandRegistry::standard()),
        _root: root,
    }
}

impl Setup {
    pub fn host(&self) -> &Arc<MailHost> {
        &self.system.host
    }

    pub fn connect(&self, name: &'static str) -> PipeClient {
        let (server_in, client_out) = os_pipe::pipe().unwrap();
        let (client_in, server_out) = os_pipe::pipe().unwrap();
        let host = Arc::clone(&self.system.host);
        let registry = Arc::clone(&self.system.registry);

        std::thread::spawn(move || {
            let mut server = Server::new(
                io::BufReader::new(server_in),
                server_out,
                host,
                registry,
                GREETING.to_owned(),
                LogPrefix::new(name.to_owned()),
            );

            match server.run() {
                Ok(()) => (),
                // The client hung up mid-command
                Err(Error::Protocol(e)) if e.is_fatal() => (),
                // Reported to the client as BYE
                Err(Error::Store(_)) => (),
                Err(e) => panic!("Unexpected server error: {}", e),
            }
        });

        PipeClient {
            read: io::BufReader::new(client_in),
            write: client_out,
            name,
            next_tag: 1,
        }
    }
}

/// A minimal line-oriented IMAP client.
pub struct PipeClient {
    read: io::BufReader<os_pipe::PipeReader>,
    write: os_pipe::PipeWriter,
    name: &'static str,
    next_tag: u32,
}

impl PipeClient {
    pub fn write_raw(&mut self, data: &[u8]) -> io::Result<()> {
        self.write.write_all(data)?;
        self.write.flush()
    }

    /// Read one response line, including the content of any literals it
    /// contains, with line endings intact.
    pub fn read_logical_line(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        loop {
            let start = buf.len();
            if 0 == self.read.read_until(b'\n', &mut buf)? {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "EOF from server",
                ));
            }

            let len = match LITERAL_AT_EOL.captures(&buf[start..]) {
                Some(c) => std::str::from_utf8(&c[1])
                    .unwrap()
                    .parse::<u64>()
                    .unwrap(),
                None => break,
            };
            self.read.by_ref().take(len).read_to_end(&mut buf)?;
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Send `text` as a command under a fresh tag and collect every
    /// response up to and including the tagged one.
    ///
    /// Literals in `text` must be non-synchronising.
    pub fn command(&mut self, text: &str) -> Vec<String> {
        let tag = format!("{}{}", self.name, self.next_tag);
        self.next_tag += 1;
        self.write_raw(format!("{} {}\r\n", tag, text).as_bytes())
            .unwrap();
        self.read_responses_until_tagged(&tag)
    }

    pub fn read_responses_until_tagged(&mut self, tag: &str) -> Vec<String> {
        let prefix = format!("{} ", tag);
        let mut responses = Vec::new();
        loop {
            let line = self.read_logical_line().unwrap();
            let done = line.starts_with(&prefix);
            responses.push(line);
            if done {
                return responses;
            }
        }
    }
}

/// Run a command, binding the responses.
///
/// `command!(responses = client, "NOOP")`
macro_rules! command {
    ($responses:ident = $client:expr, $text:expr) => {
        let $responses = $client.command(&$text);
    };
    (mut $responses:ident = $client:expr, $text:expr) => {
        let mut $responses = $client.command(&$text);
    };
}

/// Run a command and assert that it succeeded.
macro_rules! ok_command {
    ($client:expr, $text:expr) => {{
        let responses = $client.command(&$text);
        assert_tagged_ok(&responses);
        responses
    }};
}

pub fn receive_line_like(client: &mut PipeClient, pat: &str) {
    let line = client.read_logical_line().unwrap();
    assert!(
        Regex::new(pat).unwrap().is_match(&line),
        "Expected\n\
         match: {:?}\n\
         Got:   {:?}\n",
        pat,
        line
    );
}

pub fn skip_greeting(client: &mut PipeClient) {
    receive_line_like(client, r"^\* OK ");
}

pub fn quick_log_in(client: &mut PipeClient) {
    skip_greeting(client);
    ok_command!(client, "LOGIN azure hunter2");
}

pub fn quick_create(client: &mut PipeClient, mailbox: &str) {
    ok_command!(client, format!("CREATE {}", mailbox));
}

pub fn quick_select(client: &mut PipeClient, mailbox: &str) {
    ok_command!(client, format!("SELECT {}", mailbox));
}

/// Append `count` small messages to `mailbox`, numbered from 1.
pub fn quick_append(client: &mut PipeClient, mailbox: &str, count: usize) {
    for i in 1..=count {
        let message = test_message(&format!("Message {}", i));
        ok_command!(
            client,
            format!("APPEND {} {{{}+}}\r\n{}", mailbox, message.len(), message)
        );
    }
}

pub fn test_message(subject: &str) -> String {
    format!(
        "From: Azure <azure@example.com>\r\n\
         To: Pink <pink@example.com>\r\n\
         Subject: {}\r\n\
         Date: Fri, 03 Jul 2020 12:00:00 +0000\r\n\
         \r\n\
         Body of {}\r\n",
        subject, subject
    )
}

pub fn tagged(responses: &[String]) -> &str {
    responses.last().map(|s| &s[..]).unwrap_or("")
}

pub fn untagged(responses: &[String]) -> &[String] {
    &responses[..responses.len().saturating_sub(1)]
}

fn tagged_status(responses: &[String]) -> &str {
    tagged(responses).split(' ').nth(1).unwrap_or("")
}

pub fn assert_tagged_ok(responses: &[String]) {
    assert_eq!("OK", tagged_status(responses), "Responses: {:?}", responses);
}

pub fn assert_tagged_no(responses: &[String]) {
    assert_eq!("NO", tagged_status(responses), "Responses: {:?}", responses);
}

pub fn assert_tagged_bad(responses: &[String]) {
    assert_eq!("BAD", tagged_status(responses), "Responses: {:?}", responses);
}

/// Assert that some untagged response matches `pat`.
pub fn has_untagged_like(responses: &[String], pat: &str) {
    let re = Regex::new(pat).unwrap();
    assert!(
        untagged(responses).iter().any(|r| re.is_match(r)),
        "No untagged response matches {:?}; got {:?}",
        pat,
        responses
    );
}

/// Assert that no untagged response matches `pat`.
pub fn lacks_untagged_like(responses: &[String], pat: &str) {
    let re = Regex::new(pat).unwrap();
    assert!(
        !untagged(responses).iter().any(|r| re.is_match(r)),
        "Unexpected response matching {:?}; got {:?}",
        pat,
        responses
    );
}

/// The UIDs of the selected mailbox, in order.
pub fn selected_uids(client: &mut PipeClient) -> Vec<u64> {
    let responses = ok_command!(client, "UID SEARCH ALL");
    responses
        .iter()
        .find(|r| r.starts_with("* SEARCH"))
        .unwrap()
        .split_whitespace()
        .skip(2)
        .map(|uid| uid.parse::<u64>().unwrap())
        .collect()
}
