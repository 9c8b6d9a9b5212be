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

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use tempfile::TempDir;

use crate::account::host::MailHost;
use crate::imap::server::ImapServer;
use crate::support::system_config::{AccountConfig, SystemConfig};

struct TcpClient {
    read: BufReader<TcpStream>,
    write: TcpStream,
}

impl TcpClient {
    fn connect(server: &ImapServer) -> Self {
        let stream = TcpStream::connect(server.local_addr()).unwrap();
        TcpClient {
            read: BufReader::new(stream.try_clone().unwrap()),
            write: stream,
        }
    }

    fn send(&mut self, line: &str) {
        self.write.write_all(line.as_bytes()).unwrap();
        self.write.write_all(b"\r\n").unwrap();
    }

    fn line(&mut self) -> String {
        let mut line = String::new();
        self.read.read_line(&mut line).unwrap();
        line
    }
}

fn config(root: &TempDir) -> SystemConfig {
    let mut config = SystemConfig::default();
    config.imap.port = 0;
    config.imap.greeting = "Embedded server ready".to_owned();
    config.store.root = root.path().to_owned();
    config.users.account.push(AccountConfig {
        login: "azure".to_owned(),
        password: "hunter2".to_owned(),
        email: None,
    });
    config
}

#[test]
fn serve_over_tcp() {
    crate::init_test_log();
    let root = TempDir::new().unwrap();
    let config = config(&root);
    let host = MailHost::open(&config).unwrap();
    let server = ImapServer::start(&config, host).unwrap();
    assert_ne!(0, server.local_addr().port());
    assert_eq!(
        "azure",
        server.host().users().get("azure").unwrap().email
    );

    let mut client = TcpClient::connect(&server);
    assert_eq!("* OK Embedded server ready\r\n", client.line());

    client.send("a1 LOGIN azure hunter2");
    assert_eq!("a1 OK LOGIN completed.\r\n", client.line());
    client.send("a2 SELECT INBOX");
    let mut line = client.line();
    while !line.starts_with("a2 ") {
        line = client.line();
    }
    assert_eq!("a2 OK [READ-WRITE] SELECT completed.\r\n", line);

    client.send("a3 LOGOUT");
    assert_eq!("* BYE IMAP4rev1 Server logging out\r\n", client.line());
    assert_eq!("a3 OK LOGOUT completed.\r\n", client.line());
    assert_eq!("", client.line());

    server.stop().unwrap();
}

#[test]
fn stop_disconnects_clients() {
    crate::init_test_log();
    let root = TempDir::new().unwrap();
    let config = config(&root);
    let host = MailHost::open(&config).unwrap();
    let server = ImapServer::start(&config, host).unwrap();

    let mut client = TcpClient::connect(&server);
    assert_eq!("* OK Embedded server ready\r\n", client.line());
    client.send("a1 NOOP");
    assert_eq!("a1 OK NOOP completed.\r\n", client.line());

    server.stop().unwrap();
    assert_eq!("", client.line());
}

#[test]
fn accounts_persist_across_restarts() {
    crate::init_test_log();
    let root = TempDir::new().unwrap();
    let mut config = config(&root);

    let host = MailHost::open(&config).unwrap();
    host.create_user("pink", "pink@example.com", "plugh").unwrap();
    host.close().unwrap();
    drop(host);

    config.users.account.clear();
    let host = MailHost::open(&config).unwrap();
    assert!(host.authenticate("azure", "hunter2").is_ok());
    assert!(host.authenticate("pink", "plugh").is_ok());
    assert!(host.inbox("pink").is_ok());
}
