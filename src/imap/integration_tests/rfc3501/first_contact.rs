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

use super::super::defs::*;

#[test]
fn greeting_goodbye() {
    let setup = set_up();
    let mut client = setup.connect("3501fcgg");

    receive_line_like(
        &mut client,
        r"^\* OK Mailsandbox test server ready\r\n$",
    );

    client.write_raw(b"1 LOGOUT\r\n").unwrap();
    receive_line_like(&mut client, r"^\* BYE IMAP4rev1 Server logging out\r\n$");
    receive_line_like(&mut client, r"^1 OK LOGOUT completed\.\r\n$");
}

#[test]
fn request_capabilities() {
    let setup = set_up();
    let mut client = setup.connect("3501fcrc");
    skip_greeting(&mut client);

    command!(responses = client, "CAPABILITY");
    assert_eq!(2, responses.len());
    assert!(responses[0].starts_with("* CAPABILITY IMAP4rev1 "));
    assert!(responses[0].contains(" LITERAL+"));
    assert!(responses[0].contains(" AUTH=PLAIN"));
    assert_eq!("3501fcrc1 OK CAPABILITY completed.\r\n", responses[1]);
}

#[test]
fn noop_in_every_state() {
    let setup = set_up();
    let mut client = setup.connect("3501fcno");
    skip_greeting(&mut client);

    ok_command!(client, "NOOP");
    ok_command!(client, "LOGIN azure hunter2");
    ok_command!(client, "NOOP");
    ok_command!(client, "SELECT INBOX");
    ok_command!(client, "noop");
}

#[test]
fn disconnect_without_logout() {
    let setup = set_up();
    let mut client = setup.connect("3501fcdc");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");
    drop(client);

    // The server must have let go of the session on EOF
    let mut client = setup.connect("3501fcdc");
    quick_log_in(&mut client);
    ok_command!(client, "EXAMINE INBOX");
}
