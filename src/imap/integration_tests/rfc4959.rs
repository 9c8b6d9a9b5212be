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

use super::defs::*;

#[test]
fn authenticate_plain_initial_response() {
    let setup = set_up();
    let mut client = setup.connect("4959apir");
    skip_greeting(&mut client);

    command!(
        responses = client,
        format!("AUTHENTICATE PLAIN {}", base64::encode(b"\0azure\0hunter2"))
    );
    assert_eq!(
        "4959apir1 OK AUTHENTICATE completed.\r\n",
        tagged(&responses)
    );
    ok_command!(client, "SELECT INBOX");
}

#[test]
fn authenticate_plain_continuation() {
    let setup = set_up();
    let mut client = setup.connect("4959apco");
    skip_greeting(&mut client);

    client.write_raw(b"A1 AUTHENTICATE PLAIN\r\n").unwrap();
    receive_line_like(&mut client, r"^\+ \r\n$");
    client
        .write_raw(format!("{}\r\n", base64::encode(b"\0azure\0plugh")).as_bytes())
        .unwrap();
    let responses = client.read_responses_until_tagged("A1");
    assert_tagged_no(&responses);

    client.write_raw(b"A2 AUTHENTICATE PLAIN\r\n").unwrap();
    receive_line_like(&mut client, r"^\+ \r\n$");
    client.write_raw(b"*\r\n").unwrap();
    let responses = client.read_responses_until_tagged("A2");
    assert_eq!(vec!["A2 BAD Authentication cancelled\r\n".to_owned()], responses);

    client.write_raw(b"A3 AUTHENTICATE PLAIN\r\n").unwrap();
    receive_line_like(&mut client, r"^\+ \r\n$");
    client
        .write_raw(format!("{}\r\n", base64::encode(b"\0azure\0hunter2")).as_bytes())
        .unwrap();
    let responses = client.read_responses_until_tagged("A3");
    assert_tagged_ok(&responses);

    // The exchange left the command stream in sync
    ok_command!(client, "NOOP");
}

#[test]
fn authenticate_unsupported() {
    let setup = set_up();
    let mut client = setup.connect("4959auun");
    skip_greeting(&mut client);

    command!(responses = client, "AUTHENTICATE CRAM-MD5");
    assert_tagged_no(&responses);
    command!(responses = client, "AUTHENTICATE PLAIN !!!");
    assert_tagged_bad(&responses);
}
