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
fn unknown_and_malformed_commands() {
    let setup = set_up();
    let mut client = setup.connect("3501bcum");
    skip_greeting(&mut client);

    command!(responses = client, "XYZZY");
    assert_eq!("3501bcum1 BAD Invalid command.\r\n", tagged(&responses));

    client.write_raw(b"{bad} NOOP\r\n").unwrap();
    receive_line_like(
        &mut client,
        r"^\* BAD Protocol Error: Was expecting <tag SPACE command \[arguments\]>\r\n$",
    );

    command!(responses = client, "LOGIN azure");
    assert_eq!(
        "3501bcum2 BAD Missing argument. Command should be \
         '<tag> LOGIN <username> <password>'\r\n",
        tagged(&responses)
    );

    // The connection is still usable after all that
    ok_command!(client, "LOGIN azure hunter2");
}

#[test]
fn bad_arguments_in_selected_state() {
    let setup = set_up();
    let mut client = setup.connect("3501bcsa");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    command!(responses = client, "UID FROB 1");
    assert_tagged_bad(&responses);
    assert!(tagged(&responses).contains("Invalid UID command: 'FROB'"));

    command!(responses = client, "UID CREATE foo");
    assert_tagged_bad(&responses);

    command!(responses = client, "FETCH x FLAGS");
    assert_tagged_bad(&responses);

    command!(responses = client, "FETCH 1 ENVELOPE");
    assert_tagged_bad(&responses);

    command!(responses = client, "STORE 1 FLAGS.LOUD (\\Seen)");
    assert_tagged_bad(&responses);
    assert!(tagged(&responses).contains("Invalid Store Directive"));

    command!(responses = client, "SEARCH FROBNICATE");
    assert_tagged_bad(&responses);

    ok_command!(client, "NOOP");
}
