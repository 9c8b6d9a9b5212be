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
fn login_success_and_failure() {
    let setup = set_up();
    let mut client = setup.connect("3501aulo");
    skip_greeting(&mut client);

    command!(responses = client, "LOGIN azure plugh");
    assert_eq!(
        "3501aulo1 NO LOGIN failed. Invalid login/password\r\n",
        tagged(&responses)
    );

    command!(responses = client, "LOGIN nobody hunter2");
    assert_tagged_no(&responses);

    // Logins are case-insensitive, passwords are not
    command!(responses = client, "LOGIN azure HUNTER2");
    assert_tagged_no(&responses);
    command!(responses = client, "LOGIN \"AZURE\" \"hunter2\"");
    assert_eq!("3501aulo4 OK LOGIN completed.\r\n", tagged(&responses));
}

#[test]
fn commands_checked_against_state() {
    let setup = set_up();
    let mut client = setup.connect("3501aust");
    skip_greeting(&mut client);

    command!(responses = client, "SELECT INBOX");
    assert_eq!(
        "3501aust1 NO Command not valid in this state\r\n",
        tagged(&responses)
    );
    command!(responses = client, "FETCH 1 FLAGS");
    assert_tagged_no(&responses);

    ok_command!(client, "LOGIN azure hunter2");
    command!(responses = client, "LOGIN azure hunter2");
    assert_eq!(
        "3501aust4 NO Command not valid in this state\r\n",
        tagged(&responses)
    );
    command!(responses = client, "EXPUNGE");
    assert_tagged_no(&responses);

    quick_select(&mut client, "INBOX");
    ok_command!(client, "CHECK");
    ok_command!(client, "CLOSE");
    command!(responses = client, "CHECK");
    assert_tagged_no(&responses);
}

#[test]
fn open_store_creates_users() {
    let setup = set_up_open();
    let mut client = setup.connect("3501auop");
    skip_greeting(&mut client);

    ok_command!(client, "LOGIN stranger whatever");
    ok_command!(client, "SELECT INBOX");
    assert!(setup.host().users().get("stranger").is_some());
}
