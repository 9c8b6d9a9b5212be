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
fn select_and_examine() {
    let setup = set_up();
    let mut client = setup.connect("3501sese");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501sese");
    quick_append(&mut client, "3501sese", 3);

    command!(responses = client, "EXAMINE 3501sese");
    assert_eq!(
        "3501sese6 OK [READ-ONLY] EXAMINE completed.\r\n",
        tagged(&responses)
    );
    has_untagged_like(&responses, r"^\* FLAGS \(\\Answered \\Deleted \\Draft \\Flagged \\Seen\)");
    has_untagged_like(&responses, r"^\* 3 EXISTS\r\n$");
    has_untagged_like(&responses, r"^\* 3 RECENT\r\n$");
    has_untagged_like(&responses, r"^\* OK \[UIDVALIDITY [0-9]+\]");
    has_untagged_like(&responses, r"^\* OK \[UIDNEXT [0-9]+\]");
    has_untagged_like(
        &responses,
        r"^\* OK \[UNSEEN 1\] Message 1 is first unseen\r\n$",
    );
    has_untagged_like(&responses, r"^\* OK \[PERMANENTFLAGS \(");

    // EXAMINE leaves \Recent alone
    command!(responses = client, "SELECT 3501sese");
    assert_eq!(
        "3501sese7 OK [READ-WRITE] SELECT completed.\r\n",
        tagged(&responses)
    );
    has_untagged_like(&responses, r"^\* 3 RECENT\r\n$");

    // But SELECT does not
    command!(responses = client, "SELECT 3501sese");
    has_untagged_like(&responses, r"^\* 0 RECENT\r\n$");
}

#[test]
fn select_failures() {
    let setup = set_up();
    let mut client = setup.connect("3501sesf");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501sesf.child");

    command!(responses = client, "SELECT 3501sesf.nonexistent");
    assert_eq!(
        "3501sesf3 NO SELECT failed. No such mailbox\r\n",
        tagged(&responses)
    );

    // Intermediate levels are not selectable
    command!(responses = client, "SELECT 3501sesf");
    assert_tagged_no(&responses);

    // A failed SELECT leaves nothing selected
    quick_select(&mut client, "3501sesf.child");
    command!(responses = client, "SELECT 3501sesf");
    assert_tagged_no(&responses);
    command!(responses = client, "FETCH 1 FLAGS");
    assert_tagged_no(&responses);
}

#[test]
fn examine_is_read_only() {
    let setup = set_up();
    let mut client = setup.connect("3501seer");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501seer");
    quick_append(&mut client, "3501seer", 1);
    ok_command!(client, "EXAMINE 3501seer");

    command!(responses = client, "STORE 1 +FLAGS (\\Deleted)");
    assert_eq!(
        "3501seer5 NO STORE failed. Mailbox selected read only.\r\n",
        tagged(&responses)
    );
    command!(responses = client, "EXPUNGE");
    assert_tagged_no(&responses);

    // Fetching the body does not set \Seen either
    command!(responses = client, "FETCH 1 (BODY[TEXT] FLAGS)");
    assert_tagged_ok(&responses);
    lacks_untagged_like(&responses, r"\\Seen");
}
