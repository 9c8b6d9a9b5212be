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
fn move_messages() {
    let setup = set_up();
    let mut client = setup.connect("6851mvmv");
    quick_log_in(&mut client);
    quick_create(&mut client, "6851mvmv.src");
    quick_create(&mut client, "6851mvmv.dst");
    quick_append(&mut client, "6851mvmv.src", 3);
    quick_select(&mut client, "6851mvmv.src");

    command!(responses = client, "MOVE 1,3 6851mvmv.dst");
    assert_eq!(4, responses.len());
    assert!(responses[0].starts_with("* OK [COPYUID "));
    assert_eq!("* 3 EXPUNGE\r\n", responses[1]);
    assert_eq!("* 1 EXPUNGE\r\n", responses[2]);
    assert_eq!("6851mvmv8 OK MOVE completed.\r\n", responses[3]);

    command!(responses = client, "FETCH 1:* BODY.PEEK[HEADER.FIELDS (Subject)]");
    assert_eq!(2, responses.len());
    has_untagged_like(&responses, r"Subject: Message 2\r\n");

    command!(responses = client, "MOVE 1 6851mvmv.nonexistent");
    assert_tagged_no(&responses);

    ok_command!(client, "EXAMINE 6851mvmv.dst");
    command!(responses = client, "SEARCH ALL");
    assert_eq!("* SEARCH 1 2\r\n", responses[0]);

    command!(responses = client, "MOVE 1 6851mvmv.src");
    assert_tagged_no(&responses);
}
