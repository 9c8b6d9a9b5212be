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
fn search_keys() {
    let setup = set_up();
    let mut client = setup.connect("3501sesk");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501sesk");
    quick_append(&mut client, "3501sesk", 4);
    quick_select(&mut client, "3501sesk");

    ok_command!(client, "STORE 2,4 +FLAGS.SILENT (\\Flagged)");
    ok_command!(client, "STORE 4 +FLAGS.SILENT (\\Seen)");

    command!(responses = client, "SEARCH ALL");
    assert_eq!("* SEARCH 1 2 3 4\r\n", responses[0]);

    command!(responses = client, "SEARCH FLAGGED UNSEEN");
    assert_eq!("* SEARCH 2\r\n", responses[0]);

    command!(responses = client, "SEARCH OR SEEN SUBJECT \"message 1\"");
    assert_eq!("* SEARCH 1 4\r\n", responses[0]);

    command!(responses = client, "SEARCH NOT (FLAGGED) 2:*");
    assert_eq!("* SEARCH 3\r\n", responses[0]);

    command!(responses = client, "SEARCH BODY \"of message 3\" FROM azure");
    assert_eq!("* SEARCH 3\r\n", responses[0]);

    command!(responses = client, "SEARCH SENTON 3-Jul-2020 LARGER 1000000");
    assert_eq!("* SEARCH\r\n", responses[0]);

    command!(responses = client, "SEARCH CHARSET UTF-8 TO pink UNFLAGGED");
    assert_eq!("* SEARCH 1 3\r\n", responses[0]);

    command!(responses = client, "SEARCH CHARSET KOI8-R ALL");
    assert_eq!(
        "3501sesk17 NO [BADCHARSET] SEARCH failed. Unsupported charset\r\n",
        tagged(&responses)
    );
}

#[test]
fn uid_search() {
    let setup = set_up();
    let mut client = setup.connect("3501seus");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501seus");
    quick_append(&mut client, "3501seus", 3);
    quick_select(&mut client, "3501seus");
    let uids = selected_uids(&mut client);

    command!(responses = client, format!("UID SEARCH UID {}:*", uids[1]));
    assert_eq!(format!("* SEARCH {} {}\r\n", uids[1], uids[2]), responses[0]);

    command!(responses = client, format!("SEARCH UID {}", uids[0]));
    assert_eq!("* SEARCH 1\r\n", responses[0]);
}
