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
fn store_modes() {
    let setup = set_up();
    let mut client = setup.connect("3501flsm");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501flsm");
    quick_append(&mut client, "3501flsm", 2);
    quick_select(&mut client, "3501flsm");

    command!(responses = client, "STORE 1 +FLAGS (\\Flagged \\Seen)");
    assert_eq!(
        vec![
            "* 1 FETCH (FLAGS (\\Flagged \\Seen))\r\n".to_owned(),
            "3501flsm6 OK STORE completed.\r\n".to_owned(),
        ],
        responses
    );

    command!(responses = client, "STORE 1 -FLAGS (\\Seen)");
    assert_eq!("* 1 FETCH (FLAGS (\\Flagged))\r\n", responses[0]);

    command!(responses = client, "STORE 1:2 FLAGS (\\Answered \\Draft)");
    assert_eq!(3, responses.len());
    has_untagged_like(&responses, r"^\* 1 FETCH \(FLAGS \(\\Answered \\Draft\)\)\r\n$");
    has_untagged_like(&responses, r"^\* 2 FETCH \(FLAGS \(\\Answered \\Draft\)\)\r\n$");

    command!(responses = client, "STORE 2 -FLAGS.SILENT (\\Draft)");
    assert_eq!(1, responses.len());
    command!(responses = client, "FETCH 2 FLAGS");
    assert_eq!("* 2 FETCH (FLAGS (\\Answered))\r\n", responses[0]);

    // \Recent cannot be set by clients; keywords are dropped
    command!(responses = client, "STORE 2 +FLAGS ($Junk \\Recent)");
    assert_eq!("* 2 FETCH (FLAGS (\\Answered))\r\n", responses[0]);
}

#[test]
fn uid_store_reports_uid() {
    let setup = set_up();
    let mut client = setup.connect("3501flus");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501flus");
    quick_append(&mut client, "3501flus", 2);
    quick_select(&mut client, "3501flus");
    let uids = selected_uids(&mut client);

    command!(responses = client, format!("UID STORE {} +FLAGS (\\Deleted)", uids[1]));
    assert_eq!(
        format!("* 2 FETCH (FLAGS (\\Deleted) UID {})\r\n", uids[1]),
        responses[0]
    );
}

#[test]
fn unknown_backslash_flags_treated_as_keywords() {
    let setup = set_up();
    let mut client = setup.connect("3501flbk");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501flbk");
    quick_append(&mut client, "3501flbk", 1);
    quick_select(&mut client, "3501flbk");

    command!(responses = client, "STORE 1 +FLAGS (\\Seen \\Bogus)");
    assert_eq!(
        vec![
            "* 1 FETCH (FLAGS (\\Seen))\r\n".to_owned(),
            "3501flbk5 OK STORE completed.\r\n".to_owned(),
        ],
        responses
    );

    let message = test_message("Odd flags");
    ok_command!(
        client,
        format!(
            "APPEND 3501flbk (\\Flagged \\Whatever) {{{}+}}\r\n{}",
            message.len(),
            message
        )
    );
}
