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
fn fetch_simple_attributes() {
    let setup = set_up();
    let mut client = setup.connect("3501fesa");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501fesa");
    quick_append(&mut client, "3501fesa", 2);
    quick_select(&mut client, "3501fesa");
    let uids = selected_uids(&mut client);

    command!(responses = client, "FETCH 1:* FAST");
    assert_eq!(3, responses.len());
    has_untagged_like(
        &responses,
        r#"^\* 1 FETCH \(FLAGS \(\) INTERNALDATE "[^"]+" RFC822\.SIZE [0-9]+\)\r\n$"#,
    );

    command!(responses = client, "FETCH 2 (UID FLAGS)");
    assert_eq!(
        format!("* 2 FETCH (FLAGS () UID {})\r\n", uids[1]),
        responses[0]
    );

    // UID FETCH always includes the UID; sets name UIDs
    command!(responses = client, format!("UID FETCH {} FLAGS", uids[1]));
    assert_eq!(
        vec![
            format!("* 2 FETCH (FLAGS () UID {})\r\n", uids[1]),
            "3501fesa9 OK FETCH completed.\r\n".to_owned(),
        ],
        responses
    );

    // `n:*` still names the last message when n is past the end
    command!(responses = client, format!("UID FETCH {}:* FLAGS", uids[1] + 1000));
    assert_eq!(2, responses.len());
    assert_eq!(
        format!("* 2 FETCH (FLAGS () UID {})\r\n", uids[1]),
        responses[0]
    );

    // Messages which don't exist are just skipped
    command!(
        responses = client,
        format!("UID FETCH {},{} FLAGS", uids[1] + 1, uids[1] + 5)
    );
    assert_eq!(1, responses.len());
    assert_tagged_ok(&responses);
}

#[test]
fn fetch_bodies_sets_seen() {
    let setup = set_up();
    let mut client = setup.connect("3501febo");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501febo");
    quick_append(&mut client, "3501febo", 2);
    quick_select(&mut client, "3501febo");

    command!(responses = client, "FETCH 1 BODY.PEEK[TEXT]");
    assert_eq!(
        "* 1 FETCH (BODY[TEXT] {19}\r\nBody of Message 1\r\n)\r\n",
        responses[0]
    );

    command!(responses = client, "FETCH 1 FLAGS");
    assert_eq!("* 1 FETCH (FLAGS ())\r\n", responses[0]);

    command!(responses = client, "FETCH 1 BODY[TEXT]<8.7>");
    assert_eq!(
        "* 1 FETCH (FLAGS (\\Seen) BODY[TEXT]<8> {7}\r\nMessage)\r\n",
        responses[0]
    );
    assert_eq!(2, responses.len());

    command!(responses = client, "FETCH 1 FLAGS");
    assert_eq!("* 1 FETCH (FLAGS (\\Seen))\r\n", responses[0]);

    command!(responses = client, "FETCH 2 RFC822.HEADER");
    has_untagged_like(&responses, r"(?s)^\* 2 FETCH \(RFC822\.HEADER \{[0-9]+\}\r\n.*Subject: Message 2\r\n\r\n\)");

    command!(responses = client, "FETCH 2 RFC822.TEXT");
    assert_eq!(
        "* 2 FETCH (FLAGS (\\Seen) RFC822.TEXT {19}\r\nBody of Message 2\r\n)\r\n",
        responses[0]
    );

    command!(responses = client, "FETCH 2 BODY.PEEK[HEADER.FIELDS.NOT (From To Date X-GreenMail-UID)]");
    assert_eq!(
        "* 2 FETCH (BODY[HEADER.FIELDS.NOT (From To Date X-GreenMail-UID)] {22}\r\n\
         Subject: Message 2\r\n\r\n)\r\n",
        responses[0]
    );
}
