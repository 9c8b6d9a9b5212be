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
fn append_messages() {
    let setup = set_up();
    let mut client = setup.connect("3501meap");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501meap");

    let message = test_message("Flagged");
    command!(
        responses = client,
        format!(
            "APPEND 3501meap (\\Flagged \\Seen) \"03-Jul-2020 12:34:56 +0000\" {{{}+}}\r\n{}",
            message.len(),
            message
        )
    );
    assert_tagged_ok(&responses);

    command!(responses = client, "APPEND 3501meap.nonexistent {1+}\r\nx");
    assert_eq!(
        "3501meap4 NO [TRYCREATE] APPEND failed. No such mailbox\r\n",
        tagged(&responses)
    );

    command!(responses = client, "APPEND 3501meap (\\Seen)");
    assert_tagged_bad(&responses);

    quick_select(&mut client, "3501meap");
    command!(responses = client, "FETCH 1 (FLAGS INTERNALDATE)");
    has_untagged_like(
        &responses,
        r#"^\* 1 FETCH \(FLAGS \(\\Flagged \\Seen\) INTERNALDATE "03-Jul-2020 12:34:56 \+0000"\)\r\n$"#,
    );
}

#[test]
fn expunge_reports_descending() {
    let setup = set_up();
    let mut client = setup.connect("3501meex");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501meex");
    quick_append(&mut client, "3501meex", 4);
    quick_select(&mut client, "3501meex");

    ok_command!(client, "STORE 1,3 +FLAGS.SILENT (\\Deleted)");
    command!(responses = client, "EXPUNGE");
    assert_eq!(
        vec![
            "* 3 EXPUNGE\r\n".to_owned(),
            "* 1 EXPUNGE\r\n".to_owned(),
            "3501meex9 OK EXPUNGE completed.\r\n".to_owned(),
        ],
        responses
    );

    command!(responses = client, "FETCH 1:* BODY.PEEK[HEADER.FIELDS (Subject)]");
    has_untagged_like(&responses, r"(?s)^\* 1 FETCH .*Subject: Message 2\r\n");
    has_untagged_like(&responses, r"(?s)^\* 2 FETCH .*Subject: Message 4\r\n");
}

#[test]
fn close_expunges_silently() {
    let setup = set_up();
    let mut client = setup.connect("3501mecl");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501mecl");
    quick_append(&mut client, "3501mecl", 2);
    quick_select(&mut client, "3501mecl");

    ok_command!(client, "STORE 2 +FLAGS.SILENT (\\Deleted)");
    command!(responses = client, "CLOSE");
    assert_eq!(1, responses.len());
    assert_tagged_ok(&responses);

    command!(responses = client, "STATUS 3501mecl (MESSAGES)");
    has_untagged_like(&responses, r"\(MESSAGES 1\)");

    // Closing a read-only view expunges nothing
    ok_command!(client, "SELECT 3501mecl");
    ok_command!(client, "STORE 1 +FLAGS.SILENT (\\Deleted)");
    ok_command!(client, "EXAMINE 3501mecl");
    ok_command!(client, "CLOSE");
    command!(responses = client, "STATUS 3501mecl (MESSAGES)");
    has_untagged_like(&responses, r"\(MESSAGES 1\)");
}

#[test]
fn copy_messages() {
    let setup = set_up();
    let mut client = setup.connect("3501meco");
    quick_log_in(&mut client);
    quick_create(&mut client, "3501meco.src");
    quick_create(&mut client, "3501meco.dst");
    quick_append(&mut client, "3501meco.src", 3);
    quick_select(&mut client, "3501meco.src");

    ok_command!(client, "STORE 2 +FLAGS (\\Answered)");
    ok_command!(client, "COPY 2:3 3501meco.dst");

    command!(responses = client, "COPY 1 3501meco.nonexistent");
    assert_eq!(
        "3501meco10 NO [TRYCREATE] COPY failed. No such mailbox\r\n",
        tagged(&responses)
    );

    // The source is untouched
    command!(responses = client, "STATUS 3501meco.src (MESSAGES)");
    has_untagged_like(&responses, r"\(MESSAGES 3\)");

    ok_command!(client, "SELECT 3501meco.dst");
    command!(responses = client, "FETCH 1:* (FLAGS BODY.PEEK[HEADER.FIELDS (Subject)])");
    has_untagged_like(
        &responses,
        r"^\* 1 FETCH \(FLAGS \(\\Answered\) BODY\[HEADER\.FIELDS \(Subject\)\] \{[0-9]+\}\r\nSubject: Message 2\r\n",
    );
    has_untagged_like(&responses, r"(?s)^\* 2 FETCH .*Subject: Message 3\r\n");
}
