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
fn new_messages_reported_to_other_sessions() {
    let setup = set_up();
    let mut client = setup.connect("msnmrp");
    quick_log_in(&mut client);
    quick_create(&mut client, "msnmrp");
    quick_select(&mut client, "msnmrp");

    let mut other = setup.connect("msnmrpo");
    quick_log_in(&mut other);
    quick_append(&mut other, "msnmrp", 2);

    command!(responses = client, "NOOP");
    has_untagged_like(&responses, r"^\* 2 EXISTS\r\n$");
    has_untagged_like(&responses, r"^\* 2 RECENT\r\n$");

    // Nothing new since
    command!(responses = client, "NOOP");
    assert_eq!(1, responses.len());

    // The first session claimed \Recent
    command!(responses = other, "EXAMINE msnmrp");
    has_untagged_like(&responses, r"^\* 0 RECENT\r\n$");
}

#[test]
fn flag_changes_reported_to_other_sessions() {
    let setup = set_up();
    let mut client = setup.connect("msflrp");
    quick_log_in(&mut client);
    quick_create(&mut client, "msflrp");
    quick_append(&mut client, "msflrp", 1);
    quick_select(&mut client, "msflrp");

    let mut other = setup.connect("msflrpo");
    quick_log_in(&mut other);
    quick_select(&mut other, "msflrp");
    // Silent only towards the session making the change
    ok_command!(other, "STORE 1 +FLAGS.SILENT (\\Flagged)");

    command!(responses = client, "NOOP");
    has_untagged_like(&responses, r"^\* 1 FETCH \(FLAGS \(.*\\Flagged.*\)\)\r\n$");

    command!(responses = client, "STORE 1 +FLAGS.SILENT (\\Seen)");
    assert_eq!(1, responses.len());
    command!(responses = other, "NOOP");
    has_untagged_like(&responses, r"^\* 1 FETCH \(FLAGS \(.*\\Seen.*\)\)\r\n$");
}

#[test]
fn expunges_deferred_around_sequence_commands() {
    let setup = set_up();
    let mut client = setup.connect("msexdf");
    quick_log_in(&mut client);
    quick_create(&mut client, "msexdf");
    quick_append(&mut client, "msexdf", 2);
    quick_select(&mut client, "msexdf");

    let mut other = setup.connect("msexdfo");
    quick_log_in(&mut other);
    quick_select(&mut other, "msexdf");
    ok_command!(other, "STORE 1 +FLAGS.SILENT (\\Deleted)");
    command!(responses = other, "EXPUNGE");
    assert_eq!(
        vec![
            "* 1 EXPUNGE\r\n".to_owned(),
            "msexdfo4 OK EXPUNGE completed.\r\n".to_owned(),
        ],
        responses
    );

    // The client still numbers the survivor 2
    command!(responses = client, "SEARCH ALL");
    has_untagged_like(&responses, r"^\* SEARCH 2\r\n$");
    lacks_untagged_like(&responses, "EXPUNGE");

    command!(responses = client, "FETCH 2 BODY.PEEK[HEADER.FIELDS (Subject)]");
    has_untagged_like(&responses, r"(?s)^\* 2 FETCH .*Subject: Message 2");
    lacks_untagged_like(&responses, "EXPUNGE");

    command!(responses = client, "NOOP");
    has_untagged_like(&responses, r"^\* 1 EXPUNGE\r\n$");

    command!(responses = client, "SEARCH ALL");
    has_untagged_like(&responses, r"^\* SEARCH 1\r\n$");
}

#[test]
fn deleted_mailbox_closes_connection() {
    let setup = set_up();
    let mut client = setup.connect("msdlcc");
    quick_log_in(&mut client);
    quick_create(&mut client, "msdlcc");
    quick_select(&mut client, "msdlcc");

    let mut other = setup.connect("msdlcco");
    quick_log_in(&mut other);
    ok_command!(other, "DELETE msdlcc");

    command!(responses = client, "NOOP");
    assert_eq!(vec!["msdlcc4 OK NOOP completed.\r\n".to_owned()], responses);
    receive_line_like(
        &mut client,
        r"^\* BYE Mailbox #mail\.azure\.msdlcc has been deleted\r\n$",
    );
    assert!(client.read_logical_line().is_err());
}

#[test]
fn exists_agrees_with_deferred_expunges() {
    let setup = set_up();
    let mut client = setup.connect("msexag");
    quick_log_in(&mut client);
    quick_create(&mut client, "msexag");
    quick_append(&mut client, "msexag", 2);
    quick_select(&mut client, "msexag");

    let mut other = setup.connect("msexago");
    quick_log_in(&mut other);
    quick_select(&mut other, "msexag");
    ok_command!(other, "STORE 1 +FLAGS.SILENT (\\Deleted)");
    ok_command!(other, "EXPUNGE");
    quick_append(&mut other, "msexag", 1);

    // Still 2 known plus 1 new, whatever the store holds
    command!(responses = client, "SEARCH ALL");
    has_untagged_like(&responses, r"^\* 3 EXISTS\r\n$");
    lacks_untagged_like(&responses, "EXPUNGE");

    command!(responses = client, "NOOP");
    assert_eq!("* 1 EXPUNGE\r\n", responses[0]);
    lacks_untagged_like(&responses, "EXISTS");
}
