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

use regex::Regex;

use super::defs::*;

#[test]
fn appenduid_and_copyuid() {
    let setup = set_up();
    let mut client = setup.connect("4315apcu");
    quick_log_in(&mut client);
    quick_create(&mut client, "4315apcu.src");
    quick_create(&mut client, "4315apcu.dst");

    let message = test_message("UIDPLUS");
    command!(
        responses = client,
        format!("APPEND 4315apcu.src {{{}+}}\r\n{}", message.len(), message)
    );
    let captures = Regex::new(
        r"^4315apcu4 OK \[APPENDUID ([0-9]+) ([0-9]+)\] APPEND completed\.\r\n$",
    )
    .unwrap()
    .captures(tagged(&responses))
    .unwrap();
    let appended: u64 = captures[2].parse().unwrap();

    quick_append(&mut client, "4315apcu.src", 2);
    quick_select(&mut client, "4315apcu.src");
    let uids = selected_uids(&mut client);
    assert_eq!(appended, uids[0]);

    command!(responses = client, "COPY 1:3 4315apcu.dst");
    let captures = Regex::new(
        r"^4315apcu9 OK \[COPYUID ([0-9]+) ([0-9:,]+) ([0-9:,]+)\] COPY completed\.\r\n$",
    )
    .unwrap()
    .captures(tagged(&responses))
    .unwrap();
    assert_eq!(compact(&uids), &captures[2]);

    ok_command!(client, "SELECT 4315apcu.dst");
    let copied = selected_uids(&mut client);
    assert_eq!(compact(&copied), &captures[3]);
}

/// Other tests allocate UIDs concurrently, so runs may be broken up.
fn compact(uids: &[u64]) -> String {
    let mut ranges: Vec<(u64, u64)> = Vec::new();
    for &uid in uids {
        match ranges.last_mut() {
            Some(last) if last.1 + 1 == uid => last.1 = uid,
            _ => ranges.push((uid, uid)),
        }
    }

    ranges
        .into_iter()
        .map(|(low, high)| {
            if low == high {
                low.to_string()
            } else {
                format!("{}:{}", low, high)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[test]
fn uid_expunge_limited_to_set() {
    let setup = set_up();
    let mut client = setup.connect("4315uiex");
    quick_log_in(&mut client);
    quick_create(&mut client, "4315uiex");
    quick_append(&mut client, "4315uiex", 3);
    quick_select(&mut client, "4315uiex");
    let uids = selected_uids(&mut client);

    ok_command!(client, "STORE 1:* +FLAGS.SILENT (\\Deleted)");
    command!(responses = client, format!("UID EXPUNGE {}", uids[1]));
    assert_eq!(
        vec![
            "* 2 EXPUNGE\r\n".to_owned(),
            "4315uiex9 OK EXPUNGE completed.\r\n".to_owned(),
        ],
        responses
    );

    assert_eq!(vec![uids[0], uids[2]], selected_uids(&mut client));
}
