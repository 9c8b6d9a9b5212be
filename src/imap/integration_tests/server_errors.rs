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

use std::fs;

use super::defs::*;

#[test]
fn store_failure_ends_connection_with_bye() {
    let setup = set_up_open();
    let mut client = setup.connect("sestfl");
    quick_log_in(&mut client);
    quick_create(&mut client, "sestfl");
    quick_select(&mut client, "sestfl");

    let folder = setup.host().folder("azure", "sestfl").unwrap().unwrap();
    fs::remove_dir_all(folder.dir()).unwrap();

    let message = test_message("Nowhere to go");
    client
        .write_raw(
            format!(
                "sestfl4 APPEND sestfl {{{}+}}\r\n{}\r\n",
                message.len(),
                message
            )
            .as_bytes(),
        )
        .unwrap();
    receive_line_like(&mut client, r"^\* BYE Internal server error\r\n$");
    assert!(client.read_logical_line().is_err());
}

#[test]
fn oversized_literal_ends_connection_with_bye() {
    let setup = set_up();
    let mut client = setup.connect("seolit");
    quick_log_in(&mut client);

    client
        .write_raw(b"seolit2 APPEND INBOX {18446744073709551615+}\r\nabc")
        .unwrap();
    receive_line_like(&mut client, r"^\* BYE Literal too large\r\n$");
    assert!(client.read_logical_line().is_err());
}

#[test]
fn synchronising_oversized_literal_gets_no_continuation() {
    let setup = set_up();
    let mut client = setup.connect("seolsy");
    quick_log_in(&mut client);

    client
        .write_raw(b"seolsy2 APPEND INBOX {104857600}\r\n")
        .unwrap();
    receive_line_like(&mut client, r"^\* BYE Literal too large\r\n$");
    assert!(client.read_logical_line().is_err());
}
