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

/// Determine whether the given name is usable as one segment of a mailbox
/// name.
///
/// Each segment becomes a directory name under the store root, so this
/// excludes empty names and anything that would cause directory traversal or
/// hidden files. The hierarchy delimiter cannot appear inside a segment, and
/// IMAP wildcards are forbidden everywhere.
///
/// This does not care about whether the name is ultimately a valid file name;
/// for that, we simply rely on the OS rejecting it.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() &&
        // The hierarchy delimiter; also blocks `..` and hidden files
        name.find('.').is_none() &&
        name.find('/').is_none() &&
        // Only a path separator on Windows, but always block since it has high
        // potential of causing problems
        name.find('\\').is_none() &&
        // Names beginning with # are namespaces
        name.chars().next() != Some('#') &&
        // Don't allow any ASCII control characters
        name.find(|c| c < ' ' || c == '\x7F').is_none() &&
        name.find(|c| c == '*' || c == '%').is_none()
}

/// Turn an arbitrary login into a safe, lower-case name segment.
///
/// Bytes outside `[a-z0-9@_+-]` are written as `=XX`, so distinct logins
/// always map to distinct segments.
pub fn login_segment(login: &str) -> String {
    let mut out = String::with_capacity(login.len());
    for &b in login.trim().to_lowercase().as_bytes() {
        match b {
            b'a'..=b'z' | b'0'..=b'9' | b'@' | b'_' | b'+' | b'-' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("={:02X}", b)),
        }
    }
    out
}
