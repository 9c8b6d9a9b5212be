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

use log::info;

use super::defs::*;
use crate::support::error::{AuthorizationError, Error, ProtocolError};

pub(super) fn cmd_login(req: &mut Request<'_>) -> CmdResult {
    let login = p::astring(req.lexer)?;
    let password = p::astring(req.lexer)?;
    req.lexer.eol()?;

    log_in(req, &login, &password)
}

/// `AUTHENTICATE PLAIN [initial-response]`
///
/// Without an initial response, the client is sent an empty continuation
/// and answers with the response on a line of its own. `*` cancels.
pub(super) fn cmd_authenticate(req: &mut Request<'_>) -> CmdResult {
    let mechanism = p::atom(req.lexer)?;
    let initial = if req.lexer.at_eol()? {
        None
    } else {
        Some(p::atom(req.lexer)?)
    };
    req.lexer.eol()?;

    if !mechanism.eq_ignore_ascii_case("PLAIN") {
        return req.fail(None, "Unsupported authentication mechanism");
    }

    let encoded = match initial {
        Some(initial) => initial,
        None => {
            req.lexer.consume_line()?;
            req.line_consumed = true;
            req.response.continuation()?;
            req.lexer.read_line()?
        }
    };

    if "*" == encoded.trim() {
        req.response.command_error("Authentication cancelled")?;
        return Ok(());
    }

    let (login, password) = decode_plain(encoded.trim())?;
    log_in(req, &login, &password)
}

fn log_in(req: &mut Request<'_>, login: &str, password: &str) -> CmdResult {
    let user = match req.session.host().authenticate(login, password) {
        Ok(user) => user,
        Err(Error::Authorization(AuthorizationError::BadCredentials)) => {
            info!("{} Rejected login for {}", req.session.log_prefix(), login);
            return Err(AuthorizationError::BadCredentials.into());
        }
        Err(e) => return Err(e),
    };

    req.session.set_authenticated(user);
    req.complete()
}

/// Decode a SASL PLAIN response, `[authzid] NUL authcid NUL passwd`, into
/// the login and password. `=` stands for an empty response.
fn decode_plain(encoded: &str) -> Result<(String, String), Error> {
    let bad = || Error::from(ProtocolError::syntax("Invalid PLAIN response."));

    let decoded = if "=" == encoded {
        Vec::new()
    } else {
        base64::decode(encoded).map_err(|_| bad())?
    };
    let parts = decoded.split(|&b| 0 == b).collect::<Vec<_>>();
    if 3 != parts.len() {
        return Err(bad());
    }

    let login = String::from_utf8(parts[1].to_vec()).map_err(|_| bad())?;
    let password = String::from_utf8(parts[2].to_vec()).map_err(|_| bad())?;
    Ok((login, password))
}
