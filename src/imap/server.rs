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

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam::sync::WaitGroup;
use log::{error, info, warn};

use super::dispatcher::{handle_request, CommandRegistry};
use super::request_lexer::{RequestLexer, SharedWriter};
use super::response_writer::ImapResponse;
use super::session::{Session, SessionState};
use crate::account::host::MailHost;
use crate::support::error::{Error, ProtocolError};
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::SystemConfig;

/// Serves one IMAP connection.
pub struct Server {
    lexer: RequestLexer,
    response: ImapResponse,
    session: Session,
    registry: Arc<CommandRegistry>,
    greeting: String,
}

impl Server {
    pub fn new<R: BufRead + Send + 'static, W: Write + Send + 'static>(
        read: R,
        write: W,
        host: Arc<MailHost>,
        registry: Arc<CommandRegistry>,
        greeting: String,
        log_prefix: LogPrefix,
    ) -> Self {
        let write: SharedWriter = Arc::new(Mutex::new(Box::new(write)));
        Server {
            lexer: RequestLexer::new(Box::new(read), Arc::clone(&write)),
            response: ImapResponse::new(write),
            session: Session::new(host, log_prefix),
            registry,
            greeting,
        }
    }

    /// Run the server.
    ///
    /// Blocks until the client logs out or disconnects, the connection has
    /// to be closed, or a fatal error occurs.
    pub fn run(&mut self) -> Result<(), Error> {
        self.response.ok_response(None, &self.greeting)?;

        loop {
            let more = match handle_request(
                &mut self.lexer,
                &mut self.response,
                &mut self.session,
                &self.registry,
            ) {
                Ok(more) => more,
                Err(e @ Error::Protocol(ProtocolError::LiteralTooLarge(_))) => {
                    warn!("{} {}", self.session.log_prefix(), e);
                    self.response.bye_response("Literal too large")?;
                    return Err(e);
                }
                // The client is gone; nobody to say BYE to
                Err(e @ Error::Protocol(_)) => return Err(e),
                Err(e) => {
                    error!(
                        "{} Aborting connection: {}",
                        self.session.log_prefix(),
                        e
                    );
                    self.response.bye_response("Internal server error")?;
                    return Err(e);
                }
            };

            if let Some(reason) = self.session.take_close_reason() {
                info!("{} Closing connection: {}", self.session.log_prefix(), reason);
                self.response.bye_response(&reason)?;
                return Ok(());
            }

            if !more || SessionState::Logout == self.session.state() {
                return Ok(());
            }
        }
    }
}

/// A running IMAP listener with one thread per connection.
pub struct ImapServer {
    local_addr: SocketAddr,
    host: Arc<MailHost>,
    running: Arc<AtomicBool>,
    connections: Arc<Mutex<HashMap<u64, TcpStream>>>,
    accept_thread: Option<JoinHandle<()>>,
    wait_group: WaitGroup,
}

impl ImapServer {
    /// Bind the configured address and start accepting connections.
    pub fn start(
        config: &SystemConfig,
        host: Arc<MailHost>,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind((&config.imap.host[..], config.imap.port))?;
        let local_addr = listener.local_addr()?;
        info!("IMAP server listening on {}", local_addr);

        let running = Arc::new(AtomicBool::new(true));
        let connections = Arc::new(Mutex::new(HashMap::new()));
        let wait_group = WaitGroup::new();

        let acceptor = Acceptor {
            listener,
            host: Arc::clone(&host),
            registry: Arc::new(CommandRegistry::standard()),
            greeting: config.imap.greeting.clone(),
            running: Arc::clone(&running),
            connections: Arc::clone(&connections),
            wait_group: wait_group.clone(),
            next_id: AtomicU64::new(0),
        };
        let accept_thread = thread::Builder::new()
            .name("imap-accept".to_owned())
            .spawn(move || acceptor.run())?;

        Ok(ImapServer {
            local_addr,
            host,
            running,
            connections,
            accept_thread: Some(accept_thread),
            wait_group,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn host(&self) -> &Arc<MailHost> {
        &self.host
    }

    /// Stop accepting, disconnect every client, wait for the connection
    /// threads to finish, and close the store.
    pub fn stop(mut self) -> Result<(), Error> {
        self.running.store(false, Ordering::SeqCst);

        // Wake the accept thread up so it notices
        let _ = TcpStream::connect(self.local_addr);
        if let Some(accept_thread) = self.accept_thread.take() {
            if accept_thread.join().is_err() {
                warn!("IMAP accept thread panicked");
            }
        }

        for (_, stream) in self.connections.lock().unwrap().drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.wait_group.wait();

        info!("IMAP server on {} stopped", self.local_addr);
        self.host.close()
    }
}

struct Acceptor {
    listener: TcpListener,
    host: Arc<MailHost>,
    registry: Arc<CommandRegistry>,
    greeting: String,
    running: Arc<AtomicBool>,
    connections: Arc<Mutex<HashMap<u64, TcpStream>>>,
    wait_group: WaitGroup,
    next_id: AtomicU64,
}

impl Acceptor {
    fn run(self) {
        for stream in self.listener.incoming() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => {
                    if let Err(e) = self.spawn_connection(stream) {
                        warn!("Failed to start IMAP connection: {}", e);
                    }
                }
                Err(e) => warn!("Failed to accept IMAP connection: {}", e),
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream) -> io::Result<()> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_owned());
        let log_prefix = LogPrefix::new(format!("imap:{}", peer));
        info!("{} Connection established", log_prefix);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.connections
            .lock()
            .unwrap()
            .insert(id, stream.try_clone()?);

        let mut server = Server::new(
            BufReader::new(stream.try_clone()?),
            BufWriter::new(stream),
            Arc::clone(&self.host),
            Arc::clone(&self.registry),
            self.greeting.clone(),
            log_prefix.clone(),
        );
        let connections = Arc::clone(&self.connections);
        let wait_group = self.wait_group.clone();

        thread::Builder::new()
            .name(format!("imap-{}", id))
            .spawn(move || {
                match server.run() {
                    Ok(()) => info!("{} Normal client disconnect", log_prefix),
                    Err(e) => {
                        warn!("{} Abnormal client disconnect: {}", log_prefix, e)
                    }
                }

                if let Some(stream) = connections.lock().unwrap().remove(&id) {
                    let _ = stream.shutdown(Shutdown::Both);
                }
                drop(server);
                drop(wait_group);
            })?;
        Ok(())
    }
}
