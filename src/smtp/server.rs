//! SMTP transport: drives one session over a line-oriented channel

use crate::smtp::commands::{LineOutcome, SmtpCommandHandler};
use crate::smtp::error::SmtpError;
use crate::smtp::message::MessageRecord;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;
use crate::smtp::transcript::Transcript;

use log::{debug, error, info, warn};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;

/// Greeting text used when none is configured
pub const DEFAULT_SERVER_HELLO: &str = "hookmail ESMTP Mail Server Ready";

/// Runs SMTP sessions, one at a time
#[derive(Debug, Clone)]
pub struct SmtpServer {
    /// Text following the 220 code in the greeting
    server_hello: String,
    /// Where to record the conversation, if anywhere
    transcript: Option<Transcript>,
}

impl SmtpServer {
    /// Create a new SMTP server
    pub fn new(server_hello: &str) -> Self {
        Self {
            server_hello: server_hello.to_owned(),
            transcript: None,
        }
    }

    /// Record every session's conversation in `transcript`
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Run one session over the process's stdin and stdout, as under inetd.
    ///
    /// Returns the record once the client quits or closes the stream.
    pub fn serve_stdio(&self, peer_address: &str) -> Result<MessageRecord, SmtpError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), stdout.lock(), peer_address, |_| {})
    }

    /// Run one session over `reader` and `writer`.
    ///
    /// `on_queued` is called with the record each time a DATA block is finalized. The session
    /// ends on QUIT or end of input, after which the goodbye is written and the record returned.
    pub fn serve<R, W, F>(
        &self,
        mut reader: R,
        mut writer: W,
        peer_address: &str,
        mut on_queued: F,
    ) -> Result<MessageRecord, SmtpError>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&MessageRecord),
    {
        info!("Session opened by {peer_address}");

        let handler = SmtpCommandHandler::new(&self.server_hello);
        let mut session = SmtpSession::new(peer_address);

        let greeting = handler.greeting(&mut session);
        self.send_response(&mut writer, &greeting)?;

        let mut line_buffer = Vec::new();
        loop {
            line_buffer.clear();
            if reader.read_until(b'\n', &mut line_buffer)? == 0 {
                debug!("Client {peer_address} closed the stream");
                break;
            }

            // Invalid UTF-8 is replaced rather than rejected
            let line = String::from_utf8_lossy(&line_buffer);

            if !session.in_data_mode() {
                debug!("<- {}", line.trim_end());
                self.log_transcript(|t| t.received(&line));
            }

            match handler.process_line(&line, &mut session) {
                LineOutcome::Reply(response) => self.send_response(&mut writer, &response)?,
                LineOutcome::Queued(response) => {
                    self.send_response(&mut writer, &response)?;
                    info!(
                        "Queued message from <{}> to {} recipient(s) as {}",
                        session.record.sender,
                        session.record.recipients.len(),
                        response.message.rsplit(' ').next().unwrap_or_default()
                    );
                    on_queued(&session.record);
                }
                LineOutcome::Collected => {}
                LineOutcome::Quit => break,
            }
        }

        let bye = handler.goodbye(&mut session);
        self.send_response(&mut writer, &bye)?;

        info!("Session with {peer_address} closed");
        Ok(session.into_record())
    }

    /// Start the server on the specified address (blocking).
    ///
    /// Connections are served strictly one after another. Every finalized message is sent to
    /// the provided channel.
    pub fn start(
        &self,
        addr: &str,
        record_sender: mpsc::Sender<MessageRecord>,
    ) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener, record_sender)
    }

    /// Start the server with an existing listener (blocking)
    pub fn start_with_listener(
        &self,
        listener: TcpListener,
        record_sender: mpsc::Sender<MessageRecord>,
    ) -> Result<(), SmtpError> {
        info!("SMTP server listening on {}", listener.local_addr()?);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.handle_client(stream, &record_sender) {
                        error!("Error handling client: {e}");
                    }
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }

    /// Handle a client connection
    fn handle_client(
        &self,
        stream: TcpStream,
        record_sender: &mpsc::Sender<MessageRecord>,
    ) -> Result<(), SmtpError> {
        let peer_address = stream.peer_addr()?.ip().to_string();
        let reader = BufReader::new(stream.try_clone()?);

        self.serve(reader, &stream, &peer_address, |record| {
            // Errors when there are no listeners.
            // We ignore these errors for now.
            let _ = record_sender.send(record.clone());
        })?;

        Ok(())
    }

    /// Send a reply to the client
    fn send_response<W: Write>(
        &self,
        writer: &mut W,
        response: &SmtpResponse,
    ) -> Result<(), SmtpError> {
        debug!("-> {}", response.text());
        self.log_transcript(|t| t.replied(&response.text()));

        writer.write_all(response.format().as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn log_transcript(&self, write: impl FnOnce(&Transcript) -> io::Result<()>) {
        if let Some(transcript) = &self.transcript {
            if let Err(e) = write(transcript) {
                warn!(
                    "Could not write transcript {}: {e}",
                    transcript.path().display()
                );
            }
        }
    }
}

/// Address of the peer connected on stdin, when stdin is a TCP socket
#[cfg(unix)]
pub fn stdin_peer_address() -> Option<String> {
    socket_peer_address(io::stdin())
}

/// IP address of the remote end of `fd`, or `None` unless it is a connected inet socket
#[cfg(unix)]
fn socket_peer_address(fd: impl std::os::fd::AsFd) -> Option<String> {
    let addr = rustix::net::getpeername(fd).ok()??;
    std::net::SocketAddr::try_from(addr)
        .ok()
        .map(|addr| addr.ip().to_string())
}

/// Address of the peer connected on stdin, when stdin is a TCP socket
#[cfg(not(unix))]
pub fn stdin_peer_address() -> Option<String> {
    None
}
