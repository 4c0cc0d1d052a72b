//! Implementation of SMTP commands

use crate::smtp::error::SmtpError;
use crate::smtp::response::{QUEUE_ID_LENGTH, SmtpResponse, generate_queue_id};
use crate::smtp::session::SmtpSession;

use regex::Regex;
use std::sync::LazyLock;

static MAIL_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^MAIL FROM:\s?<(.*)>").expect("MAIL pattern is valid"));

static RCPT_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^RCPT TO:\s?<(.*)>").expect("RCPT pattern is valid"));

static VRFY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^VRFY (.*)").expect("VRFY pattern is valid"));

/// The end-of-data line, after CRLF has been normalized
const DATA_TERMINATOR: &str = ".\n";

/// A command line recognized in command mode
#[derive(Debug, Clone, PartialEq)]
pub enum SmtpCommand {
    Mail(String),
    Rcpt(String),
    Rset,
    Noop,
    Vrfy(String),
    Data,
    Helo,
    Quit,
    Unrecognized,
}

impl SmtpCommand {
    /// Recognize a command line.
    ///
    /// Verbs match case-insensitively and the first matching rule wins. MAIL, RCPT and
    /// HELO/EHLO are matched against the line as received, the others against the trimmed line.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();

        if let Some(captures) = MAIL_FROM.captures(line) {
            Self::Mail(captures[1].to_owned())
        } else if let Some(captures) = RCPT_TO.captures(line) {
            Self::Rcpt(captures[1].to_owned())
        } else if trimmed.eq_ignore_ascii_case("RSET") {
            Self::Rset
        } else if trimmed.eq_ignore_ascii_case("NOOP") {
            Self::Noop
        } else if let Some(captures) = VRFY.captures(trimmed) {
            Self::Vrfy(captures[1].to_owned())
        } else if starts_with_ignore_case(trimmed, "DATA") {
            Self::Data
        } else if starts_with_ignore_case(line, "HELO") || starts_with_ignore_case(line, "EHLO") {
            Self::Helo
        } else if starts_with_ignore_case(trimmed, "QUIT") {
            Self::Quit
        } else {
            Self::Unrecognized
        }
    }
}

fn starts_with_ignore_case(line: &str, prefix: &str) -> bool {
    line.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// What the transport should do after a line has been processed
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Send the reply and keep reading
    Reply(SmtpResponse),
    /// A DATA block was finalized; send the reply and keep reading
    Queued(SmtpResponse),
    /// The line was stored as message data, nothing to send
    Collected,
    /// QUIT received, stop reading
    Quit,
}

/// Handles SMTP lines and returns appropriate responses
#[derive(Debug)]
pub struct SmtpCommandHandler<'a> {
    server_hello: &'a str,
}

impl<'a> SmtpCommandHandler<'a> {
    /// Create a new command handler
    pub fn new(server_hello: &'a str) -> Self {
        Self { server_hello }
    }

    /// Produce the greeting and move the session into command mode
    pub fn greeting(&self, session: &mut SmtpSession) -> SmtpResponse {
        session.begin();
        SmtpResponse::greeting(self.server_hello)
    }

    /// Produce the goodbye and terminate the session
    pub fn goodbye(&self, session: &mut SmtpSession) -> SmtpResponse {
        session.terminate();
        SmtpResponse::bye(session.peer_address())
    }

    /// Process one input line in whatever mode the session is in.
    ///
    /// CRLF is normalized to LF first. Rejections become error replies; nothing here ends the
    /// session except QUIT.
    pub fn process_line(&self, line: &str, session: &mut SmtpSession) -> LineOutcome {
        let line = line.replace("\r\n", "\n");

        if session.in_data_mode() {
            return self.handle_data_line(&line, session);
        }

        match self.process_command(&line, session) {
            Ok(outcome) => outcome,
            Err(e) => LineOutcome::Reply(SmtpResponse::error(
                e.to_response_code(),
                &e.to_response_message(),
            )),
        }
    }

    /// Process a command line and return a response
    pub fn process_command(
        &self,
        command_line: &str,
        session: &mut SmtpSession,
    ) -> Result<LineOutcome, SmtpError> {
        let response = match SmtpCommand::parse(command_line) {
            SmtpCommand::Mail(addr) => {
                session.set_sender(addr)?;
                SmtpResponse::sender_ok()
            }
            SmtpCommand::Rcpt(addr) => {
                session.add_recipient(addr)?;
                SmtpResponse::recipient_ok()
            }
            SmtpCommand::Rset => {
                session.reset();
                SmtpResponse::ok()
            }
            SmtpCommand::Noop => SmtpResponse::ok(),
            SmtpCommand::Vrfy(arg) => SmtpResponse::verify(&arg),
            SmtpCommand::Data => {
                session.start_data_mode()?;
                SmtpResponse::data_start()
            }
            SmtpCommand::Helo => SmtpResponse::helo(session.peer_address()),
            SmtpCommand::Quit => return Ok(LineOutcome::Quit),
            SmtpCommand::Unrecognized => return Err(SmtpError::InvalidCommand),
        };

        Ok(LineOutcome::Reply(response))
    }

    /// Handle a line of data during DATA mode
    fn handle_data_line(&self, line: &str, session: &mut SmtpSession) -> LineOutcome {
        if line != DATA_TERMINATOR {
            session.add_data_line(line);
            return LineOutcome::Collected;
        }

        match session.finish_data_collection() {
            Ok(_) => LineOutcome::Queued(SmtpResponse::queued(&generate_queue_id(
                QUEUE_ID_LENGTH,
            ))),
            Err(e) => LineOutcome::Reply(SmtpResponse::error(
                e.to_response_code(),
                &e.to_response_message(),
            )),
        }
    }
}
