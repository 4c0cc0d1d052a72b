//! SMTP session state management

use crate::smtp::address;
use crate::smtp::error::SmtpError;
use crate::smtp::message::MessageRecord;

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmtpState {
    /// Connected, greeting not yet sent
    Greeting,
    /// Lines are interpreted as commands
    Command,
    /// DATA accepted - collecting message lines until the terminator
    Data,
    /// Goodbye sent, no further input is processed
    Terminated,
}

/// Manages the state and data for a single SMTP session
#[derive(Debug)]
pub struct SmtpSession {
    /// Current state of the session
    pub state: SmtpState,
    /// Whether a MAIL FROM has been accepted since the last RSET
    pub has_valid_from: bool,
    /// Whether a RCPT TO has been accepted since the last RSET
    pub has_valid_to: bool,
    /// The message being received
    pub record: MessageRecord,
}

impl SmtpSession {
    /// Create a new SMTP session for a peer
    pub fn new(peer_address: &str) -> Self {
        Self {
            state: SmtpState::Greeting,
            has_valid_from: false,
            has_valid_to: false,
            record: MessageRecord::new(peer_address),
        }
    }

    /// Address of the connected peer
    pub fn peer_address(&self) -> &str {
        &self.record.peer_address
    }

    /// Whether lines are currently collected as message data
    pub fn in_data_mode(&self) -> bool {
        self.state == SmtpState::Data
    }

    /// Leave the greeting state once the greeting has been sent
    pub fn begin(&mut self) {
        if self.state == SmtpState::Greeting {
            self.state = SmtpState::Command;
        }
    }

    /// Set the sender address
    pub fn set_sender(&mut self, sender: String) -> Result<(), SmtpError> {
        if !address::accepts_sender(&sender) {
            return Err(SmtpError::BadSender);
        }

        self.record.sender = sender;
        self.has_valid_from = true;
        Ok(())
    }

    /// Add a recipient address
    pub fn add_recipient(&mut self, recipient: String) -> Result<(), SmtpError> {
        if !self.has_valid_from {
            return Err(SmtpError::BadSequence("MAIL"));
        }

        if !address::accepts_recipient(&recipient) {
            return Err(SmtpError::BadRecipient(recipient));
        }

        self.record.recipients.push(recipient);
        self.has_valid_to = true;
        Ok(())
    }

    /// Forget the accepted MAIL FROM and RCPT TO.
    ///
    /// Only the flags are cleared; the sender and recipients already stored in the record stay.
    pub fn reset(&mut self) {
        self.has_valid_from = false;
        self.has_valid_to = false;
    }

    /// Start data collection mode
    pub fn start_data_mode(&mut self) -> Result<(), SmtpError> {
        if !self.has_valid_to {
            return Err(SmtpError::BadSequence("RCPT"));
        }

        self.record.begin_data();
        self.state = SmtpState::Data;
        Ok(())
    }

    /// Add a line of data during data collection
    pub fn add_data_line(&mut self, line: &str) {
        self.record.append_data(line);
    }

    /// Finish data collection and finalize the record
    pub fn finish_data_collection(&mut self) -> Result<&MessageRecord, SmtpError> {
        if !self.in_data_mode() {
            return Err(SmtpError::BadSequence("DATA"));
        }

        self.state = SmtpState::Command;
        self.record.finalize();
        Ok(&self.record)
    }

    /// Mark the session as finished
    pub fn terminate(&mut self) {
        self.state = SmtpState::Terminated;
    }

    /// Consume the session and hand out its record
    pub fn into_record(self) -> MessageRecord {
        self.record
    }
}
