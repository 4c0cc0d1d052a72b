//! Error types for the SMTP responder

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected the message with status {status}")]
    WebhookStatus { status: u16 },

    #[error("Invalid command")]
    InvalidCommand,

    #[error("Bad sequence of commands: need {0} command")]
    BadSequence(&'static str),

    #[error("Bad sender address syntax")]
    BadSender,

    #[error("Bad recipient address syntax: {0}")]
    BadRecipient(String),

    #[error("No message data was received")]
    IncompleteTransaction,
}

/// Maps protocol errors to the reply lines sent back to the client
impl SmtpError {
    pub fn to_response_code(&self) -> &'static str {
        match self {
            SmtpError::InvalidCommand => "502",
            SmtpError::BadSequence(_) => "503",
            SmtpError::BadSender => "551",
            SmtpError::BadRecipient(_) => "501",
            SmtpError::Io(_)
            | SmtpError::Json(_)
            | SmtpError::Http(_)
            | SmtpError::WebhookStatus { .. }
            | SmtpError::IncompleteTransaction => "451",
        }
    }

    pub fn to_response_message(&self) -> String {
        match self {
            SmtpError::InvalidCommand => "5.5.2 Error: command not recognized".to_string(),
            SmtpError::BadSequence(command) => format!("5.5.1 Error: need {command} command"),
            SmtpError::BadSender => "5.1.7 Bad sender address syntax".to_string(),
            SmtpError::BadRecipient(addr) => format!("5.1.3 Bad recipient address syntax {addr}"),
            SmtpError::Io(_)
            | SmtpError::Json(_)
            | SmtpError::Http(_)
            | SmtpError::WebhookStatus { .. }
            | SmtpError::IncompleteTransaction => "4.3.0 Local error in processing".to_string(),
        }
    }
}
