//! # hookmail
//!
//! hookmail is a single-session SMTP responder for testing and webhook forwarding.
//!
//! It is meant to be started once per connection, e.g. by inetd, talking SMTP over
//! stdin/stdout. The received message is parsed into a [`MessageRecord`] which can be posted to
//! an HTTP endpoint as JSON.
//!
//! ## Quick Start
//!
//! ```rust
//! use hookmail::SmtpServer;
//! use std::io::Cursor;
//!
//! let input = "MAIL FROM:<a@b.com>\r\n\
//!              RCPT TO:<c@d.com>\r\n\
//!              DATA\r\n\
//!              Subject: Hi\r\n\
//!              \r\n\
//!              Hello world\r\n\
//!              .\r\n\
//!              QUIT\r\n";
//!
//! let server = SmtpServer::new("test.local ESMTP");
//! let mut replies = Vec::new();
//! let record = server
//!     .serve(Cursor::new(input), &mut replies, "127.0.0.1", |_| {})
//!     .unwrap();
//!
//! assert_eq!(record.subject.as_deref(), Some("Hi"));
//! assert_eq!(record.text_body.as_deref(), Some("Hello world\n"));
//! println!("{}", record.to_json_pretty().unwrap());
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` / `EHLO` - Greet the server
//! - `MAIL FROM` - Specify the sender's address
//! - `RCPT TO` - Specify a recipient (multiple recipients are supported)
//! - `DATA` - Send the message
//! - `RSET` - Forget the accepted sender and recipients
//! - `NOOP` - Do nothing
//! - `VRFY` - Echo the argument back
//! - `QUIT` - Close the session
//!
//! ## Notes
//!
//! - This is a receive-only stub, not a mail transfer agent. Nothing is queued or relayed.
//! - Extensions, pipelining, authentication and TLS are not supported.
//! - Any non-empty sender is accepted. Recipients must look like `local@domain.tld` or
//!   `postmaster@[literal]`.
//! - `RSET` only clears the transaction flags; the sender and recipients already recorded stay
//!   in the record.
//!
//! ## Message document
//!
//! [`MessageRecord`] serializes with the fields `ipaddress`, `sender`, `recipients`, `subject`,
//! `rawEmail`, `headers` and `TextBody`. Absent values are `null`.

pub mod config;
pub mod delivery;
mod smtp;

pub use smtp::{
    DEFAULT_SERVER_HELLO, LineOutcome, MessageRecord, SmtpCommand, SmtpCommandHandler, SmtpError,
    SmtpResponse, SmtpServer, SmtpSession, SmtpState, Transcript, address, stdin_peer_address,
};
