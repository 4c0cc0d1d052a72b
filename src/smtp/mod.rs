//! SMTP responder implementation

pub mod address;
pub mod commands;
pub mod error;
pub mod message;
pub mod response;
pub mod server;
pub mod session;
pub mod transcript;

pub use commands::{LineOutcome, SmtpCommand, SmtpCommandHandler};
pub use error::SmtpError;
pub use message::MessageRecord;
pub use response::SmtpResponse;
pub use server::{DEFAULT_SERVER_HELLO, SmtpServer, stdin_peer_address};
pub use session::{SmtpSession, SmtpState};
pub use transcript::Transcript;
