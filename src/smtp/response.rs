//! SMTP reply handling

use rand::RngCore;

/// Number of random bytes drawn for a queue id
pub const QUEUE_ID_LENGTH: usize = 10;

/// Represents an SMTP reply that can be sent to a client
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpResponse {
    /// The SMTP reply code (e.g., "250", "354", "502")
    pub code: String,
    /// The reply text, including any enhanced status code
    pub message: String,
}

impl SmtpResponse {
    /// Create a new SMTP reply
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a generic success reply (250 2.0.0)
    pub fn ok() -> Self {
        Self::new("250", "2.0.0 Ok")
    }

    /// Create a greeting reply (220)
    pub fn greeting(server_hello: &str) -> Self {
        Self::new("220", server_hello)
    }

    /// Create a HELO/EHLO reply (250) naming the peer
    pub fn helo(peer: &str) -> Self {
        Self::new("250", &format!("HELO {peer}"))
    }

    /// Create a MAIL FROM accepted reply (250 2.1.0)
    pub fn sender_ok() -> Self {
        Self::new("250", "2.1.0 Ok")
    }

    /// Create a RCPT TO accepted reply (250 2.1.5)
    pub fn recipient_ok() -> Self {
        Self::new("250", "2.1.5 Ok")
    }

    /// Create a VRFY reply echoing the argument back
    pub fn verify(arg: &str) -> Self {
        Self::new("250", &format!("2.0.0 {arg}"))
    }

    /// Create a DATA intermediate reply (354)
    pub fn data_start() -> Self {
        Self::new("354", "Ok Send data ending with <CRLF>.<CRLF>")
    }

    /// Create the reply acknowledging a finished DATA block
    pub fn queued(queue_id: &str) -> Self {
        Self::new("250", &format!("2.0.0 Ok: queued as {queue_id}"))
    }

    /// Create the closing reply (221) naming the peer
    pub fn bye(peer: &str) -> Self {
        Self::new("221", &format!("2.0.0 Bye {peer}"))
    }

    /// Create an error reply
    pub fn error(code: &str, message: &str) -> Self {
        Self::new(code, message)
    }

    /// The reply text without the line terminator
    pub fn text(&self) -> String {
        format!("{} {}", self.code, self.message)
    }

    /// Format the reply for sending over the wire
    pub fn format(&self) -> String {
        format!("{} {}\r\n", self.code, self.message)
    }
}

/// Generate an opaque queue id from `length` random bytes.
///
/// The bytes are hex encoded and only the part after the first `length` characters is kept,
/// so the id is `length` hex digits long.
pub fn generate_queue_id(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::rng().fill_bytes(&mut bytes);

    let encoded: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    encoded[length..].to_string()
}
