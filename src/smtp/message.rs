//! The message record accumulated over one session

use crate::smtp::error::SmtpError;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static FOLDED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[[:space:]]").expect("fold pattern is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" [[:space:]]+").expect("whitespace pattern is valid"));

static SUBJECT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Subject: (.*)").expect("subject pattern is valid"));

/// Represents the message received during a session.
///
/// Serializes to the document handed to the webhook. The raw header block is kept for
/// finalization only and is never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Address of the connected peer
    #[serde(rename = "ipaddress")]
    pub peer_address: String,

    /// Reverse path from the accepted MAIL FROM, empty until one is accepted
    pub sender: String,

    /// Forward paths from accepted RCPT TO commands, in arrival order
    pub recipients: Vec<String>,

    /// Trimmed value of the Subject header
    pub subject: Option<String>,

    /// DATA lines exactly as received, terminator excluded
    #[serde(rename = "rawEmail")]
    pub raw_email: Option<String>,

    #[serde(skip)]
    header_block: Option<String>,

    /// Parsed headers, present only when a blank line separated headers from the body
    pub headers: Option<BTreeMap<String, String>>,

    /// Body after the header block, or the whole raw message when there is no header block
    #[serde(rename = "TextBody")]
    pub text_body: Option<String>,
}

impl MessageRecord {
    /// Create an empty record for a session with `peer_address`
    pub fn new(peer_address: &str) -> Self {
        Self {
            peer_address: peer_address.to_owned(),
            ..Self::default()
        }
    }

    /// Drop the content of any earlier DATA block, keeping the envelope
    pub fn begin_data(&mut self) {
        self.subject = None;
        self.raw_email = None;
        self.header_block = None;
        self.headers = None;
        self.text_body = None;
    }

    /// Append one line, including its line feed, to the raw message
    pub fn append_data(&mut self, line: &str) {
        self.raw_email.get_or_insert_with(String::new).push_str(line);
    }

    /// Split the raw message into headers and body.
    ///
    /// The split happens at the first blank line. Header continuation lines are unfolded and
    /// each header line is split at its first `": "`; lines without one are skipped. Later
    /// headers overwrite earlier ones with the same name.
    pub fn finalize(&mut self) {
        let raw = self.raw_email.as_deref().unwrap_or_default();

        let Some((header_block, body)) = raw.split_once("\n\n") else {
            self.text_body = Some(raw.to_owned());
            return;
        };

        let header_block = header_block.to_owned();
        self.text_body = Some(body.to_owned());

        let unfolded = FOLDED_LINE.replace_all(&header_block, " ");
        let unfolded = WHITESPACE_RUN.replace_all(&unfolded, " ");

        let mut headers = BTreeMap::new();
        for line in unfolded.split('\n') {
            if let Some((name, value)) = line.split_once(": ") {
                headers.insert(name.to_owned(), value.to_owned());
            }

            if let Some(captures) = SUBJECT_LINE.captures(line) {
                self.subject = Some(captures[1].trim().to_owned());
            }
        }

        self.headers = Some(headers);
        self.header_block = Some(header_block);
    }

    /// Whether any message data was captured.
    ///
    /// A record without data comes from a session that ended before a DATA block and should
    /// not be delivered.
    pub fn is_complete(&self) -> bool {
        self.raw_email.is_some()
    }

    /// Look up a parsed header by name.
    ///
    /// An exact match wins. Otherwise the first key equal to `name` ignoring ASCII case is
    /// returned, in key order.
    pub fn header(&self, name: &str) -> Option<&str> {
        let headers = self.headers.as_ref()?;
        headers
            .get(name)
            .or_else(|| {
                headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }

    /// Serialize the record to indented JSON
    pub fn to_json_pretty(&self) -> Result<String, SmtpError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(raw: &str) -> MessageRecord {
        let mut record = MessageRecord::new("127.0.0.1");
        record.sender = "a@b.com".to_string();
        record.recipients.push("c@d.com".to_string());
        for line in raw.split_inclusive('\n') {
            record.append_data(line);
        }
        record.finalize();
        record
    }

    #[test]
    fn test_new_record() {
        let record = MessageRecord::new("10.0.0.7");
        assert_eq!(record.peer_address, "10.0.0.7");
        assert!(record.sender.is_empty());
        assert!(record.recipients.is_empty());
        assert!(record.raw_email.is_none());
        assert!(!record.is_complete());
    }

    #[test]
    fn test_finalize_splits_headers_and_body() {
        let record = record_with("Subject: Hi\n\nHello world\n");

        assert_eq!(record.raw_email.as_deref(), Some("Subject: Hi\n\nHello world\n"));
        assert_eq!(record.subject.as_deref(), Some("Hi"));
        assert_eq!(record.text_body.as_deref(), Some("Hello world\n"));
        assert_eq!(record.header("Subject"), Some("Hi"));
        assert_eq!(record.header_block.as_deref(), Some("Subject: Hi"));
    }

    #[test]
    fn test_finalize_without_blank_line() {
        let record = record_with("Just a body\nwith two lines\n");

        assert_eq!(
            record.text_body.as_deref(),
            Some("Just a body\nwith two lines\n")
        );
        assert!(record.headers.is_none());
        assert!(record.subject.is_none());
        assert!(record.header_block.is_none());
    }

    #[test]
    fn test_finalize_unfolds_continuation_lines() {
        let record = record_with(
            "Subject: A long\n   subject line\nX-Tags: one,\n\ttwo\nFrom: a@b.com\n\nBody\n",
        );

        assert_eq!(record.subject.as_deref(), Some("A long subject line"));
        assert_eq!(record.header("X-Tags"), Some("one, two"));
        assert_eq!(record.header("From"), Some("a@b.com"));
    }

    #[test]
    fn test_finalize_duplicate_headers_last_wins() {
        let record = record_with("Received: first\nReceived: second\n\nBody\n");
        assert_eq!(record.header("Received"), Some("second"));
        assert_eq!(record.headers.as_ref().map(BTreeMap::len), Some(1));
    }

    #[test]
    fn test_finalize_skips_lines_without_separator() {
        let record = record_with("Subject: Hi\ngarbage-line\nX-Empty:\n\nBody\n");

        let headers = record.headers.as_ref().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Subject").map(String::as_str), Some("Hi"));
    }

    #[test]
    fn test_header_prefers_exact_name() {
        let record = record_with("Subject: mixed\nSUBJECT: upper\n\nBody\n");

        assert_eq!(record.header("Subject"), Some("mixed"));
        assert_eq!(record.header("SUBJECT"), Some("upper"));
        // "SUBJECT" sorts before "Subject"
        assert_eq!(record.header("subject"), Some("upper"));
    }

    #[test]
    fn test_finalize_value_keeps_later_separators() {
        let record = record_with("X-Note: a: b\n\nBody\n");
        assert_eq!(record.header("X-Note"), Some("a: b"));
    }

    #[test]
    fn test_subject_match_ignores_case() {
        let record = record_with("SUBJECT:   padded   \n\nBody\n");
        assert_eq!(record.subject.as_deref(), Some("padded"));
        assert!(record.headers.as_ref().unwrap().contains_key("SUBJECT"));
    }

    #[test]
    fn test_body_keeps_later_blank_lines() {
        let record = record_with("Subject: Hi\n\nfirst\n\nsecond\n");
        assert_eq!(record.text_body.as_deref(), Some("first\n\nsecond\n"));
    }

    #[test]
    fn test_begin_data_keeps_envelope() {
        let mut record = record_with("Subject: Hi\n\nHello\n");
        record.begin_data();

        assert_eq!(record.sender, "a@b.com");
        assert_eq!(record.recipients, vec!["c@d.com"]);
        assert!(record.raw_email.is_none());
        assert!(record.subject.is_none());
        assert!(record.headers.is_none());
        assert!(record.text_body.is_none());
    }

    #[test]
    fn test_json_field_names() {
        let record = record_with("Subject: Hi\n\nHello world\n");
        let value: serde_json::Value = serde_json::from_str(&record.to_json_pretty().unwrap()).unwrap();

        assert_eq!(value["ipaddress"], "127.0.0.1");
        assert_eq!(value["sender"], "a@b.com");
        assert_eq!(value["recipients"][0], "c@d.com");
        assert_eq!(value["subject"], "Hi");
        assert_eq!(value["rawEmail"], "Subject: Hi\n\nHello world\n");
        assert_eq!(value["headers"]["Subject"], "Hi");
        assert_eq!(value["TextBody"], "Hello world\n");
        assert!(value.get("emailHeaders").is_none());
        assert_eq!(value.as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_json_absent_fields_are_null() {
        let record = MessageRecord::new("127.0.0.1");
        let value: serde_json::Value =
            serde_json::from_str(&record.to_json_pretty().unwrap()).unwrap();

        assert!(value["subject"].is_null());
        assert!(value["rawEmail"].is_null());
        assert!(value["headers"].is_null());
        assert!(value["TextBody"].is_null());
    }

    #[test]
    fn test_json_round_trip() {
        let record = record_with("Subject: Round trip\nFrom: a@b.com\n\nLine one\nLine two\n");
        let parsed: MessageRecord = serde_json::from_str(&record.to_json_pretty().unwrap()).unwrap();

        assert_eq!(parsed.sender, record.sender);
        assert_eq!(parsed.recipients, record.recipients);
        assert_eq!(parsed.text_body, record.text_body);
        assert_eq!(parsed.headers, record.headers);
    }
}
