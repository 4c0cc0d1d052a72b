//! Forwarding finished messages to a webhook

use crate::smtp::{MessageRecord, SmtpError};

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Posts message records to an HTTP endpoint as JSON
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    endpoint: String,
}

impl WebhookClient {
    /// Create a client posting straight to `endpoint`, ignoring proxy environment variables
    pub fn new(endpoint: &str) -> Result<Self, SmtpError> {
        Ok(Self {
            client: Client::builder().no_proxy().build()?,
            endpoint: endpoint.to_owned(),
        })
    }

    /// Create a client that goes through `proxy` and accepts any certificate.
    ///
    /// Meant for development, where traffic is inspected by a local intercepting proxy.
    pub fn with_proxy(endpoint: &str, proxy: &str) -> Result<Self, SmtpError> {
        let client = Client::builder()
            .proxy(reqwest::Proxy::all(proxy)?)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
        })
    }

    /// Post an already serialized record and return the response body
    pub fn post_json(&self, json: String) -> Result<String, SmtpError> {
        debug!("Posting {} bytes to {}", json.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(json)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SmtpError::WebhookStatus {
                status: status.as_u16(),
            });
        }

        info!("Webhook {} answered {status}", self.endpoint);
        Ok(response.text()?)
    }

    /// Post a finished record.
    ///
    /// Records without message data are refused with [`SmtpError::IncompleteTransaction`].
    pub fn deliver(&self, record: &MessageRecord) -> Result<Delivery, SmtpError> {
        if !record.is_complete() {
            return Err(SmtpError::IncompleteTransaction);
        }

        let payload = record.to_json_pretty()?;
        let response = self.post_json(payload.clone())?;
        Ok(Delivery { payload, response })
    }
}

/// What was sent to the webhook and what came back
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// The JSON document posted
    pub payload: String,
    /// The response body
    pub response: String,
}

/// Keeps copies of posted records and webhook responses, for development
#[derive(Debug, Clone)]
pub struct DevArchive {
    dir: PathBuf,
}

impl DevArchive {
    /// Create an archive writing into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Append both halves of a delivery to their files
    pub fn store(&self, delivery: &Delivery) -> Result<(), SmtpError> {
        self.store_email(&delivery.payload)?;
        self.store_response(&delivery.response)
    }

    /// Append a posted record to `emails.txt`
    pub fn store_email(&self, json: &str) -> Result<(), SmtpError> {
        self.append("emails.txt", json)
    }

    /// Append a webhook response body to `res.txt`
    pub fn store_response(&self, body: &str) -> Result<(), SmtpError> {
        self.append("res.txt", body)
    }

    fn append(&self, name: &str, contents: &str) -> Result<(), SmtpError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(name))?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read};
    use std::net::TcpListener;
    use std::thread;

    /// Accepts one HTTP request, answers with `status` and `body`, and returns the request
    fn one_shot_http_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut head = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
                if line == "\r\n" {
                    break;
                }
            }

            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();

            head + &String::from_utf8(request_body).unwrap()
        });

        (url, handle)
    }

    fn complete_record() -> MessageRecord {
        let mut record = MessageRecord::new("127.0.0.1");
        record.sender = "a@b.com".to_string();
        record.recipients.push("c@d.com".to_string());
        record.append_data("Subject: Hi\n");
        record.append_data("\n");
        record.append_data("Hello world\n");
        record.finalize();
        record
    }

    #[test]
    fn test_deliver_posts_json() {
        let (url, handle) = one_shot_http_server("200 OK", "{\"ok\":true}");
        let client = WebhookClient::new(&url).unwrap();

        let delivery = client.deliver(&complete_record()).unwrap();
        assert_eq!(delivery.response, "{\"ok\":true}");

        let request = handle.join().unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /hook HTTP/1.1\r\n"));
        assert!(lower.contains("content-type: application/json\r\n"));
        assert!(lower.contains("accept: application/json\r\n"));

        let json = &request[request.find("\r\n\r\n").unwrap() + 4..];
        assert_eq!(json, delivery.payload);
        let posted: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(posted.sender, "a@b.com");
        assert_eq!(posted.recipients, vec!["c@d.com"]);
        assert_eq!(posted.text_body.as_deref(), Some("Hello world\n"));
    }

    #[test]
    fn test_deliver_rejected_status() {
        let (url, handle) = one_shot_http_server("500 Internal Server Error", "boom");
        let client = WebhookClient::new(&url).unwrap();

        let result = client.deliver(&complete_record());
        assert!(matches!(result, Err(SmtpError::WebhookStatus { status: 500 })));
        handle.join().unwrap();
    }

    #[test]
    fn test_deliver_incomplete_record() {
        let client = WebhookClient::new("http://127.0.0.1:9/hook").unwrap();
        let record = MessageRecord::new("127.0.0.1");

        assert!(matches!(
            client.deliver(&record),
            Err(SmtpError::IncompleteTransaction)
        ));
    }

    #[test]
    fn test_dev_archive_appends() {
        let dir = std::env::temp_dir().join(format!("hookmail-archive-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let archive = DevArchive::new(&dir);

        archive.store_email("{\"first\":1}").unwrap();
        archive
            .store(&Delivery {
                payload: "{\"second\":2}".to_string(),
                response: "accepted".to_string(),
            })
            .unwrap();

        let emails = std::fs::read_to_string(dir.join("emails.txt")).unwrap();
        assert_eq!(emails, "{\"first\":1}{\"second\":2}");
        let responses = std::fs::read_to_string(dir.join("res.txt")).unwrap();
        assert_eq!(responses, "accepted");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
