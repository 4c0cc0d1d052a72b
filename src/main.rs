use clap::Parser;
use hookmail::config::Config;
use hookmail::delivery::{DevArchive, WebhookClient};
use hookmail::{MessageRecord, SmtpError, SmtpServer, Transcript, stdin_peer_address};
use log::{error, info, warn};
use std::sync::mpsc;
use std::thread;

fn main() {
    // stdout carries the SMTP conversation, so logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    if let Err(e) = run(&config) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), SmtpError> {
    let mut server = SmtpServer::new(&config.server_hello);
    if let Some(path) = config.transcript_path() {
        server = server.with_transcript(Transcript::new(path));
    }

    let forwarder = Forwarder::new(config)?;

    match &config.listen {
        Some(addr) => listen(&server, addr, forwarder),
        None => {
            let peer = config
                .peer
                .clone()
                .or_else(stdin_peer_address)
                .unwrap_or_else(|| "unknown".to_string());

            let record = server.serve_stdio(&peer)?;
            forwarder.forward(&record)
        }
    }
}

/// Serve TCP sessions one at a time, forwarding each queued message
fn listen(server: &SmtpServer, addr: &str, forwarder: Forwarder) -> Result<(), SmtpError> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        while let Ok(record) = rx.recv() {
            if let Err(e) = forwarder.forward(&record) {
                error!("Failed to forward message from <{}>: {e}", record.sender);
            }
        }
    });

    server.start(addr, tx)
}

/// Hands finished records to the webhook, or to the log when no webhook is configured
struct Forwarder {
    webhook: Option<WebhookClient>,
    archive: Option<DevArchive>,
}

impl Forwarder {
    fn new(config: &Config) -> Result<Self, SmtpError> {
        let webhook = match &config.endpoint {
            Some(endpoint) if config.is_dev() => {
                Some(WebhookClient::with_proxy(endpoint, &config.proxy)?)
            }
            Some(endpoint) => Some(WebhookClient::new(endpoint)?),
            None => None,
        };
        let archive = config.is_dev().then(|| DevArchive::new(&config.log_dir));

        Ok(Self { webhook, archive })
    }

    fn forward(&self, record: &MessageRecord) -> Result<(), SmtpError> {
        if !record.is_complete() {
            warn!(
                "Session with {} ended without a message; nothing to forward",
                record.peer_address
            );
            return Ok(());
        }

        let Some(webhook) = &self.webhook else {
            info!(
                "No endpoint configured, received message:\n{}",
                record.to_json_pretty()?
            );
            return Ok(());
        };

        let delivery = webhook.deliver(record)?;

        if let Some(archive) = &self.archive {
            archive.store(&delivery)?;
        }

        Ok(())
    }
}
