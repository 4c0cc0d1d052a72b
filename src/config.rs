//! Command line and environment configuration

use crate::smtp::DEFAULT_SERVER_HELLO;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Deployment flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    /// Transcript on, proxied delivery, responses archived
    Dev,
    /// Direct delivery, nothing written to disk
    Prod,
}

/// Single-session SMTP responder that forwards received mail to a webhook as JSON.
///
/// By default one session is served over stdin/stdout, as when started by inetd.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Webhook receiving the message as JSON; without it the JSON is only logged
    #[arg(long, env = "ENDPOINT")]
    pub endpoint: Option<String>,

    /// Deployment environment
    #[arg(
        long = "env",
        env = "ENV",
        value_enum,
        default_value_t = Environment::Prod,
        ignore_case = true
    )]
    pub environment: Environment,

    /// Text sent after the 220 code when the session opens
    #[arg(long, env = "SMTP_SERVER_HELLO", default_value = DEFAULT_SERVER_HELLO)]
    pub server_hello: String,

    /// File receiving a transcript of every session
    #[arg(long, env = "SMTP_TRANSCRIPT")]
    pub transcript: Option<PathBuf>,

    /// Directory for development archives and the default transcript
    #[arg(long, env = "LOG_DIR", default_value = "/app/log")]
    pub log_dir: PathBuf,

    /// Proxy used for webhook delivery in development
    #[arg(long, env = "DEV_PROXY", default_value = "http://host.docker.internal:8888")]
    pub proxy: String,

    /// Peer address to report, instead of asking the socket on stdin
    #[arg(long, env = "TCPREMOTEIP")]
    pub peer: Option<String>,

    /// Serve TCP connections on this address, one at a time, instead of stdin/stdout
    #[arg(long)]
    pub listen: Option<String>,
}

impl Config {
    /// Whether running in the development environment
    pub fn is_dev(&self) -> bool {
        self.environment == Environment::Dev
    }

    /// The transcript location in effect.
    ///
    /// An explicit path always wins. Development falls back to `log.txt` beside the log
    /// directory, so `/app/log` gives `/app/log.txt`.
    pub fn transcript_path(&self) -> Option<PathBuf> {
        match (&self.transcript, self.environment) {
            (Some(path), _) => Some(path.clone()),
            (None, Environment::Dev) => {
                let base = self.log_dir.parent().unwrap_or(&self.log_dir);
                Some(base.join("log.txt"))
            }
            (None, Environment::Prod) => None,
        }
    }
}
