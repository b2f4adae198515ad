use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::chat::prompt::DEFAULT_COMPANY_NAME;
use crate::chat::session::{SessionStore, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};
use crate::gateway::{ModelSelection, DEFAULT_FALLBACK_MODEL, DEFAULT_PRIMARY_MODEL};
use crate::gemini_client::DEFAULT_API_BASE_URL;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port for the web server
    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,

    /// Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API
    #[arg(long, env = "GEMINI_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Model probed first at startup
    #[arg(long, env = "GEMINI_PRIMARY_MODEL", default_value = DEFAULT_PRIMARY_MODEL)]
    pub primary_model: String,

    /// Model used when the primary one does not answer
    #[arg(long, env = "GEMINI_FALLBACK_MODEL", default_value = DEFAULT_FALLBACK_MODEL)]
    pub fallback_model: String,

    /// Timeout for each model request, in seconds
    #[arg(long, default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// CSV file qualified leads are appended to
    #[arg(long, env = "LEADS_FILE", default_value = "leads.csv")]
    pub leads_file: PathBuf,

    /// Seconds a chat session may stay idle before it is dropped
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL.as_secs())]
    pub session_ttl_secs: u64,

    /// Most chat sessions kept in memory at once
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Directory served under /static
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,

    /// Company the assistant introduces itself for
    #[arg(long, env = "COMPANY_NAME", default_value = DEFAULT_COMPANY_NAME)]
    pub company_name: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn models(&self) -> ModelSelection {
        ModelSelection {
            primary: self.primary_model.clone(),
            fallback: self.fallback_model.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::with_limits(Duration::from_secs(self.session_ttl_secs), self.max_sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "nexus-lead-chat",
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--primary-model",
            "gemini-pro",
            "--fallback-model",
            "gemini-lite",
            "--request-timeout-secs",
            "5",
            "--leads-file",
            "/tmp/leads.csv",
            "--session-ttl-secs",
            "120",
            "--max-sessions",
            "50",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.bind_addr(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(
            cli.models(),
            ModelSelection {
                primary: "gemini-pro".to_string(),
                fallback: "gemini-lite".to_string(),
            }
        );
        assert_eq!(cli.request_timeout(), Duration::from_secs(5));
        assert_eq!(cli.leads_file, PathBuf::from("/tmp/leads.csv"));
        assert_eq!(cli.session_ttl_secs, 120);
        assert_eq!(cli.max_sessions, 50);
        assert!(cli.verbose);
    }

    #[test]
    fn listens_on_port_5000_by_default() {
        let cli = Cli::try_parse_from(["nexus-lead-chat"]).unwrap();

        assert_eq!(cli.port, 5000);
        assert_eq!(cli.request_timeout(), Duration::from_secs(60));
        assert_eq!(cli.static_dir, PathBuf::from("static"));
        assert_eq!(cli.session_ttl_secs, 30 * 60);
        assert_eq!(cli.max_sessions, 10_000);
    }
}
