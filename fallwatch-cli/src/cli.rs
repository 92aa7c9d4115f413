use anyhow::{Context, Result};
use clap::Parser;
use fallwatch_core::{ChannelConfig, Endpoint};
use std::path::PathBuf;

use crate::app::WatchOptions;

#[derive(Parser, Debug)]
#[command(name = "fallwatch")]
#[command(about = "Watch realtime fall-detection alerts for a user", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Alert server base URL (http/ws map to ws, https/wss to wss)
    #[arg(long, env = "FALLWATCH_SERVER", default_value = "http://localhost:5000")]
    pub server: String,

    /// User whose alerts to watch
    #[arg(long, env = "FALLWATCH_USER_ID")]
    pub user_id: String,

    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Reconnect attempts before giving up (default: 5)
    #[arg(long)]
    pub max_reconnect_attempts: Option<u32>,

    /// Delay between reconnect attempts in milliseconds (default: 3000)
    #[arg(long)]
    pub reconnect_delay_ms: Option<u64>,

    /// Do not ring the terminal bell on alerts
    #[arg(long)]
    pub no_bell: bool,

    /// JSON message to send once connected
    #[arg(long)]
    pub send: Option<String>,
}

impl Cli {
    /// Config precedence: defaults, then the TOML file, then `FALLWATCH_*` env, then flags.
    pub fn channel_config(&self) -> Result<ChannelConfig> {
        let config = match &self.config {
            Some(path) => ChannelConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ChannelConfig::default(),
        };

        let mut config = config.with_env_overrides()?;

        if let Some(attempts) = self.max_reconnect_attempts {
            config.max_reconnect_attempts = attempts;
        }
        if let Some(delay) = self.reconnect_delay_ms {
            config.reconnect_delay_ms = delay;
        }

        Ok(config)
    }

    pub fn into_options(self) -> Result<WatchOptions> {
        let user_id = self.user_id.trim().to_string();
        if user_id.is_empty() {
            anyhow::bail!("User id must not be empty");
        }

        let config = self.channel_config()?;
        let endpoint = Endpoint::from_base_url(&self.server)?;
        let send = self
            .send
            .as_deref()
            .map(|raw| serde_json::from_str::<serde_json::Value>(raw))
            .transpose()
            .context("--send must be valid JSON")?;

        Ok(WatchOptions {
            endpoint,
            user_id,
            config,
            bell: !self.no_bell,
            send,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fallwatch_core::Scheme;
    use std::io::Write;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["fallwatch", "--user-id", "42"]).unwrap();
        assert_eq!(cli.server, "http://localhost:5000");
        assert_eq!(cli.user_id, "42");
        assert!(!cli.no_bell);

        let options = cli.into_options().unwrap();
        assert_eq!(options.endpoint.scheme(), Scheme::Ws);
        assert_eq!(options.endpoint.host(), "localhost:5000");
        assert!(options.bell);
        assert!(options.send.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_reconnect_attempts = 9\nreconnect_delay_ms = 100").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::try_parse_from([
            "fallwatch",
            "--user-id",
            "42",
            "--config",
            path.as_str(),
            "--reconnect-delay-ms",
            "250",
        ])
        .unwrap();

        let config = cli.channel_config().unwrap();
        assert_eq!(config.max_reconnect_attempts, 9);
        assert_eq!(config.reconnect_delay_ms, 250);
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from([
            "fallwatch",
            "--user-id",
            "42",
            "--config",
            "/nonexistent/fallwatch.toml",
        ])
        .unwrap();

        let err = cli.channel_config().unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_send_must_be_json() {
        let cli = Cli::try_parse_from(["fallwatch", "--user-id", "42", "--send", "{oops"]).unwrap();
        assert!(cli.into_options().is_err());

        let cli = Cli::try_parse_from([
            "fallwatch",
            "--user-id",
            "42",
            "--send",
            r#"{"type":"ack"}"#,
            "--no-bell",
        ])
        .unwrap();
        let options = cli.into_options().unwrap();
        assert_eq!(options.send, Some(serde_json::json!({"type": "ack"})));
        assert!(!options.bell);
    }

    #[test]
    fn test_blank_user_id_rejected() {
        let cli = Cli::try_parse_from(["fallwatch", "--user-id", "  "]).unwrap();
        assert!(cli.into_options().is_err());
    }

    #[test]
    fn test_secure_server() {
        let cli = Cli::try_parse_from([
            "fallwatch",
            "--user-id",
            "42",
            "--server",
            "https://care.example.com",
        ])
        .unwrap();

        let options = cli.into_options().unwrap();
        assert_eq!(options.endpoint.scheme(), Scheme::Wss);
    }
}
