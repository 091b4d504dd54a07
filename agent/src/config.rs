use clap::Parser;
use config::{Config as ConfigSource, Environment, FileFormat};
use serde::Deserialize;

/// Agent configuration, merged default < config file < CLI flag <
/// environment variable, same precedence as the server.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    #[serde(default)]
    pub crypto_key: Option<String>,
    #[serde(default)]
    pub use_grpc: bool,
}

fn default_address() -> String {
    "localhost:8080".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_report_interval() -> u64 {
    10
}

fn default_rate_limit() -> usize {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: default_address(),
            poll_interval: default_poll_interval(),
            report_interval: default_report_interval(),
            key: None,
            rate_limit: default_rate_limit(),
            crypto_key: None,
            use_grpc: false,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "metrics-agent")]
pub struct Args {
    /// Net address host:port
    #[arg(short = 'a', long)]
    pub address: Option<String>,
    /// Poll interval in seconds
    #[arg(short = 'p', long)]
    pub poll_interval: Option<u64>,
    /// Report interval in seconds
    #[arg(short = 'r', long)]
    pub report_interval: Option<u64>,
    /// Secret used to compute the HMAC header
    #[arg(short = 'k', long)]
    pub key: Option<String>,
    /// Max number of concurrent requests to the server
    #[arg(short = 'l', long)]
    pub rate_limit: Option<usize>,
    /// Path to the public certificate used for payload encryption
    #[arg(long = "crypto-key")]
    pub crypto_key: Option<String>,
    /// Report over gRPC instead of HTTP
    #[arg(long)]
    pub grpc: bool,
    /// Path to a JSON/YAML config file
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,
}

impl Settings {
    /// `set_override` always outranks every `add_source` layer regardless of
    /// call order, so flags can't be applied that way without also beating
    /// the environment. Instead the flags are collected into a JSON blob and
    /// layered in as a source of their own, placed after the config file and
    /// before `Environment` so the crate's own source-ordering rules (later
    /// source wins) give the intended precedence.
    pub fn load(args: &Args) -> Result<Self, config::ConfigError> {
        let mut builder = ConfigSource::builder()
            .set_default("address", default_address())?
            .set_default("poll_interval", default_poll_interval() as i64)?
            .set_default("report_interval", default_report_interval() as i64)?
            .set_default("rate_limit", default_rate_limit() as i64)?
            .set_default("use_grpc", false)?;

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::with_name(path).required(false));
        } else {
            builder = builder.add_source(config::File::with_name("config").required(false));
        }

        let mut flags = serde_json::Map::new();
        if let Some(v) = &args.address {
            flags.insert("address".into(), v.clone().into());
        }
        if let Some(v) = args.poll_interval {
            flags.insert("poll_interval".into(), v.into());
        }
        if let Some(v) = args.report_interval {
            flags.insert("report_interval".into(), v.into());
        }
        if let Some(v) = &args.key {
            flags.insert("key".into(), v.clone().into());
        }
        if let Some(v) = args.rate_limit {
            flags.insert("rate_limit".into(), v.into());
        }
        if let Some(v) = &args.crypto_key {
            flags.insert("crypto_key".into(), v.clone().into());
        }
        if args.grpc {
            flags.insert("use_grpc".into(), true.into());
        }
        if !flags.is_empty() {
            let json = serde_json::Value::Object(flags).to_string();
            builder = builder.add_source(config::File::from_str(&json, FileFormat::Json));
        }

        // Added last so it wins the final tie-break, per the precedence above.
        builder = builder.add_source(Environment::default().try_parsing(true).list_separator(","));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_expected_values() {
        let settings = Settings::default();
        assert_eq!(settings.address, "localhost:8080");
        assert_eq!(settings.poll_interval, 2);
        assert_eq!(settings.report_interval, 10);
        assert_eq!(settings.rate_limit, 3);
    }
}
