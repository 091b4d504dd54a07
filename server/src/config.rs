use clap::Parser;
use config::{Config as ConfigSource, Environment, FileFormat};
use serde::Deserialize;

/// Server configuration, merged default < config file < CLI flag <
/// environment variable.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub store_interval: u64,
    #[serde(default)]
    pub file_storage_path: Option<String>,
    #[serde(default)]
    pub restore: bool,
    #[serde(default)]
    pub database_dsn: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub crypto_key: Option<String>,
    #[serde(default)]
    pub trusted_subnet: Option<String>,
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: default_address(),
            store_interval: 300,
            file_storage_path: None,
            restore: false,
            database_dsn: None,
            key: None,
            crypto_key: None,
            trusted_subnet: None,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "metrics-server")]
pub struct Args {
    /// Net address host:port
    #[arg(short = 'a', long)]
    pub address: Option<String>,
    /// Store interval in seconds (0 = sync on every write)
    #[arg(short = 'i', long)]
    pub store_interval: Option<u64>,
    /// Filepath where metrics will be saved
    #[arg(short = 'f', long)]
    pub file_path: Option<String>,
    /// Restore metrics from file on start
    #[arg(short = 'r', long)]
    pub restore: Option<bool>,
    /// Database connection string
    #[arg(short = 'd', long)]
    pub database_dsn: Option<String>,
    /// Secret used to verify/compute the HMAC header
    #[arg(short = 'k', long)]
    pub key: Option<String>,
    /// Private key used to decrypt the request payload
    #[arg(long = "crypto-key")]
    pub crypto_key: Option<String>,
    /// CIDR subnet trusted to submit metrics
    #[arg(short = 't', long)]
    pub trusted_subnet: Option<String>,
    /// Path to a JSON/YAML config file
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,
}

impl Settings {
    /// Builds settings from default < config file < flags < environment.
    ///
    /// `set_override` always outranks every `add_source` layer regardless of
    /// call order, so flags can't be applied that way without also beating
    /// the environment. Instead the flags are collected into a JSON blob and
    /// layered in as a source of their own, placed after the config file and
    /// before `Environment` so the crate's own source-ordering rules (later
    /// source wins) give the intended precedence.
    pub fn load(args: &Args) -> Result<Self, config::ConfigError> {
        let mut builder = ConfigSource::builder()
            .set_default("address", default_address())?
            .set_default("store_interval", 300)?
            .set_default("restore", false)?;

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::with_name(path).required(false));
        } else {
            builder = builder.add_source(config::File::with_name("config").required(false));
        }

        let mut flags = serde_json::Map::new();
        if let Some(v) = &args.address {
            flags.insert("address".into(), v.clone().into());
        }
        if let Some(v) = args.store_interval {
            flags.insert("store_interval".into(), v.into());
        }
        if let Some(v) = &args.file_path {
            flags.insert("file_storage_path".into(), v.clone().into());
        }
        if let Some(v) = args.restore {
            flags.insert("restore".into(), v.into());
        }
        if let Some(v) = &args.database_dsn {
            flags.insert("database_dsn".into(), v.clone().into());
        }
        if let Some(v) = &args.key {
            flags.insert("key".into(), v.clone().into());
        }
        if let Some(v) = &args.crypto_key {
            flags.insert("crypto_key".into(), v.clone().into());
        }
        if let Some(v) = &args.trusted_subnet {
            flags.insert("trusted_subnet".into(), v.clone().into());
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
