use std::path::PathBuf;
use std::time::Duration;

use burrow_gateway::telemetry::LogFormat;
use burrow_storage::PostgresOptions;
use clap::builder::RangedU64ValueParser;
use clap::Parser;

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const AUTH_SECRET_ENV: &str = "AUTH_SECRET";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_FILE_STORAGE_PATH: &str = "/tmp/short-url-fs.json";

const MAX_CODE_LENGTH: u64 = burrow_core::shortcode::MAX_LENGTH as u64;

/// Where short links are kept, in order of precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { dsn: String },
    File { path: PathBuf },
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "burrow", about = "URL shortener HTTP server")]
pub struct CLI {
    /// Address the HTTP server listens on.
    #[arg(short = 'a', long, env = SERVER_ADDRESS_ENV, default_value = DEFAULT_SERVER_ADDRESS)]
    pub server_address: String,

    /// Prefix of every returned short URL.
    #[arg(short = 'b', long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Append-only log file; an empty value keeps links in memory.
    #[arg(
        short = 'f',
        long,
        env = FILE_STORAGE_PATH_ENV,
        default_value = DEFAULT_FILE_STORAGE_PATH
    )]
    pub file_storage_path: String,

    /// PostgreSQL connection string; takes precedence over the file log.
    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    /// Key signing identity tokens. A random one is used when absent.
    #[arg(long, env = AUTH_SECRET_ENV, hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// Length of generated short codes.
    #[arg(
        long,
        default_value_t = burrow_generator::random::DEFAULT_LENGTH,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_CODE_LENGTH)
    )]
    pub code_length: usize,

    #[arg(long, default_value_t = burrow_shortener::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    #[arg(long, default_value_t = 10)]
    pub db_max_connections: u32,

    #[arg(long, default_value_t = 5)]
    pub db_acquire_timeout_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl CLI {
    pub fn storage_backend(&self) -> StorageBackend {
        if let Some(dsn) = self.database_dsn.as_deref().map(str::trim) {
            if !dsn.is_empty() {
                return StorageBackend::Postgres {
                    dsn: dsn.to_string(),
                };
            }
        }

        let path = self.file_storage_path.trim();
        if path.is_empty() {
            StorageBackend::Memory
        } else {
            StorageBackend::File {
                path: PathBuf::from(path),
            }
        }
    }

    pub fn postgres_options(&self) -> PostgresOptions {
        PostgresOptions::builder()
            .max_connections(self.db_max_connections.max(1))
            .acquire_timeout(Duration::from_secs(self.db_acquire_timeout_secs))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CLI {
        CLI::try_parse_from(std::iter::once("burrow").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.server_address, DEFAULT_SERVER_ADDRESS);
        assert_eq!(cli.base_url, DEFAULT_BASE_URL);
        assert_eq!(cli.code_length, 6);
        assert_eq!(cli.max_attempts, 5);
        assert_eq!(cli.log_format, LogFormat::Plain);
    }

    #[test]
    fn code_length_is_bounded_by_short_code_limit() {
        assert_eq!(parse(&["--code-length", "32"]).code_length, 32);

        for bad in ["0", "33", "100"] {
            let args = ["burrow", "--code-length", bad];
            assert!(CLI::try_parse_from(args).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn database_takes_precedence_over_file() {
        let cli = parse(&["-d", "postgres://u:p@localhost/db", "-f", "/tmp/x.json"]);
        assert_eq!(
            cli.storage_backend(),
            StorageBackend::Postgres {
                dsn: "postgres://u:p@localhost/db".to_string()
            }
        );
    }

    #[test]
    fn file_then_memory() {
        let cli = parse(&["-d", "", "-f", "/tmp/x.json"]);
        assert_eq!(
            cli.storage_backend(),
            StorageBackend::File {
                path: PathBuf::from("/tmp/x.json")
            }
        );

        let cli = parse(&["-d", "", "-f", ""]);
        assert_eq!(cli.storage_backend(), StorageBackend::Memory);
    }

    #[test]
    fn postgres_options_from_flags() {
        let cli = parse(&["--db-max-connections", "3", "--db-acquire-timeout-secs", "1"]);
        let options = cli.postgres_options();
        assert_eq!(options.max_connections, 3);
        assert_eq!(options.acquire_timeout, Duration::from_secs(1));
    }
}
