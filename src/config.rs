// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `API_SECRET` | HS256 secret for bearer tokens | Required |
//! | `SIGNING_KEY` | Key material for sealing signatures (≥ 32 bytes) | Required |
//! | `DATABASE_PATH` | redb file holding signature records (`:memory:` keeps them in process) | `./data/signatures.redb` |
//! | `HOST` | Server bind IP address (IPv4 or IPv6) | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `REQUEST_TIMEOUT_SECS` | Time budget per signing/verification call | `5` |
//! | `SHUTDOWN_TIMEOUT_SECS` | Grace period for draining on shutdown | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `DEBUG` | Enable debug logging (`true`/`1`) | `false` |
//! | `RUST_LOG` | Log level filter, overrides `DEBUG` | `info,tower_http=debug` |

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const API_SECRET_ENV: &str = "API_SECRET";

/// Key material for the sealing engine. Never logged.
pub const SIGNING_KEY_ENV: &str = "SIGNING_KEY";

/// Path to the redb database file.
///
/// The special value [`IN_MEMORY_DATABASE`] selects a process-local store
/// whose records are lost on exit.
///
/// # Default
/// `./data/signatures.redb`
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";

pub const IN_MEMORY_DATABASE: &str = ":memory:";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const REQUEST_TIMEOUT_ENV: &str = "REQUEST_TIMEOUT_SECS";
pub const SHUTDOWN_TIMEOUT_ENV: &str = "SHUTDOWN_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const DEBUG_ENV: &str = "DEBUG";

const DEFAULT_DATABASE_PATH: &str = "./data/signatures.redb";
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("environment variable {name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where signature records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Redb(PathBuf),
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Startup configuration.
#[derive(Clone)]
pub struct Config {
    pub api_secret: String,
    pub signing_key: Vec<u8>,
    pub store: StoreBackend,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub log_format: LogFormat,
    pub debug: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_secret", &"<redacted>")
            .field("signing_key", &"<redacted>")
            .field("store", &self.store)
            .field("bind_addr", &self.bind_addr)
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("log_format", &self.log_format)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let api_secret = required(API_SECRET_ENV)?;
        let signing_key = required(SIGNING_KEY_ENV)?.into_bytes();

        let store = match lookup(DATABASE_PATH_ENV).filter(|value| !value.is_empty()) {
            Some(path) if path == IN_MEMORY_DATABASE => StoreBackend::Memory,
            Some(path) => StoreBackend::Redb(PathBuf::from(path)),
            None => StoreBackend::Redb(PathBuf::from(DEFAULT_DATABASE_PATH)),
        };

        let host: IpAddr = parse_or(&lookup, HOST_ENV, DEFAULT_HOST)?;
        let port = parse_or(&lookup, PORT_ENV, DEFAULT_PORT)?;
        let bind_addr = SocketAddr::new(host, port);

        let request_timeout = Duration::from_secs(parse_or(
            &lookup,
            REQUEST_TIMEOUT_ENV,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let shutdown_timeout = Duration::from_secs(parse_or(
            &lookup,
            SHUTDOWN_TIMEOUT_ENV,
            DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        )?);
        if request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: REQUEST_TIMEOUT_ENV,
                reason: "must be greater than zero".into(),
            });
        }

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };

        let debug = matches!(
            lookup(DEBUG_ENV).as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes")
        );

        Ok(Self {
            api_secret,
            signing_key,
            store,
            bind_addr,
            request_timeout,
            shutdown_timeout,
            log_format,
            debug,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(name).filter(|value| !value.is_empty()) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
