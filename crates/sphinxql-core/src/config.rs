//! Connection options and the configuration loader.
//!
//! Uses Figment to merge `sphinxql.toml` + `sphinxql.<env>.toml` + `SPHINXQL_*`
//! env vars. Named connections live under `connections.<alias>`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::query::is_identifier;
use crate::traits::Endpoint;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9306;
pub const DEFAULT_CLEAR_PAGE_SIZE: usize = 1000;
pub const DEFAULT_IDENTITY_DB: &str = "sphinxql-identity.db";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("sphinxql.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("sphinxql.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("sphinxql.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("sphinxql.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("SPHINXQL_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Options of the named connection, e.g. `connections.default`.
    pub fn connection(&self, alias: &str) -> anyhow::Result<ConnectionOptions> {
        self.get(&format!("connections.{}", alias))
    }
}

/// Raw connection options as written by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    #[serde(default, alias = "INDEX_NAME")]
    pub index_name: Option<String>,
    #[serde(default = "default_pooling", alias = "CONNECTION_POOLING")]
    pub connection_pooling: bool,
    #[serde(default = "default_clear_page_size", alias = "CLEAR_PAGE_SIZE")]
    pub clear_page_size: usize,
    #[serde(default = "default_identity_db", alias = "IDENTITY_DB")]
    pub identity_db: String,
}

fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
fn default_pooling() -> bool { true }
fn default_clear_page_size() -> usize { DEFAULT_CLEAR_PAGE_SIZE }
fn default_identity_db() -> String { DEFAULT_IDENTITY_DB.to_string() }

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            index_name: None,
            connection_pooling: default_pooling(),
            clear_page_size: default_clear_page_size(),
            identity_db: default_identity_db(),
        }
    }
}

impl ConnectionOptions {
    pub fn for_index(index_name: impl Into<String>) -> Self {
        Self { index_name: Some(index_name.into()), ..Self::default() }
    }

    /// Validates the options; the index name is mandatory and must be a
    /// plain identifier since it is spliced into every statement.
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        let index_name = match self.index_name.as_deref().map(str::trim) {
            Some(name) if is_identifier(name) => name.to_string(),
            _ => return Err(Error::Configuration { key: "INDEX_NAME" }),
        };
        if self.clear_page_size == 0 {
            return Err(Error::Configuration { key: "CLEAR_PAGE_SIZE" });
        }
        if self.host == "localhost" {
            tracing::warn!(host = %self.host, "'localhost' connects via the MySQL socket; the daemon listens on a TCP socket");
        }
        if !self.connection_pooling {
            tracing::warn!(index = %index_name, "connection pooling disabled for the sphinx backend");
        }
        Ok(ResolvedOptions {
            endpoint: Endpoint { host: self.host.clone(), port: self.port, pooled: self.connection_pooling },
            index_name,
            clear_page_size: self.clear_page_size,
            identity_db: expand_path(&self.identity_db),
        })
    }
}

/// Options after validation, fixed for the lifetime of a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub endpoint: Endpoint,
    pub index_name: String,
    pub clear_page_size: usize,
    pub identity_db: PathBuf,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
