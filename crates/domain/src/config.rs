//! Environment-driven configuration structures shared by all binaries.

use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

use crate::address::{AddressFormatError, TronAddress};

/// TRC20 USDT on TRON mainnet.
pub const DEFAULT_ASSET_CONTRACT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
pub const DEFAULT_ASSET_SYMBOL: &str = "USDT";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// TronGrid rejects pages larger than this.
pub const MAX_PAGE_SIZE: u32 = 200;
pub const DEFAULT_MIN_FETCH_SPACING_MS: u64 = 67;
pub const DEFAULT_POLL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_AUDIT_LOG_PATH: &str = "deposits-log.txt";
pub const DEFAULT_API_BIND_ADDRESS: &str = "0.0.0.0:3007";

/// Service-specific configuration (HTTP bind) so the HTTP surface does not
/// depend on monitor-only environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    database_url: String,
    api_bind_address: String,
}

impl ApiConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        Ok(Self {
            database_url: get_required_var("DATABASE_URL")?,
            api_bind_address: get_optional_var("API_BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_API_BIND_ADDRESS.to_string()),
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }
}

/// Everything the ingestion loop needs to start: storage, ledger endpoint and
/// credentials, the tracked asset, and the polling cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    database_url: String,
    tron_node_url: String,
    tron_api_key: String,
    asset_contract: TronAddress,
    asset_symbol: String,
    page_size: u32,
    min_fetch_spacing: Duration,
    poll_delay: Duration,
    fetch_timeout: Duration,
    audit_log_path: String,
}

impl MonitorConfig {
    /// Loads configuration by hydrating `.env` (if present) and reading the
    /// process variables. Missing or malformed entries surface as
    /// `ConfigError` so binaries can refuse to start.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let database_url = get_required_var("DATABASE_URL")?;
        let tron_node_url = get_required_var("TRON_NODE")?
            .trim_end_matches('/')
            .to_string();
        let tron_api_key = get_required_var("TRON_API_KEY")?;

        let contract = get_optional_var("TRON_ASSET_CONTRACT")
            .unwrap_or_else(|| DEFAULT_ASSET_CONTRACT.to_string());
        let asset_contract =
            TronAddress::parse(&contract).map_err(|source| ConfigError::InvalidAddress {
                key: "TRON_ASSET_CONTRACT",
                source,
            })?;
        let asset_symbol = get_optional_var("TRON_ASSET_SYMBOL")
            .unwrap_or_else(|| DEFAULT_ASSET_SYMBOL.to_string());

        let page_size: u32 = parse_optional_var("MONITOR_PAGE_SIZE")?.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::OutOfRange {
                key: "MONITOR_PAGE_SIZE",
                min: 1,
                max: MAX_PAGE_SIZE as u64,
            });
        }

        let min_fetch_spacing = Duration::from_millis(
            parse_optional_var("MONITOR_MIN_FETCH_SPACING_MS")?
                .unwrap_or(DEFAULT_MIN_FETCH_SPACING_MS),
        );
        let poll_delay = Duration::from_millis(
            parse_optional_var("MONITOR_POLL_DELAY_MS")?.unwrap_or(DEFAULT_POLL_DELAY_MS),
        );
        let fetch_timeout_ms: u64 =
            parse_optional_var("MONITOR_FETCH_TIMEOUT_MS")?.unwrap_or(DEFAULT_FETCH_TIMEOUT_MS);
        if fetch_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: "MONITOR_FETCH_TIMEOUT_MS",
                min: 1,
                max: u64::MAX,
            });
        }

        let audit_log_path = get_optional_var("DEPOSIT_AUDIT_LOG")
            .unwrap_or_else(|| DEFAULT_AUDIT_LOG_PATH.to_string());

        Ok(Self {
            database_url,
            tron_node_url,
            tron_api_key,
            asset_contract,
            asset_symbol,
            page_size,
            min_fetch_spacing,
            poll_delay,
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            audit_log_path,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn tron_node_url(&self) -> &str {
        &self.tron_node_url
    }

    pub fn tron_api_key(&self) -> &str {
        &self.tron_api_key
    }

    pub fn asset_contract(&self) -> &TronAddress {
        &self.asset_contract
    }

    pub fn asset_symbol(&self) -> &str {
        &self.asset_symbol
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn min_fetch_spacing(&self) -> Duration {
        self.min_fetch_spacing
    }

    pub fn poll_delay(&self) -> Duration {
        self.poll_delay
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn audit_log_path(&self) -> &str {
        &self.audit_log_path
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    get_optional_var(key).ok_or(ConfigError::MissingVar { key })
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_optional_var<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    get_optional_var(key)
        .map(|raw| {
            raw.parse()
                .map_err(|source| ConfigError::InvalidNumber { key, source })
        })
        .transpose()
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("TRON_DEPOSIT_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("`{key}` must be between {min} and {max}")]
    OutOfRange {
        key: &'static str,
        min: u64,
        max: u64,
    },
    #[error("invalid address in `{key}`: {source}")]
    InvalidAddress {
        key: &'static str,
        #[source]
        source: AddressFormatError,
    },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    const OPTIONAL_KEYS: [&str; 8] = [
        "TRON_ASSET_CONTRACT",
        "TRON_ASSET_SYMBOL",
        "MONITOR_PAGE_SIZE",
        "MONITOR_MIN_FETCH_SPACING_MS",
        "MONITOR_POLL_DELAY_MS",
        "MONITOR_FETCH_TIMEOUT_MS",
        "DEPOSIT_AUDIT_LOG",
        "API_BIND_ADDRESS",
    ];

    fn set_env() {
        std::env::set_var("TRON_DEPOSIT_SKIP_DOTENV", "1");
        std::env::set_var("DATABASE_URL", "sqlite://test.db");
        std::env::set_var("TRON_NODE", "https://api.trongrid.io/");
        std::env::set_var("TRON_API_KEY", "test-key");
        for key in OPTIONAL_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn monitor_config_uses_defaults() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();

        let config = MonitorConfig::load_from_env().expect("config loads");
        assert_eq!(config.database_url(), "sqlite://test.db");
        assert_eq!(config.tron_node_url(), "https://api.trongrid.io");
        assert_eq!(config.tron_api_key(), "test-key");
        assert_eq!(config.asset_contract().as_str(), DEFAULT_ASSET_CONTRACT);
        assert_eq!(config.asset_symbol(), "USDT");
        assert_eq!(config.page_size(), 100);
        assert_eq!(config.min_fetch_spacing(), Duration::from_millis(67));
        assert_eq!(config.poll_delay(), Duration::from_secs(1));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.audit_log_path(), "deposits-log.txt");
    }

    #[test]
    fn monitor_config_reads_overrides() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::set_var("MONITOR_PAGE_SIZE", " 50 ");
        std::env::set_var("MONITOR_POLL_DELAY_MS", "250");
        std::env::set_var("TRON_ASSET_SYMBOL", "USDC");
        std::env::set_var("DEPOSIT_AUDIT_LOG", "/var/log/deposits.txt");

        let config = MonitorConfig::load_from_env().expect("config loads");
        assert_eq!(config.page_size(), 50);
        assert_eq!(config.poll_delay(), Duration::from_millis(250));
        assert_eq!(config.asset_symbol(), "USDC");
        assert_eq!(config.audit_log_path(), "/var/log/deposits.txt");

        set_env();
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::set_var("TRON_API_KEY", "   ");

        let err = MonitorConfig::load_from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar {
                key: "TRON_API_KEY"
            }
        ));

        set_env();
    }

    #[test]
    fn page_size_is_bounded() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::set_var("MONITOR_PAGE_SIZE", "500");

        let err = MonitorConfig::load_from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                key: "MONITOR_PAGE_SIZE",
                ..
            }
        ));

        std::env::set_var("MONITOR_PAGE_SIZE", "ten");
        let err = MonitorConfig::load_from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        set_env();
    }

    #[test]
    fn invalid_contract_is_rejected() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::set_var("TRON_ASSET_CONTRACT", "not-an-address");

        let err = MonitorConfig::load_from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress { .. }));

        set_env();
    }

    #[test]
    fn api_config_only_requires_database() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::remove_var("TRON_NODE");
        std::env::remove_var("TRON_API_KEY");

        let config = ApiConfig::load_from_env().expect("api config loads");
        assert_eq!(config.database_url(), "sqlite://test.db");
        assert_eq!(config.api_bind_address(), DEFAULT_API_BIND_ADDRESS);

        std::env::set_var("API_BIND_ADDRESS", " 127.0.0.1:9999 ");
        let config = ApiConfig::load_from_env().expect("api config loads");
        assert_eq!(config.api_bind_address(), "127.0.0.1:9999");

        set_env();
    }
}
