use clap::{Parser, ValueEnum};
use jiff::SignedDuration;
use portkey_core::CacheTtls;
use portkey_shortener::CodeAllocator;
use portkey_sweeper::SweeperConfig;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "PORTKEY_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "PORTKEY_PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "PORTKEY_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "PORTKEY_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "PORTKEY_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "PORTKEY_REDIS_URL";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::InMemory => write!(f, "in-memory"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "portkey")]
pub struct Cli {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Base URL used when rendering short links back to clients.
    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::InMemory
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    /// TTL for `link:` cache entries, in seconds.
    #[arg(long, env = "PORTKEY_LINK_TTL_SECS", default_value_t = 3600)]
    pub link_ttl_secs: u64,

    /// TTL for `search:` cache entries, in seconds.
    #[arg(long, env = "PORTKEY_SEARCH_TTL_SECS", default_value_t = 600)]
    pub search_ttl_secs: u64,

    /// TTL for `analytics:daily:` cache entries, in seconds.
    #[arg(long, env = "PORTKEY_DAILY_TTL_SECS", default_value_t = 3600)]
    pub daily_ttl_secs: u64,

    /// How often the sweeper runs, in seconds.
    #[arg(long, env = "PORTKEY_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Expiry-warning window, in hours.
    #[arg(long, env = "PORTKEY_WARN_WINDOW_HOURS", default_value_t = 24)]
    pub warn_window_hours: i64,

    /// Links with no visit for this many days are archived as unused.
    #[arg(long, env = "PORTKEY_UNUSED_AFTER_DAYS", default_value_t = 30)]
    pub unused_after_days: i64,

    /// Auto-renew extension, in days.
    #[arg(long, env = "PORTKEY_RENEW_EXTENSION_DAYS", default_value_t = 7)]
    pub renew_extension_days: i64,

    /// Length of generated short codes.
    #[arg(long, env = "PORTKEY_CODE_LENGTH", default_value_t = 6)]
    pub code_length: usize,

    /// Draw attempts before code allocation gives up.
    #[arg(long, env = "PORTKEY_CODE_ATTEMPTS", default_value_t = 10)]
    pub code_attempts: u32,
}

impl Cli {
    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            link: Duration::from_secs(self.link_ttl_secs),
            search: Duration::from_secs(self.search_ttl_secs),
            daily: Duration::from_secs(self.daily_ttl_secs),
        }
    }

    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig::builder()
            .tick_interval(Duration::from_secs(self.sweep_interval_secs))
            .warn_window(SignedDuration::from_hours(self.warn_window_hours))
            .unused_after(SignedDuration::from_hours(self.unused_after_days * 24))
            .renew_extension(SignedDuration::from_hours(self.renew_extension_days * 24))
            .build()
    }

    pub fn allocator(&self) -> CodeAllocator {
        CodeAllocator::new(self.code_length, self.code_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_without_arguments() {
        let cli = Cli::try_parse_from(["portkey"]).unwrap();
        assert_eq!(cli.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.cache, CacheBackendArg::InMemory);
        assert_eq!(cli.cache_ttls().link, Duration::from_secs(3600));
        assert_eq!(cli.cache_ttls().search, Duration::from_secs(600));
        assert_eq!(
            cli.sweeper_config().unused_after,
            SignedDuration::from_hours(30 * 24)
        );
    }

    #[test]
    fn mysql_requires_a_dsn() {
        let result = Cli::try_parse_from(["portkey", "--storage", "mysql"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "portkey",
            "--storage",
            "mysql",
            "--mysql-dsn",
            "mysql://portkey@localhost/portkey",
        ])
        .unwrap();
        assert_eq!(cli.storage, StorageBackendArg::Mysql);
    }
}
