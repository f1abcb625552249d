use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

/// Server settings, read from `VILLAGE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub sweep_interval: Duration,
    pub cookie_secure: bool,
    pub db_busy_timeout: Duration,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let sweep_secs: u64 = setting(&lookup, "VILLAGE_SWEEP_INTERVAL_SECS", 3600)?;
        if sweep_secs == 0 {
            anyhow::bail!("VILLAGE_SWEEP_INTERVAL_SECS must be at least 1");
        }

        Ok(Self {
            db_path: text("VILLAGE_DB_PATH", "village-square.db").into(),
            host: text("VILLAGE_HOST", "0.0.0.0"),
            port: setting(&lookup, "VILLAGE_PORT", 8080)?,
            static_dir: text("VILLAGE_STATIC_DIR", "static").into(),
            sweep_interval: Duration::from_secs(sweep_secs),
            cookie_secure: setting(&lookup, "VILLAGE_COOKIE_SECURE", false)?,
            db_busy_timeout: Duration::from_millis(setting(
                &lookup,
                "VILLAGE_DB_BUSY_TIMEOUT_MS",
                5000,
            )?),
            argon2_memory_kib: setting(&lookup, "VILLAGE_ARGON2_MEMORY_KIB", 19456)?,
            argon2_iterations: setting(&lookup, "VILLAGE_ARGON2_ITERATIONS", 2)?,
        })
    }
}

/// Parses `key` if set, otherwise returns `default`.
fn setting<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("village-square.db"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.db_busy_timeout, Duration::from_millis(5000));
        assert!(!config.cookie_secure);
        assert_eq!(config.argon2_memory_kib, 19456);
        assert_eq!(config.argon2_iterations, 2);
    }

    #[test]
    fn overrides_and_bad_values() {
        let config = load(&[("VILLAGE_PORT", "9000"), ("VILLAGE_COOKIE_SECURE", "true")]).unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.cookie_secure);

        let err = load(&[("VILLAGE_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("VILLAGE_PORT"));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = load(&[("VILLAGE_SWEEP_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("VILLAGE_SWEEP_INTERVAL_SECS"));

        let config = load(&[("VILLAGE_SWEEP_INTERVAL_SECS", "1")]).unwrap();
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
    }
}
