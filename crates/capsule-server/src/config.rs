//! Start-up configuration, read from the environment (and `.env`).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file holding the capsules.
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Built front-end; `index.html` doubles as the fallback page.
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("CAPSULE_PORT").unwrap_or_else(|| "5000".into());
        let port: u16 = port
            .parse()
            .with_context(|| format!("CAPSULE_PORT must be a port number, got '{}'", port))?;

        Ok(Self {
            db_path: lookup("CAPSULE_DB_PATH").unwrap_or_else(|| "time_capsule.db".into()).into(),
            host: lookup("CAPSULE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            static_dir: lookup("CAPSULE_STATIC_DIR").unwrap_or_else(|| "./frontend".into()).into(),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().with_context(|| format!("invalid bind address '{}'", addr))
    }
}
