//! Config store shared by every component handler during a run
//!
//! The store serves values from the `config` sections of `stack.yaml`,
//! generates passwords on first use and builds database connection strings.
//! Everything handed out is recorded so the settings touched by a run can be
//! reported once it finishes.

use crate::resolver::{resolve_env_vars, resolve_passwords, resolve_references};
use crate::{Config, Result};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Length of generated passwords
pub const PASSWORD_LENGTH: usize = 16;

/// Section holding predefined passwords
pub const PASSWORD_SECTION: &str = "passwords";

/// Section describing the database server
pub const DB_SECTION: &str = "db";

#[derive(Debug, Default)]
struct Recorded {
    passwords: BTreeMap<String, String>,
    fetched: BTreeMap<String, String>,
    dsns: BTreeMap<String, String>,
}

/// Configuration store
#[derive(Debug)]
pub struct ConfigStore {
    sections: BTreeMap<String, BTreeMap<String, String>>,
    env_vars: HashMap<String, String>,
    recorded: RwLock<Recorded>,
}

impl ConfigStore {
    /// Create a store over the given sections, resolving against the process environment
    pub fn new(sections: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self::with_env(sections, std::env::vars().collect())
    }

    /// Create a store with an explicit environment
    pub fn with_env(
        sections: BTreeMap<String, BTreeMap<String, String>>,
        env_vars: HashMap<String, String>,
    ) -> Self {
        Self {
            sections,
            env_vars,
            recorded: RwLock::new(Recorded::default()),
        }
    }

    /// Create a store from a parsed configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.config.clone())
    }

    /// Fetch `key` from `section`, resolving environment variables
    pub fn get(&self, section: &str, key: &str) -> Result<Option<String>> {
        let Some(raw) = self.sections.get(section).and_then(|s| s.get(key)) else {
            return Ok(None);
        };

        let value = resolve_env_vars(raw, &self.env_vars)?;
        debug!("Fetched config {}/{}", section, key);
        self.recorded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fetched
            .insert(format!("{}/{}", section, key), value.clone());
        Ok(Some(value))
    }

    /// Fetch `key` from `section`, falling back to `default`
    pub fn get_or(&self, section: &str, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get(section, key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Password for `name`
    ///
    /// Uses a non-empty entry of the `passwords` section when present,
    /// otherwise generates one. The value is stable for the store's lifetime.
    pub fn password(&self, name: &str) -> String {
        if let Some(existing) = self
            .recorded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .passwords
            .get(name)
        {
            return existing.clone();
        }

        let configured = self
            .sections
            .get(PASSWORD_SECTION)
            .and_then(|s| s.get(name))
            .and_then(|raw| resolve_env_vars(raw, &self.env_vars).ok())
            .filter(|value| !value.is_empty());

        let password = match configured {
            Some(value) => value,
            None => {
                debug!("Generating password for {}", name);
                generate_password(PASSWORD_LENGTH)
            }
        };

        self.recorded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .passwords
            .entry(name.to_string())
            .or_insert(password)
            .clone()
    }

    /// Connection string for database `dbname` on the configured server
    pub fn db_dsn(&self, dbname: &str) -> Result<String> {
        let db_type = self.get_or(DB_SECTION, "type", "mysql")?;
        let user = self.get_or(DB_SECTION, "user", "root")?;
        let host = self.get_or(DB_SECTION, "host", "localhost")?;
        let port = self.get_or(DB_SECTION, "port", "3306")?;
        let password = self.password("sql");

        let dsn = format!(
            "{}://{}:{}@{}:{}/{}",
            db_type, user, password, host, port, dbname
        );
        self.recorded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .dsns
            .insert(dbname.to_string(), dsn.clone());
        Ok(dsn)
    }

    /// Render a template, resolving passwords, config references and environment variables
    pub fn render(&self, template: &str) -> Result<String> {
        let with_passwords = resolve_passwords(template, |name| self.password(name));
        let with_refs = resolve_references(&with_passwords, |section, key| self.get(section, key))?;
        resolve_env_vars(&with_refs, &self.env_vars)
    }

    /// Passwords handed out so far
    pub fn passwords(&self) -> BTreeMap<String, String> {
        self.recorded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .passwords
            .clone()
    }

    /// Config values fetched so far, keyed `section/key`
    pub fn fetched(&self) -> BTreeMap<String, String> {
        self.recorded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .fetched
            .clone()
    }

    /// Database connection strings built so far, keyed by database name
    pub fn dsns(&self) -> BTreeMap<String, String> {
        self.recorded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dsns
            .clone()
    }
}

fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
