use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::db::{ConnectTarget, Identifier};
use crate::error::DemoError;

pub const ENV_PREFIX: &str = "DEMO_SERVER_";

/// Process-wide configuration, loaded once from defaults and `DEMO_SERVER_*` env vars.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| match Config::load() {
    Ok(cfg) => cfg,
    Err(e) => {
        eprintln!("failed to load configuration: {e}");
        std::process::exit(1);
    }
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    /// Database the table operations run against.
    pub db_name: String,
    pub table_name: String,
    pub listen_addr: String,
    pub loglevel: String,
    /// File that receives a copy of every log line; `None` logs to stdout only.
    pub logfile: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_host: "127.0.0.1".to_string(),
            db_port: 5432,
            db_user: "postgres".to_string(),
            db_password: "mysecretpassword".to_string(),
            db_name: "names_db".to_string(),
            table_name: "names".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            logfile: Some(PathBuf::from("demo_server.log")),
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, DemoError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, DemoError> {
        Ok(figment.extract()?)
    }

    pub fn connect_target(&self) -> ConnectTarget {
        ConnectTarget {
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
        }
    }

    pub fn database(&self) -> Result<Identifier, DemoError> {
        Identifier::new(&self.db_name)
    }

    pub fn table(&self) -> Result<Identifier, DemoError> {
        Identifier::new(&self.table_name)
    }
}
