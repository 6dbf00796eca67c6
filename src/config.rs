use serde::Deserialize;

/// Which store backs the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    Memory,
}

/// Runtime configuration, read from `QUEUESTATS_*` environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageKind,
    pub db_path: Option<String>,
    #[serde(default)]
    pub in_memory: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> eyre::Result<Self> {
        Ok(envy::prefixed("QUEUESTATS_").from_env::<Self>()?)
    }

    pub fn db_path(&self) -> &str {
        self.db_path.as_deref().unwrap_or("queuestats.db")
    }

    /// Config for a private in-memory database, used by tests and local runs.
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            db_path: None,
            in_memory: false,
            host: default_host(),
            port: default_port(),
        }
    }
}
