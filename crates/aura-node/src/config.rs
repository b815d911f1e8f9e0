use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub api: ApiConfig,
    pub leaderboard: LeaderboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub name: String,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Staleness bound for the global view, in seconds.
    pub ttl_secs: i64,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            name: "aura-node".to_string(),
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            ttl_secs: aura_rank::LEADERBOARD_TTL_SECS,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node: NodeSettings::default(),
            api: ApiConfig::default(),
            leaderboard: LeaderboardConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut config: NodeConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Environment variables win over the file, for container deployments.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = env::var("AURA_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = env::var("AURA_API_PORT") {
            if let Ok(port) = port.parse() {
                self.api.port = port;
            }
        }
        if let Ok(ttl) = env::var("AURA_LEADERBOARD_TTL_SECS") {
            if let Ok(ttl) = ttl.parse() {
                self.leaderboard.ttl_secs = ttl;
            }
        }
        if let Ok(name) = env::var("AURA_NODE_NAME") {
            self.node.name = name;
        }
    }
}
