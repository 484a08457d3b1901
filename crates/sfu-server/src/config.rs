use std::fs;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_control_addr() -> String {
    "0.0.0.0:8888".to_string()
}

fn default_media_addr() -> String {
    "0.0.0.0:8889".to_string()
}

fn default_log_filter() -> String {
    "sfu_server=info,sfu_core=info".to_string()
}

fn default_room() -> String {
    "general".to_string()
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_control_addr")]
    pub control_addr: String,
    #[serde(default = "default_media_addr")]
    pub media_addr: String,
    #[serde(default = "default_room")]
    pub default_room: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            control_addr: default_control_addr(),
            media_addr: default_media_addr(),
            default_room: default_room(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to built-in defaults if the file
    /// doesn't exist -- so running with no setup at all still works, the
    /// same convention `paracord-server::config::Config` follows.
    pub fn load(path: &str) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                toml::from_str(&contents).with_context(|| format!("parsing config file {path}"))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e).with_context(|| format!("reading config file {path}")),
        }
    }

    pub fn control_addr(&self) -> Result<SocketAddr> {
        self.server
            .control_addr
            .parse()
            .with_context(|| format!("invalid control_addr {:?}", self.server.control_addr))
    }

    pub fn media_addr(&self) -> Result<SocketAddr> {
        self.server
            .media_addr
            .parse()
            .with_context(|| format!("invalid media_addr {:?}", self.server.media_addr))
    }
}
