//! Service configuration, read from the environment.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// JSON file holding the classroom registry.
    pub classrooms_file: PathBuf,

    /// Default log filter; `RUST_LOG` takes precedence when set.
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("SEATING_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse::<SocketAddr>()
            .context("SEATING_BIND_ADDR must be a socket address such as 127.0.0.1:8080.")?;

        let classrooms_file = std::env::var("SEATING_CLASSROOMS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("classrooms.json"));

        let log_level = std::env::var("SEATING_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            bind_addr,
            classrooms_file,
            log_level,
        })
    }
}
