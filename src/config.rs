// src/config.rs
use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "iobroker.json";

/// Storage type that lives on a remote server and is never compacted locally.
pub const REMOTE_STORE_TYPE: &str = "redis";

/// The `host` field of a database block.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(untagged)]
pub enum DbHost {
    #[default]
    Missing,
    Single(String),
    // e.g. a list of sentinel/cluster members
    Multiple(serde_json::Value),
}

impl DbHost {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            DbHost::Single(host) => Some(host),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DatabaseConfig {
    // Kept as raw JSON: an unexpected type only means "not redis".
    #[serde(rename = "type", default)]
    pub db_type: Option<serde_json::Value>,
    #[serde(default)]
    pub host: DbHost,
}

impl DatabaseConfig {
    /// Interprets one role block. Anything that is not a JSON object yields
    /// `None`, leaving the other role unaffected.
    pub fn from_block(block: &serde_json::Value) -> Option<Self> {
        match serde_json::from_value(block.clone()) {
            Ok(db) => Some(db),
            Err(e) => {
                log::warn!("Ignoring malformed database block {}: {}", block, e);
                None
            }
        }
    }

    pub fn is_remote_type(&self) -> bool {
        self.db_type.as_ref().and_then(serde_json::Value::as_str) == Some(REMOTE_STORE_TYPE)
    }
}

/// Top-level `iobroker.json`. Role blocks stay unparsed until a role is
/// looked at.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub states: Option<serde_json::Value>,
    #[serde(default)]
    pub objects: Option<serde_json::Value>,
}

/// Reads `<dir>/iobroker.json`.
///
/// Returns `Error::ConfigNotFound` when the file is absent and
/// `Error::ConfigParse` when it is not valid JSON. Role blocks are checked
/// later, one at a time, by [`DatabaseConfig::from_block`].
pub fn load_config<P: AsRef<Path>>(dir: P) -> Result<Config> {
    let path = dir.as_ref().join(CONFIG_FILE_NAME);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::ConfigNotFound(path)),
        Err(e) => return Err(Error::Io(e)),
    };
    serde_json::from_str(&raw).map_err(|source| Error::ConfigParse { path, source })
}
