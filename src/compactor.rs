// src/compactor.rs
use crate::config::{load_config, Config, DatabaseConfig};
use crate::network::discovery::{list_local_addresses, AddressSource, OwnAddressSet};
use crate::network::locality::is_local;
use crate::storage::engine::{compact_file, LogEngine};
use crate::Error;
use std::fmt;
use std::future::Future;
use std::path::Path;

/// The two databases an ioBroker data directory can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseRole {
    States,
    Objects,
}

impl DatabaseRole {
    pub const ALL: [DatabaseRole; 2] = [DatabaseRole::States, DatabaseRole::Objects];

    pub fn name(self) -> &'static str {
        match self {
            DatabaseRole::States => "states",
            DatabaseRole::Objects => "objects",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            DatabaseRole::States => "states.jsonl",
            DatabaseRole::Objects => "objects.jsonl",
        }
    }

    /// The role's block from `config`, if present and shaped like one.
    pub fn select(self, config: &Config) -> Option<DatabaseConfig> {
        let block = match self {
            DatabaseRole::States => config.states.as_ref(),
            DatabaseRole::Objects => config.objects.as_ref(),
        }?;
        DatabaseConfig::from_block(block)
    }
}

impl fmt::Display for DatabaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub enum CompactionOutcome {
    Compacted,
    SkippedRemote,
    SkippedMissingFile,
    /// No config block for the role, or a store type that is never local.
    SkippedWrongType,
    Failed(Error),
}

impl CompactionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CompactionOutcome::Failed(_))
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<(DatabaseRole, CompactionOutcome)>,
    /// The config file existed but could not be read or parsed.
    pub config_error: bool,
}

impl RunReport {
    pub fn compacted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, CompactionOutcome::Compacted))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.config_error || self.outcomes.iter().any(|(_, outcome)| outcome.is_failure())
    }

    pub fn outcome(&self, role: DatabaseRole) -> Option<&CompactionOutcome> {
        self.outcomes
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, outcome)| outcome)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.compacted() {
            0 => write!(f, "No JSONL files found to compress, skip"),
            n => write!(f, "Compressed {} JSONL files. Done", n),
        }
    }
}

/// Compacts the local JSONL databases of one data directory, one role after
/// the other.
pub struct Compactor<E, S> {
    engine: E,
    addresses: S,
}

impl<E: LogEngine, S: AddressSource> Compactor<E, S> {
    pub fn new(engine: E, addresses: S) -> Self {
        Compactor { engine, addresses }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn run(&self, dir: &Path) -> RunReport {
        let mut config_error = false;
        let config = match load_config(dir) {
            Ok(config) => Some(config),
            Err(e) if e.is_benign() => {
                log::info!("{} is not a valid ioBroker directory, skip", dir.display());
                None
            }
            Err(e) => {
                log::error!("Cannot check config file in {}: {}", dir.display(), e);
                config_error = true;
                None
            }
        };

        let mut outcomes = Vec::with_capacity(DatabaseRole::ALL.len());
        match config {
            Some(config) => {
                let own = list_local_addresses(&self.addresses);
                for role in DatabaseRole::ALL {
                    let outcome = self.compact_role(dir, role, role.select(&config), &own).await;
                    outcomes.push((role, outcome));
                }
            }
            None => {
                for role in DatabaseRole::ALL {
                    outcomes.push((role, CompactionOutcome::SkippedWrongType));
                }
            }
        }

        RunReport {
            outcomes,
            config_error,
        }
    }

    async fn compact_role(
        &self,
        dir: &Path,
        role: DatabaseRole,
        db: Option<DatabaseConfig>,
        own: &OwnAddressSet,
    ) -> CompactionOutcome {
        let Some(db) = db.filter(|db| !db.is_remote_type()) else {
            log::debug!("{} database is not file based, skip", role);
            return CompactionOutcome::SkippedWrongType;
        };
        if !is_local(&db.host, own) {
            log::info!("{} database is not hosted on this machine ({:?}), skip", role, db.host);
            return CompactionOutcome::SkippedRemote;
        }

        let path = dir.join(role.file_name());
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => {
                log::info!("{} not found to compress, skip", role.file_name());
                return CompactionOutcome::SkippedMissingFile;
            }
            Err(e) => {
                log::error!("Cannot compress {}: {}", role.file_name(), e);
                return CompactionOutcome::Failed(Error::Io(e));
            }
        }

        log::info!("Compressing {}", path.display());
        match compact_file(&self.engine, &path).await {
            Ok(()) => CompactionOutcome::Compacted,
            Err(e) => {
                log::error!("Cannot compress {}: {}", role.file_name(), e);
                CompactionOutcome::Failed(e)
            }
        }
    }
}

/// Drives a run on its own task so a panic inside it is logged and reported
/// as `None` instead of tearing down the process.
pub async fn run_isolated<F>(run: F) -> Option<RunReport>
where
    F: Future<Output = RunReport> + Send + 'static,
{
    match tokio::spawn(run).await {
        Ok(report) => Some(report),
        Err(e) => {
            log::error!("Compaction run aborted: {}", e);
            None
        }
    }
}
