//! Record persistence and staleness pruning.

use std::fs;
use std::io::{self, Write};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use drover_config::{SessionName, SocketEndpoint, runtime_directory};

use crate::liveness::process_alive;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");
const RECORD_PREFIX: &str = "session-";
const RECORD_SUFFIX: &str = ".json";

/// Persisted record describing one live session daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Process id of the daemon owning the session.
    pub pid: u32,
    /// Transport endpoint the daemon listens on.
    pub endpoint: SocketEndpoint,
}

/// Filesystem-backed mapping from session names to daemon records.
#[derive(Debug, Clone)]
pub struct Registry {
    dir: Utf8PathBuf,
}

impl Registry {
    /// Opens the registry in the shared runtime directory.
    #[must_use]
    pub fn open_default() -> Self {
        Self::at(runtime_directory())
    }

    /// Opens a registry rooted at an explicit directory (used by tests).
    #[must_use]
    pub fn at(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Looks up a session and probes the recorded process for liveness.
    ///
    /// Returns `None` when no record exists or the recorded process is dead;
    /// dead and unreadable records are deleted opportunistically.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the record exists but cannot be read
    /// for reasons other than staleness (for example permissions).
    pub fn resolve(&self, name: &SessionName) -> Result<Option<SessionRecord>, RegistryError> {
        let path = self.record_path(name);
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(RegistryError::Read { path, source }),
        };
        let record: SessionRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(error) => {
                warn!(
                    target: REGISTRY_TARGET,
                    session = %name,
                    error = %error,
                    "removing unreadable registry record"
                );
                self.remove_record(&path)?;
                return Ok(None);
            }
        };
        if !process_alive(record.pid) {
            debug!(
                target: REGISTRY_TARGET,
                session = %name,
                pid = record.pid,
                "pruning stale registry record"
            );
            self.remove_record(&path)?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Atomically persists a record, overwriting any prior entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the directory cannot be prepared or
    /// the rename-into-place write fails.
    pub fn register(
        &self,
        name: &SessionName,
        record: &SessionRecord,
    ) -> Result<(), RegistryError> {
        self.prepare_directory()?;
        let path = self.record_path(name);
        let mut staged = NamedTempFile::new_in(self.dir.as_std_path()).map_err(|source| {
            RegistryError::Stage {
                path: self.dir.clone(),
                source,
            }
        })?;
        serde_json::to_writer(&mut staged, record)?;
        staged
            .write_all(b"\n")
            .and_then(|()| staged.flush())
            .map_err(|source| RegistryError::Stage {
                path: self.dir.clone(),
                source,
            })?;
        staged
            .persist(path.as_std_path())
            .map_err(|error| RegistryError::Persist {
                path: path.clone(),
                source: error.error,
            })?;
        debug!(
            target: REGISTRY_TARGET,
            session = %name,
            pid = record.pid,
            endpoint = %record.endpoint,
            "registered session"
        );
        Ok(())
    }

    /// Removes the record for a session; idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when an existing record cannot be removed.
    pub fn unregister(&self, name: &SessionName) -> Result<(), RegistryError> {
        self.remove_record(&self.record_path(name))
    }

    /// Enumerates sessions whose recorded process is currently alive,
    /// pruning stale records along the way.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the registry directory cannot be read.
    pub fn list(&self) -> Result<Vec<SessionName>, RegistryError> {
        let entries = match fs::read_dir(self.dir.as_std_path()) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RegistryError::Read {
                    path: self.dir.clone(),
                    source,
                });
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let listing = entry.map_err(|source| RegistryError::Read {
                path: self.dir.clone(),
                source,
            })?;
            let file_name = listing.file_name();
            let Some(name) = record_session_name(&file_name.to_string_lossy()) else {
                continue;
            };
            if self.resolve(&name)?.is_some() {
                names.push(name);
            }
        }
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(names)
    }

    fn record_path(&self, name: &SessionName) -> Utf8PathBuf {
        self.dir.join(format!("{RECORD_PREFIX}{name}{RECORD_SUFFIX}"))
    }

    fn prepare_directory(&self) -> Result<(), RegistryError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        match builder.create(self.dir.as_std_path()) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(RegistryError::Prepare {
                path: self.dir.clone(),
                source,
            }),
        }
    }

    fn remove_record(&self, path: &Utf8PathBuf) -> Result<(), RegistryError> {
        match fs::remove_file(path.as_std_path()) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RegistryError::Remove {
                path: path.clone(),
                source,
            }),
        }
    }
}

fn record_session_name(file_name: &str) -> Option<SessionName> {
    file_name
        .strip_prefix(RECORD_PREFIX)?
        .strip_suffix(RECORD_SUFFIX)?
        .parse()
        .ok()
}

/// Errors raised by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Creating the registry directory failed.
    #[error("failed to prepare registry directory '{path}': {source}")]
    Prepare {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading a record or the registry directory failed.
    #[error("failed to read registry entry '{path}': {source}")]
    Read {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Staging the temporary record file failed.
    #[error("failed to stage registry record in '{path}': {source}")]
    Stage {
        /// Directory the staged file lives in.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising a record failed.
    #[error("failed to serialise registry record: {0}")]
    Serialise(#[from] serde_json::Error),
    /// Renaming the staged record into place failed.
    #[error("failed to persist registry record '{path}': {source}")]
    Persist {
        /// Destination path of the record.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing a record failed.
    #[error("failed to remove registry record '{path}': {source}")]
    Remove {
        /// Path that could not be removed.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> (TempDir, Registry) {
        let dir = TempDir::new().expect("temp dir");
        let registry = Registry::at(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir"),
        );
        (dir, registry)
    }

    fn name(text: &str) -> SessionName {
        text.parse().expect("valid session name")
    }

    fn live_record() -> SessionRecord {
        SessionRecord {
            pid: std::process::id(),
            endpoint: SocketEndpoint::unix("/tmp/drover-test/session-default.sock"),
        }
    }

    #[rstest]
    fn resolve_unknown_session_returns_none(scratch: (TempDir, Registry)) {
        let (_dir, registry) = scratch;
        assert_eq!(registry.resolve(&name("ghost")).expect("resolve"), None);
    }

    #[rstest]
    fn register_then_resolve_round_trips(scratch: (TempDir, Registry)) {
        let (_dir, registry) = scratch;
        let record = live_record();
        registry.register(&name("work"), &record).expect("register");
        assert_eq!(
            registry.resolve(&name("work")).expect("resolve"),
            Some(record)
        );
    }

    #[rstest]
    fn register_overwrites_prior_entry(scratch: (TempDir, Registry)) {
        let (_dir, registry) = scratch;
        let session = name("work");
        registry.register(&session, &live_record()).expect("first");
        let replacement = SessionRecord {
            pid: std::process::id(),
            endpoint: SocketEndpoint::tcp("127.0.0.1", 4100),
        };
        registry.register(&session, &replacement).expect("second");
        assert_eq!(
            registry.resolve(&session).expect("resolve"),
            Some(replacement)
        );
    }

    #[cfg(unix)]
    #[rstest]
    fn dead_pid_is_pruned_and_stays_gone(scratch: (TempDir, Registry)) {
        use std::process::Command;

        let (_dir, registry) = scratch;
        let mut child = Command::new("true").spawn().expect("spawn true");
        let pid = child.id();
        child.wait().expect("wait for child");

        let session = name("stale");
        registry
            .register(
                &session,
                &SessionRecord {
                    pid,
                    endpoint: SocketEndpoint::tcp("127.0.0.1", 4101),
                },
            )
            .expect("register");

        assert_eq!(registry.resolve(&session).expect("first resolve"), None);
        // The prune is persistent: a second resolve also misses.
        assert_eq!(registry.resolve(&session).expect("second resolve"), None);
    }

    #[rstest]
    fn unregister_is_idempotent(scratch: (TempDir, Registry)) {
        let (_dir, registry) = scratch;
        let session = name("work");
        registry.register(&session, &live_record()).expect("register");
        registry.unregister(&session).expect("first unregister");
        registry.unregister(&session).expect("second unregister");
        assert_eq!(registry.resolve(&session).expect("resolve"), None);
    }

    #[rstest]
    fn list_returns_live_sessions_sorted(scratch: (TempDir, Registry)) {
        let (_dir, registry) = scratch;
        registry.register(&name("beta"), &live_record()).expect("b");
        registry.register(&name("alpha"), &live_record()).expect("a");
        let names: Vec<String> = registry
            .list()
            .expect("list")
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["alpha".to_owned(), "beta".to_owned()]);
    }

    #[rstest]
    fn corrupt_records_are_pruned(scratch: (TempDir, Registry)) {
        let (dir, registry) = scratch;
        let path = dir.path().join("session-bad.json");
        fs::write(&path, b"{not json").expect("write corrupt record");
        assert_eq!(registry.resolve(&name("bad")).expect("resolve"), None);
        assert!(!path.exists());
    }

    #[rstest]
    fn list_ignores_foreign_files(scratch: (TempDir, Registry)) {
        let (dir, registry) = scratch;
        fs::write(dir.path().join("README"), b"not a record").expect("write");
        registry.register(&name("only"), &live_record()).expect("register");
        assert_eq!(registry.list().expect("list").len(), 1);
    }
}
