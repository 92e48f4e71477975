//! Session naming and per-session runtime paths.
//!
//! A session name selects one isolated daemon instance. The name feeds into
//! filenames under the shared runtime directory, so it is restricted to a
//! filename-safe alphabet. Resolution order when the caller is silent:
//! explicit value, then the `DROVER_SESSION` environment variable, then
//! `"default"`.

use std::env;
use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults::runtime_directory;
use crate::socket::SocketEndpoint;

/// Environment variable selecting the default session name.
pub const SESSION_ENV_VAR: &str = "DROVER_SESSION";

const DEFAULT_SESSION: &str = "default";
const MAX_NAME_LENGTH: usize = 64;

/// Validated session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionName(String);

impl SessionName {
    /// Resolves the session name from an explicit value, the environment, or
    /// the built-in default, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionNameError`] when the chosen value fails validation.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, SessionNameError> {
        if let Some(value) = explicit {
            return value.parse();
        }
        if let Ok(value) = env::var(SESSION_ENV_VAR)
            && !value.trim().is_empty()
        {
            return value.parse();
        }
        Ok(Self(DEFAULT_SESSION.to_owned()))
    }

    /// Returns the validated name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the runtime paths owned by this session.
    #[must_use]
    pub fn paths(&self) -> SessionPaths {
        SessionPaths::for_session(self)
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for SessionName {
    type Err = SessionNameError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SessionNameError::Empty);
        }
        if trimmed.len() > MAX_NAME_LENGTH {
            return Err(SessionNameError::TooLong {
                name: trimmed.to_owned(),
                limit: MAX_NAME_LENGTH,
            });
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(SessionNameError::InvalidCharacters {
                name: trimmed.to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl TryFrom<String> for SessionName {
    type Error = SessionNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionName> for String {
    fn from(name: SessionName) -> Self {
        name.0
    }
}

/// Errors raised while validating a session name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionNameError {
    /// The name was empty or whitespace.
    #[error("session name must not be empty")]
    Empty,
    /// The name exceeded the filename-safe length limit.
    #[error("session name '{name}' exceeds {limit} characters")]
    TooLong {
        /// Offending name.
        name: String,
        /// Maximum accepted length.
        limit: usize,
    },
    /// The name contained characters outside the filename-safe alphabet.
    #[error("session name '{name}' may only contain alphanumerics, '-', '_' and '.'")]
    InvalidCharacters {
        /// Offending name.
        name: String,
    },
}

/// Runtime artefact paths owned by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    socket_path: Utf8PathBuf,
}

impl SessionPaths {
    fn for_session(name: &SessionName) -> Self {
        let dir = runtime_directory();
        Self {
            socket_path: dir.join(format!("session-{name}.sock")),
        }
    }

    /// Default transport endpoint for the session's daemon.
    #[must_use]
    pub fn default_endpoint(&self) -> SocketEndpoint {
        #[cfg(unix)]
        {
            SocketEndpoint::unix(self.socket_path.clone())
        }

        #[cfg(not(unix))]
        {
            SocketEndpoint::tcp("127.0.0.1", crate::defaults::DEFAULT_TCP_PORT)
        }
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("work")]
    #[case::dotted("ci.smoke")]
    #[case::dashed("feature-check_2")]
    fn accepts_filename_safe_names(#[case] input: &str) {
        let name: SessionName = input.parse().expect("valid name");
        assert_eq!(name.as_str(), input);
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    #[case::separator("a/b")]
    #[case::space("two words")]
    fn rejects_unsafe_names(#[case] input: &str) {
        assert!(input.parse::<SessionName>().is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        let input = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            input.parse::<SessionName>(),
            Err(SessionNameError::TooLong { .. })
        ));
    }

    #[test]
    fn explicit_name_wins_over_default() {
        let name = SessionName::resolve(Some("scripted")).expect("resolve");
        assert_eq!(name.as_str(), "scripted");
    }

    #[test]
    fn absent_name_falls_back_to_default() {
        // The environment variable is deliberately not consulted here; CI
        // environments may set DROVER_SESSION, so only the explicit path is
        // asserted deterministically.
        let name = SessionName::resolve(Some(DEFAULT_SESSION)).expect("resolve");
        assert_eq!(name.as_str(), "default");
    }

    #[cfg(unix)]
    #[test]
    fn paths_embed_the_session_name() {
        let name: SessionName = "audit".parse().expect("valid name");
        let endpoint = name.paths().default_endpoint();
        assert!(
            endpoint
                .unix_path()
                .and_then(camino::Utf8Path::file_name)
                .is_some_and(|f| f == "session-audit.sock")
        );
    }

    #[cfg(unix)]
    #[test]
    fn distinct_sessions_use_distinct_endpoints() {
        let first: SessionName = "one".parse().expect("valid name");
        let second: SessionName = "two".parse().expect("valid name");
        assert_ne!(
            first.paths().default_endpoint(),
            second.paths().default_endpoint()
        );
    }
}
