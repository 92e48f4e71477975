//! Default locations and values shared by the binaries.

use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

/// Default TCP port used when Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 9821;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Computes the directory holding per-session sockets and registry records.
///
/// Prefers the user runtime directory (`$XDG_RUNTIME_DIR/drover`) and falls
/// back to a uid-namespaced directory under the system temp location so
/// concurrent users never share registry state.
#[must_use]
pub fn runtime_directory() -> Utf8PathBuf {
    runtime_directory_inner()
}

#[cfg(unix)]
fn runtime_directory_inner() -> Utf8PathBuf {
    if let Some(dir) = runtime_dir()
        && let Ok(mut base) = Utf8PathBuf::from_path_buf(dir)
    {
        base.push("drover");
        return base;
    }
    let mut base = fallback_base_directory();
    base.push("drover");
    base.push(user_namespace());
    base
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: geteuid cannot fail and touches no shared state.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn runtime_directory_inner() -> Utf8PathBuf {
    let mut base = Utf8PathBuf::from_path_buf(env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("."));
    base.push("drover");
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_directory_is_namespaced_under_drover() {
        let dir = runtime_directory();
        assert!(
            dir.components().any(|c| c.as_str() == "drover"),
            "unexpected runtime directory: {dir}"
        );
    }
}
