//! Process liveness probing.

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::kill;
#[cfg(unix)]
use nix::unistd::Pid;

/// Probes whether a process id refers to a live process.
///
/// Sends signal 0: an existence check with no side effects. `EPERM` counts
/// as alive (the process exists but belongs to someone else); `ESRCH` and
/// unexpected errors count as dead, which errs towards pruning.
#[cfg(unix)]
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Probes whether a process id refers to a live process.
///
/// Non-Unix platforms lack a cheap existence signal; records are trusted
/// until a connection attempt disproves them.
#[cfg(not(unix))]
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    pid != 0
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;

    #[test]
    fn own_process_is_alive() {
        assert!(process_alive(std::process::id()));
    }

    #[test]
    fn pid_zero_is_never_alive() {
        assert!(!process_alive(0));
    }

    #[cfg(unix)]
    #[test]
    fn reaped_child_is_dead() {
        use std::process::Command;

        let mut child = Command::new("true").spawn().expect("spawn true");
        let pid = child.id();
        child.wait().expect("wait for child");
        assert!(!process_alive(pid));
    }
}
