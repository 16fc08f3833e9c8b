//! Shared helpers for the end-to-end test suite

use cmdwrap_process::Invocation;

/// Invocation running `script` under `sh -c`
pub fn sh(script: &str) -> Invocation {
    Invocation::new("sh").args(["-c", script])
}

/// Whether a process with this pid still exists
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(_) => true,
    }
}
