//! Helpers shared by the process-level tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes an executable `/bin/sh` script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("script permissions");
    path
}

/// Shell snippet running the last argument as a local command, standing in for
/// a remote shell that executes the command it was given.
pub const RUN_LAST_ARG: &str = "for last; do :; done\neval \"$last\"";

/// Whether a process with `pid` still exists (zombies included).
pub fn process_alive(pid: u32) -> bool {
    // SAFETY: signal 0 only performs existence and permission checks.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}
