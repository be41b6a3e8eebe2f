// src/process_tree/unix.rs

use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// ESRCH: no such process or group.
    Gone,
    Failed,
}

/// Kill descendants leaf-first, then the process group led by `root`.
pub(super) fn kill_tree(root: u32, descendants: &[u32]) -> Vec<u32> {
    let mut failed = Vec::new();

    for &pid in descendants.iter().rev() {
        if signal(pid as libc::pid_t, libc::SIGKILL) == Delivery::Failed {
            failed.push(pid);
        }
    }

    // Negative pid: the whole group. Workers are spawned with
    // `process_group(0)`, so the group id equals the worker's pid.
    if signal(-(root as libc::pid_t), libc::SIGKILL) != Delivery::Sent {
        // No such group: fall back to the root alone.
        if signal(root as libc::pid_t, libc::SIGKILL) == Delivery::Failed {
            failed.push(root);
        }
    }

    failed
}

/// Kill what is left of the group led by an already reaped `root`. The root
/// pid itself is never signalled, since it may have been reused.
pub(super) fn kill_group(root: u32) -> Vec<u32> {
    match signal(-(root as libc::pid_t), libc::SIGKILL) {
        Delivery::Sent | Delivery::Gone => Vec::new(),
        Delivery::Failed => vec![root],
    }
}

fn signal(target: libc::pid_t, sig: libc::c_int) -> Delivery {
    // SAFETY: kill(2) takes plain integers and touches no memory of ours;
    // a stale or foreign pid only yields an error code.
    let result = unsafe { libc::kill(target, sig) };
    if result == 0 {
        return Delivery::Sent;
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Delivery::Gone;
    }
    tracing::debug!(pid = target, error = %err, "kill failed");
    Delivery::Failed
}
