// src/process_tree/mod.rs

//! Forced termination of a process and everything it spawned.
//!
//! [`kill_process_tree`] handles a live worker that overran its deadline;
//! [`kill_orphans`] handles background children a worker left behind after
//! exiting normally. The platform backends decide how the tree is reached:
//! - POSIX: workers are spawned as leaders of their own process group, so the
//!   whole group is signalled, after every descendant found by a process
//!   table scan has been killed (that also covers children that moved to a
//!   different group).
//! - Windows: descendants found by a process table scan are terminated
//!   leaf-first, then the root.
//!
//! Descendants are always enumerated before anything is killed: once a parent
//! dies its children are re-parented and can no longer be found by walking
//! parent links.

use std::collections::{HashMap, HashSet};

use sysinfo::{Pid, ProcessesToUpdate, System};

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

/// What a tree kill did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillReport {
    pub root: u32,
    /// Descendants found at kill time, parents before children.
    pub descendants: Vec<u32>,
    /// Pids whose kill request failed for a reason other than "already gone".
    pub failed: Vec<u32>,
}

/// Kill `pid` and all of its descendants. Never fails; problems are logged
/// and reported in [`KillReport::failed`].
pub fn kill_process_tree(pid: u32) -> KillReport {
    let descendants = descendants_of(pid);
    tracing::debug!(pid, descendants = ?descendants, "killing process tree");

    #[cfg(unix)]
    let failed = unix::kill_tree(pid, &descendants);
    #[cfg(windows)]
    let failed = windows::kill_tree(pid, &descendants);
    #[cfg(not(any(unix, windows)))]
    let failed = Vec::new();

    for failed_pid in &failed {
        tracing::warn!(root = pid, pid = failed_pid, "could not kill process");
    }

    KillReport {
        root: pid,
        descendants,
        failed,
    }
}

/// Kill whatever `pid` left behind after it exited and was reaped.
///
/// On POSIX only the process group is signalled; the reaped pid may already
/// belong to an unrelated process. On Windows parent links survive the
/// parent's exit, so the descendants are found by a scan as usual.
pub fn kill_orphans(pid: u32) -> KillReport {
    #[cfg(unix)]
    let (descendants, failed) = (Vec::new(), unix::kill_group(pid));
    #[cfg(windows)]
    let (descendants, failed) = {
        let descendants = descendants_of(pid);
        let failed = windows::kill_pids(&descendants);
        (descendants, failed)
    };
    #[cfg(not(any(unix, windows)))]
    let (descendants, failed) = (Vec::new(), Vec::new());

    tracing::debug!(pid, descendants = ?descendants, "killing leftovers of exited process");
    for failed_pid in &failed {
        tracing::warn!(root = pid, pid = failed_pid, "could not kill process");
    }

    KillReport {
        root: pid,
        descendants,
        failed,
    }
}

/// Every transitive child of `root` in the current process table, in
/// breadth-first order. `root` itself is not included.
pub fn descendants_of(root: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (proc_pid, process) in system.processes() {
        if process.thread_kind().is_some() {
            continue;
        }
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*proc_pid);
        }
    }

    let root = Pid::from_u32(root);
    let mut order = Vec::new();
    let mut seen: HashSet<Pid> = HashSet::from([root]);
    let mut queue = std::collections::VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        if let Some(kids) = children.get(&current) {
            for kid in kids {
                if seen.insert(*kid) {
                    order.push(kid.as_u32());
                    queue.push_back(*kid);
                }
            }
        }
    }
    order
}

/// True if `pid` is present in the process table and is not a zombie.
pub fn is_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    match system.process(pid) {
        Some(process) => !matches!(process.status(), sysinfo::ProcessStatus::Zombie),
        None => false,
    }
}
