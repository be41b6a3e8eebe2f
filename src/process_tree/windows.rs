// src/process_tree/windows.rs

use sysinfo::{Pid, ProcessesToUpdate, System};

/// Terminate descendants leaf-first, then the root.
pub(super) fn kill_tree(root: u32, descendants: &[u32]) -> Vec<u32> {
    let mut targets: Vec<u32> = descendants.iter().rev().copied().collect();
    targets.push(root);
    kill_pids(&targets)
}

/// Terminate `pids` in the given order.
pub(super) fn kill_pids(pids: &[u32]) -> Vec<u32> {
    let targets: Vec<Pid> = pids.iter().map(|p| Pid::from_u32(*p)).collect();

    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&targets), true);

    let mut failed = Vec::new();
    for pid in targets {
        // Missing from the table means it already exited.
        if let Some(process) = system.process(pid) {
            if !process.kill() {
                failed.push(pid.as_u32());
            }
        }
    }
    failed
}
