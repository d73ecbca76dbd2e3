//! Best-effort NUMA topology discovery and CPU pinning for acceptor threads
//! (spec.md §4.9: "pinned to a CPU chosen from a distinct NUMA node when topology
//! permits"). Falls back to a single node spanning every CPU when sysfs topology
//! is unavailable (non-Linux hosts, containers without `/sys` mounted).

use std::fs;

fn parse_cpulist(raw: &str) -> Vec<usize> {
    let mut cpus = Vec::new();
    for part in raw.trim().split(',') {
        if part.is_empty() {
            continue;
        }
        if let Some((lo, hi)) = part.split_once('-') {
            if let (Ok(lo), Ok(hi)) = (lo.parse(), hi.parse()) {
                cpus.extend(lo..=hi);
            }
        } else if let Ok(cpu) = part.parse() {
            cpus.push(cpu);
        }
    }
    cpus
}

fn all_cpus() -> Vec<usize> {
    let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (0..n).collect()
}

/// Discovers NUMA nodes and the CPUs that belong to each, reading
/// `/sys/devices/system/node/nodeN/cpulist`.
pub fn topology() -> Vec<Vec<usize>> {
    let Ok(entries) = fs::read_dir("/sys/devices/system/node") else {
        return vec![all_cpus()];
    };
    let mut nodes = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(digits) = name.strip_prefix("node") else { continue };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if let Ok(raw) = fs::read_to_string(entry.path().join("cpulist")) {
            let cpus = parse_cpulist(&raw);
            if !cpus.is_empty() {
                nodes.push(cpus);
            }
        }
    }
    if nodes.is_empty() {
        nodes.push(all_cpus());
    }
    nodes
}

/// Pins the calling thread to the first CPU in `node_cpus`; any CPU within the
/// node satisfies "a CPU chosen from a distinct NUMA node".
#[cfg(target_os = "linux")]
pub fn pin_current_thread(node_cpus: &[usize]) {
    let Some(&cpu) = node_cpus.first() else { return };
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        let rc = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if rc != 0 {
            tracing::debug!(cpu, "sched_setaffinity failed, continuing unpinned");
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_node_cpus: &[usize]) {}
