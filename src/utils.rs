use std::ops::Not;

/// Outcome of verifying a file against an expected ETag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
}

impl Not for Status {
    type Output = Status;

    fn not(self) -> Self::Output {
        match self {
            Status::Passed => Status::Failed,
            Status::Failed => Status::Passed,
        }
    }
}

impl From<bool> for Status {
    fn from(ok: bool) -> Self {
        if ok {
            Status::Passed
        } else {
            Status::Failed
        }
    }
}

pub fn size_to_human_readable(size: f64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut size = size;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size, UNITS[unit])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// Resolve a worker count given on the command line.
///
/// Negative values are a multiple of the CPU count (`-2` means two workers
/// per core). Zero means hash sequentially.
pub fn resolve_workers(requested: i64, cpus: usize) -> usize {
    if requested < 0 {
        cpus.saturating_mul(requested.unsigned_abs() as usize)
    } else {
        requested as usize
    }
}
