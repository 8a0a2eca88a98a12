pub mod local;
pub mod memory;

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub enum HashError {
    /// Rejected before any work starts, e.g. a zero chunk size.
    InvalidConfig(String),
    Io(io::Error),
    /// End of input was reached before a part was fully read.
    ShortRead {
        part: usize,
        expected: u64,
        actual: u64,
    },
    Cancelled,
    /// A part index never received a result. Should be unreachable.
    Incomplete(usize),
    WorkerPanicked,
}

impl HashError {
    /// Read faults and short reads, as opposed to cancellation or bad config.
    pub fn is_io(&self) -> bool {
        matches!(self, HashError::Io(_) | HashError::ShortRead { .. })
    }
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            HashError::Io(e) => write!(f, "io error: {}", e),
            HashError::ShortRead {
                part,
                expected,
                actual,
            } => write!(
                f,
                "short read on part {}: expected {} bytes, got {}",
                part, expected, actual
            ),
            HashError::Cancelled => write!(f, "operation cancelled"),
            HashError::Incomplete(part) => write!(f, "results incomplete: part {} missing", part),
            HashError::WorkerPanicked => write!(f, "digest worker panicked"),
        }
    }
}

impl std::error::Error for HashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HashError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HashError {
    fn from(e: io::Error) -> Self {
        HashError::Io(e)
    }
}

/// Random-access input of fixed length.
///
/// `read_at` must not depend on or move any shared cursor: several digest
/// workers call it concurrently for disjoint ranges.
pub trait Source: Send + Sync {
    fn len(&self) -> u64;

    /// Read up to `buf.len()` bytes starting at `offset`. Returns 0 at end of input.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub use local::LocalSource;
pub use memory::MemorySource;

/// Open a file on disk as a shareable source.
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<Arc<dyn Source>, HashError> {
    let source = LocalSource::open(path)?;
    Ok(Arc::new(source))
}
