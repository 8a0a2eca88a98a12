//! Project overview:
//! - Computes the S3 multipart ETag of a local file without talking to S3
//! - Splits the input into fixed-size parts, MD5s them in parallel, then
//!   MD5s the concatenated part digests (the "hash of hashes")
//! - Uses a producer-consumer model: a bounded work queue feeds digest
//!   workers, and a single collector gathers results by part number
//! - Worker count is tunable; 0 or 1 worker hashes sequentially on the
//!   calling thread with identical output
//!
//! Key behaviors:
//! - Single-part input: the ETag is the plain MD5 hex, no suffix
//! - Multipart input: `<md5 of digests>-<part count>`
//! - The first read failure cancels all outstanding work and is returned;
//!   a partial ETag is never produced
//! - Callers can cancel a running computation through a `CancelToken`
//!
//! Flags:
//! - no_progress: disables the progress bar

pub mod backends;
pub mod cancel;
pub mod digest;
pub mod engine;
pub mod parts;
pub mod utils;

pub use backends::{open_source, HashError, LocalSource, MemorySource, Source};
pub use cancel::CancelToken;
pub use digest::Etag;
pub use parts::{partition, PartSpec};

use std::path::Path;
use std::sync::Arc;

pub const MIB: u64 = 1024 * 1024;

/// Smallest part size S3 accepts for every part but the last.
pub const MIN_PART_SIZE: u64 = 5 * MIB;

/// Part size used by the AWS CLI unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * MIB;

/// Most parts a single S3 multipart upload may have.
pub const MAX_PARTS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct HashOptions {
    /// Part size in bytes. Must be greater than zero.
    pub chunk_size: u64,
    /// Digest threads. 0 or 1 hashes sequentially.
    pub workers: usize,
    pub no_progress: bool,
}

impl HashOptions {
    /// Options with the progress bar disabled.
    pub fn new(chunk_size: u64, workers: usize) -> Self {
        Self {
            chunk_size,
            workers,
            no_progress: true,
        }
    }
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: num_cpus::get(),
            no_progress: true,
        }
    }
}

/// Compute the S3 ETag of `source`, e.g. `"38a7e5991be21b577978abb001323b0a-20"`.
pub fn calculate(source: Arc<dyn Source>, options: &HashOptions) -> Result<String, HashError> {
    let etag = calculate_with_cancel(source, options, &CancelToken::new())?;
    Ok(etag.to_string())
}

/// Like [`calculate`], but stops early with [`HashError::Cancelled`] once
/// `cancel` fires. Cancellation is checked between parts, so a part being
/// read when it fires is finished first.
pub fn calculate_with_cancel(
    source: Arc<dyn Source>,
    options: &HashOptions,
    cancel: &CancelToken,
) -> Result<Etag, HashError> {
    engine::run(source, options, cancel)
}

/// Open `path` and compute its S3 ETag.
pub fn calculate_for_file<P: AsRef<Path>>(
    path: P,
    options: &HashOptions,
) -> Result<String, HashError> {
    let source = open_source(path.as_ref())?;
    log::debug!("Opened {:?} ({} bytes)", path.as_ref(), source.len());
    calculate(source, options)
}
