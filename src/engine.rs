//! The digest engine: partition, digest every part, combine.
//!
//! With more than one worker the engine runs a producer-consumer pipeline:
//! - a producer thread feeds part descriptors, in ascending order, into a
//!   bounded work queue;
//! - `workers` digest threads pull parts, hash them and send
//!   `(index, digest | error)` back on a bounded result channel;
//! - the calling thread collects results into a map keyed by part index. It
//!   is the only thread touching that map, so the map needs no lock.
//!
//! The first failure (or an external cancellation) fires an internal halt
//! token that the producer and every worker observe between parts. All
//! threads are joined before returning. With zero or one worker the same
//! partition, digest and combine steps run inline on the calling thread.

use crossbeam_channel::{bounded, select};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crate::backends::{HashError, Source};
use crate::cancel::CancelToken;
use crate::digest::{combine, digest_part, Etag, PartDigest};
use crate::parts::{partition, Parts};
use crate::utils::size_to_human_readable;
use crate::{HashOptions, MAX_PARTS};

/// Upper bound on each worker's read buffer.
const READ_BUF_SIZE: usize = 1 << 20;

struct PartResult {
    index: usize,
    outcome: Result<PartDigest, HashError>,
}

/// Compute the ETag of `source` according to `options`.
pub fn run(
    source: Arc<dyn Source>,
    options: &HashOptions,
    cancel: &CancelToken,
) -> Result<Etag, HashError> {
    let total_len = source.len();
    let parts = partition(total_len, options.chunk_size)?;
    let count = parts.len();
    if count > MAX_PARTS {
        warn!(
            "{} parts exceeds the S3 limit of {}; no real upload could produce this ETag",
            count, MAX_PARTS
        );
    }
    if cancel.is_cancelled() {
        return Err(HashError::Cancelled);
    }

    let workers = options.workers.min(count);
    info!(
        "Hashing {} as {} part(s) of {} using {} worker(s)",
        size_to_human_readable(total_len as f64),
        count,
        size_to_human_readable(options.chunk_size as f64),
        workers.max(1)
    );

    let buf_len = options.chunk_size.min(READ_BUF_SIZE as u64) as usize;
    let pb = progress_bar(total_len, options.no_progress);

    let result = if workers <= 1 {
        sequential(source.as_ref(), parts, buf_len, cancel, pb.as_ref())
    } else {
        parallel(source, parts, workers, buf_len, cancel, pb.clone())
    };

    if let Some(pb) = pb {
        match result {
            Ok(_) => pb.finish_with_message("Hash complete"),
            Err(_) => pb.abandon_with_message("Hash failed"),
        }
    }
    result
}

fn progress_bar(total_len: u64, no_progress: bool) -> Option<ProgressBar> {
    if no_progress {
        return None;
    }
    let pb = ProgressBar::new(total_len);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("Hashing...");
    Some(pb)
}

fn sequential(
    source: &dyn Source,
    parts: Parts,
    buf_len: usize,
    cancel: &CancelToken,
    pb: Option<&ProgressBar>,
) -> Result<Etag, HashError> {
    let mut buf = vec![0u8; buf_len];
    let mut digests = Vec::with_capacity(parts.len());
    for part in parts {
        if cancel.is_cancelled() {
            return Err(HashError::Cancelled);
        }
        digests.push(digest_part(source, &part, &mut buf)?);
        debug!("Digested part {} ({} bytes)", part.index, part.length);
        if let Some(pb) = pb {
            pb.inc(part.length);
        }
    }
    Ok(combine(&digests))
}

fn parallel(
    source: Arc<dyn Source>,
    parts: Parts,
    workers: usize,
    buf_len: usize,
    cancel: &CancelToken,
    pb: Option<ProgressBar>,
) -> Result<Etag, HashError> {
    let count = parts.len();
    let halt = CancelToken::new();
    let (work_tx, work_rx) = bounded(workers);
    let (result_tx, result_rx) = bounded::<PartResult>(workers);

    // Producer thread
    let producer_halt = halt.clone();
    let producer = thread::spawn(move || {
        for part in parts {
            if producer_halt.is_cancelled() {
                break;
            }
            select! {
                send(work_tx, part) -> res => if res.is_err() { break; },
                recv(producer_halt.done()) -> _ => break,
            }
        }
        // Dropping work_tx lets idle workers fall out of recv().
    });

    // Worker threads
    let mut handles = Vec::with_capacity(workers);
    for id in 0..workers {
        let work_rx = work_rx.clone();
        let result_tx = result_tx.clone();
        let source = Arc::clone(&source);
        let halt = halt.clone();
        let pb = pb.clone();

        handles.push(thread::spawn(move || {
            let mut buf = vec![0u8; buf_len];
            while let Ok(part) = work_rx.recv() {
                if halt.is_cancelled() {
                    break;
                }
                let outcome = digest_part(source.as_ref(), &part, &mut buf);
                if outcome.is_ok() {
                    debug!("Worker {} digested part {}", id, part.index);
                    if let Some(pb) = pb.as_ref() {
                        pb.inc(part.length);
                    }
                }
                let result = PartResult {
                    index: part.index,
                    outcome,
                };
                select! {
                    send(result_tx, result) -> res => if res.is_err() { break; },
                    recv(halt.done()) -> _ => break,
                }
            }
            debug!("Worker {} exiting", id);
        }));
    }
    drop(work_rx);
    drop(result_tx);

    // Collector: sole owner of the accumulator.
    let mut digests: HashMap<usize, PartDigest> = HashMap::with_capacity(count);
    let mut failure = None;
    while digests.len() < count {
        select! {
            recv(result_rx) -> msg => match msg {
                Ok(PartResult { index, outcome: Ok(digest) }) => {
                    digests.insert(index, digest);
                }
                Ok(PartResult { index, outcome: Err(e) }) => {
                    warn!("Part {} failed, cancelling remaining work: {}", index, e);
                    failure = Some(e);
                    break;
                }
                // Every worker has exited.
                Err(_) => break,
            },
            recv(cancel.done()) -> _ => {
                // An error that already reached us wins over the cancellation.
                let delivered = result_rx.try_iter().find_map(|r| r.outcome.err());
                info!("Cancelled after {} of {} parts", digests.len(), count);
                failure = Some(delivered.unwrap_or(HashError::Cancelled));
                break;
            }
        }
    }
    halt.cancel();
    drop(result_rx);

    let mut panicked = producer.join().is_err();
    for (i, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() {
            panicked = true;
        } else {
            debug!("Joined worker thread {}", i);
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }
    if panicked {
        return Err(HashError::WorkerPanicked);
    }

    let mut ordered = Vec::with_capacity(count);
    for index in 1..=count {
        match digests.remove(&index) {
            Some(digest) => ordered.push(digest),
            None => return Err(HashError::Incomplete(index)),
        }
    }
    Ok(combine(&ordered))
}
