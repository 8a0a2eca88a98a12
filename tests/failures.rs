use s3hash::{
    calculate, calculate_with_cancel, CancelToken, HashError, HashOptions, MemorySource, Source,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Reports a longer length than it can actually deliver.
struct Truncated {
    inner: MemorySource,
    claimed_len: u64,
}

impl Source for Truncated {
    fn len(&self) -> u64 {
        self.claimed_len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read_at(offset, buf)
    }
}

/// Fails every read at or past `fail_from`.
struct Faulty {
    len: u64,
    fail_from: u64,
    reads: AtomicUsize,
}

impl Source for Faulty {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if offset >= self.fail_from {
            return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
        }
        let n = buf.len().min((self.len - offset) as usize);
        buf[..n].fill(0xab);
        Ok(n)
    }
}

/// Sleeps on every read.
struct Slow {
    len: u64,
    delay: Duration,
}

impl Source for Slow {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(self.delay);
        let n = buf.len().min((self.len - offset) as usize);
        buf[..n].fill(1);
        Ok(n)
    }
}

#[test]
fn test_truncated_input_is_a_short_read() {
    for workers in [0, 1, 4] {
        let src: Arc<dyn Source> = Arc::new(Truncated {
            inner: MemorySource::new(vec![7u8; 600]),
            claimed_len: 1000,
        });
        let err = calculate(src, &HashOptions::new(100, workers)).unwrap_err();
        match err {
            HashError::ShortRead { part, expected, actual } => {
                assert!(part >= 7, "part {}", part);
                assert_eq!(expected, 100);
                assert_eq!(actual, 0);
            }
            other => panic!("workers = {}: expected short read, got {:?}", workers, other),
        }
    }
}

#[test]
fn test_truncated_last_part_mid_range() {
    let src: Arc<dyn Source> = Arc::new(Truncated {
        inner: MemorySource::new(vec![7u8; 250]),
        claimed_len: 300,
    });
    let err = calculate(src, &HashOptions::new(100, 3)).unwrap_err();
    assert!(matches!(
        err,
        HashError::ShortRead { part: 3, expected: 100, actual: 50 }
    ));
}

#[test]
fn test_read_fault_never_yields_a_digest() {
    for workers in [0, 2, 8] {
        let src = Arc::new(Faulty {
            len: 64 * 1024,
            fail_from: 1024,
            reads: AtomicUsize::new(0),
        });
        let dyn_src: Arc<dyn Source> = src.clone();
        let err = calculate(dyn_src, &HashOptions::new(512, workers)).unwrap_err();
        assert!(err.is_io(), "workers = {}: {:?}", workers, err);
        // 128 parts; cancellation should stop well short of reading them all.
        assert!(src.reads.load(Ordering::SeqCst) < 128);
    }
}

#[test]
fn test_external_cancel_returns_promptly_and_joins_workers() {
    // 1000 parts at 20ms each is ~5s of work on 4 workers.
    let src = Arc::new(Slow {
        len: 100_000,
        delay: Duration::from_millis(20),
    });
    let dyn_src: Arc<dyn Source> = src.clone();
    let cancel = CancelToken::new();

    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        remote.cancel();
    });

    let started = Instant::now();
    let err = calculate_with_cancel(dyn_src, &HashOptions::new(100, 4), &cancel).unwrap_err();
    let elapsed = started.elapsed();
    canceller.join().unwrap();

    assert!(matches!(err, HashError::Cancelled), "{:?}", err);
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    // Every worker has been joined and dropped its handle on the source.
    assert_eq!(Arc::strong_count(&src), 1);
}

#[test]
fn test_external_cancel_sequential() {
    let src: Arc<dyn Source> = Arc::new(Slow {
        len: 10_000,
        delay: Duration::from_millis(10),
    });
    let cancel = CancelToken::new();
    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.cancel();
    });

    let started = Instant::now();
    let err = calculate_with_cancel(src, &HashOptions::new(10, 0), &cancel).unwrap_err();
    canceller.join().unwrap();

    assert!(matches!(err, HashError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_zero_chunk_size_is_invalid() {
    let src: Arc<dyn Source> = Arc::new(MemorySource::new(b"abc".to_vec()));
    let err = calculate(src, &HashOptions::new(0, 0)).unwrap_err();
    assert!(matches!(err, HashError::InvalidConfig(_)));
}
