//! Splitting an input into fixed-size parts.
//!
//! Parts are numbered from 1 like S3 part numbers. Every part except the last
//! is exactly `chunk_size` bytes; the last holds the remainder. An empty input
//! still yields a single zero-length part.

use crate::backends::HashError;

/// One part of the input: `[offset, offset + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    pub index: usize,
    pub offset: u64,
    pub length: u64,
}

/// Number of parts `total_len` splits into. Never less than 1.
pub fn part_count(total_len: u64, chunk_size: u64) -> usize {
    if total_len == 0 || chunk_size == 0 {
        return 1;
    }
    total_len.div_ceil(chunk_size) as usize
}

/// Partition `[0, total_len)` into parts of `chunk_size` bytes.
pub fn partition(total_len: u64, chunk_size: u64) -> Result<Parts, HashError> {
    if chunk_size == 0 {
        return Err(HashError::InvalidConfig(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    Ok(Parts {
        total_len,
        chunk_size,
        next: 1,
        count: part_count(total_len, chunk_size),
    })
}

/// Ascending iterator over the parts of one input.
#[derive(Debug, Clone)]
pub struct Parts {
    total_len: u64,
    chunk_size: u64,
    next: usize,
    count: usize,
}

impl Iterator for Parts {
    type Item = PartSpec;

    fn next(&mut self) -> Option<PartSpec> {
        if self.next > self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let offset = (index as u64 - 1) * self.chunk_size;
        let length = self.chunk_size.min(self.total_len - offset);
        Some(PartSpec {
            index,
            offset,
            length,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count + 1 - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Parts {}
