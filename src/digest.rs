//! Per-part MD5 digests and the S3 hash-of-hashes combination.
//!
//! A single-part ETag is the plain MD5 of the data. A multipart ETag is the
//! MD5 of the concatenated part digests (in part order) followed by
//! `-<part count>`.

use md5::{Digest, Md5};
use std::fmt;
use std::str::FromStr;

use crate::backends::{HashError, Source};
use crate::parts::PartSpec;

/// Size of an MD5 digest in bytes.
pub const DIGEST_LEN: usize = 16;

pub type PartDigest = [u8; DIGEST_LEN];

/// Digest the byte range described by `part`, using `buf` as scratch space.
///
/// Reads until the whole range has been consumed; a read returning 0 before
/// that is reported as a short read.
pub fn digest_part(
    source: &dyn Source,
    part: &PartSpec,
    buf: &mut [u8],
) -> Result<PartDigest, HashError> {
    let mut hasher = Md5::new();
    let mut done = 0u64;
    while done < part.length {
        let want = (part.length - done).min(buf.len() as u64) as usize;
        let n = source.read_at(part.offset + done, &mut buf[..want])?;
        if n == 0 {
            return Err(HashError::ShortRead {
                part: part.index,
                expected: part.length,
                actual: done,
            });
        }
        hasher.update(&buf[..n]);
        done += n as u64;
    }
    Ok(hasher.finalize().into())
}

/// Combine part digests, given in ascending part order, into the final ETag.
pub fn combine(digests: &[PartDigest]) -> Etag {
    match digests {
        [single] => Etag {
            digest: *single,
            parts: 1,
        },
        _ => {
            let mut hasher = Md5::new();
            for digest in digests {
                hasher.update(digest);
            }
            Etag {
                digest: hasher.finalize().into(),
                parts: digests.len(),
            }
        }
    }
}

/// An S3 ETag: the final digest plus the number of parts it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Etag {
    digest: PartDigest,
    parts: usize,
}

impl Etag {
    pub fn digest(&self) -> &PartDigest {
        &self.digest
    }

    pub fn parts(&self) -> usize {
        self.parts
    }

    pub fn is_multipart(&self) -> bool {
        self.parts > 1
    }

    /// Parse an ETag as S3 reports it. Surrounding quotes are ignored and the
    /// hex digest may be in either case.
    pub fn parse(s: &str) -> Result<Self, HashError> {
        let s = s.trim().trim_matches('"');
        let invalid = || HashError::InvalidConfig(format!("not an S3 ETag: {:?}", s));

        let (hex_part, parts) = match s.split_once('-') {
            Some((hex_part, count)) => {
                let parts: usize = count.parse().map_err(|_| invalid())?;
                // "-1" would be a one-part multipart upload, whose digest is
                // an MD5 of an MD5 and can never match a local single-part hash.
                if parts < 2 {
                    return Err(invalid());
                }
                (hex_part, parts)
            }
            None => (s, 1),
        };

        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(hex_part, &mut digest).map_err(|_| invalid())?;
        Ok(Self { digest, parts })
    }
}

impl FromStr for Etag {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.digest))?;
        if self.is_multipart() {
            write!(f, "-{}", self.parts)?;
        }
        Ok(())
    }
}
