//! Digests of split partition images
//!
//! Computed on the fly while copying, so a multi-gigabyte partition is only
//! read once.

use crate::error::SplitError;
use md5::{Digest as _, Md5};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Lowercase name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            _ => Err(SplitError::UnknownDigest(s.to_string())),
        }
    }
}

/// A finished digest of one partition image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDigest {
    pub algorithm: DigestAlgorithm,
    pub hex: String,
}

impl fmt::Display for PartitionDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Incremental hasher over the selected algorithms
#[derive(Default)]
pub struct PartitionHasher {
    md5: Option<Md5>,
    sha1: Option<Sha1>,
    sha256: Option<Sha256>,
}

impl PartitionHasher {
    /// Hasher for `algorithms`; an empty list makes every call a no-op
    pub fn new(algorithms: &[DigestAlgorithm]) -> Self {
        let mut hasher = Self::default();
        for algorithm in algorithms {
            match algorithm {
                DigestAlgorithm::Md5 => hasher.md5 = Some(Md5::new()),
                DigestAlgorithm::Sha1 => hasher.sha1 = Some(Sha1::new()),
                DigestAlgorithm::Sha256 => hasher.sha256 = Some(Sha256::new()),
            }
        }
        hasher
    }

    pub fn update(&mut self, data: &[u8]) {
        if let Some(ref mut h) = self.md5 {
            h.update(data);
        }
        if let Some(ref mut h) = self.sha1 {
            h.update(data);
        }
        if let Some(ref mut h) = self.sha256 {
            h.update(data);
        }
    }

    /// Finish all digests, in md5, sha1, sha256 order
    pub fn finalize(self) -> Vec<PartitionDigest> {
        let mut digests = Vec::new();

        if let Some(h) = self.md5 {
            digests.push(PartitionDigest {
                algorithm: DigestAlgorithm::Md5,
                hex: hex::encode(h.finalize()),
            });
        }
        if let Some(h) = self.sha1 {
            digests.push(PartitionDigest {
                algorithm: DigestAlgorithm::Sha1,
                hex: hex::encode(h.finalize()),
            });
        }
        if let Some(h) = self.sha256 {
            digests.push(PartitionDigest {
                algorithm: DigestAlgorithm::Sha256,
                hex: hex::encode(h.finalize()),
            });
        }

        digests
    }
}
