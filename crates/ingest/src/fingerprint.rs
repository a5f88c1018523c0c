//! Streaming content hashes for duplicate detection.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 8192;

/// Hash algorithm recorded alongside a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// XXH3, 64-bit output.
    #[cfg(feature = "xxhash")]
    Xxh3,
    Sha256,
}

impl HashAlgorithm {
    /// Name declared in the upload request.
    pub fn as_str(self) -> &'static str {
        match self {
            #[cfg(feature = "xxhash")]
            Self::Xxh3 => "xxh3_64",
            Self::Sha256 => "sha256",
        }
    }

    /// The fast hash when compiled in, sha256 otherwise.
    pub fn preferred() -> Self {
        #[cfg(feature = "xxhash")]
        {
            Self::Xxh3
        }
        #[cfg(not(feature = "xxhash"))]
        {
            Self::Sha256
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content hash and the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub algorithm: HashAlgorithm,
    pub digest: Vec<u8>,
}

impl Fingerprint {
    pub fn hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

/// Hashes a file in fixed-size chunks with the given algorithm.
pub fn fingerprint_with(path: &Path, algorithm: HashAlgorithm) -> std::io::Result<Fingerprint> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; CHUNK_SIZE];

    let digest = match algorithm {
        #[cfg(feature = "xxhash")]
        HashAlgorithm::Xxh3 => {
            use std::hash::Hasher as _;
            let mut hasher = twox_hash::Xxh3Hash64::with_seed(0);
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.write(&buf[..n]);
            }
            hasher.finish().to_be_bytes().to_vec()
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            hasher.finalize().to_vec()
        }
    };

    Ok(Fingerprint { algorithm, digest })
}

/// Hashes a file on a blocking thread with the preferred algorithm.
pub async fn fingerprint(path: PathBuf) -> std::io::Result<Fingerprint> {
    tokio::task::spawn_blocking(move || fingerprint_with(&path, HashAlgorithm::preferred()))
        .await
        .map_err(std::io::Error::other)?
}
