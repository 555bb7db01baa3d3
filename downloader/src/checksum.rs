/// File checksums over a selectable digest.
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use sha2::Digest;
use tokio::io::AsyncReadExt;

use modelfetch_shared::errors::{FetchError, FetchResult};

use crate::config::HASH_BUFFER_SIZE;

/// Supported digests. MD5 is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    fn hasher(&self) -> Box<dyn Hasher> {
        match self {
            HashAlgorithm::Md5 => Box::new(DigestHasher(md5::Md5::new())),
            HashAlgorithm::Sha224 => Box::new(DigestHasher(sha2::Sha224::new())),
            HashAlgorithm::Sha256 => Box::new(DigestHasher(sha2::Sha256::new())),
            HashAlgorithm::Sha384 => Box::new(DigestHasher(sha2::Sha384::new())),
            HashAlgorithm::Sha512 => Box::new(DigestHasher(sha2::Sha512::new())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = FetchError;

    /// Case-insensitive; `SHA-256` and `sha256` are the same.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(FetchError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

struct DigestHasher<D>(D);

impl<D: Digest + Send> Hasher for DigestHasher<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        let DigestHasher(digest) = *self;
        digest.finalize().to_vec()
    }
}

/// Stream `path` through `algorithm` and return the lowercase hex digest.
pub async fn file_checksum(path: &Path, algorithm: HashAlgorithm) -> FetchResult<String> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FetchError::NotDownloaded(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut hasher = algorithm.hasher();
    let mut buf = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compare two hex digests, ignoring case and surrounding whitespace.
pub fn digest_matches(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        tokio::fs::write(&path, contents).await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_md5_default() {
        let (_dir, path) = write_temp(b"hello world").await;
        let sum = file_checksum(&path, HashAlgorithm::default()).await.unwrap();
        assert_eq!(sum, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[tokio::test]
    async fn test_sha256() {
        let (_dir, path) = write_temp(b"hello world").await;
        let sum = file_checksum(&path, HashAlgorithm::Sha256).await.unwrap();
        assert_eq!(
            sum,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn test_deterministic_across_buffer_boundary() {
        let data: Vec<u8> = (0..(HASH_BUFFER_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let (_dir, path) = write_temp(&data).await;
        let a = file_checksum(&path, HashAlgorithm::Sha512).await.unwrap();
        let b = file_checksum(&path, HashAlgorithm::Sha512).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = file_checksum(&dir.path().join("nope"), HashAlgorithm::Md5)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotDownloaded(_)));
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("MD5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert_eq!("sha-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert!(matches!(
            "crc32".parse::<HashAlgorithm>(),
            Err(FetchError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_digest_matches() {
        assert!(digest_matches("ABCDEF", " abcdef\n"));
        assert!(!digest_matches("abcdef", "abcdee"));
    }
}
