use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Persistent byte store for computed derivatives, one file per cache key.
///
/// Artifacts are written once and never deleted; there is no eviction and
/// no coordination between concurrent writers of the same key (last
/// writer wins, matching the reference behavior).
pub struct DerivativeStore {
    dir: PathBuf,
}

impl DerivativeStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.dir.join(key).is_file()
    }

    pub fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.dir.join(key))
    }

    pub fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        fs::write(self.dir.join(key), bytes)
    }
}
