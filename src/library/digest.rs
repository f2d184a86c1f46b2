use crate::error::LibraryError;
use md5::{Digest, Md5};
use std::fs;
use std::path::Path;

/// Lowercase hex MD5 of `bytes`, the key format of `images.json`.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn file_hash(path: &Path) -> Result<String, LibraryError> {
    let bytes = fs::read(path).map_err(|err| LibraryError::io(path, err))?;
    Ok(hash_bytes(&bytes))
}
