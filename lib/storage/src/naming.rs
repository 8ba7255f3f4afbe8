//! Deterministic output file names.
//!
//! `<token>-<input file name>.vec`, where `token` is the first four bytes of the
//! SHA-256 digest of the input's qualified parent directory, in lowercase hex.
//! Same parent and base name give the same output name; identical base names in
//! different directories do not collide in a flat output directory.

use avrovec_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::fs::Storage;

/// Suffix of every converted vector container
pub const OUTPUT_SUFFIX: &str = ".vec";

const TOKEN_BYTES: usize = 4;

/// Short hex token identifying the directory that holds `input`
pub fn parent_token(storage: &dyn Storage, input: &Path) -> String {
    let parent = match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let digest = Sha256::digest(storage.qualify(parent).as_bytes());
    digest[..TOKEN_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Output file name for one input file
pub fn output_name(storage: &dyn Storage, input: &Path) -> Result<String> {
    let base = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::Config(format!("input path has no file name: {}", input.display())))?;
    Ok(format!("{}-{}{}", parent_token(storage, input), base, OUTPUT_SUFFIX))
}
