// src/input.rs
use crate::errors::CacheError;

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::mem;
use std::path::Path;
use zeroize::{Zeroize, Zeroizing};

/// Read size; matches the stdin buffer so large reads bypass it
const CHUNK: usize = 8 * 1024;

/// Load input bytes, with `-` for stdin, `@<path>` for an explicit file,
/// an existing path, or otherwise the literal string
pub fn load(input: &str) -> Result<Vec<u8>, CacheError> {
    let mut content = if input == "-" {
        read_secret(io::stdin().lock(), 0)?
    } else if let Some(filename) = input.strip_prefix('@') {
        if !Path::new(filename).exists() {
            return Err(CacheError::InvalidPath(format!(
                "File not found: {}",
                filename
            )));
        }
        read_file(Path::new(filename))?
    } else if Path::new(input).is_file() {
        read_file(Path::new(input))?
    } else {
        input.as_bytes().to_vec()
    };

    // Remove trailing newline for consistency
    if content.last() == Some(&b'\n') {
        content.pop();
    }

    Ok(content)
}

fn read_file(path: &Path) -> Result<Vec<u8>, CacheError> {
    let file = File::open(path)?;
    let size_hint = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    read_secret(file, size_hint)
}

/// Read `reader` to the end without leaving copies behind.
///
/// The buffer never reallocates in place: when it fills up, the contents
/// move to a larger buffer and the old one is zeroized before it is freed.
/// Partial contents are zeroized on error.
pub fn read_secret<R: Read>(mut reader: R, size_hint: usize) -> Result<Vec<u8>, CacheError> {
    let mut content = Zeroizing::new(Vec::with_capacity(size_hint.max(CHUNK)));
    let mut chunk = Zeroizing::new([0u8; CHUNK]);

    loop {
        let n = match reader.read(&mut chunk[..]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        if content.len() + n > content.capacity() {
            let grown = (content.capacity() * 2).max(content.len() + n);
            let mut larger = Vec::with_capacity(grown);
            larger.extend_from_slice(&content);
            let mut old = mem::replace(&mut *content, larger);
            old.zeroize();
        }
        content.extend_from_slice(&chunk[..n]);
    }

    Ok(mem::take(&mut *content))
}
