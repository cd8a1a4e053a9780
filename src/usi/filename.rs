//! Deterministic local file names for identifiers
//!
//! Each field is escaped so that only `[A-Za-z0-9.-]` survive verbatim; every
//! other byte (including `_`) becomes `_XX`. Fields are joined with `__`, which
//! can never occur inside an escaped field, so the mapping is injective. Stems
//! longer than [`FILENAME_STEM_CAP`] are shortened to a prefix plus a SHA-256
//! suffix.

use std::fmt::Write;

use sha2::{Digest, Sha256};

use super::Usi;

/// Longest stem kept verbatim
pub const FILENAME_STEM_CAP: usize = 150;

/// Characters of the escaped stem kept in front of the hash suffix
pub const FILENAME_HASH_PREFIX: usize = 100;

/// Hex characters of the SHA-256 digest used as suffix
const FILENAME_HASH_CHARS: usize = 16;

/// Extension of every canonical asset
const CANONICAL_EXTENSION: &str = "mzML";

fn escape_field(field: &str, out: &mut String) {
    for byte in field.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' {
            out.push(byte as char);
        } else {
            let _ = write!(out, "_{byte:02X}");
        }
    }
}

/// Escaped, length-capped stem (without extension)
pub fn canonical_stem(usi: &Usi) -> String {
    let mut fields = vec![usi.scheme.as_str(), usi.collection.as_str(), usi.path.as_str()];
    if let Some(accession) = usi.library_accession.as_deref() {
        fields.push(accession);
    }

    let mut stem = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            stem.push_str("__");
        }
        escape_field(field, &mut stem);
    }

    if stem.len() <= FILENAME_STEM_CAP {
        return stem;
    }

    let digest = Sha256::digest(stem.as_bytes());
    let mut hashed = String::with_capacity(FILENAME_HASH_PREFIX + 1 + FILENAME_HASH_CHARS);
    // The escaped stem is pure ASCII, so byte slicing is safe
    hashed.push_str(&stem[..FILENAME_HASH_PREFIX]);
    hashed.push('_');
    for byte in digest.iter().take(FILENAME_HASH_CHARS / 2) {
        let _ = write!(hashed, "{byte:02x}");
    }
    hashed
}

/// File name of the canonical asset for an identifier
///
/// The scan locator is not part of the name: every scan of a file shares
/// one asset.
pub fn canonical_filename(usi: &Usi) -> String {
    format!("{}.{CANONICAL_EXTENSION}", canonical_stem(usi))
}
