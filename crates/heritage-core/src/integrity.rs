// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text fingerprinting: SHA-256 digests of extracted text.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `text` and return it as a lowercase hex string.
///
/// Identical documents processed with identical settings yield identical
/// `full_text`, so equal fingerprints let downstream consumers recognise a
/// re-submitted page before doing any structuring work.
pub fn fingerprint_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
