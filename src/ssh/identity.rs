// ABOUTME: Private key identity loading for public-key authentication.
// ABOUTME: Picks the first key block from a file and decodes it with russh::keys.

use super::error::{Error, Result};
use russh::keys::{PrivateKey, decode_secret_key};
use std::path::Path;

const BEGIN_MARKER: &str = "-----BEGIN ";
const END_MARKER: &str = "-----END ";
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY-----";

/// Load exactly one key pair from `path`.
///
/// A file holding several key blocks yields the first one. A file holding none
/// (empty, or only public keys) fails with [`Error::NoIdentityFound`] without
/// attempting to decode anything. Unreadable files and blocks that fail to
/// decode fail with [`Error::KeyLoadFailed`].
pub fn load_identity(path: &Path, passphrase: Option<&str>) -> Result<PrivateKey> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::KeyLoadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let blocks = key_blocks(&content);
    let Some(first) = blocks.first() else {
        return Err(Error::NoIdentityFound(path.to_path_buf()));
    };

    if blocks.len() > 1 {
        tracing::debug!(
            path = %path.display(),
            count = blocks.len(),
            "key file holds several identities, using the first"
        );
    }

    decode_secret_key(first, passphrase).map_err(|e| Error::KeyLoadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Split file content into armored private key blocks.
///
/// Public key and certificate blocks are skipped. A block missing its END line
/// runs to the end of the file so that decoding reports it as malformed.
fn key_blocks(content: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(BEGIN_MARKER) {
        let candidate = &rest[start..];
        let header = candidate.lines().next().unwrap_or_default();
        let block_len = match candidate.find(END_MARKER) {
            Some(end) => {
                let tail = &candidate[end..];
                end + tail.find('\n').map(|i| i + 1).unwrap_or(tail.len())
            }
            None => candidate.len(),
        };
        if header.contains(PRIVATE_KEY_LABEL) {
            blocks.push(&candidate[..block_len]);
        }
        rest = &candidate[block_len..];
    }

    blocks
}
