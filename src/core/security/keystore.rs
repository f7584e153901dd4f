// Copyright (c) 2026 Blocker
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Validator key file: a hex-encoded 32-byte Ed25519 seed.
//!
//! The file is written atomically (tmp + fsync + rename) with 0600 permissions on unix.

use crate::core::security::keys::PrivateKey;
use std::{fs, io::Write, path::Path};
use thiserror::Error;
use zeroize::Zeroize;

/// Keystore errors.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// Reading or writing the key file failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// File content is not a valid hex seed.
    #[error("invalid key encoding")]
    InvalidKey,
}

fn set_private_perms_best_effort(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
}

fn atomic_write_private(path: &Path, bytes: &[u8]) -> Result<(), KeystoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");

    {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)?;
        f.write_all(bytes)?;
        let _ = f.sync_all();
    }

    set_private_perms_best_effort(&tmp);
    fs::rename(&tmp, path)?;
    set_private_perms_best_effort(path);
    Ok(())
}

/// Load the seed at `path`, or generate one and persist it.
pub fn load_or_create(path: &Path) -> Result<PrivateKey, KeystoreError> {
    if path.exists() {
        let mut text = fs::read_to_string(path)?;
        let key = PrivateKey::from_hex_seed(&text).map_err(|_| KeystoreError::InvalidKey);
        text.zeroize();
        return key;
    }

    let key = PrivateKey::generate().map_err(|_| KeystoreError::InvalidKey)?;
    let mut encoded = hex::encode(key.seed());
    let written = atomic_write_private(path, encoded.as_bytes());
    encoded.zeroize();
    written?;
    Ok(key)
}
