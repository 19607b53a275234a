//! Long-term server key material.
//!
//! All four key files are read at the start of every run, before phase 1.
//! A missing file aborts the run.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::collaborators::KeyPair;
use crate::error::{DemoError, Result};

pub const KEM_PUBLIC_KEY_FILE: &str = "auth_server_kyber_pk.bin";
pub const KEM_SECRET_KEY_FILE: &str = "auth_server_kyber_sk.bin";
pub const SIGNING_PUBLIC_KEY_FILE: &str = "auth_server_dilithium_pk.bin";
pub const SIGNING_SECRET_KEY_FILE: &str = "auth_server_dilithium_sk.bin";

pub const KEY_FILES: [&str; 4] = [
    KEM_PUBLIC_KEY_FILE,
    KEM_SECRET_KEY_FILE,
    SIGNING_PUBLIC_KEY_FILE,
    SIGNING_SECRET_KEY_FILE,
];

/// Authorization server keys: KEM pair for the handshake, signing pair for tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerKeyMaterial {
    pub kem: KeyPair,
    pub signing: KeyPair,
}

impl ServerKeyMaterial {
    /// Read all key files from `dir`.
    pub async fn load(dir: &Path) -> Result<Self> {
        let kem = KeyPair::new(
            read_key(dir, KEM_PUBLIC_KEY_FILE).await?,
            read_key(dir, KEM_SECRET_KEY_FILE).await?,
        );
        let signing = KeyPair::new(
            read_key(dir, SIGNING_PUBLIC_KEY_FILE).await?,
            read_key(dir, SIGNING_SECRET_KEY_FILE).await?,
        );

        debug!(dir = %dir.display(), "Server key material loaded");
        Ok(Self { kem, signing })
    }

    /// Write all key files into `dir`, creating it if needed.
    pub async fn write(&self, dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(dir).await?;

        let files: [(&str, &[u8]); 4] = [
            (KEM_PUBLIC_KEY_FILE, self.kem.public.as_slice()),
            (KEM_SECRET_KEY_FILE, self.kem.secret.as_slice()),
            (SIGNING_PUBLIC_KEY_FILE, self.signing.public.as_slice()),
            (SIGNING_SECRET_KEY_FILE, self.signing.secret.as_slice()),
        ];
        for (name, bytes) in files {
            fs::write(dir.join(name), bytes).await?;
        }

        info!(dir = %dir.display(), "Server key material written");
        Ok(())
    }
}

async fn read_key(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = dir.join(name);
    fs::read(&path)
        .await
        .map_err(|source| DemoError::MissingKeyMaterial { path, source })
}

/// Key files that do not exist under `dir`.
pub fn missing_key_files(dir: &Path) -> Vec<PathBuf> {
    KEY_FILES
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| !path.is_file())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::simulated::generate_server_keys;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let keys = generate_server_keys();

        keys.write(temp_dir.path()).await.unwrap();
        let loaded = ServerKeyMaterial::load(temp_dir.path()).await.unwrap();

        assert_eq!(loaded, keys);
        assert!(missing_key_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_load_reports_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        generate_server_keys().write(temp_dir.path()).await.unwrap();
        std::fs::remove_file(temp_dir.path().join(SIGNING_SECRET_KEY_FILE)).unwrap();

        let err = ServerKeyMaterial::load(temp_dir.path()).await.unwrap_err();
        match err {
            DemoError::MissingKeyMaterial { path, .. } => {
                assert!(path.ends_with(SIGNING_SECRET_KEY_FILE));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_key_files_in_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(missing_key_files(temp_dir.path()).len(), 4);
    }
}
