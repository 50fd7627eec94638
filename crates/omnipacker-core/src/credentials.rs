//! Saved login for the download runner.
//!
//! Stored as `OP1:` followed by the hex of the JSON record XOR-masked with a
//! fixed key. This keeps the password out of casual view only; it is not encryption.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const LOGIN_FILE: &str = "login.dat";
const PREFIX: &str = "OP1:";
const MASK_KEY: &[u8] = b"omnipacker-login-key";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLogin {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SavedLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavedLogin")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at `~/.local/share/omnipacker/login.dat`.
    pub fn open_default() -> Result<Self> {
        Ok(Self::at_path(crate::paths::data_dir()?.join(LOGIN_FILE)))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, username: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() || password.is_empty() {
            bail!("username and password are required");
        }
        let login = SavedLogin {
            username: username.to_string(),
            password: password.to_string(),
        };
        let json = serde_json::to_string(&login).context("encode login")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        std::fs::write(&self.path, encode(&json))
            .with_context(|| format!("write login: {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "saved login");
        Ok(())
    }

    /// `None` if nothing is saved.
    pub fn load(&self) -> Result<Option<SavedLogin>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read login: {}", self.path.display()))
            }
        };
        let json = decode(&content)?;
        let login = serde_json::from_str(&json).context("parse login")?;
        Ok(Some(login))
    }

    /// Deleting a missing login is not an error.
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete login: {}", self.path.display())),
        }
    }
}

fn mask(data: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(MASK_KEY.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

fn encode(plain: &str) -> String {
    format!("{PREFIX}{}", hex::encode(mask(plain.as_bytes())))
}

fn decode(payload: &str) -> Result<String> {
    let Some(body) = payload.trim().strip_prefix(PREFIX) else {
        bail!("unsupported login data format");
    };
    let bytes = hex::decode(body).context("invalid login payload")?;
    String::from_utf8(mask(&bytes)).context("invalid login data")
}
