use super::{crypto, CookiePair, Session, SessionError};
use crate::util::write_atomic;
use secrecy::SecretString;
use std::path::{Path, PathBuf};

/// Persists a [`Session`]'s cookies to a single file.
///
/// Plaintext format is one `name=value` pair per line. With a passphrase
/// configured, the same text is wrapped by [`crypto::encrypt`] before it
/// touches disk, and every load expects the encrypted layout.
pub struct SessionStore {
    path: PathBuf,
    passphrase: Option<SecretString>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: SecretString) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_encrypted(&self) -> bool {
        self.passphrase.is_some()
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the cookie file.
    ///
    /// Blank and malformed lines are skipped. A missing file is
    /// `SessionError::NotFound`, distinct from decrypt and corruption errors.
    pub fn load(&self) -> Result<Vec<CookiePair>, SessionError> {
        let raw = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(SessionError::Io(e)),
        };

        let plain = match &self.passphrase {
            Some(passphrase) => crypto::decrypt(&raw, passphrase)?,
            None => raw,
        };

        let text = String::from_utf8(plain)
            .map_err(|_| SessionError::Corrupt("cookie file is not valid UTF-8".to_string()))?;

        let cookies = parse_cookie_lines(&text);
        tracing::debug!(
            path = %self.path.display(),
            count = cookies.len(),
            encrypted = self.is_encrypted(),
            "Loaded session cookies"
        );
        Ok(cookies)
    }

    /// Load the file straight into `session`'s jar. Returns the cookie count.
    pub fn load_into(&self, session: &Session) -> Result<usize, SessionError> {
        let cookies = self.load()?;
        session.insert_all(&cookies);
        Ok(cookies.len())
    }

    /// Persist every cookie the jar holds for the instance.
    ///
    /// Fails with `NoCookies` (writing nothing) when the jar is empty, so a
    /// login that never received a session cookie cannot look successful.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        self.save_pairs(&session.cookies())
    }

    pub fn save_pairs(&self, cookies: &[CookiePair]) -> Result<(), SessionError> {
        if cookies.is_empty() {
            return Err(SessionError::NoCookies);
        }

        let text = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("\n");

        let bytes = match &self.passphrase {
            Some(passphrase) => crypto::encrypt(text.as_bytes(), passphrase)?,
            None => text.into_bytes(),
        };

        write_atomic(&self.path, &bytes)?;
        tracing::info!(
            path = %self.path.display(),
            count = cookies.len(),
            encrypted = self.is_encrypted(),
            "Saved session cookies"
        );
        Ok(())
    }

    /// Delete the cookie file. Returns false if there was nothing to delete.
    pub fn remove(&self) -> Result<bool, SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SessionError::Io(e)),
        }
    }
}

/// Parse `name=value` lines, trimming both halves.
///
/// Lines without `=` or with an empty name are dropped rather than failing
/// the whole load.
pub fn parse_cookie_lines(text: &str) -> Vec<CookiePair> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let Some((name, value)) = line.split_once('=') else {
                tracing::debug!("Skipping malformed cookie line");
                return None;
            };
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(CookiePair::new(name, value.trim()))
        })
        .collect()
}
