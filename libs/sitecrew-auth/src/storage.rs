//! Token storage scopes.
//!
//! Two scopes mirror a browser session: a *persistent* scope that survives
//! restarts ("remember me") and a *session* scope that lives only as long as
//! the process. Reads prefer the persistent scope.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::secret::SecretString;

/// Access token plus optional refresh token.
#[derive(Clone, Debug)]
pub struct StoredTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl StoredTokens {
    pub fn new(access_token: impl Into<SecretString>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<SecretString>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// One storage scope.
///
/// `load` is called on every outbound request, so implementations serve it
/// from memory.
pub trait TokenScope: Send + Sync {
    fn load(&self) -> Option<StoredTokens>;

    /// # Errors
    /// Returns `AuthError` if the backing store cannot be written.
    fn save(&self, tokens: &StoredTokens) -> Result<(), AuthError>;

    /// # Errors
    /// Returns `AuthError` if the backing store cannot be cleared.
    fn clear(&self) -> Result<(), AuthError>;
}

/// Process-lifetime scope.
#[derive(Default)]
pub struct MemoryScope {
    tokens: Mutex<Option<StoredTokens>>,
}

impl MemoryScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenScope for MemoryScope {
    fn load(&self) -> Option<StoredTokens> {
        self.tokens.lock().clone()
    }

    fn save(&self, tokens: &StoredTokens) -> Result<(), AuthError> {
        *self.tokens.lock() = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.tokens.lock() = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct TokenFile {
    token: String,
    #[serde(default, rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// JSON-file-backed scope, cached in memory and written through.
pub struct FileScope {
    path: PathBuf,
    cache: Mutex<Option<StoredTokens>>,
}

impl FileScope {
    /// Open the scope, loading existing tokens.
    ///
    /// A missing file is an empty scope. An unreadable or corrupt file is
    /// logged and treated as empty so a bad file never blocks sign-in.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = match read_token_file(&path) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable token file");
                None
            }
        };
        Self {
            path,
            cache: Mutex::new(cache),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for FileScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileScope")
            .field("path", &self.path)
            .field("has_tokens", &self.cache.lock().is_some())
            .finish()
    }
}

fn read_token_file(path: &Path) -> Result<Option<StoredTokens>, AuthError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AuthError::Storage {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let file: TokenFile = serde_json::from_slice(&raw)?;
    Ok(Some(StoredTokens {
        access_token: SecretString::from(file.token),
        refresh_token: file.refresh_token.map(SecretString::from),
    }))
}

impl TokenScope for FileScope {
    fn load(&self) -> Option<StoredTokens> {
        self.cache.lock().clone()
    }

    fn save(&self, tokens: &StoredTokens) -> Result<(), AuthError> {
        let file = TokenFile {
            token: tokens.access_token.expose().to_owned(),
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(|t| t.expose().to_owned()),
        };
        let json = zeroize::Zeroizing::new(serde_json::to_vec(&file)?);
        std::fs::write(&self.path, json.as_slice()).map_err(|source| AuthError::Storage {
            path: self.path.clone(),
            source,
        })?;
        *self.cache.lock() = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.cache.lock() = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AuthError::Storage {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Which scope a token set lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Persistent,
    Session,
}

/// Persistent + session token scopes shared by the client stack.
#[derive(Clone)]
pub struct TokenStorage {
    persistent: Arc<dyn TokenScope>,
    session: Arc<dyn TokenScope>,
}

impl fmt::Debug for TokenStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStorage")
            .field("signed_in", &self.is_signed_in())
            .finish_non_exhaustive()
    }
}

impl TokenStorage {
    pub fn new(persistent: Arc<dyn TokenScope>, session: Arc<dyn TokenScope>) -> Self {
        Self {
            persistent,
            session,
        }
    }

    /// Both scopes in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryScope::new()), Arc::new(MemoryScope::new()))
    }

    /// Persistent scope backed by `path`, session scope in memory.
    pub fn with_token_file(path: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(FileScope::open(path)),
            Arc::new(MemoryScope::new()),
        )
    }

    /// Tokens and the scope they came from, persistent scope first.
    #[must_use]
    pub fn current(&self) -> Option<(Scope, StoredTokens)> {
        self.persistent
            .load()
            .map(|t| (Scope::Persistent, t))
            .or_else(|| self.session.load().map(|t| (Scope::Session, t)))
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.current().map(|(_, t)| t.access_token)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.current().and_then(|(_, t)| t.refresh_token)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.current().is_some()
    }

    /// Store tokens after sign-in.
    ///
    /// # Errors
    /// Returns `AuthError` if the scope cannot be written.
    pub fn store(&self, scope: Scope, tokens: &StoredTokens) -> Result<(), AuthError> {
        match scope {
            Scope::Persistent => self.persistent.save(tokens),
            Scope::Session => self.session.save(tokens),
        }
    }

    /// Store refreshed tokens in the scope that held the previous ones
    /// (persistent when neither did).
    ///
    /// # Errors
    /// Returns `AuthError` if the scope cannot be written.
    pub fn store_refreshed(&self, tokens: &StoredTokens) -> Result<(), AuthError> {
        let scope = self.current().map_or(Scope::Persistent, |(scope, _)| scope);
        self.store(scope, tokens)
    }

    /// Sign out: clear both scopes.
    ///
    /// Both scopes are attempted even if the first fails; the first error is
    /// returned.
    ///
    /// # Errors
    /// Returns `AuthError` if a scope cannot be cleared.
    pub fn clear_all(&self) -> Result<(), AuthError> {
        let persistent = self.persistent.clear();
        let session = self.session.clear();
        persistent.and(session)
    }
}
