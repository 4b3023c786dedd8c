//! Credential types and the collaborator seams for credential acquisition
//!
//! Storage backends (system keyrings, GPG, cloud identity services) are
//! external collaborators. The library only defines the traits it consumes;
//! a default [`StdinPrompt`] ships for interactive use.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// A transient username/password pair, consumed once by the authenticator
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account user name
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create a credential bundle
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// ============================================================================
// Collaborator seams
// ============================================================================

/// Persistent credential storage (e.g. a system keyring)
pub trait CredentialStore: Send + Sync {
    /// Load previously saved credentials, if any
    fn load(&self) -> Result<Option<Credentials>>;
    /// Save credentials for later sessions
    fn save(&self, credentials: &Credentials) -> Result<()>;
    /// Remove saved credentials
    fn clear(&self) -> Result<()>;
}

/// Interactive credential entry
pub trait CredentialPrompt: Send + Sync {
    /// Ask the user for a username and password
    fn prompt(&self) -> Result<Credentials>;
}

/// Decrypts an encrypted password file using a local key store
pub trait PasswordDecryptor: Send + Sync {
    /// Decrypt the file contents into the plain password
    fn decrypt(&self, ciphertext: &[u8]) -> Result<String>;
}

/// Fetches credentials from a platform identity/metadata service
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetch the credential bundle
    async fn fetch(&self) -> Result<Credentials>;
}

/// Prompt implementation reading from standard input.
///
/// Note: the password is echoed; wire up a terminal-aware prompt through
/// [`CredentialPrompt`] where that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl StdinPrompt {
    /// Read credentials from any input stream, re-asking on entries that
    /// are too short. A closed stream is a hard failure, not a retry.
    pub(super) fn read_from(mut input: impl BufRead) -> Result<Credentials> {
        let mut line = String::new();

        let username = loop {
            print!("Username: ");
            std::io::stdout().flush()?;
            line.clear();
            if input.read_line(&mut line)? == 0 {
                return Err(Error::auth("end of input while reading credentials"));
            }
            let username = line.trim();
            if username.len() >= 2 {
                break username.to_string();
            }
        };

        let password = loop {
            print!("Password: ");
            std::io::stdout().flush()?;
            line.clear();
            if input.read_line(&mut line)? == 0 {
                return Err(Error::auth("end of input while reading credentials"));
            }
            let password = line.trim_end_matches(['\r', '\n']);
            if password.len() >= 2 {
                break password.to_string();
            }
        };

        Ok(Credentials::new(username, password))
    }
}

impl CredentialPrompt for StdinPrompt {
    fn prompt(&self) -> Result<Credentials> {
        Self::read_from(std::io::stdin().lock())
    }
}

// ============================================================================
// Login methods
// ============================================================================

/// A credential acquisition strategy
#[derive(Clone)]
pub enum LoginMethod {
    /// Retrieve saved credentials; on absence, prompt and store.
    /// The only strategy that re-prompts after `invalid_credentials`.
    Stored {
        /// Persistent credential backend
        store: Arc<dyn CredentialStore>,
        /// Prompt used when the store is empty or the credentials are stale
        prompt: Arc<dyn CredentialPrompt>,
    },

    /// Prompt on every login
    Interactive {
        /// Interactive entry
        prompt: Arc<dyn CredentialPrompt>,
    },

    /// Credentials supplied by the caller
    Plain {
        /// Account user name
        username: String,
        /// Account password
        password: String,
    },

    /// Password decrypted from a local file
    EncryptedFile {
        /// Account user name
        username: String,
        /// Path to the encrypted password file
        path: PathBuf,
        /// Decryption backend
        decryptor: Arc<dyn PasswordDecryptor>,
    },

    /// Credentials fetched from a platform credential provider
    Managed {
        /// Identity/metadata service backend
        provider: Arc<dyn CredentialProvider>,
    },
}

impl LoginMethod {
    /// Stored credentials with the default stdin prompt
    pub fn stored(store: Arc<dyn CredentialStore>) -> Self {
        Self::Stored {
            store,
            prompt: Arc::new(StdinPrompt),
        }
    }

    /// Stored credentials with a custom prompt
    pub fn stored_with_prompt(
        store: Arc<dyn CredentialStore>,
        prompt: Arc<dyn CredentialPrompt>,
    ) -> Self {
        Self::Stored { store, prompt }
    }

    /// Prompt on every login, default stdin prompt
    pub fn interactive() -> Self {
        Self::Interactive {
            prompt: Arc::new(StdinPrompt),
        }
    }

    /// Prompt on every login with a custom prompt
    pub fn interactive_with_prompt(prompt: Arc<dyn CredentialPrompt>) -> Self {
        Self::Interactive { prompt }
    }

    /// Credentials supplied directly
    pub fn plain(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Plain {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Password decrypted from a local file
    pub fn encrypted_file(
        username: impl Into<String>,
        path: impl Into<PathBuf>,
        decryptor: Arc<dyn PasswordDecryptor>,
    ) -> Self {
        Self::EncryptedFile {
            username: username.into(),
            path: path.into(),
            decryptor,
        }
    }

    /// Credentials from a platform provider
    pub fn managed(provider: Arc<dyn CredentialProvider>) -> Self {
        Self::Managed { provider }
    }

    /// Whether this strategy supports the one-shot credential-retry path
    pub fn can_reacquire(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

impl fmt::Debug for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stored { .. } => "Stored",
            Self::Interactive { .. } => "Interactive",
            Self::Plain { .. } => "Plain",
            Self::EncryptedFile { .. } => "EncryptedFile",
            Self::Managed { .. } => "Managed",
        };
        f.debug_struct(name).finish_non_exhaustive()
    }
}

/// In-memory credential store, useful for tests and short-lived tools
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: std::sync::Mutex<Option<Credentials>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with credentials
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: std::sync::Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credentials>> {
        Ok(self
            .credentials
            .lock()
            .map_err(|_| Error::Other("credential store poisoned".to_string()))?
            .clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        *self
            .credentials
            .lock()
            .map_err(|_| Error::Other("credential store poisoned".to_string()))? =
            Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .credentials
            .lock()
            .map_err(|_| Error::Other("credential store poisoned".to_string()))? = None;
        Ok(())
    }
}
