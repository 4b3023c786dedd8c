//! Authentication module
//!
//! Exchanges one of several credential acquisition strategies for a bearer
//! token via the fixed `/rest/login` endpoint.
//!
//! # Strategies
//!
//! - **Stored**: load from a [`CredentialStore`], prompting and saving on
//!   absence; the only strategy with a credential-retry path
//! - **Interactive**: prompt on every login
//! - **Plain**: credentials passed in directly
//! - **EncryptedFile**: password decrypted from a local file
//! - **Managed**: fetched from a platform credential provider

mod authenticator;
mod types;

pub use authenticator::{build_login_token, Authenticator};
pub use types::{
    CredentialPrompt, CredentialProvider, CredentialStore, Credentials, LoginMethod, MemoryStore,
    PasswordDecryptor, StdinPrompt,
};

#[cfg(test)]
mod tests;
