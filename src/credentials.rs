//! Game platform credentials.
//!
//! Credentials come from exactly one [`CredentialSource`], selected once at
//! startup and resolved into [`GameCredentials`]. Everything downstream
//! consumes the resolved value and never looks at the source again.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::SyncError;

/// Secret-store key holding the login email.
pub const SECRET_EMAIL: &str = "wordfeud-email";
/// Secret-store key holding the password.
pub const SECRET_PASSWORD: &str = "wordfeud-pass";
/// Secret-store key holding the username to sync.
pub const SECRET_USERNAME: &str = "wordfeud-user";

/// Resolved login for the game platform.
#[derive(Clone, PartialEq, Eq)]
pub struct GameCredentials {
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
    /// Player whose matches are synced.
    pub username: String,
}

impl fmt::Debug for GameCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Where credentials are read from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// A local `.env`-style file with `EMAIL`, `PASSWORD` and `USERNAME`
    /// entries, for development.
    LocalFile(PathBuf),
    /// A secret store keyed by `wordfeud-email`, `wordfeud-pass` and
    /// `wordfeud-user`, as provided by the hosting environment.
    SecretStore(HashMap<String, String>),
}

impl CredentialSource {
    /// Secret store populated from the process environment, mapping
    /// `WORDFEUD_EMAIL`, `WORDFEUD_PASSWORD` and `WORDFEUD_USERNAME` onto
    /// the secret keys.
    #[must_use]
    pub fn from_env() -> Self {
        let secrets = [
            (SECRET_EMAIL, "WORDFEUD_EMAIL"),
            (SECRET_PASSWORD, "WORDFEUD_PASSWORD"),
            (SECRET_USERNAME, "WORDFEUD_USERNAME"),
        ]
        .into_iter()
        .filter_map(|(secret, var)| {
            std::env::var(var)
                .ok()
                .map(|value| (secret.to_string(), value))
        })
        .collect();
        Self::SecretStore(secrets)
    }

    /// Short name of the source for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LocalFile(_) => "local_file",
            Self::SecretStore(_) => "secret_store",
        }
    }

    /// Reads and validates the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the file cannot be read, and
    /// [`SyncError::Auth`] if any of the three values is missing or empty.
    pub fn resolve(&self) -> Result<GameCredentials, SyncError> {
        let (email, password, username) = match self {
            Self::LocalFile(path) => {
                let mut values: HashMap<String, String> = HashMap::new();
                let entries = dotenvy::from_path_iter(path).map_err(|e| {
                    SyncError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                for entry in entries {
                    let (key, value) = entry.map_err(|e| {
                        SyncError::Config(format!("malformed {}: {e}", path.display()))
                    })?;
                    values.insert(key, value);
                }
                (
                    values.remove("EMAIL"),
                    values.remove("PASSWORD"),
                    values.remove("USERNAME"),
                )
            }
            Self::SecretStore(secrets) => (
                secrets.get(SECRET_EMAIL).cloned(),
                secrets.get(SECRET_PASSWORD).cloned(),
                secrets.get(SECRET_USERNAME).cloned(),
            ),
        };

        let require = |value: Option<String>, name: &str| {
            value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                SyncError::Auth(format!(
                    "{name} not found in {} credentials",
                    self.kind()
                ))
            })
        };

        Ok(GameCredentials {
            email: require(email, "email")?,
            password: require(password, "password")?,
            username: require(username, "username")?,
        })
    }
}
