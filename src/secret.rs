//! Generated secrets
//!
//! Passwords and WordPress salts are drawn from the operating system's
//! CSPRNG and live in [`SecretString`] from the moment they are created, so
//! `Debug` output and logs only ever show a redaction marker.

use rand::Rng;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Length of generated database passwords
pub const PASSWORD_LENGTH: usize = 32;

/// Length of generated WordPress keys and salts
pub const SALT_LENGTH: usize = 64;

/// Shown wherever a secret would otherwise be displayed
pub const REDACTED: &str = "********";

/// Password alphabet: safe inside single-quoted SQL and PHP strings
const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Salt alphabet: printable ASCII minus quotes, backslash and whitespace
const SALT_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

fn random_string(alphabet: &[u8], len: usize) -> SecretString {
    let mut rng = OsRng;
    let value: String = (0..len)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect();
    SecretString::from(value)
}

/// Generate a database password
pub fn generate_password() -> SecretString {
    random_string(PASSWORD_ALPHABET, PASSWORD_LENGTH)
}

/// Generate a WordPress authentication key or salt
pub fn generate_salt() -> SecretString {
    random_string(SALT_ALPHABET, SALT_LENGTH)
}

/// Copy a secret without exposing it anywhere but the new box
pub fn duplicate(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

/// Credentials for a freshly created database.
///
/// Returned to the caller exactly once, at creation time. The password is
/// never written to the state document.
pub struct DatabaseCredentials {
    pub database: String,
    pub user: String,
    pub host: String,
    pub password: SecretString,
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("host", &self.host)
            .field("password", &REDACTED)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_shape() {
        let password = generate_password();
        let exposed = password.expose_secret();
        assert_eq!(exposed.len(), PASSWORD_LENGTH);
        assert!(exposed.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_passwords_do_not_collide() {
        let passwords: std::collections::HashSet<String> = (0..64)
            .map(|_| generate_password().expose_secret().to_string())
            .collect();
        assert_eq!(passwords.len(), 64);
    }

    #[test]
    fn test_salt_is_quote_free() {
        let salt = generate_salt();
        let exposed = salt.expose_secret();
        assert_eq!(exposed.len(), SALT_LENGTH);
        assert!(!exposed.contains('\''));
        assert!(!exposed.contains('"'));
        assert!(!exposed.contains('\\'));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let password = generate_password();
        let creds = DatabaseCredentials {
            database: "shop_db".to_string(),
            user: "shop_db".to_string(),
            host: "localhost".to_string(),
            password: duplicate(&password),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains(REDACTED));
        assert!(!debug.contains(password.expose_secret()));
    }
}
