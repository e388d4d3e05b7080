use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand_core::OsRng;
use secrecy::{ExposeSecret, Secret};

use crate::errors::UserError;

/// Encode the password using argon2
#[tracing::instrument(skip(password))]
pub fn encode_password(password: &Secret<String>) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::Hashing(e.to_string()))
}

/// Check if the candidate match the hashed user password
#[tracing::instrument(skip_all)]
pub fn verify_password(user_password: &str, candidate: &Secret<String>) -> bool {
    match PasswordHash::new(user_password) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(candidate.expose_secret().as_bytes(), &parsed_hash)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored password hash can't be parsed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_password_can_be_verified() {
        let password = Secret::new(String::from("correct horse battery staple"));
        let hash = encode_password(&password).unwrap();

        assert_ne!(hash, "correct horse battery staple");
        assert!(verify_password(&hash, &password));
        assert!(!verify_password(&hash, &Secret::new(String::from("wrong"))));
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify_password("not a hash", &Secret::new(String::from("x"))));
    }
}
