use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Argon2id PHC string for a plain password.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{PasswordHash, PasswordVerifier};

    #[test]
    fn hash_verifies_against_original_password() {
        let hash = hash_password("TestPass123").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        let parsed = PasswordHash::new(&hash).expect("phc string");
        assert!(Argon2::default()
            .verify_password(b"TestPass123", &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"WrongPass123", &parsed)
            .is_err());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("TestPass123").unwrap();
        let b = hash_password("TestPass123").unwrap();
        assert_ne!(a, b);
    }
}
