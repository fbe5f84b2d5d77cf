use argon2::{
    password_hash::{PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Argon2 PHC string for a member password.
///
/// The only ways to obtain one are hashing a plaintext or decoding a stored
/// row; there is no way back to the plaintext.
#[derive(Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_plaintext(plain: &str) -> anyhow::Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(Self(hash))
    }

    pub fn verify(&self, plain: &str) -> anyhow::Result<bool> {
        let parsed = PhcString::new(&self.0).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn raw(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = PasswordHash::from_plaintext("Secur3P@ssw0rd!").expect("hashing should succeed");
        assert!(hash.as_str().starts_with("$argon2"));
        assert!(hash.verify("Secur3P@ssw0rd!").expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = PasswordHash::from_plaintext("correct-horse-battery-staple").unwrap();
        assert!(!hash.verify("wrong-password").expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_fresh_salt() {
        let a = PasswordHash::from_plaintext("secret").unwrap();
        let b = PasswordHash::from_plaintext("secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = PasswordHash::raw("not-a-valid-hash").verify("anything").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn debug_does_not_leak_hash() {
        let hash = PasswordHash::from_plaintext("secret").unwrap();
        assert_eq!(format!("{hash:?}"), "PasswordHash(..)");
    }
}
