use base64::{Engine, engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD}};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_ITERATIONS: u32 = 260000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("invalid password hash format")]
    InvalidFormat,

    #[error("password hashing failed")]
    Hashing,
}

/// Hash un mot de passe au format Werkzeug (compatible avec les comptes
/// créés par l'ancienne application Flask)
/// Format: pbkdf2:sha256:iterations$salt$hash
pub fn hash_password(password: &str, iterations: u32) -> Result<String, PasswordError> {
    // Salt aléatoire de 16 bytes
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut key)
        .map_err(|_| PasswordError::Hashing)?;

    // base64 URL-safe sans padding (format Werkzeug moderne)
    let salt_b64 = URL_SAFE_NO_PAD.encode(salt);
    let hash_b64 = URL_SAFE_NO_PAD.encode(key);

    Ok(format!("pbkdf2:sha256:{}${}${}", iterations, salt_b64, hash_b64))
}

/// Vérifie un mot de passe contre un hash Werkzeug
/// Supporte les formats: base64 (nouveau) et hex (ancien Python)
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parts: Vec<&str> = stored_hash.split('$').collect();
    if parts.len() != 3 {
        return Err(PasswordError::InvalidFormat);
    }

    let header_parts: Vec<&str> = parts[0].split(':').collect();
    if header_parts.len() != 3 || header_parts[0] != "pbkdf2" || header_parts[1] != "sha256" {
        return Err(PasswordError::InvalidFormat);
    }

    let iterations = header_parts[2]
        .parse::<u32>()
        .map_err(|_| PasswordError::InvalidFormat)?;

    // Hash hex = format Werkzeug Python, dont le salt est du texte brut.
    // Sinon le salt est encodé en base64 comme dans hash_password.
    let salt = if is_hex_digest(parts[2]) {
        parts[1].as_bytes().to_vec()
    } else {
        decode_flexible(parts[1]).ok_or(PasswordError::InvalidFormat)?
    };
    let expected_hash = decode_flexible(parts[2]).ok_or(PasswordError::InvalidFormat)?;
    if expected_hash.is_empty() {
        return Err(PasswordError::InvalidFormat);
    }

    let mut computed = vec![0u8; expected_hash.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut computed)
        .map_err(|_| PasswordError::Hashing)?;

    Ok(constant_time_eq(&computed, &expected_hash))
}

/// Comparaison sans sortie anticipée (même durée quel que soit l'octet différent)
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// 64 caractères hex = 32 bytes
fn is_hex_digest(input: &str) -> bool {
    input.len() == 64 && input.chars().all(|c| c.is_ascii_hexdigit())
}

/// Décode une chaîne encodée en hexadécimal ou base64
fn decode_flexible(input: &str) -> Option<Vec<u8>> {
    if is_hex_digest(input) {
        return hex::decode(input).ok();
    }

    let padded = add_base64_padding(input);

    STANDARD.decode(&padded).ok()
        .or_else(|| URL_SAFE.decode(&padded).ok())
        .or_else(|| URL_SAFE_NO_PAD.decode(input).ok())
        .or_else(|| STANDARD_NO_PAD.decode(input).ok())
}

/// Ajoute le padding '=' manquant pour base64
fn add_base64_padding(input: &str) -> String {
    let padding_needed = (4 - (input.len() % 4)) % 4;
    format!("{}{}", input, "=".repeat(padding_needed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITERATIONS: u32 = 1_000;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret-pass", ITERATIONS).unwrap();

        assert!(hash.starts_with("pbkdf2:sha256:1000$"));
        assert!(!hash.contains("s3cret-pass"));
        assert_eq!(verify_password("s3cret-pass", &hash), Ok(true));
        assert_eq!(verify_password("wrong-pass", &hash), Ok(false));
    }

    #[test]
    fn test_same_password_different_salt() {
        let first = hash_password("same", ITERATIONS).unwrap();
        let second = hash_password("same", ITERATIONS).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_legacy_hex_hash() {
        // Hash hexadécimal avec salt texte brut (format Werkzeug Python)
        let salt = "legacysalt";
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2::<HmacSha256>(b"adminpass", salt.as_bytes(), ITERATIONS, &mut key).unwrap();
        let stored = format!("pbkdf2:sha256:{}${}${}", ITERATIONS, salt, hex::encode(key));

        assert_eq!(verify_password("adminpass", &stored), Ok(true));
        assert_eq!(verify_password("userpass", &stored), Ok(false));
    }

    #[test]
    fn test_invalid_format() {
        assert_eq!(verify_password("x", "not-a-hash"), Err(PasswordError::InvalidFormat));
        assert_eq!(
            verify_password("x", "scrypt:32768:8:1$salt$abcd"),
            Err(PasswordError::InvalidFormat)
        );
        assert_eq!(
            verify_password("x", "pbkdf2:sha256:many$salt$abcd"),
            Err(PasswordError::InvalidFormat)
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
