use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::utils::clock::Clock;

/// Action pour laquelle un token est émis.
/// Le purpose fait partie du payload signé: un token `confirm_email`
/// n'est jamais accepté là où un `reset_password` est attendu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    ResetPassword,
    ConfirmEmail,
    Session,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    purpose: TokenPurpose,
    sub: i32,   // user_id
    exp: i64,   // expiration timestamp
    #[serde(default)]
    ver: i32,   // users.token_version au moment de l'émission
}

/// Une seule variante d'échec: l'appelant ne doit pas savoir si le token
/// est expiré, falsifié ou émis pour une autre action.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid or expired token")]
    Invalid,

    #[error("failed to sign token")]
    Signing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject_id: i32,
    pub version: i32,
}

/// Émission et vérification des tokens HS256 signés avec la clé du process
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            clock,
        }
    }

    pub fn issue(
        &self,
        purpose: TokenPurpose,
        subject_id: i32,
        ttl_seconds: i64,
    ) -> Result<String, TokenError> {
        self.issue_versioned(purpose, subject_id, 0, ttl_seconds)
    }

    /// Émet un token lié à une version de l'utilisateur: incrémenter
    /// `token_version` invalide tous les tokens versionnés déjà émis.
    pub fn issue_versioned(
        &self,
        purpose: TokenPurpose,
        subject_id: i32,
        version: i32,
        ttl_seconds: i64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            purpose,
            sub: subject_id,
            exp: self.clock.now().timestamp() + ttl_seconds,
            ver: version,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Signing)
    }

    pub fn verify(&self, purpose: TokenPurpose, token: &str) -> Result<i32, TokenError> {
        self.verify_versioned(purpose, token)
            .map(|verified| verified.subject_id)
    }

    pub fn verify_versioned(
        &self,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<VerifiedToken, TokenError> {
        // L'expiration est vérifiée avec l'horloge injectée, sans leeway
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)?;

        if claims.purpose != purpose {
            return Err(TokenError::Invalid);
        }

        if self.clock.now().timestamp() > claims.exp {
            return Err(TokenError::Invalid);
        }

        Ok(VerifiedToken {
            subject_id: claims.sub,
            version: claims.ver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    const SECRET: &[u8] = b"unit-test-secret-0123456789abcdef";

    fn service() -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        (TokenService::new(SECRET, clock.clone()), clock)
    }

    #[test]
    fn test_issue_and_verify() {
        let (tokens, _) = service();

        let token = tokens.issue(TokenPurpose::ResetPassword, 42, 600).unwrap();
        assert_eq!(tokens.verify(TokenPurpose::ResetPassword, &token), Ok(42));
    }

    #[test]
    fn test_reset_token_expiry_boundary() {
        let (tokens, clock) = service();
        let token = tokens.issue(TokenPurpose::ResetPassword, 7, 600).unwrap();

        clock.advance(Duration::seconds(599));
        assert_eq!(tokens.verify(TokenPurpose::ResetPassword, &token), Ok(7));

        clock.advance(Duration::seconds(2));
        assert_eq!(
            tokens.verify(TokenPurpose::ResetPassword, &token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_purpose_isolation() {
        let (tokens, _) = service();
        let confirm = tokens.issue(TokenPurpose::ConfirmEmail, 3, 86_400).unwrap();

        assert_eq!(
            tokens.verify(TokenPurpose::ResetPassword, &confirm),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            tokens.verify(TokenPurpose::Session, &confirm),
            Err(TokenError::Invalid)
        );
        assert_eq!(tokens.verify(TokenPurpose::ConfirmEmail, &confirm), Ok(3));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let (tokens, _) = service();
        let token = tokens.issue(TokenPurpose::ConfirmEmail, 5, 86_400).unwrap();

        // Remplace le dernier caractère de la signature
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(
            tokens.verify(TokenPurpose::ConfirmEmail, &tampered),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let (tokens, clock) = service();
        let other = TokenService::new(b"another-secret-another-secret-00", clock);

        let token = other.issue(TokenPurpose::ResetPassword, 1, 600).unwrap();
        assert_eq!(
            tokens.verify(TokenPurpose::ResetPassword, &token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_garbage_token() {
        let (tokens, _) = service();
        assert_eq!(
            tokens.verify(TokenPurpose::Session, "invalid.token.here"),
            Err(TokenError::Invalid)
        );
        assert_eq!(tokens.verify(TokenPurpose::Session, ""), Err(TokenError::Invalid));
    }

    #[test]
    fn test_version_is_carried() {
        let (tokens, _) = service();
        let token = tokens
            .issue_versioned(TokenPurpose::Session, 9, 4, 3600)
            .unwrap();

        let verified = tokens.verify_versioned(TokenPurpose::Session, &token).unwrap();
        assert_eq!(verified, VerifiedToken { subject_id: 9, version: 4 });
    }
}
