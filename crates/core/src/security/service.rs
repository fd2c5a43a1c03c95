//! Security service - rate limiting, payload encryption and input checks

use std::time::Duration;

use bitebase_common::crypto::CipherService;
use bitebase_common::resilience::{Clock, FixedWindowRateLimiter, RateLimitDecision, SystemClock};
use bitebase_common::{CommonError, ErrorClassification};
use bitebase_domain::constants::ENCRYPTION_AAD;
use bitebase_domain::{BiteBaseError, Result, SecurityConfig};
use tracing::{debug, warn};

use super::validation::{validate_email, validate_name, validate_password};

/// Shown to callers that hit a limit
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Login attempts allowed per email and window
pub const LOGIN_MAX_ATTEMPTS: u32 = 5;
/// Window of the login limit
pub const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Registrations allowed per client IP and window
pub const REGISTER_MAX_ATTEMPTS: u32 = 3;
/// Window of the registration limit
pub const REGISTER_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Rate limits, input validation and field encryption.
pub struct SecurityService<C = SystemClock>
where
    C: Clock,
{
    limiter: FixedWindowRateLimiter<C>,
    cipher: Option<CipherService>,
}

impl Default for SecurityService<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityService<SystemClock> {
    /// Service without an encryption key.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Build from config, loading the hex encryption key when present.
    ///
    /// # Errors
    ///
    /// Returns [`BiteBaseError::Config`] when the configured key is not 32
    /// hex-encoded bytes.
    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        let service = Self::new();
        match config.encryption_key.as_deref() {
            Some(key) => service.with_key_hex(key),
            None => Ok(service),
        }
    }
}

impl<C: Clock> SecurityService<C> {
    /// Service reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self { limiter: FixedWindowRateLimiter::with_clock(clock), cipher: None }
    }

    /// Load a hex-encoded 32-byte AES-256-GCM key.
    ///
    /// # Errors
    ///
    /// Returns [`BiteBaseError::Config`] for malformed key material.
    pub fn with_key_hex(mut self, key_hex: &str) -> Result<Self> {
        let cipher = CipherService::from_hex(key_hex)
            .map_err(|err| BiteBaseError::Config(format!("invalid encryption key: {err}")))?;
        self.cipher = Some(cipher.with_aad(ENCRYPTION_AAD.to_vec()));
        Ok(self)
    }

    /// Whether an encryption key is loaded.
    pub fn has_encryption(&self) -> bool {
        self.cipher.is_some()
    }

    /// Register a hit for `key` in a fixed window of `window`.
    ///
    /// # Errors
    ///
    /// [`BiteBaseError::RateLimited`] once `max_attempts` hits were made in
    /// the current window; [`BiteBaseError::InvalidInput`] for a zero limit
    /// or an empty window.
    pub fn check_rate_limit(&self, key: &str, max_attempts: u32, window: Duration) -> Result<RateLimitDecision> {
        self.limiter.check(key, max_attempts, window).map_err(|err| {
            if matches!(err, CommonError::RateLimitExceeded { .. }) {
                debug!(key, retry_after = ?err.retry_after(), "rate limit hit");
                return BiteBaseError::RateLimited(RATE_LIMIT_MESSAGE.into());
            }
            BiteBaseError::InvalidInput(err.to_string())
        })
    }

    /// Count a login attempt for `email`.
    pub fn check_login_rate_limit(&self, email: &str) -> Result<RateLimitDecision> {
        self.check_rate_limit(&format!("login:{email}"), LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW)
    }

    /// Count a registration from `client_ip`.
    pub fn check_register_rate_limit(&self, client_ip: &str) -> Result<RateLimitDecision> {
        self.check_rate_limit(&format!("register:{client_ip}"), REGISTER_MAX_ATTEMPTS, REGISTER_WINDOW)
    }

    /// Forget the window for `key`, e.g. after a successful login.
    pub fn reset_rate_limit(&self, key: &str) {
        self.limiter.reset(key);
    }

    /// Drop windows that have already closed.
    pub fn purge_rate_limits(&self) -> usize {
        self.limiter.purge_expired()
    }

    /// Encrypt `plaintext` into `ivHex:tagHex:ciphertextHex`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = self.cipher()?;
        cipher.encrypt_to_string(plaintext).map_err(|err| {
            warn!(error = %err, "encryption failed");
            BiteBaseError::Security("Encryption failed".into())
        })
    }

    /// Decrypt a payload produced by [`SecurityService::encrypt`].
    ///
    /// Malformed or tampered payloads fail with the same error.
    pub fn decrypt(&self, payload: &str) -> Result<String> {
        let cipher = self.cipher()?;
        cipher.decrypt_from_string(payload).map_err(|err| {
            warn!(error = %err, "decryption failed");
            BiteBaseError::Security("Decryption failed".into())
        })
    }

    /// Validate login input.
    pub fn validate_credentials(&self, email: &str, password: &str) -> Result<()> {
        validate_email(email)?;
        validate_password(password)
    }

    /// Validate registration input.
    pub fn validate_registration(&self, email: &str, password: &str, name: &str) -> Result<()> {
        validate_email(email)?;
        validate_password(password)?;
        validate_name(name)
    }

    fn cipher(&self) -> Result<&CipherService> {
        self.cipher
            .as_ref()
            .ok_or_else(|| BiteBaseError::Config("encryption key is not configured".into()))
    }
}

impl<C: Clock> std::fmt::Debug for SecurityService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityService")
            .field("tracked_keys", &self.limiter.tracked_keys())
            .field("encryption", &self.cipher.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for security::service.
    use bitebase_common::resilience::MockClock;

    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn service() -> SecurityService<MockClock> {
        SecurityService::with_clock(MockClock::new()).with_key_hex(KEY_HEX).unwrap()
    }

    /// Validates the fixed window of `check_rate_limit`.
    ///
    /// Assertions:
    /// - Confirms `max_attempts` hits pass and the next one is rejected.
    /// - Confirms the rejection carries the user-facing message.
    /// - Ensures the window reopens once it has elapsed.
    #[test]
    fn test_rate_limit_window() {
        let clock = MockClock::new();
        let security = SecurityService::with_clock(clock.clone());
        let window = Duration::from_secs(60);

        for remaining in (0..3).rev() {
            assert_eq!(security.check_rate_limit("login:a", 3, window).unwrap().remaining, remaining);
        }
        assert_eq!(
            security.check_rate_limit("login:a", 3, window).unwrap_err(),
            BiteBaseError::RateLimited(RATE_LIMIT_MESSAGE.into())
        );
        assert!(security.check_rate_limit("login:b", 3, window).is_ok());

        clock.advance_secs(60);
        assert!(security.check_rate_limit("login:a", 3, window).is_ok());
    }

    #[test]
    fn test_login_preset_allows_five_attempts() {
        let security = SecurityService::with_clock(MockClock::new());
        for _ in 0..LOGIN_MAX_ATTEMPTS {
            security.check_login_rate_limit("chef@bitebase.app").unwrap();
        }
        assert!(security.check_login_rate_limit("chef@bitebase.app").is_err());

        security.reset_rate_limit("login:chef@bitebase.app");
        assert!(security.check_login_rate_limit("chef@bitebase.app").is_ok());
    }

    #[test]
    fn test_zero_limit_is_invalid_input() {
        let security = SecurityService::new();
        assert!(matches!(
            security.check_rate_limit("k", 0, Duration::from_secs(1)),
            Err(BiteBaseError::InvalidInput(_))
        ));
    }

    /// Validates encryption with a fresh IV per message.
    ///
    /// Assertions:
    /// - Confirms the payload has three hex parts and round-trips.
    /// - Ensures two encryptions of the same text differ.
    /// - Ensures a tampered ciphertext fails with "Decryption failed".
    #[test]
    fn test_encrypt_decrypt() {
        let security = service();

        let first = security.encrypt("4111 1111 1111 1111").unwrap();
        let second = security.encrypt("4111 1111 1111 1111").unwrap();
        assert_ne!(first, second);
        assert_eq!(first.split(':').count(), 3);
        assert_eq!(security.decrypt(&first).unwrap(), "4111 1111 1111 1111");

        let mut tampered = first.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert_eq!(security.decrypt(&tampered), Err(BiteBaseError::Security("Decryption failed".into())));
        assert!(security.decrypt("not-a-payload").is_err());
    }

    #[test]
    fn test_missing_or_invalid_key() {
        let security = SecurityService::new();
        assert!(matches!(security.encrypt("x"), Err(BiteBaseError::Config(_))));

        let config = SecurityConfig { encryption_key: Some("abcd".into()) };
        assert!(matches!(SecurityService::from_config(&config), Err(BiteBaseError::Config(_))));
    }

    #[test]
    fn test_registration_validation_order() {
        let security = SecurityService::new();
        assert!(security.validate_registration("chef@bitebase.app", "Tomyum42", "Ana").is_ok());

        let err = security.validate_registration("chef@bitebase.app", "Tomyum42", "A").unwrap_err();
        assert_eq!(err, BiteBaseError::InvalidInput("Name must be at least 2 characters long".into()));

        let err = security.validate_credentials("bad", "x").unwrap_err();
        assert_eq!(err, BiteBaseError::InvalidInput("Invalid email format".into()));
    }
}
