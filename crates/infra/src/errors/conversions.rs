//! Conversions from external infrastructure errors into domain errors.

use bitebase_domain::BiteBaseError;
use redis::{ErrorKind as RedisErrorKind, RedisError};
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BiteBaseError);

impl From<InfraError> for BiteBaseError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BiteBaseError> for InfraError {
    fn from(value: BiteBaseError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBiteBaseError {
    fn into_bitebase(self) -> BiteBaseError;
}

/* -------------------------------------------------------------------------- */
/* redis::RedisError → BiteBaseError */
/* -------------------------------------------------------------------------- */

impl IntoBiteBaseError for RedisError {
    fn into_bitebase(self) -> BiteBaseError {
        if self.is_timeout() {
            return BiteBaseError::Cache("redis command timed out".into());
        }
        if self.is_connection_refusal() || self.is_connection_dropped() || self.is_io_error() {
            return BiteBaseError::Network(format!("redis connection failure: {self}"));
        }

        match self.kind() {
            RedisErrorKind::AuthenticationFailed => {
                BiteBaseError::Config("redis rejected the configured credentials".into())
            }
            RedisErrorKind::InvalidClientConfig => {
                BiteBaseError::Config(format!("invalid redis configuration: {self}"))
            }
            RedisErrorKind::TypeError => {
                BiteBaseError::Serialization(format!("unexpected redis reply: {self}"))
            }
            _ => BiteBaseError::Cache(self.to_string()),
        }
    }
}

impl From<RedisError> for InfraError {
    fn from(value: RedisError) -> Self {
        InfraError(value.into_bitebase())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BiteBaseError */
/* -------------------------------------------------------------------------- */

impl IntoBiteBaseError for HttpError {
    fn into_bitebase(self) -> BiteBaseError {
        if self.is_timeout() {
            return BiteBaseError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BiteBaseError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => BiteBaseError::Auth(message),
                404 => BiteBaseError::NotFound(message),
                429 => BiteBaseError::RateLimited(message),
                400..=499 => BiteBaseError::InvalidInput(message),
                _ => BiteBaseError::External(message),
            };
        }

        if self.is_decode() {
            return BiteBaseError::Serialization(format!("invalid HTTP response body: {self}"));
        }
        if self.is_builder() {
            return BiteBaseError::Config(format!("invalid HTTP request: {self}"));
        }

        BiteBaseError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bitebase())
    }
}

/* -------------------------------------------------------------------------- */
/* Config file errors */
/* -------------------------------------------------------------------------- */

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(BiteBaseError::Config(format!("Invalid TOML format: {value}")))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(BiteBaseError::Config(format!("Failed to read config file: {value}")))
    }
}

/// Shorthand for `?` on infrastructure results inside this crate.
pub(crate) fn to_domain<E>(err: E) -> BiteBaseError
where
    InfraError: From<E>,
{
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
