//! Symmetric encryption primitives.

pub mod cipher;

pub use cipher::{CipherService, SealedPayload};
