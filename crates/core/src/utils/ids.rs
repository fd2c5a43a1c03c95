//! Correlation identifiers
//!
//! Error ids and session ids share the shape `{prefix}_{epochMillis}_{suffix}`
//! where the suffix is nine random base36 characters.
//!
//! ```
//! use bitebase_core::utils::ids::{error_id, session_id};
//!
//! let id = error_id(1_700_000_000_000);
//! assert!(id.starts_with("err_1700000000000_"));
//! assert_eq!(id.len(), "err_1700000000000_".len() + 9);
//! assert!(session_id(1).starts_with("session_1_"));
//! ```

use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Random lowercase base36 string of `len` characters.
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())])).collect()
}

/// `error_<millis>_<suffix>`
pub fn error_id(epoch_millis: u64) -> String {
    format!("err_{epoch_millis}_{}", random_base36(SUFFIX_LEN))
}

/// `session_<millis>_<suffix>`
pub fn session_id(epoch_millis: u64) -> String {
    format!("session_{epoch_millis}_{}", random_base36(SUFFIX_LEN))
}
