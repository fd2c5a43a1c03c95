//! Macro for implementing Display, FromStr and `as_str` for taxonomy enums
//!
//! The error taxonomy exposes each enum as a stable lowercase wire string
//! (`"business_logic"`, `"critical"`, ...). This macro keeps the string table
//! in one place for formatting, parsing and tag emission.
//!
//! # Example
//!
//! ```rust
//! use bitebase_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Plan {
//!     Free,
//!     Premium,
//! }
//!
//! impl_domain_enum_conversions!(Plan {
//!     Free => "free",
//!     Premium => "premium",
//! });
//!
//! assert_eq!(Plan::Premium.as_str(), "premium");
//! assert_eq!("FREE".parse::<Plan>(), Ok(Plan::Free));
//! ```

/// Implements `as_str`, Display and FromStr for unit-variant enums
///
/// Parsing is case-insensitive; formatting always emits the mapped string.
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable string representation used in logs, tags and payloads.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
