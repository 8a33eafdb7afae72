//! Macro for implementing Display and FromStr for state enums
//!
//! Keeps the wire/log representation of small state enums in one place.
//!
//! # Example
//!
//! ```rust
//! use authdesk_domain::impl_state_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Starting,
//!     Done,
//! }
//!
//! impl_state_conversions!(Phase {
//!     Starting => "starting",
//!     Done => "done",
//! });
//!
//! assert_eq!(Phase::Done.to_string(), "done");
//! ```

/// Implements Display and FromStr traits for state enums
///
/// - Display: writes the mapped lowercase string
/// - FromStr: parses case-insensitively, erroring with the enum name
#[macro_export]
macro_rules! impl_state_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
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
