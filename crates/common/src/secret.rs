//! Secret types for keeping credentials out of logs.
//!
//! Re-exports the [`secrecy`] wrappers. Anything that can authenticate a caller
//! (raw bearer tokens in particular) is held as a [`SecretString`] so that
//! `{:?}` formatting and `tracing` fields never print it.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Presented {
//!     username: String,
//!     token: SecretString,
//! }
//!
//! let presented = Presented {
//!     username: "alice".to_string(),
//!     token: SecretString::from("eyJhbGciOiJSUzI1NiJ9.e30.c2ln"),
//! };
//!
//! assert!(!format!("{presented:?}").contains("eyJ"));
//! assert!(presented.token.expose_secret().starts_with("eyJ"));
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let token = SecretString::from("eyJhbGciOiJSUzI1NiJ9.e30.c2ln");
        let debug_str = format!("{token:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("eyJ"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let token = SecretString::from("raw-bearer-value");
        assert_eq!(token.expose_secret(), "raw-bearer-value");
    }

    #[test]
    fn test_clone_keeps_value() {
        let token = SecretString::from("cloneable");
        let cloned = token.clone();
        assert_eq!(cloned.expose_secret(), "cloneable");
    }
}
