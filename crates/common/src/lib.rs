//! Common utilities and types shared across gateway components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (compact parsing, RSA key material, expiry checks)
pub mod jwt;
