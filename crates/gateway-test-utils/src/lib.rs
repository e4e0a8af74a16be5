//! # Gateway Test Utilities
//!
//! Shared test utilities for the gateway service.
//!
//! This crate provides:
//! - Fixed RSA keypairs that sign RS256 tokens (`TestKeypair`)
//! - Cognito-shaped claim builder (`TestTokenBuilder`)
//! - Mock JWKS endpoint (`MockJwks`)
//! - Server test harness (`TestGatewayServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let keypair = TestKeypair::primary("abc");
//!     let jwks = MockJwks::start(&[&keypair]).await;
//!     let server = TestGatewayServer::spawn(&jwks.url()).await?;
//!
//!     let token = keypair.sign_token(&TestTokenBuilder::new().for_user("alice").build());
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/user-info", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
