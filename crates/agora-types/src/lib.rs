//! Agora Types - Primitive type definitions for the Agora governance engine.
//!
//! This crate provides:
//! - Addresses (20-byte account identities)
//! - U256 (256-bit unsigned integer with checked arithmetic)
//! - Token unit helpers (18 decimal places)

pub mod address;
pub mod u256;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use u256::U256;
pub use error::TypesError;

/// Seconds since the UNIX epoch, as reported by the environment clock.
pub type Timestamp = u64;

/// Number of decimal places of the governance token.
pub const TOKEN_DECIMALS: u32 = 18;
