//! Shared utilities and common types for the warehouse backend.
//!
//! This crate provides common functionality used across all other crates:
//! - JWT access token validation (and minting for tooling/tests)
//! - Page/limit normalization and the paginated response envelope
//! - Common validation logic for query parameters

pub mod jwt;
pub mod pagination;
pub mod validation;
