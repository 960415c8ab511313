//! chainscope - blockchain explorer API over an execution node and a beacon node
//!
//! # Architecture
//!
//! Requests flow upward through four layers:
//!
//! ## Records
//! - [`block`] - Execution-layer blocks
//! - [`transaction`] - Transactions and hash validation
//! - [`consensus`] - Epochs and slot headers
//!
//! ## Derivation
//! - [`derivation`] - Slot/epoch arithmetic, progress, relative time, wide integers
//!
//! ## Upstreams
//! - [`upstream`] - Execution JSON-RPC and beacon REST adapters
//!
//! ## Aggregation & Integration
//! - [`aggregator`] - Composite views and the partial-failure policy
//! - [`api`] - HTTP surface
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Records
// ============================================================================
pub mod block;
pub mod consensus;
pub mod transaction;

// ============================================================================
// Derivation
// ============================================================================
pub mod derivation;

// ============================================================================
// Upstreams
// ============================================================================
pub mod upstream;

// ============================================================================
// Aggregation & Integration
// ============================================================================
pub mod aggregator;
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
