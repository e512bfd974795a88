//! Core library components.
//!
//! Everything the CLI needs lives here: the envelope codec and contract, the
//! key-resolving provider, the cipher backends and settings handling.

pub mod cipher;
pub mod codec;
pub mod config;
pub mod constants;
pub mod domain;
pub mod envelope;
pub mod provider;
pub mod types;
