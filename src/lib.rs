//! joao keeps three views of one configuration document in sync: a
//! human-edited YAML file (comments, ordering and `!!secret` annotations
//! included), a flat 1Password item, and the JSON projection downstream
//! programs consume.
//!
//! The pieces:
//!
//! - [`config`]: the typed tree ([`config::Entry`]), the document identity
//!   ([`Config`]), tree operations, the flat-item codec and the loader.
//! - [`yaml`]: a comment-preserving YAML subset codec; with default
//!   [`OutputOptions`] a document round-trips byte for byte.
//! - [`opclient`]: the [`opclient::SecretClient`] trait with the `op` CLI
//!   and Connect HTTP backends.
//! - [`diff`]: rendering two snapshots through `diff(1)`.
//! - [`vault`]: the read-only adapter a secrets-backend plugin host mounts.

pub mod config;
pub mod diff;
pub mod error;
pub mod opclient;
pub mod vault;
pub mod yaml;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::{Config, Entry, OutputOptions};
pub use error::{Error, Result};
