//! Commit store contract for ot-sync.
//!
//! This crate defines the [`CommitStore`] trait, the single interface through
//! which the OT engine reads and writes the commit graph. The engine never
//! touches durable storage directly; it programs against the trait.
//!
//! # Crate layout
//!
//! - [`store`]: the [`CommitStore`] trait definition.
//! - [`types`]: value types used in trait signatures ([`Commit`], [`CommitId`]).
//! - [`error`]: the [`StoreError`] enum returned by all trait methods.
//! - [`memory`]: [`MemoryStore`], an in-memory content-addressed store.

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{CommitKey, CommitStore};
pub use types::{Commit, CommitId, IdParseError};
