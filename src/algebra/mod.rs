//! Diff algebra: transform, squash, and invert over lists of
//! application-defined diffs.
//!
//! The algebra is a table of functions keyed by diff *kind*, built once with
//! [`OtSystem::builder`] and then shared immutably. Diffs are otherwise
//! opaque to the engine.

mod result;
mod system;

use std::fmt::Debug;
use std::hash::Hash;

pub use result::{ConflictResolution, TransformResult, Transformed};
pub use system::{OtSystem, OtSystemBuilder};

/// An application diff the algebra can dispatch on.
///
/// `Kind` is a stable tag per diff variant, usually a fieldless enum. All
/// registrations in an [`OtSystem`] are keyed by it.
pub trait OtDiff: Clone + Debug + Send + Sync + 'static {
    /// Discriminant type used as the registration key.
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// The kind of this diff.
    fn kind(&self) -> Self::Kind;
}
