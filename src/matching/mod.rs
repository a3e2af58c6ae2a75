//! Component identity across documents.
//!
//! - [`resolver_key`] computes the key under which the merge unifies nodes
//! - [`purl`] parses and canonically renders package URLs
//! - [`DuplicateFilter`] recognises scanner nodes that repeat what the
//!   prefetch tool already reported

mod flavour;
pub mod purl;
mod resolver;

pub use flavour::{remove_duplicates, DuplicateFilter, Flavour, FlavouredInput};
pub use purl::Purl;
pub use resolver::{resolver_key, ResolverKey};
