//! CLI command handlers.
//!
//! This module provides testable command handlers that are invoked by main.rs.
//! Each handler reads its inputs, runs one library operation and writes the
//! result to the requested [`OutputTarget`](crate::pipeline::OutputTarget).

mod enrich;
mod generate;
mod merge;

pub use enrich::{run_add_base_images, run_add_image_ref};
pub use generate::{run_index_image, run_oci_copy, run_purls};
pub use merge::run_merge;
