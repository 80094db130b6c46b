/// Utility for generating batch script contents.
mod script_builder;
pub use script_builder::{shell_quote, BatchScriptBuilder};

/// Decide which tasks still need computing.
mod filter;
pub use filter::{needs_compute, SkipList};

/// Wall-time and memory annotations for submissions.
mod resources;
pub use resources::ResourceAnnotation;
