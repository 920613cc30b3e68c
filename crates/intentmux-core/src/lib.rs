pub mod config;
pub mod resolution;
pub mod text;

pub use config::{ConfigError, ResolverConfig};
pub use resolution::{Candidate, Resolution, Rule, Source, UNKNOWN_INTENT, arbitrate};
pub use text::normalize;
