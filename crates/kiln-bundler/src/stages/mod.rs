//! Built-in pipeline stages, in the order the pipeline runs them.

pub mod bundle;
pub mod lower;
pub mod minify;
pub mod resolve;
pub(crate) mod scan;

pub use bundle::BundleStage;
pub use lower::LowerStage;
pub use minify::MinifyStage;
pub use resolve::ResolveStage;
