//! Bar construction and routing.

pub mod builder;
pub mod router;

pub use builder::BarBuilder;
pub use router::BarRouter;
