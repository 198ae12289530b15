//! Validated, immutable descriptions of a load run.
pub mod run;


pub use run::{RequestSpec, RunConfig};
