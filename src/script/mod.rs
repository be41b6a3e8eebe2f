// src/script/mod.rs

//! Entry-script construction.
//!
//! - [`correlation`] defines the per-call id that tags every marker line.
//! - [`markers`] is the marker vocabulary shared by the wrapper and the
//!   output parser.
//! - [`wrapper`] embeds caller script text in the marker-emitting
//!   preamble/postamble.

pub mod correlation;
pub mod markers;
pub mod wrapper;

pub use correlation::CorrelationId;
pub use markers::{Marker, Markers};
pub use wrapper::{WrappedScript, wrap};
