//! Core pipeline for turning a long narrative script into short, visually
//! descriptive phrases suitable for searching stock video footage.
//!
//! Flow: sentence splitting -> fixed-size batching -> one completion request
//! per batch (sequential, fixed delay) -> line-grammar parsing -> aggregated
//! result with counts. Presentation (clipboard, styling) lives outside this
//! crate; the bundled CLI is a thin shell over `processor`.

pub mod completion;
pub mod error;
pub mod modes;
pub mod parser;
pub mod processor;
pub mod script;

pub use error::ExtractError;
pub use modes::ExtractionMode;
pub use processor::{ExtractionResult, ExtractionSettings};
