//! Individual stages of a launcher run.
//!
//! Each stage is a separate module with functions the orchestrator calls
//! in sequence.

pub mod download;
pub mod extract;
pub mod launch;
