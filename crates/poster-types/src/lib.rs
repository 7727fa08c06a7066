//! Core types for the map-poster generation client.
//!
//! Wire DTOs match the backend's JSON contract; `JobState` carries the rules
//! for applying status snapshots to the active job.

mod dto;
mod job;
mod location;
mod traits;

pub use dto::*;
pub use job::*;
pub use location::*;
pub use traits::*;
