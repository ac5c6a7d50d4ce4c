//! pace-domain
//!
//! Pure domain models (Envelope, Purchase, Period, Shuffle, Bills, Preferences).
//! No I/O, no clock, no storage. Only data types and core enums.

pub mod bills;
pub mod common;
pub mod envelope;
pub mod period;
pub mod preferences;
pub mod purchase;
pub mod shuffle;
pub mod snapshot;
pub mod status;

pub use bills::*;
pub use common::*;
pub use envelope::*;
pub use period::*;
pub use preferences::*;
pub use purchase::*;
pub use shuffle::*;
pub use snapshot::*;
pub use status::*;
