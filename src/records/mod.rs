//! Global change log.
//!
//! Every run appends one entry: the full normalized state on an initial run,
//! the attributed change list otherwise.

mod log;

pub use log::ChangeLog;
