//! Capability registrations
//!
//! Lookup rules and instance lifecycles live on [`crate::Scope`]; this module
//! only holds the bookkeeping.

mod entry;
mod table;

pub use entry::ServiceEntry;
pub use table::ServiceTable;
