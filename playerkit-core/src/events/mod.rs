//! Event delivery
//!
//! Each scope owns one [`EventBus`]. Sticky values and cross-scope
//! propagation are implemented by the scope itself.

mod bus;

pub use bus::EventBus;
