//! Battery Reporter Seam
//!
//! The heartbeat pushes the simulated battery level through this trait.
//! On target the implementation forwards into the standard Battery
//! Service; tests record the pushed levels instead.

pub trait BatteryReporter {
    /// Publish a new battery percentage (0..=100).
    fn set_level(&mut self, percent: u8);
}
