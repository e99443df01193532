//! BLE application layer: attribute data plane, stack event dispatch and
//! the SoftDevice GATT server glue.

pub mod attributes;
pub mod events;

#[cfg(feature = "embedded")]
pub mod server;
