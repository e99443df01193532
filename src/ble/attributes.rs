//! ATT Data Plane
//!
//! Attribute identities of the heartbeat service, the two-phase
//! (probe/blob) read provider and the write handler. Both handlers treat
//! unknown attributes and malformed payloads as no-ops; rejecting a
//! request at the protocol level is the transport's job.

use crate::led::LedControl;
use crate::state::AppState;

/// Client characteristic configuration value enabling notifications.
pub const CCC_NOTIFICATION: u16 = 0x0001;

/// User description served for the counter characteristic.
pub const COUNTER_DESCRIPTION: &[u8] = b"Counter";

/// User description served for the LED characteristic.
pub const LED_DESCRIPTION: &[u8] = b"LED Status and Control";

/// ATT handles of the heartbeat service, fixed once the table is
/// registered and valid for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattHandles {
    pub counter_value: u16,
    pub counter_description: u16,
    pub counter_cccd: u16,
    pub led_value: u16,
    pub led_description: u16,
    pub led_cccd: u16,
}

/// Outcome of a read: the probed total length when no destination was
/// supplied, or the number of bytes copied into the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadOutcome {
    Length(usize),
    Bytes(usize),
}

impl ReadOutcome {
    /// Byte count carried by either variant.
    pub fn len(&self) -> usize {
        match self {
            ReadOutcome::Length(n) | ReadOutcome::Bytes(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outbound LED action produced by a characteristic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedCommand {
    On,
    Off,
}

/// Serve a read of one of the four served attributes.
///
/// Probe mode (`destination == None`) returns the remaining value length
/// from `offset`; blob mode copies `min(capacity, len - offset)` bytes.
/// An offset past the end yields a zero-length result, and so does any
/// attribute this provider does not serve.
pub fn att_read<L: LedControl>(
    state: &mut AppState,
    led: &L,
    handles: &GattHandles,
    attribute: u16,
    offset: usize,
    destination: Option<&mut [u8]>,
) -> ReadOutcome {
    if attribute == handles.counter_value {
        return read_blob(state.counter_text.as_bytes(), offset, destination);
    }
    if attribute == handles.counter_description {
        return read_blob(COUNTER_DESCRIPTION, offset, destination);
    }
    if attribute == handles.led_value {
        // The LED may have changed since the last tick; refresh before
        // serving so the read reflects the live driver state.
        state.refresh_led_text(led.is_on());
        return read_blob(state.led_text.as_bytes(), offset, destination);
    }
    if attribute == handles.led_description {
        return read_blob(LED_DESCRIPTION, offset, destination);
    }

    debug!("ATT: read on unknown attribute {=u16:#06x}", attribute);
    read_blob(&[], offset, destination)
}

fn read_blob(source: &[u8], offset: usize, destination: Option<&mut [u8]>) -> ReadOutcome {
    let remaining = source.len().saturating_sub(offset);
    match destination {
        None => ReadOutcome::Length(remaining),
        Some(dest) => {
            let count = remaining.min(dest.len());
            dest[..count].copy_from_slice(&source[offset..offset + count]);
            ReadOutcome::Bytes(count)
        }
    }
}

/// Apply a write to one of the four writable attributes.
///
/// Never fails: malformed payloads and unknown attributes degrade to an
/// ignored write. The returned command is the only outbound effect; the
/// caller drives the LED with it.
pub fn att_write(
    state: &mut AppState,
    handles: &GattHandles,
    connection: u16,
    attribute: u16,
    transaction_mode: u16,
    offset: u16,
    payload: &[u8],
) -> Option<LedCommand> {
    if attribute == handles.counter_cccd || attribute == handles.led_cccd {
        let Some(config) = read_u16_le(payload) else {
            warn!(
                "ATT: configuration write of {=usize} bytes ignored",
                payload.len()
            );
            return None;
        };
        // The most recent writer to either configuration handle owns the
        // single subscriber slot, enable or disable.
        state.set_subscription(connection, config == CCC_NOTIFICATION);
        return None;
    }

    if attribute == handles.counter_value {
        debug!(
            "ATT: counter write, mode {=u16}, offset {=u16}, data {=[u8]:x}",
            transaction_mode, offset, payload
        );
        return None;
    }

    if attribute == handles.led_value {
        debug!(
            "ATT: led write, mode {=u16}, offset {=u16}, data {=[u8]:x}",
            transaction_mode, offset, payload
        );
        if payload == b"ON" {
            return Some(LedCommand::On);
        }
        if payload == b"OFF" {
            return Some(LedCommand::Off);
        }
        // Anything else, including lowercase, is silently ignored.
        return None;
    }

    None
}

fn read_u16_le(payload: &[u8]) -> Option<u16> {
    let bytes = payload.get(..2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}
