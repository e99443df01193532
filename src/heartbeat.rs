//! Periodic Heartbeat
//!
//! Each tick advances the counter, re-renders the status texts, drains
//! the simulated battery and, if a peer subscribed, asks the transport
//! for a can-send-now grant.

use crate::battery::BatteryReporter;
use crate::led::LedControl;
use crate::state::AppState;

/// Fixed heartbeat period. The timer is one-shot and must be re-armed on
/// every tick; missing the re-arm stops the heartbeat for good.
pub const HEARTBEAT_PERIOD_MS: u64 = 1000;

/// One heartbeat tick.
///
/// Returns the connection handle a can-send-now grant should be requested
/// for, if a subscriber is active. The grant resolves later through the
/// event dispatcher, never inline.
pub fn tick<L, B>(state: &mut AppState, led: &L, battery: &mut B) -> Option<u16>
where
    L: LedControl,
    B: BatteryReporter,
{
    state.beat(led.is_on());

    let request = state.subscriber();

    let level = state.drain_battery();
    battery.set_level(level);

    request
}
