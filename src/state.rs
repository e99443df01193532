//! Application Status Store
//!
//! Holds the heartbeat counter, its rendered text, the LED status text,
//! the simulated battery level and the notification subscription. One
//! instance is created by the composition root and handed into every
//! callback; nothing in here is global.

use core::fmt::{self, Write};

use heapless::String;

/// Usable characters in the rendered counter text.
pub const COUNTER_TEXT_CAPACITY: usize = 29;

/// Usable characters in the rendered LED status text.
pub const LED_TEXT_CAPACITY: usize = 9;

/// Battery level the simulated drain re-arms to.
pub const BATTERY_FULL_PERCENT: u8 = 100;

/// Lowest level ever reported; a decrement below this re-arms to full.
pub const BATTERY_RESET_THRESHOLD: u8 = 50;

/// Volatile session state, reset on every restart.
pub struct AppState {
    /// Heartbeat counter, wraps silently at the integer width.
    pub counter: u32,

    /// Most recent rendering of `counter`, regenerated every beat.
    pub counter_text: String<COUNTER_TEXT_CAPACITY>,

    /// "ON"/"OFF", regenerated every beat and lazily before LED reads.
    pub led_text: String<LED_TEXT_CAPACITY>,

    /// Simulated battery level, kept within `[50, 100]`.
    pub battery_percent: u8,

    /// Whether a peer has enabled notifications.
    pub notifications_enabled: bool,

    /// Connection handle of the subscriber, meaningful only while
    /// `notifications_enabled` is set.
    pub subscriber: u16,
}

impl AppState {
    pub const fn new() -> Self {
        Self {
            counter: 0,
            counter_text: String::new(),
            led_text: String::new(),
            battery_percent: BATTERY_FULL_PERCENT,
            notifications_enabled: false,
            subscriber: 0,
        }
    }

    /// Connection handle to notify, while a subscriber is active.
    pub fn subscriber(&self) -> Option<u16> {
        self.notifications_enabled.then_some(self.subscriber)
    }

    /// Record the most recent configuration writer as the subscriber.
    ///
    /// There is one subscriber slot; the latest writer to either
    /// configuration handle owns it, enable or disable.
    pub fn set_subscription(&mut self, connection: u16, enabled: bool) {
        self.notifications_enabled = enabled;
        self.subscriber = connection;
    }

    /// Drop the subscription, whichever connection held it.
    pub fn clear_subscription(&mut self) {
        self.notifications_enabled = false;
    }

    /// Advance the counter and re-render both status texts.
    pub fn beat(&mut self, led_on: bool) {
        self.counter = self.counter.wrapping_add(1);
        render_counter_text(&mut self.counter_text, self.counter);
        info!("{=str}", self.counter_text.as_str());

        self.refresh_led_text(led_on);
    }

    /// Re-render the LED status text from the driver's live state.
    pub fn refresh_led_text(&mut self, led_on: bool) {
        self.led_text.clear();
        let _ = self.led_text.push_str(if led_on { "ON" } else { "OFF" });
        debug!("{=str}", self.led_text.as_str());
    }

    /// Simulated drain: one percent per tick. The level is re-armed to
    /// full the instant a decrement would land below the threshold, so
    /// observers never see it there.
    pub fn drain_battery(&mut self) -> u8 {
        self.battery_percent = self.battery_percent.saturating_sub(1);
        if self.battery_percent < BATTERY_RESET_THRESHOLD {
            self.battery_percent = BATTERY_FULL_PERCENT;
        }
        self.battery_percent
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the counter line into `text`, truncating at capacity.
pub fn render_counter_text<const N: usize>(text: &mut String<N>, counter: u32) {
    text.clear();
    let _ = write!(Truncating(text), "BTstack counter {:04}", counter);
}

/// `core::fmt::Write` adapter that drops characters past capacity instead
/// of failing the whole write.
struct Truncating<'a, const N: usize>(&'a mut String<N>);

impl<const N: usize> fmt::Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}
