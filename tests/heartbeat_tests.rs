//! Heartbeat tests: counter text rendering, battery drain schedule and
//! the per-tick notification request.

mod common;

use common::{FakeBattery, FakeLed};
use le_counter_firmware::heartbeat::tick;
use le_counter_firmware::led::LedControl;
use le_counter_firmware::state::{render_counter_text, AppState, BATTERY_FULL_PERCENT};
use proptest::prelude::*;

#[test]
fn counter_tracks_the_tick_count() {
    let mut state = AppState::new();
    let led = FakeLed::default();
    let mut battery = FakeBattery::default();

    for expected in 1..=5u32 {
        tick(&mut state, &led, &mut battery);
        assert_eq!(state.counter, expected);
    }
}

#[test]
fn counter_text_is_zero_padded_to_four_digits() {
    let mut state = AppState::new();
    state.counter = 41;
    state.beat(false);
    assert_eq!(state.counter_text.as_str(), "BTstack counter 0042");

    state.counter = 6;
    state.beat(false);
    assert_eq!(state.counter_text.as_str(), "BTstack counter 0007");
}

#[test]
fn counter_text_grows_past_four_digits() {
    let mut state = AppState::new();
    state.counter = 12344;
    state.beat(false);
    assert_eq!(state.counter_text.as_str(), "BTstack counter 12345");
}

#[test]
fn counter_wraps_instead_of_overflowing() {
    let mut state = AppState::new();
    state.counter = u32::MAX;
    state.beat(false);
    assert_eq!(state.counter, 0);
    assert_eq!(state.counter_text.as_str(), "BTstack counter 0000");
}

#[test]
fn render_truncates_at_the_buffer_capacity() {
    let mut text: heapless::String<8> = heapless::String::new();
    render_counter_text(&mut text, 1);
    assert_eq!(text.as_str(), "BTstack ");
}

#[test]
fn battery_level_is_pushed_every_tick() {
    let mut state = AppState::new();
    let led = FakeLed::default();
    let mut battery = FakeBattery::default();

    for _ in 0..3 {
        tick(&mut state, &led, &mut battery);
    }
    assert_eq!(battery.levels, vec![99, 98, 97]);
    assert_eq!(state.battery_percent, 97);
}

#[test]
fn battery_resets_to_full_below_half() {
    let mut state = AppState::new();
    let led = FakeLed::default();
    let mut battery = FakeBattery::default();

    for _ in 0..50 {
        tick(&mut state, &led, &mut battery);
    }
    assert_eq!(state.battery_percent, 50);

    tick(&mut state, &led, &mut battery);
    assert_eq!(state.battery_percent, BATTERY_FULL_PERCENT);
    assert_eq!(*battery.levels.last().unwrap(), BATTERY_FULL_PERCENT);
}

#[test]
fn notification_request_follows_the_subscription() {
    let mut state = AppState::new();
    let led = FakeLed::default();
    let mut battery = FakeBattery::default();

    assert_eq!(tick(&mut state, &led, &mut battery), None);

    state.set_subscription(0x2a, true);
    assert_eq!(tick(&mut state, &led, &mut battery), Some(0x2a));

    state.clear_subscription();
    assert_eq!(tick(&mut state, &led, &mut battery), None);
}

#[test]
fn tick_refreshes_the_led_text() {
    let mut state = AppState::new();
    let mut led = FakeLed::default();
    let mut battery = FakeBattery::default();

    led.turn_on();
    tick(&mut state, &led, &mut battery);
    assert_eq!(state.led_text.as_str(), "ON");

    led.turn_off();
    tick(&mut state, &led, &mut battery);
    assert_eq!(state.led_text.as_str(), "OFF");
}

proptest! {
    #[test]
    fn battery_stays_within_the_drain_band(ticks in 1usize..600) {
        let mut state = AppState::new();
        let led = FakeLed::default();
        let mut battery = FakeBattery::default();

        for _ in 0..ticks {
            tick(&mut state, &led, &mut battery);
        }

        for level in &battery.levels {
            prop_assert!((50u8..=100).contains(level), "level {level} out of band");
        }
        prop_assert_eq!(state.battery_percent, *battery.levels.last().unwrap());
    }
}
