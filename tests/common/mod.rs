#![allow(dead_code)]

//! Shared helpers for the host test suite: fake collaborators and a
//! fixed attribute table layout.

use le_counter_firmware::battery::BatteryReporter;
use le_counter_firmware::ble::attributes::GattHandles;
use le_counter_firmware::led::LedControl;

/// In-memory LED driver standing in for the board GPIO line.
#[derive(Debug, Default)]
pub struct FakeLed {
    pub on: bool,
}

impl LedControl for FakeLed {
    fn turn_on(&mut self) {
        self.on = true;
    }

    fn turn_off(&mut self) {
        self.on = false;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// Records every level pushed to the battery service.
#[derive(Debug, Default)]
pub struct FakeBattery {
    pub levels: Vec<u8>,
}

impl BatteryReporter for FakeBattery {
    fn set_level(&mut self, percent: u8) {
        self.levels.push(percent);
    }
}

/// Attribute layout mirroring a registered service table.
pub fn handles() -> GattHandles {
    GattHandles {
        counter_value: 0x000b,
        counter_description: 0x000c,
        counter_cccd: 0x000d,
        led_value: 0x000f,
        led_description: 0x0010,
        led_cccd: 0x0011,
    }
}
