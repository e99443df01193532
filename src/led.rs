//! LED Driver Seam
//!
//! The core drives the LED through this trait; the board implementation
//! sits behind the `embedded` feature so tests can substitute a fake.

/// On/off/get primitives over the board LED line.
pub trait LedControl {
    fn turn_on(&mut self);
    fn turn_off(&mut self);
    fn is_on(&self) -> bool;
}

#[cfg(feature = "embedded")]
pub use board::BoardLed;

#[cfg(feature = "embedded")]
mod board {
    use embassy_nrf::gpio::Output;

    use super::LedControl;

    /// Board LED on an active-low GPIO line (nRF52-DK wiring: LOW = lit).
    pub struct BoardLed {
        pin: Output<'static>,
    }

    impl BoardLed {
        pub fn new(pin: Output<'static>) -> Self {
            Self { pin }
        }
    }

    impl LedControl for BoardLed {
        fn turn_on(&mut self) {
            self.pin.set_low();
        }

        fn turn_off(&mut self) {
            self.pin.set_high();
        }

        fn is_on(&self) -> bool {
            self.pin.is_set_low()
        }
    }
}
