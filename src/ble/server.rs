//! SoftDevice GATT Server Glue
//!
//! Registers the heartbeat service (0xFF10) and the standard Battery
//! Service, owns the shared application state, and routes write callbacks
//! into the ATT write handler.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, RegisterError, WriteOp};
use nrf_softdevice::ble::{Connection, Uuid};
use nrf_softdevice::Softdevice;

use crate::battery::BatteryReporter;
use crate::ble::attributes::{
    att_write, GattHandles, LedCommand, COUNTER_DESCRIPTION, LED_DESCRIPTION,
};
use crate::state::{AppState, BATTERY_FULL_PERCENT, COUNTER_TEXT_CAPACITY, LED_TEXT_CAPACITY};

// 16-bit aliases of the fixed 128-bit (Bluetooth base) identities
// 0000xxxx-0000-1000-8000-00805F9B34FB. The mapping must stay stable for
// peers that already know this device.
const HEARTBEAT_SERVICE_UUID: Uuid = Uuid::new_16(0xff10);
const COUNTER_CHAR_UUID: Uuid = Uuid::new_16(0xff11);
const LED_CHAR_UUID: Uuid = Uuid::new_16(0xff12);
const USER_DESCRIPTION_UUID: Uuid = Uuid::new_16(0x2901);

/// Standard Battery Service fed by the simulated drain.
#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", read, notify)]
    battery_level: u8,
}

/// GATT server: collaborator services plus the shared application state
/// the write callback mutates.
pub struct Server {
    pub bas: BatteryService,
    pub handles: GattHandles,
    state: Mutex<CriticalSectionRawMutex, RefCell<AppState>>,
}

/// Events surfaced to the connection task by `gatt_server::run`.
pub enum ServerEvent {
    Led(LedCommand),
    Battery(BatteryServiceEvent),
}

impl Server {
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let bas = BatteryService::new(sd)?;
        let handles = register_heartbeat_service(sd)?;
        info!("GATT table registered: {}", handles);

        let server = Self {
            bas,
            handles,
            state: Mutex::new(RefCell::new(AppState::new())),
        };
        BasReporter { bas: &server.bas }.set_level(BATTERY_FULL_PERCENT);
        Ok(server)
    }

    /// Run a closure against the shared application state.
    pub fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut AppState) -> R,
    {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

impl gatt_server::Server for Server {
    type Event = ServerEvent;

    fn on_write(
        &self,
        conn: &Connection,
        handle: u16,
        op: WriteOp,
        offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        if let Some(event) = self.bas.on_write(handle, data) {
            return Some(ServerEvent::Battery(event));
        }

        let connection = conn.handle().unwrap_or(0);
        let mode = match op {
            WriteOp::Request => 0,
            WriteOp::Command => 1,
        };
        self.with_state(|state| {
            att_write(
                state,
                &self.handles,
                connection,
                handle,
                mode,
                offset as u16,
                data,
            )
        })
        .map(ServerEvent::Led)
    }
}

/// Pushes drain updates into the Battery Service value attribute.
pub struct BasReporter<'a> {
    pub bas: &'a BatteryService,
}

impl BatteryReporter for BasReporter<'_> {
    fn set_level(&mut self, percent: u8) {
        if self.bas.battery_level_set(&percent).is_err() {
            warn!("battery level update failed");
        }
    }
}

/// Mirror the rendered texts into the SoftDevice attribute table so reads
/// served by the stack stay current.
pub fn sync_attribute_values(sd: &Softdevice, server: &Server) {
    server.with_state(|state| {
        if gatt_server::set_value(sd, server.handles.counter_value, state.counter_text.as_bytes())
            .is_err()
        {
            warn!("counter value sync failed");
        }
        if gatt_server::set_value(sd, server.handles.led_value, state.led_text.as_bytes()).is_err()
        {
            warn!("led value sync failed");
        }
    });
}

fn register_heartbeat_service(sd: &mut Softdevice) -> Result<GattHandles, RegisterError> {
    let mut service = ServiceBuilder::new(sd, HEARTBEAT_SERVICE_UUID)?;

    let mut counter = service.add_characteristic(
        COUNTER_CHAR_UUID,
        Attribute::new(&[0u8; COUNTER_TEXT_CAPACITY]).variable_len(),
        Metadata::new(Properties::new().read().write().notify()),
    )?;
    let counter_description =
        counter.add_descriptor(USER_DESCRIPTION_UUID, Attribute::new(COUNTER_DESCRIPTION))?;
    let counter_handles = counter.build();

    let mut led = service.add_characteristic(
        LED_CHAR_UUID,
        Attribute::new(&[0u8; LED_TEXT_CAPACITY]).variable_len(),
        Metadata::new(Properties::new().read().write().notify()),
    )?;
    let led_description =
        led.add_descriptor(USER_DESCRIPTION_UUID, Attribute::new(LED_DESCRIPTION))?;
    let led_handles = led.build();

    let _service_handle = service.build();

    Ok(GattHandles {
        counter_value: counter_handles.value_handle,
        counter_description: counter_description.handle,
        counter_cccd: counter_handles.cccd_handle,
        led_value: led_handles.value_handle,
        led_description: led_description.handle,
        led_cccd: led_handles.cccd_handle,
    })
}
