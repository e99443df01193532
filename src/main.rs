#![no_std]
#![no_main]

use core::cell::RefCell;
use core::mem;

use defmt::{info, unwrap, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::{config::Config, interrupt};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::{raw, Softdevice};
use panic_probe as _;
use static_cell::StaticCell;

use le_counter_firmware::ble::attributes::LedCommand;
use le_counter_firmware::ble::events::{dispatch, Action, StackEvent, StackState, MAX_ACTIONS};
use le_counter_firmware::ble::server::{
    sync_attribute_values, BasReporter, BatteryServiceEvent, Server, ServerEvent,
};
use le_counter_firmware::heartbeat::{tick, HEARTBEAT_PERIOD_MS};
use le_counter_firmware::led::{BoardLed, LedControl};

/// Composition root context: the collaborators every task shares.
struct Context {
    server: Server,
    led: Mutex<CriticalSectionRawMutex, RefCell<BoardLed>>,
    sd: &'static Softdevice,
}

impl Context {
    fn with_led<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut BoardLed) -> R,
    {
        self.led.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

static CONTEXT: StaticCell<Context> = StaticCell::new();

/// Can-send-now grants flowing from the heartbeat to the connection task.
static CAN_SEND_NOW: Channel<CriticalSectionRawMutex, u16, 4> = Channel::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting LE counter firmware");

    // Configure interrupt priorities to avoid SoftDevice reserved levels.
    let mut nrf_config = Config::default();
    nrf_config.gpiote_interrupt_priority = interrupt::Priority::P2;
    nrf_config.time_interrupt_priority = interrupt::Priority::P2;

    let p = embassy_nrf::init(nrf_config);

    // LED on while the stack is powering up.
    let mut led = BoardLed::new(Output::new(p.P0_13, Level::High, OutputDrive::Standard));
    led.turn_on();

    let sd_config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 247 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: 1408,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: Default::default(),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: b"Pico BLE" as *const u8 as _,
            current_len: 8,
            max_len: 8,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&sd_config);
    let server = unwrap!(Server::new(sd));
    let sd: &'static Softdevice = sd;

    let context = CONTEXT.init(Context {
        server,
        led: Mutex::new(RefCell::new(led)),
        sd,
    });

    // Beat once before the stack is visible to peers, so the served
    // values exist even if a central connects and reads immediately.
    let led_on = context.with_led(|led| led.is_on());
    context.server.with_state(|state| state.beat(led_on));
    sync_attribute_values(context.sd, &context.server);

    unwrap!(spawner.spawn(softdevice_task(context.sd)));

    // The SoftDevice is live: same moment the host stack would report
    // its working state, so clear the booting indicator.
    let handles = context.server.handles;
    let actions = context
        .server
        .with_state(|state| dispatch(state, &handles, StackEvent::StateChanged(StackState::Working)));
    apply_actions(context, None, actions);

    unwrap!(spawner.spawn(heartbeat_task(context)));
    unwrap!(spawner.spawn(ble_task(context)));
}

/// Execute the outbound actions a dispatch produced. Notifications need
/// the live connection; without one they are dropped.
fn apply_actions(ctx: &Context, conn: Option<&Connection>, actions: heapless::Vec<Action, MAX_ACTIONS>) {
    for action in actions {
        match action {
            Action::LedOff => {
                ctx.with_led(|led| led.turn_off());
                refresh_led_value(ctx);
            }
            Action::Notify {
                connection,
                attribute,
                data,
            } => {
                let Some(conn) = conn else {
                    warn!("notify for conn {=u16} dropped: no connection", connection);
                    continue;
                };
                if gatt_server::notify_value(conn, attribute, &data).is_err() {
                    warn!("notify on attribute {=u16:#06x} failed", attribute);
                }
            }
        }
    }
}

/// Re-render the LED text from the driver and mirror it into the table.
fn refresh_led_value(ctx: &Context) {
    let led_on = ctx.with_led(|led| led.is_on());
    ctx.server.with_state(|state| state.refresh_led_text(led_on));
    sync_attribute_values(ctx.sd, &ctx.server);
}

#[embassy_executor::task]
async fn heartbeat_task(ctx: &'static Context) {
    loop {
        // One-shot timer, re-armed every tick.
        Timer::after(Duration::from_millis(HEARTBEAT_PERIOD_MS)).await;

        let request = ctx.with_led(|led| {
            ctx.server.with_state(|state| {
                let mut reporter = BasReporter {
                    bas: &ctx.server.bas,
                };
                tick(state, led, &mut reporter)
            })
        });
        sync_attribute_values(ctx.sd, &ctx.server);

        if let Some(connection) = request {
            if CAN_SEND_NOW.try_send(connection).is_err() {
                warn!("can-send-now request dropped: queue full");
            }
        }
    }
}

#[embassy_executor::task]
async fn ble_task(ctx: &'static Context) {
    static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
        .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
        .services_16(ServiceList::Incomplete, &[ServiceUuid16::from_u16(0xff10)])
        .full_name("Pico BLE")
        .build();

    static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new().build();

    loop {
        let config = peripheral::Config::default();
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };

        let conn = match peripheral::advertise_connectable(ctx.sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("advertising failed: {:?}", defmt::Debug2Format(&e));
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };
        let conn_handle = conn.handle().unwrap_or(0);
        info!("connected: conn {=u16}", conn_handle);

        let gatt = gatt_server::run(&conn, &ctx.server, |event| match event {
            ServerEvent::Led(command) => {
                ctx.with_led(|led| match command {
                    LedCommand::On => led.turn_on(),
                    LedCommand::Off => led.turn_off(),
                });
                refresh_led_value(ctx);
            }
            ServerEvent::Battery(BatteryServiceEvent::BatteryLevelCccdWrite { notifications }) => {
                info!("battery notifications: {=bool}", notifications);
            }
        });

        // Grants requested by the heartbeat resolve here, where the
        // connection object lives.
        let grants = async {
            loop {
                let _requested = CAN_SEND_NOW.receive().await;
                let handles = ctx.server.handles;
                let actions = ctx
                    .server
                    .with_state(|state| dispatch(state, &handles, StackEvent::CanSendNow));
                apply_actions(ctx, Some(&conn), actions);
            }
        };

        match select(gatt, grants).await {
            Either::First(error) => {
                info!("disconnected: {:?}", defmt::Debug2Format(&error));
                let handles = ctx.server.handles;
                let actions = ctx.server.with_state(|state| {
                    dispatch(
                        state,
                        &handles,
                        StackEvent::Disconnected {
                            connection: conn_handle,
                        },
                    )
                });
                apply_actions(ctx, None, actions);
            }
            // The grant loop never completes on its own.
            Either::Second(_) => {}
        }
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}
