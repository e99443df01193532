//! Stack Event Dispatch
//!
//! Tagged events delivered by the transport/stack collaborator and the
//! pure dispatch routine that turns them into state changes plus outbound
//! actions. Keeping the dispatcher free of I/O lets the whole session
//! logic run under the host test suite.

use heapless::Vec;

use crate::ble::attributes::GattHandles;
use crate::state::{AppState, COUNTER_TEXT_CAPACITY};

/// Largest notification payload (the rendered counter line).
pub const MAX_NOTIFY_LEN: usize = COUNTER_TEXT_CAPACITY;

/// Actions emitted by one dispatch, at most one per characteristic.
pub const MAX_ACTIONS: usize = 2;

/// Host stack lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackState {
    Off,
    Initializing,
    Working,
    Halting,
}

/// Events delivered by the transport/stack collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum StackEvent {
    /// Stack lifecycle change; only `Working` triggers an action.
    StateChanged(StackState),
    /// A link dropped. The handle is informational: the single
    /// subscriber slot is cleared no matter which connection it was.
    Disconnected { connection: u16 },
    /// The transport granted a previously requested send slot.
    CanSendNow,
}

/// Outbound actions the composition root executes after a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Clear the booting indicator.
    LedOff,
    /// Push a notification payload to the subscriber.
    Notify {
        connection: u16,
        attribute: u16,
        data: Vec<u8, MAX_NOTIFY_LEN>,
    },
}

/// Route one stack event. Synchronous and total: unrecognized lifecycle
/// states are ignored, and a grant that raced a disconnect sends nothing.
pub fn dispatch(
    state: &mut AppState,
    handles: &GattHandles,
    event: StackEvent,
) -> Vec<Action, MAX_ACTIONS> {
    let mut actions = Vec::new();

    match event {
        StackEvent::StateChanged(StackState::Working) => {
            info!("stack up and running");
            let _ = actions.push(Action::LedOff);
        }
        StackEvent::StateChanged(_) => {}
        StackEvent::Disconnected { connection } => {
            debug!("disconnected: conn {=u16}", connection);
            state.clear_subscription();
        }
        StackEvent::CanSendNow => {
            if let Some(connection) = state.subscriber() {
                // Fixed order: counter strictly before LED status.
                let _ = actions.push(notify(
                    connection,
                    handles.counter_value,
                    state.counter_text.as_bytes(),
                ));
                let _ = actions.push(notify(
                    connection,
                    handles.led_value,
                    state.led_text.as_bytes(),
                ));
            }
        }
    }

    actions
}

fn notify(connection: u16, attribute: u16, bytes: &[u8]) -> Action {
    let mut data = Vec::new();
    let _ = data.extend_from_slice(bytes);
    Action::Notify {
        connection,
        attribute,
        data,
    }
}
