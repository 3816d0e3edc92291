use std::sync::{mpsc::Sender, Arc};

use tokio::runtime::Handle;

use crate::{
    domain::{
        events::AppEvent,
        turn::{OutboundTurn, TurnCompletion},
    },
    usecases::contracts::{BusinessDirectorySource, ChatGateway, TurnDispatcher},
};

const EVENT_CHANNEL_CLOSED: &str = "BACKEND_EVENT_CHANNEL_CLOSED";

/// Runs backend calls on the async runtime and posts their results to the UI
/// thread as [`AppEvent`]s.
pub struct BackgroundDispatcher<G> {
    runtime: Handle,
    gateway: Arc<G>,
    events: Sender<AppEvent>,
}

impl<G> BackgroundDispatcher<G>
where
    G: ChatGateway + BusinessDirectorySource + 'static,
{
    pub fn new(runtime: Handle, gateway: Arc<G>, events: Sender<AppEvent>) -> Self {
        Self {
            runtime,
            gateway,
            events,
        }
    }
}

impl<G> TurnDispatcher for BackgroundDispatcher<G>
where
    G: ChatGateway + BusinessDirectorySource + 'static,
{
    fn dispatch_turn(&self, turn: OutboundTurn) {
        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();

        self.runtime.spawn(async move {
            let outcome = gateway.send_turn(&turn.payload, &turn.session_id).await;
            let turn_id = turn.turn_id;

            if events
                .send(AppEvent::TurnCompleted(TurnCompletion { turn, outcome }))
                .is_err()
            {
                tracing::debug!(
                    code = EVENT_CHANNEL_CLOSED,
                    turn_id,
                    "turn finished after the shell stopped listening"
                );
            }
        });
    }

    fn dispatch_directory_fetch(&self) {
        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();

        self.runtime.spawn(async move {
            let outcome = gateway.fetch_businesses().await;

            if events.send(AppEvent::DirectoryLoaded(outcome)).is_err() {
                tracing::debug!(
                    code = EVENT_CHANNEL_CLOSED,
                    "directory fetch finished after the shell stopped listening"
                );
            }
        });
    }
}
