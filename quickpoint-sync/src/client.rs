//! Async driver connecting one viewer to a broadcast group.
//!
//! Provides:
//! - Join/leave lifecycle on a named channel
//! - Applying controller [`Effects`] to a host view and the channel
//! - Filtering out the instance's own posts and unknown message types
//! - A `run` loop multiplexing host commands and bus traffic

use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::mpsc;
use uuid::Uuid;

use quickpoint_core::{Deck, Intent, LocationToken};

use crate::broadcast::{BroadcastGroup, BusReceiver, Envelope};
use crate::controller::{Effects, ViewerController};
use crate::presenter::PresenterView;
use crate::protocol::{InstanceInfo, ProtocolError, Role, SyncMessage};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not listening (never connected, opted out, or left).
    Detached,
    Joined,
}

/// Anything that can sit on the sync bus: turns inputs into [`Effects`].
pub trait SyncPeer {
    fn role(&self) -> Role;
    fn participates(&self) -> bool;
    fn start(&mut self, initial_location: Option<&str>) -> Effects;
    fn handle_intent(&mut self, intent: Intent) -> Effects;
    fn handle_location(&mut self, location: &str) -> Effects;
    fn handle_message(&mut self, message: SyncMessage) -> Effects;
    fn replace_deck(&mut self, deck: Deck) -> Effects;
}

impl SyncPeer for ViewerController {
    fn role(&self) -> Role {
        ViewerController::role(self)
    }

    fn participates(&self) -> bool {
        ViewerController::participates(self)
    }

    fn start(&mut self, initial_location: Option<&str>) -> Effects {
        ViewerController::start(self, initial_location)
    }

    fn handle_intent(&mut self, intent: Intent) -> Effects {
        ViewerController::handle_intent(self, intent)
    }

    fn handle_location(&mut self, location: &str) -> Effects {
        ViewerController::handle_location(self, location)
    }

    fn handle_message(&mut self, message: SyncMessage) -> Effects {
        ViewerController::handle_message(self, message)
    }

    fn replace_deck(&mut self, deck: Deck) -> Effects {
        ViewerController::replace_deck(self, deck)
    }
}

impl SyncPeer for PresenterView {
    fn role(&self) -> Role {
        self.controller().role()
    }

    fn participates(&self) -> bool {
        self.controller().participates()
    }

    fn start(&mut self, initial_location: Option<&str>) -> Effects {
        self.controller_mut().start(initial_location)
    }

    fn handle_intent(&mut self, intent: Intent) -> Effects {
        match intent {
            Intent::Advance => self.press_next(),
            Intent::Retreat => self.press_prev(),
            Intent::JumpTo { .. } => Effects::none(),
        }
    }

    fn handle_location(&mut self, location: &str) -> Effects {
        self.controller_mut().handle_location(location)
    }

    fn handle_message(&mut self, message: SyncMessage) -> Effects {
        PresenterView::handle_message(self, message)
    }

    fn replace_deck(&mut self, deck: Deck) -> Effects {
        PresenterView::replace_deck(self, deck)
    }
}

/// The window a viewer draws into.
pub trait ViewHost<P: ?Sized> {
    /// Position changed: redraw and re-project step reveals.
    fn render(&mut self, peer: &P);

    /// Write the address token with replace (not push) semantics.
    fn replace_location(&mut self, _token: &LocationToken) {}
}

/// Inputs a host feeds into [`ViewerClient::run`].
#[derive(Debug, Clone)]
pub enum ViewerCommand {
    Intent(Intent),
    Location(String),
    Reload(Deck),
    Shutdown,
}

/// One viewer window attached to a broadcast group.
pub struct ViewerClient<P, H> {
    info: InstanceInfo,
    peer: P,
    host: H,
    group: Arc<BroadcastGroup>,
    receiver: Option<BusReceiver>,
    state: ConnectionState,
}

impl<P, H> ViewerClient<P, H>
where
    P: SyncPeer,
    H: ViewHost<P>,
{
    pub fn new(label: impl Into<String>, peer: P, host: H, group: Arc<BroadcastGroup>) -> Self {
        let info = InstanceInfo::new(label, peer.role());
        Self {
            info,
            peer,
            host,
            group,
            receiver: None,
            state: ConnectionState::Detached,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.info.instance_id
    }

    pub fn info(&self) -> &InstanceInfo {
        &self.info
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Join the group (unless opted out) and run startup effects.
    pub async fn connect(&mut self, initial_location: Option<&str>) -> Result<(), ProtocolError> {
        if self.peer.participates() {
            self.receiver = Some(self.group.join(self.info.clone()).await);
            self.state = ConnectionState::Joined;
            log::info!("client: {} joined as {:?}", self.info.label, self.info.role);
        } else {
            log::info!("client: {} not participating in sync", self.info.label);
        }
        let effects = self.peer.start(initial_location);
        self.apply(effects)
    }

    /// Leave the group. Further bus traffic is not received.
    pub async fn disconnect(&mut self) {
        if self.state == ConnectionState::Joined {
            self.group.leave(&self.info.instance_id).await;
            log::info!("client: {} left", self.info.label);
        }
        self.receiver = None;
        self.state = ConnectionState::Detached;
    }

    pub fn dispatch(&mut self, intent: Intent) -> Result<(), ProtocolError> {
        let effects = self.peer.handle_intent(intent);
        self.apply(effects)
    }

    pub fn navigate_to_location(&mut self, location: &str) -> Result<(), ProtocolError> {
        let effects = self.peer.handle_location(location);
        self.apply(effects)
    }

    pub fn reload(&mut self, deck: Deck) -> Result<(), ProtocolError> {
        let effects = self.peer.replace_deck(deck);
        self.apply(effects)
    }

    /// Handle one envelope taken off the bus.
    ///
    /// Own posts, unknown types and undecodable payloads are dropped.
    pub fn handle_envelope(&mut self, envelope: &Envelope) -> Result<(), ProtocolError> {
        if envelope.sender == self.info.instance_id {
            return Ok(());
        }
        match SyncMessage::decode(&envelope.payload) {
            Ok(Some(message)) => {
                let effects = self.peer.handle_message(message);
                self.apply(effects)
            }
            Ok(None) => Ok(()),
            Err(e) => {
                log::warn!("client: {} dropped bad message: {e}", self.info.label);
                Ok(())
            }
        }
    }

    /// Wait for the next envelope and handle it.
    ///
    /// Returns `Ok(false)` when the client is not joined.
    pub async fn poll_bus(&mut self) -> Result<bool, ProtocolError> {
        let result = match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => return Ok(false),
        };
        self.on_received(result)?;
        Ok(true)
    }

    /// Handle everything already queued, without waiting.
    ///
    /// Returns the number of envelopes taken off the bus.
    pub fn try_drain(&mut self) -> Result<usize, ProtocolError> {
        let mut handled = 0;
        loop {
            let result = match self.receiver.as_mut() {
                Some(receiver) => receiver.try_recv(),
                None => return Ok(handled),
            };
            match result {
                Ok(envelope) => {
                    handled += 1;
                    self.handle_envelope(&envelope)?;
                }
                Err(TryRecvError::Empty) => return Ok(handled),
                Err(TryRecvError::Lagged(skipped)) => self.on_lagged(skipped),
                Err(TryRecvError::Closed) => return Err(ProtocolError::ChannelClosed),
            }
        }
    }

    /// Drive the viewer until `Shutdown` or the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ViewerCommand>) -> Result<H, ProtocolError> {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ViewerCommand::Intent(intent)) => self.dispatch(intent)?,
                    Some(ViewerCommand::Location(location)) => self.navigate_to_location(&location)?,
                    Some(ViewerCommand::Reload(deck)) => self.reload(deck)?,
                    Some(ViewerCommand::Shutdown) | None => break,
                },
                result = next_envelope(&mut self.receiver) => self.on_received(result)?,
            }
        }
        self.disconnect().await;
        Ok(self.host)
    }

    fn on_received(&mut self, result: Result<Arc<Envelope>, RecvError>) -> Result<(), ProtocolError> {
        match result {
            Ok(envelope) => self.handle_envelope(&envelope),
            Err(RecvError::Lagged(skipped)) => {
                self.on_lagged(skipped);
                Ok(())
            }
            Err(RecvError::Closed) => Err(ProtocolError::ChannelClosed),
        }
    }

    fn on_lagged(&self, skipped: u64) {
        log::warn!("client: {} lagged, {skipped} messages lost", self.info.label);
        self.group.record_dropped(skipped);
    }

    fn apply(&mut self, effects: Effects) -> Result<(), ProtocolError> {
        if let Some(token) = &effects.location {
            self.host.replace_location(token);
        }
        if effects.position.is_some() {
            self.host.render(&self.peer);
        }
        for message in &effects.outgoing {
            self.group.post(self.info.instance_id, message)?;
        }
        Ok(())
    }
}

async fn next_envelope(receiver: &mut Option<BusReceiver>) -> Result<Arc<Envelope>, RecvError> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use quickpoint_core::Position;

    #[derive(Default)]
    struct RecordingHost {
        renders: Vec<Position>,
        locations: Vec<String>,
    }

    impl ViewHost<ViewerController> for RecordingHost {
        fn render(&mut self, peer: &ViewerController) {
            self.renders.push(peer.current_position());
        }

        fn replace_location(&mut self, token: &LocationToken) {
            self.locations.push(token.to_string());
        }
    }

    fn deck() -> Deck {
        Deck::from_sources([("a.html", "<h1>a</h1>"), ("b.html", "<h1>b</h1>")]).unwrap()
    }

    #[tokio::test]
    async fn test_connect_announces_and_renders() {
        let group = Arc::new(BroadcastGroup::new(16));
        let mut observer = group.subscribe();
        let controller = ViewerController::primary(deck(), ViewerConfig::primary());
        let mut client = ViewerClient::new("main", controller, RecordingHost::default(), group.clone());

        client.connect(None).await.unwrap();
        assert_eq!(client.state(), ConnectionState::Joined);
        assert_eq!(client.host().renders, vec![Position::START]);
        assert_eq!(client.host().locations, vec!["slide-1"]);

        let envelope = observer.recv().await.unwrap();
        assert_eq!(envelope.sender, client.instance_id());
        assert_eq!(
            SyncMessage::decode(&envelope.payload).unwrap(),
            Some(SyncMessage::SlideChanged { index: 0, step: -1 })
        );
    }

    #[tokio::test]
    async fn test_own_posts_are_skipped() {
        let group = Arc::new(BroadcastGroup::new(16));
        let controller = ViewerController::primary(deck(), ViewerConfig::primary());
        let mut client = ViewerClient::new("main", controller, RecordingHost::default(), group);
        client.connect(None).await.unwrap();
        client.dispatch(Intent::Advance).unwrap();

        // Start announcement plus one change, both ours.
        assert_eq!(client.try_drain().unwrap(), 2);
        assert_eq!(client.host().renders.len(), 2);
    }

    #[tokio::test]
    async fn test_opted_out_client_never_joins() {
        let group = Arc::new(BroadcastGroup::new(16));
        let controller = ViewerController::primary(deck(), ViewerConfig::from_query("?receiver=no"));
        let mut client = ViewerClient::new("preview", controller, RecordingHost::default(), group.clone());
        client.connect(Some("#slide-2")).await.unwrap();

        assert_eq!(client.state(), ConnectionState::Detached);
        assert_eq!(group.instance_count().await, 0);
        assert_eq!(group.stats().await.messages_sent, 0);
        assert!(!client.poll_bus().await.unwrap());
        assert_eq!(client.host().locations, vec!["slide-2"]);
    }

    #[tokio::test]
    async fn test_garbage_payload_is_dropped() {
        let group = Arc::new(BroadcastGroup::new(16));
        let controller = ViewerController::primary(deck(), ViewerConfig::primary());
        let mut client = ViewerClient::new("main", controller, RecordingHost::default(), group.clone());
        client.connect(None).await.unwrap();

        for payload in ["{oops", r#"{"type":"CURSOR"}"#] {
            group.post_raw(Arc::new(Envelope {
                sender: Uuid::new_v4(),
                payload: payload.to_string(),
            }));
        }
        client.try_drain().unwrap();
        assert_eq!(client.peer().current_position(), Position::START);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let group = Arc::new(BroadcastGroup::new(16));
        let controller = ViewerController::primary(deck(), ViewerConfig::primary());
        let mut client = ViewerClient::new("main", controller, RecordingHost::default(), group.clone());
        client.connect(None).await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(client.run(rx));
        tx.send(ViewerCommand::Intent(Intent::Advance)).await.unwrap();
        tx.send(ViewerCommand::Location("#slide-1".into())).await.unwrap();
        tx.send(ViewerCommand::Shutdown).await.unwrap();

        let host = task.await.unwrap().unwrap();
        assert_eq!(host.locations, vec!["slide-1", "slide-2", "slide-1"]);
        assert_eq!(group.instance_count().await, 0);
    }
}
