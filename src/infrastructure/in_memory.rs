use crate::domain::booking::RideStatus;
use crate::domain::identity::Identity;
use crate::domain::ports::{IdentityProvider, Navigator, Notifier, StatusChannel};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// An identity provider with a fixed answer.
///
/// Used when the identity is supplied up front (CLI flags) and in tests.
/// Sign-in prompts are only counted.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    identity: Identity,
    prompts: Arc<AtomicUsize>,
}

impl StaticIdentity {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            prompts: Arc::default(),
        }
    }

    /// Number of times the sign-in surface was requested.
    pub fn sign_in_prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Identity {
        self.identity.clone()
    }

    fn prompt_sign_in(&self) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keeps every notification in order of arrival.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Records redirect targets instead of leaving the application.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    targets: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, target: &str) {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.to_string());
    }
}

/// A status channel fed from the same process through a [`StatusFeeder`].
///
/// Dropping every feeder reads as a server-side disconnect.
pub struct InMemoryStatusChannel {
    events: mpsc::UnboundedReceiver<RideStatus>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

/// Sending half of an [`InMemoryStatusChannel`].
#[derive(Debug, Clone)]
pub struct StatusFeeder {
    events: mpsc::UnboundedSender<RideStatus>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl InMemoryStatusChannel {
    pub fn new() -> (Self, StatusFeeder) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connects = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let channel = Self {
            events: rx,
            connects: connects.clone(),
            closes: closes.clone(),
        };
        let feeder = StatusFeeder {
            events: tx,
            connects,
            closes,
        };
        (channel, feeder)
    }
}

impl StatusFeeder {
    /// Pushes a `ride_status` event. Returns `false` once the channel is gone.
    pub fn push(&self, status: RideStatus) -> bool {
        self.events.send(status).is_ok()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusChannel for InMemoryStatusChannel {
    async fn connect(&mut self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_status(&mut self) -> Result<Option<RideStatus>> {
        Ok(self.events.recv().await)
    }

    async fn close(&mut self) {
        self.events.close();
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
