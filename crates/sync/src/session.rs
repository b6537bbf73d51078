//! # Sync Session
//!
//! Share/follow state machine for one participant.
//!
//! ```text
//! Idle ──start_sharing──▶ Sharing ──stop──▶ Idle
//! Idle ──connect──▶ Connecting ──first valid envelope──▶ Following
//! Connecting | Following ──transport_lost──▶ Disconnected ──stop──▶ Idle
//! ```
//!
//! # Locking
//!
//! Envelopes are captured under the read lock and compressed after it is
//! released. Incoming bytes are decoded into a detached snapshot before the
//! write lock is taken for the swap, so a dropped future never leaves a
//! half-applied timetable behind.

use crate::timetable::{SharedTimetable, Timetable};
use crate::transport::{Transport, TransportEvent};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tofmt_core::{PeerId, Result, TimerError, Timestamp};
use tofmt_protocol::{SyncEnvelope, WireOptions};
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Owner role, broadcasting local changes
    Sharing,
    /// Waiting for the first envelope from the target
    Connecting,
    /// Mirroring a remote owner; local edits are refused
    Following,
    /// Transport lost while connecting or following
    Disconnected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sharing => "sharing",
            Self::Connecting => "connecting",
            Self::Following => "following",
            Self::Disconnected => "disconnected",
        }
    }

    /// Whether the timetable currently mirrors a remote owner
    pub fn is_mirror(&self) -> bool {
        matches!(self, Self::Connecting | Self::Following)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant's view of a shared timetable
///
/// # Purpose
/// Owns the state machine and drives the codec in both directions: owners
/// capture and send, followers decode and swap.
///
/// # Thread Safety
/// The timetable itself is behind a [`SharedTimetable`], so readers on other
/// tasks can render it while the session applies updates.
pub struct SyncSession {
    peer_id: PeerId,
    target: Option<PeerId>,
    state: SessionState,
    timetable: SharedTimetable,
    transport: Arc<dyn Transport>,
    options: WireOptions,
    last_received: Option<Timestamp>,
}

impl SyncSession {
    /// Create an idle session
    ///
    /// # Arguments
    /// * `peer_id` - This participant's id
    /// * `timetable` - The timetable to share or mirror into
    /// * `transport` - Outbound half used by [`broadcast`](Self::broadcast)
    /// * `options` - Compression and text wrapping for outgoing envelopes
    pub fn new(
        peer_id: PeerId,
        timetable: SharedTimetable,
        transport: Arc<dyn Transport>,
        options: WireOptions,
    ) -> Self {
        tracing::debug!("Creating session {}", peer_id);

        Self {
            peer_id,
            target: None,
            state: SessionState::Idle,
            timetable,
            transport,
            options,
            last_received: None,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Owner being followed, if any
    pub fn target(&self) -> Option<&PeerId> {
        self.target.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn timetable(&self) -> SharedTimetable {
        Arc::clone(&self.timetable)
    }

    pub fn options(&self) -> &WireOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: WireOptions) {
        self.options = options;
    }

    /// Creation time of the last applied envelope
    pub fn last_received(&self) -> Option<Timestamp> {
        self.last_received
    }

    /// Become the owner of the timetable
    ///
    /// # Errors
    /// [`TimerError::Transport`] unless the session is idle.
    pub fn start_sharing(&mut self) -> Result<()> {
        self.transition(SessionState::Idle, SessionState::Sharing)?;
        tracing::info!("Session {} sharing", self.peer_id);
        Ok(())
    }

    /// Capture the timetable and send it
    ///
    /// # Returns
    /// Number of bytes handed to the transport
    ///
    /// # Errors
    /// [`TimerError::Transport`] when not sharing or when the send fails;
    /// encode errors propagate unchanged.
    pub async fn broadcast(&self) -> Result<usize> {
        if self.state != SessionState::Sharing {
            return Err(self.illegal("broadcast"));
        }

        let envelope = {
            let timetable = self.timetable.read();
            timetable.capture()?
        };
        let bytes = envelope.to_transport(&self.options)?;
        let len = bytes.len();

        self.transport.send(bytes).await?;
        tracing::debug!("Session {} broadcast {} bytes", self.peer_id, len);
        Ok(len)
    }

    /// Start following `target`
    ///
    /// # Errors
    /// [`TimerError::Transport`] unless the session is idle.
    pub fn connect(&mut self, target: PeerId) -> Result<()> {
        self.transition(SessionState::Idle, SessionState::Connecting)?;
        tracing::info!("Session {} connecting to {}", self.peer_id, target);
        self.target = Some(target);
        Ok(())
    }

    /// Decode one incoming envelope and swap it into the timetable
    ///
    /// The first success moves `Connecting` to `Following`. On any error the
    /// timetable and the state are left as they were.
    pub fn apply_incoming(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.state.is_mirror() {
            return Err(self.illegal("apply an incoming envelope"));
        }

        let limits = self.timetable.read().catalog().limits().clone();
        let envelope = SyncEnvelope::from_transport(bytes, &limits)?;
        let created_at = envelope.created_at;

        self.timetable.write().apply(envelope.payload)?;
        self.last_received = Some(created_at);

        if self.state == SessionState::Connecting {
            self.state = SessionState::Following;
            tracing::info!(
                "Session {} following {}",
                self.peer_id,
                self.target.as_ref().map_or("?", PeerId::get)
            );
        }
        Ok(())
    }

    /// Apply incoming envelopes until the transport goes away
    ///
    /// Envelopes that fail to decode or validate are logged and skipped.
    /// A [`TransportEvent::Closed`] or a closed channel ends the loop in
    /// `Disconnected`.
    ///
    /// # Returns
    /// Number of envelopes applied
    pub async fn follow(&mut self, mut events: mpsc::Receiver<TransportEvent>) -> Result<usize> {
        if !self.state.is_mirror() {
            return Err(self.illegal("follow"));
        }

        let mut applied = 0;
        loop {
            match events.recv().await {
                Some(TransportEvent::Received(bytes)) => match self.apply_incoming(&bytes) {
                    Ok(()) => applied += 1,
                    Err(e) => tracing::warn!("Session {} rejected envelope: {}", self.peer_id, e),
                },
                Some(TransportEvent::Closed) | None => {
                    self.transport_lost()?;
                    break;
                }
            }
        }

        Ok(applied)
    }

    /// Record that the connection to the owner is gone
    ///
    /// The mirrored timetable is kept as last received.
    pub fn transport_lost(&mut self) -> Result<()> {
        if !self.state.is_mirror() {
            return Err(self.illegal("lose the transport"));
        }
        tracing::warn!("Session {} lost its transport", self.peer_id);
        self.state = SessionState::Disconnected;
        Ok(())
    }

    /// Return to idle from any state
    pub fn stop(&mut self) {
        if self.state != SessionState::Idle {
            tracing::info!("Session {} stopped ({})", self.peer_id, self.state);
        }
        self.state = SessionState::Idle;
        self.target = None;
    }

    /// Run a local mutation under the write lock
    ///
    /// # Errors
    /// [`TimerError::ReadOnlyMirror`] while connecting to or following an
    /// owner. Errors from `f` propagate unchanged.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Timetable) -> Result<R>) -> Result<R> {
        if self.state.is_mirror() {
            return Err(TimerError::ReadOnlyMirror);
        }
        let mut timetable = self.timetable.write();
        f(&mut timetable)
    }

    /// [`mutate`](Self::mutate), then broadcast if sharing
    pub async fn commit<R>(&self, f: impl FnOnce(&mut Timetable) -> Result<R>) -> Result<R> {
        let result = self.mutate(f)?;
        if self.state == SessionState::Sharing {
            self.broadcast().await?;
        }
        Ok(result)
    }

    /// Broadcast every `period` until `shutdown` fires or a send fails
    ///
    /// The first broadcast goes out immediately.
    pub async fn share_every(&self, period: Duration, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        if self.state != SessionState::Sharing {
            return Err(self.illegal("share periodically"));
        }

        let mut ticker = interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.broadcast().await {
                        tracing::error!("Session {} broadcast failed: {}", self.peer_id, e);
                        return Err(e);
                    }
                }
                _ = &mut shutdown => {
                    tracing::debug!("Session {} periodic sharing stopped", self.peer_id);
                    return Ok(());
                }
            }
        }
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> Result<()> {
        if self.state != from {
            return Err(TimerError::Transport(format!(
                "cannot move from {} to {}",
                self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }

    fn illegal(&self, action: &str) -> TimerError {
        TimerError::Transport(format!("cannot {} while {}", action, self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use tofmt_config::{AreaTemplate, BossTemplate, CatalogConfig};
    use tofmt_protocol::CompressionType;
    use tofmt_timetable::Catalog;

    const T0: i64 = 1_700_000_000;

    fn timetable() -> SharedTimetable {
        let config = CatalogConfig {
            line_limit: 30,
            areas: vec![
                AreaTemplate {
                    name: "Asha".into(),
                    default_line_count: 20,
                    bosses: vec![
                        BossTemplate::new("Sobek", "Croc", "#3A4454"),
                        BossTemplate::new("Lucia", "Mom", "#BDA8A0"),
                    ],
                },
                AreaTemplate {
                    name: "Abyss".into(),
                    default_line_count: 5,
                    bosses: vec![BossTemplate::new("Hela", "Hela", "#15151F")],
                },
            ],
        };
        Timetable::new(Catalog::build(&config, &Default::default(), None).unwrap()).shared()
    }

    fn session(name: &str, transport: ChannelTransport) -> SyncSession {
        SyncSession::new(PeerId::new(name), timetable(), Arc::new(transport), WireOptions::default())
    }

    fn kill(timetable: &mut Timetable, line: u8, boss: &str) -> Result<()> {
        timetable
            .catalog_mut()
            .area_mut("Asha")
            .unwrap()
            .kill(line, boss, Timestamp::from_secs(T0))
    }

    #[test]
    fn test_state_transitions() {
        let (transport, _rx) = ChannelTransport::pair(1);
        let mut session = session("A", transport);
        assert_eq!(session.state(), SessionState::Idle);

        session.connect(PeerId::new("OWNER")).unwrap();
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(session.target().map(PeerId::get), Some("OWNER"));
        assert!(matches!(session.start_sharing(), Err(TimerError::Transport(_))));

        session.transport_lost().unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.connect(PeerId::new("OWNER")).is_err());

        session.stop();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.target().is_none());

        session.start_sharing().unwrap();
        assert_eq!(session.state(), SessionState::Sharing);
        assert!(session.connect(PeerId::new("OWNER")).is_err());
        assert!(session.transport_lost().is_err());
        assert!(session.apply_incoming(&[]).is_err());
    }

    #[tokio::test]
    async fn test_broadcast_requires_sharing() {
        let (transport, _rx) = ChannelTransport::pair(1);
        let session = session("A", transport);
        assert!(matches!(session.broadcast().await, Err(TimerError::Transport(_))));
    }

    #[tokio::test]
    async fn test_owner_to_follower() {
        let (transport, rx) = ChannelTransport::pair(8);
        let closer = transport.clone();
        let mut owner = session("OWNER", transport);
        owner.start_sharing().unwrap();

        owner.commit(|t| kill(t, 19, "Lucia")).await.unwrap();
        owner
            .commit(|t| t.set_exclusions(vec!["Sobek".into()], vec![2]))
            .await
            .unwrap();
        closer.close().await.unwrap();

        let (unused, _unused_rx) = ChannelTransport::pair(1);
        let mut follower = session("FOLLOWER", unused);
        follower.connect(PeerId::new("OWNER")).unwrap();

        let applied = follower.follow(rx).await.unwrap();
        assert_eq!(applied, 2);
        assert_eq!(follower.state(), SessionState::Disconnected);
        assert!(follower.last_received().is_some());
        assert_eq!(*follower.timetable().read(), *owner.timetable().read());

        let mirror = follower.timetable();
        let mirror = mirror.read();
        let lucia = mirror.catalog().find_area("Asha").unwrap().find_boss(19, "Lucia").unwrap();
        assert!(!lucia.is_alive(Timestamp::from_secs(T0 + 60)));
    }

    #[tokio::test]
    async fn test_mirror_is_read_only() {
        let (transport, _rx) = ChannelTransport::pair(1);
        let mut follower = session("FOLLOWER", transport);
        follower.connect(PeerId::new("OWNER")).unwrap();

        let before = follower.timetable().read().clone();
        let err = follower.mutate(|t| kill(t, 1, "Sobek")).unwrap_err();
        assert!(matches!(err, TimerError::ReadOnlyMirror));
        assert_eq!(*follower.timetable().read(), before);

        follower.transport_lost().unwrap();
        follower.mutate(|t| kill(t, 1, "Sobek")).unwrap();
    }

    #[tokio::test]
    async fn test_bad_envelope_leaves_state_untouched() {
        let (transport, _rx) = ChannelTransport::pair(1);
        let mut follower = session("FOLLOWER", transport);
        follower.connect(PeerId::new("OWNER")).unwrap();

        let before = follower.timetable().read().clone();
        assert!(follower.apply_incoming(b"not an envelope").is_err());
        assert!(follower.apply_incoming(&[0, 0, 0, 9]).is_err());

        assert_eq!(follower.state(), SessionState::Connecting);
        assert_eq!(*follower.timetable().read(), before);
        assert!(follower.last_received().is_none());
    }

    #[tokio::test]
    async fn test_follow_skips_invalid_envelopes() {
        let (transport, rx) = ChannelTransport::pair(8);
        let raw = transport.clone();
        let mut owner = session("OWNER", transport);
        owner.set_options(WireOptions {
            compression: CompressionType::Bzip2,
            level: None,
            text: true,
        });
        owner.start_sharing().unwrap();

        raw.send(b"garbage".to_vec()).await.unwrap();
        owner.commit(|t| kill(t, 3, "Sobek")).await.unwrap();
        drop(raw);
        drop(owner);

        let (unused, _unused_rx) = ChannelTransport::pair(1);
        let mut follower = session("FOLLOWER", unused);
        follower.connect(PeerId::new("OWNER")).unwrap();

        assert_eq!(follower.follow(rx).await.unwrap(), 1);
        assert_eq!(follower.state(), SessionState::Disconnected);

        let mirror = follower.timetable();
        let sobek_alive = mirror
            .read()
            .catalog()
            .find_area("Asha")
            .unwrap()
            .find_boss(3, "Sobek")
            .unwrap()
            .is_alive(Timestamp::from_secs(T0 + 60));
        assert!(!sobek_alive);
    }

    #[tokio::test]
    async fn test_commit_without_sharing_sends_nothing() {
        let (transport, mut rx) = ChannelTransport::pair(1);
        let session = session("A", transport);
        session.commit(|t| kill(t, 1, "Sobek")).await.unwrap();
        drop(session);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_share_every() {
        let (transport, mut rx) = ChannelTransport::pair(8);
        let mut owner = session("OWNER", transport);
        owner.start_sharing().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move { owner.share_every(Duration::from_millis(5), stop_rx).await });

        for _ in 0..2 {
            assert!(matches!(rx.recv().await, Some(TransportEvent::Received(_))));
        }
        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
