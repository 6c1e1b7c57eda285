//! Session host - async ownership of one game session.
//!
//! The session lives behind a tokio mutex. Every joined player gets a gravity
//! task that ticks that player's timers on a fixed interval. Events are drained
//! while the lock is held and published after it is released, so slow
//! subscribers never stall the board.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::core::{GameConfig, GameEvent, GameSession, SessionSnapshot};
use crate::protocol::{
    create_error, create_ok, create_rejected, ClientCommand, ErrorCode, InboundMessage,
    OutboundMessage,
};
use crate::types::{PlayerId, TICK_MS};

/// Host tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOptions {
    /// Gravity task period
    pub tick_ms: u64,
    /// Buffered events per subscriber before it starts lagging
    pub event_capacity: usize,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS as u64,
            event_capacity: 256,
        }
    }
}

impl HostOptions {
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let tick_ms = env::var("SHAKTRIS_TICK_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&ms| ms > 0)
            .unwrap_or(defaults.tick_ms);
        let event_capacity = env::var("SHAKTRIS_EVENT_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.event_capacity);

        Self {
            tick_ms,
            event_capacity,
        }
    }
}

struct Shared {
    session: Mutex<GameSession>,
    events: broadcast::Sender<GameEvent>,
    snapshots: Option<mpsc::Sender<SessionSnapshot>>,
    started: Instant,
}

impl Shared {
    /// Catch the session clock up with wall time. Several gravity tasks share
    /// the clock, so it only ever moves forward to `started.elapsed()`.
    fn sync_clock(&self, session: &mut GameSession) {
        let now = self.started.elapsed().as_millis() as u64;
        let behind = now.saturating_sub(session.clock_ms());
        if behind > 0 {
            session.advance_clock(behind.min(u32::MAX as u64) as u32);
        }
    }

    /// Drain pending events (and a snapshot when a sink is attached)
    fn collect(&self, session: &mut GameSession) -> (Vec<GameEvent>, Option<SessionSnapshot>) {
        let events = session.drain_events();
        let snapshot = if !events.is_empty() && self.snapshots.is_some() {
            Some(session.snapshot())
        } else {
            None
        };
        (events, snapshot)
    }

    /// Must be called without the session lock held
    fn publish(&self, events: Vec<GameEvent>, snapshot: Option<SessionSnapshot>) {
        for event in events {
            if let GameEvent::GameOver { winner_id, .. } = &event {
                log::info!("game over, winner {:?}", winner_id);
            }
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        if let (Some(sink), Some(snapshot)) = (self.snapshots.as_ref(), snapshot) {
            if let Err(mpsc::error::TrySendError::Full(_)) = sink.try_send(snapshot) {
                log::warn!("snapshot sink full, dropping snapshot");
            }
        }
    }
}

/// Running session host
pub struct SessionHost {
    shared: Arc<Shared>,
    gravity: Mutex<Vec<JoinHandle<()>>>,
    tick: Duration,
}

impl SessionHost {
    pub fn new(config: GameConfig, options: HostOptions) -> anyhow::Result<Self> {
        Self::build(config, options, None)
    }

    /// Like [`SessionHost::new`], also pushing a snapshot to `sink` after every
    /// batch of events. Snapshots are dropped when the sink is full.
    pub fn with_snapshot_sink(
        config: GameConfig,
        options: HostOptions,
        sink: mpsc::Sender<SessionSnapshot>,
    ) -> anyhow::Result<Self> {
        Self::build(config, options, Some(sink))
    }

    fn build(
        config: GameConfig,
        options: HostOptions,
        snapshots: Option<mpsc::Sender<SessionSnapshot>>,
    ) -> anyhow::Result<Self> {
        let session = GameSession::new(config).context("invalid game configuration")?;
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Ok(Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                events,
                snapshots,
                started: Instant::now(),
            }),
            gravity: Mutex::new(Vec::new()),
            tick: Duration::from_millis(options.tick_ms.max(1)),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.shared.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.shared.session.lock().await.snapshot()
    }

    /// Run `f` against the session under the lock
    pub async fn with_session<R>(&self, f: impl FnOnce(&mut GameSession) -> R) -> R {
        let (result, events, snapshot) = {
            let mut session = self.shared.session.lock().await;
            let result = f(&mut session);
            let (events, snapshot) = self.shared.collect(&mut session);
            (result, events, snapshot)
        };
        self.shared.publish(events, snapshot);
        result
    }

    /// Seat `player` and start its gravity task
    pub async fn join(&self, player: PlayerId) -> anyhow::Result<()> {
        {
            let mut session = self.shared.session.lock().await;
            if session.is_over() {
                anyhow::bail!("the game is already over");
            }
            session
                .join_player(player)
                .with_context(|| format!("player {} could not join", player))?;
        }
        log::info!("player {} joined", player);

        let handle = tokio::spawn(run_gravity(Arc::clone(&self.shared), player, self.tick));
        self.gravity.lock().await.push(handle);
        Ok(())
    }

    /// Handle one inbound message and build its reply
    pub async fn handle(&self, msg: InboundMessage) -> OutboundMessage {
        let InboundMessage {
            player,
            seq,
            command,
        } = msg;

        match command {
            ClientCommand::Join => match self.join(player).await {
                Ok(()) => OutboundMessage::Reply(create_ok(player, seq, None)),
                Err(e) => OutboundMessage::Reply(create_error(
                    Some(player),
                    seq,
                    ErrorCode::JoinFailed,
                    &format!("{:#}", e),
                )),
            },
            ClientCommand::Snapshot => OutboundMessage::Snapshot(self.snapshot().await),
            _ => {
                let Some(game_command) = command.game_command() else {
                    return OutboundMessage::Reply(create_error(
                        Some(player),
                        seq,
                        ErrorCode::InvalidMessage,
                        "unsupported command",
                    ));
                };
                let shared = Arc::clone(&self.shared);
                let result = self
                    .with_session(move |session| {
                        shared.sync_clock(session);
                        session.apply(player, game_command)
                    })
                    .await;
                match result {
                    Ok(outcome) => OutboundMessage::Reply(create_ok(player, seq, Some(outcome))),
                    Err(reason) => OutboundMessage::Reply(create_rejected(player, seq, reason)),
                }
            }
        }
    }

    /// Stop every gravity task
    pub async fn shutdown(&self) {
        let mut gravity = self.gravity.lock().await;
        for handle in gravity.drain(..) {
            handle.abort();
        }
    }
}

async fn run_gravity(shared: Arc<Shared>, owner: PlayerId, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = interval.tick().await;

    loop {
        let now = interval.tick().await;
        let elapsed = now.duration_since(last).as_millis().min(u32::MAX as u128) as u32;
        last = now;

        let (events, snapshot, done) = {
            let mut session = shared.session.lock().await;
            shared.sync_clock(&mut session);
            session.tick_player(owner, elapsed);
            let (events, snapshot) = shared.collect(&mut session);
            let done = session.is_over()
                || session.player(owner).map_or(true, |p| p.eliminated);
            (events, snapshot, done)
        };
        shared.publish(events, snapshot);

        if done {
            log::debug!("gravity task for player {} finished", owner);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_message;

    fn fast_config() -> GameConfig {
        GameConfig {
            base_fall_interval_ms: 10,
            spawn_height: 2,
            ..GameConfig::default()
        }
    }

    fn fast_options() -> HostOptions {
        HostOptions {
            tick_ms: 5,
            event_capacity: 64,
        }
    }

    async fn next_event(
        rx: &mut broadcast::Receiver<GameEvent>,
        pred: impl Fn(&GameEvent) -> bool,
    ) -> GameEvent {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(e) => panic!("event channel closed: {}", e),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn test_join_spawns_and_gravity_lands() {
        let host = SessionHost::new(fast_config(), fast_options()).unwrap();
        let mut rx = host.subscribe();
        host.join(1).await.unwrap();
        host.join(2).await.unwrap();

        let spawned = next_event(&mut rx, |e| {
            matches!(e, GameEvent::TetrominoSpawned { owner_id: 1, .. })
        })
        .await;
        assert_eq!(spawned.owner_id(), 1);

        // Falling from height 2 at 10ms per level ends in a terminal outcome.
        next_event(&mut rx, |e| {
            matches!(
                e,
                GameEvent::TetrominoAttached { owner_id: 1, .. }
                    | GameEvent::TetrominoDisintegrated { owner_id: 1, .. }
            )
        })
        .await;
        let phase = next_event(&mut rx, |e| {
            matches!(e, GameEvent::PhaseChanged { owner_id: 1, .. })
        })
        .await;
        assert!(matches!(phase, GameEvent::PhaseChanged { .. }));
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_handle_replies() {
        let host = SessionHost::new(GameConfig::default(), HostOptions::default()).unwrap();

        let reply = host
            .handle(parse_message(r#"{"player":7,"seq":1,"type":"join"}"#).unwrap())
            .await;
        match reply {
            OutboundMessage::Reply(r) => {
                assert!(r.ok);
                assert_eq!(r.seq, 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        // Chess commands are rejected while the player is in the tetromino phase.
        let reply = host
            .handle(parse_message(r#"{"player":7,"seq":2,"type":"select_chess_piece","x":0,"y":0}"#).unwrap())
            .await;
        match reply {
            OutboundMessage::Reply(r) => {
                assert!(!r.ok);
                let error = r.error.unwrap();
                assert_eq!(error.code, ErrorCode::Rejected);
                assert_eq!(error.reason, Some(crate::core::RejectReason::WrongPhase));
            }
            other => panic!("unexpected {:?}", other),
        }

        let reply = host
            .handle(parse_message(r#"{"player":7,"seq":3,"type":"join"}"#).unwrap())
            .await;
        match reply {
            OutboundMessage::Reply(r) => {
                assert!(!r.ok);
                assert_eq!(r.error.unwrap().code, ErrorCode::JoinFailed);
            }
            other => panic!("unexpected {:?}", other),
        }

        match host
            .handle(parse_message(r#"{"player":7,"type":"snapshot"}"#).unwrap())
            .await
        {
            OutboundMessage::Snapshot(snapshot) => {
                assert_eq!(snapshot.players.len(), 1);
                assert_eq!(snapshot.board.width, 30);
            }
            other => panic!("unexpected {:?}", other),
        }
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_snapshot_sink_receives_after_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let host = SessionHost::with_snapshot_sink(fast_config(), fast_options(), tx).unwrap();
        host.join(1).await.unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for snapshot")
            .expect("sink closed");
        assert_eq!(snapshot.players.len(), 1);
        host.shutdown().await;
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let config = GameConfig {
            board_width: 2,
            ..GameConfig::default()
        };
        assert!(SessionHost::new(config, HostOptions::default()).is_err());
    }

    #[test]
    fn test_default_options() {
        let options = HostOptions::default();
        assert_eq!(options.tick_ms, 16);
        assert!(options.event_capacity > 0);
    }
}
