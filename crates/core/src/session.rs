//! Game session - the aggregate that owns the board and every player
//!
//! A session holds one authoritative [`Board`], the chess piece registry and one
//! [`PlayerState`] per player. Players act independently; every mutator takes
//! `&mut self`, so callers sharing a session across tasks must serialize access
//! (see the adapter's `SessionHost`).
//!
//! Board-mutating work (attachments with their row clears, chess moves) runs in a
//! transaction: board, registry and players are copied first, the mutation and
//! the orphan sweep run, then the board invariants are verified. A violation
//! restores the copy, is logged and recorded, and the caller sees
//! [`RejectReason::InvariantViolation`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::board::{Board, HomeZone, Rect};
use crate::chess::{self, ChessPiece, LegalMove, MoveKind};
use crate::config::GameConfig;
use crate::connectivity::orphaned_cells;
use crate::error::{InvariantViolation, RejectReason, SessionError};
use crate::events::{GameEvent, GameOverReason};
use crate::phase::{PlayerSnapshot, PlayerState};
use crate::pieces::ShapeMatrix;
use crate::row_clear;
use crate::scoring;
use crate::snapshot::{BoardSnapshot, SessionSnapshot};
use crate::tetromino::{self, DisintegrationReason, Landing, Tetromino};
use crate::types::{
    Cell, ChessPieceKind, Coord, Facing, GameCommand, Phase, PieceId, PlayerId, RotateDirection,
    TetrominoId, TetrominoKind,
};

/// Result of an accepted command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CommandOutcome {
    Spawned { tetromino_id: TetrominoId },
    /// The falling tetromino moved, rotated or was swapped with the hold slot
    Updated,
    Landed { landing: Landing },
    Selected { piece_id: PieceId },
    ChessMoved {
        piece_id: PieceId,
        from: Coord,
        to: Coord,
        captured_id: Option<PieceId>,
    },
}

struct Checkpoint {
    board: Board,
    pieces: BTreeMap<PieceId, ChessPiece>,
    players: BTreeMap<PlayerId, PlayerState>,
    events: usize,
    over: bool,
    winner: Option<PlayerId>,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    board: Board,
    pieces: BTreeMap<PieceId, ChessPiece>,
    players: BTreeMap<PlayerId, PlayerState>,
    events: Vec<GameEvent>,
    violations: Vec<InvariantViolation>,
    clock_ms: u64,
    next_piece_id: PieceId,
    next_tetromino_id: TetrominoId,
    over: bool,
    winner: Option<PlayerId>,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            board: Board::new(config.board_width, config.board_height),
            config,
            pieces: BTreeMap::new(),
            players: BTreeMap::new(),
            events: Vec::new(),
            violations: Vec::new(),
            clock_ms: 0,
            next_piece_id: 1,
            next_tetromino_id: 1,
            over: false,
            winner: None,
        })
    }

    // ---- setup ----

    /// Join with the default seat and the standard army.
    ///
    /// The first player sits at the bottom edge facing north, the second at the
    /// top edge facing south. Zones are centred horizontally.
    pub fn join_player(&mut self, id: PlayerId) -> Result<(), SessionError> {
        let width = self.config.home_zone_width as i32;
        let height = self.config.home_zone_height as i32;
        let x = (self.config.board_width as i32 - width) / 2;
        let (facing, y) = match self.players.len() {
            0 => (Facing::North, self.config.board_height as i32 - height),
            1 => (Facing::South, 0),
            _ => return Err(SessionError::NoSeatAvailable),
        };
        let rect = Rect::new(x, y, width, height);
        let army = chess::standard_army(&rect, facing);
        self.join_player_with(id, rect, facing, &army)
    }

    /// Join with an explicit home zone and army. Every piece must start inside the
    /// zone and the army must hold exactly one king.
    pub fn join_player_with(
        &mut self,
        id: PlayerId,
        zone: Rect,
        facing: Facing,
        army: &[(ChessPieceKind, Coord)],
    ) -> Result<(), SessionError> {
        if self.over {
            return Err(SessionError::Finished);
        }
        if self.players.contains_key(&id) {
            return Err(SessionError::DuplicatePlayer(id));
        }
        let fits = zone.width > 0
            && zone.height > 0
            && self.board.in_bounds(zone.x, zone.y)
            && self
                .board
                .in_bounds(zone.x + zone.width - 1, zone.y + zone.height - 1);
        if !fits {
            return Err(SessionError::ZoneOutOfBounds);
        }
        if self
            .board
            .home_zones()
            .iter()
            .any(|z| z.rect.intersects(&zone))
        {
            return Err(SessionError::ZoneOverlap);
        }
        if let Some(taken) = zone.coords().find(|c| !self.board.get_at(*c).is_empty()) {
            return Err(SessionError::BadSetupSquare(taken));
        }

        let kings = army
            .iter()
            .filter(|(kind, _)| *kind == ChessPieceKind::King)
            .count();
        if kings != 1 {
            return Err(SessionError::KingCount(kings));
        }
        for (i, (_, at)) in army.iter().enumerate() {
            if !zone.contains(*at) || army[..i].iter().any(|(_, other)| other == at) {
                return Err(SessionError::BadSetupSquare(*at));
            }
        }

        let mut home = HomeZone::new(id, zone);
        home.last_activity = self.clock_ms;
        self.board.add_home_zone(home);
        for &(kind, at) in army {
            let piece = ChessPiece::new(self.next_piece_id, kind, id, at);
            self.next_piece_id += 1;
            self.board.set_at(at, piece.marker());
            self.pieces.insert(piece.id, piece);
        }
        let color = (self.players.len() % u8::MAX as usize) as u8 + 1;
        self.players
            .insert(id, PlayerState::new(id, facing, color, &self.config));

        log::info!(
            "player {} joined: zone {:?}, facing {:?}, {} pieces",
            id,
            zone,
            facing,
            army.len()
        );
        Ok(())
    }

    // ---- queries ----

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn pieces(&self) -> &BTreeMap<PieceId, ChessPiece> {
        &self.pieces
    }

    pub fn piece(&self, id: PieceId) -> Option<&ChessPiece> {
        self.pieces.get(&id)
    }

    /// Active piece standing on (x, y)
    pub fn piece_at(&self, x: i32, y: i32) -> Option<&ChessPiece> {
        self.board
            .get(x, y)
            .piece_id()
            .and_then(|id| self.pieces.get(&id))
            .filter(|p| p.is_active())
    }

    pub fn active_tetromino(&self, owner: PlayerId) -> Option<&Tetromino> {
        self.players.get(&owner)?.active.as_ref()
    }

    pub fn king_position(&self, owner: PlayerId) -> Option<Coord> {
        self.pieces
            .values()
            .find(|p| p.owner_id == owner && p.kind == ChessPieceKind::King && p.is_active())
            .map(|p| p.position)
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Invariant violations detected (and rolled back) so far
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current fall interval for `owner`'s level
    pub fn fall_interval_ms(&self, owner: PlayerId) -> Option<u32> {
        let player = self.players.get(&owner)?;
        Some(scoring::fall_interval_ms(&self.config, player.stats.level))
    }

    /// Height of the falling piece including partial progress, for smooth rendering
    pub fn visual_height(&self, owner: PlayerId) -> Option<f32> {
        let interval = self.fall_interval_ms(owner)?;
        Some(self.active_tetromino(owner)?.visual_height(interval))
    }

    /// What would happen if the falling piece landed now. Read-only.
    pub fn preview_landing(&self, owner: PlayerId) -> Option<Landing> {
        let piece = self.active_tetromino(owner)?;
        let landing = match tetromino::check_attachment(&self.board, piece, self.king_position(owner)) {
            Ok(cells) => Landing::Attached { cells },
            Err(reason) => Landing::Disintegrated { reason },
        };
        Some(landing)
    }

    /// Squares the piece could legally move to (connectivity not considered)
    pub fn legal_destinations(&self, piece_id: PieceId) -> Vec<Coord> {
        let Some(piece) = self.pieces.get(&piece_id).filter(|p| p.is_active()) else {
            return Vec::new();
        };
        let Some(player) = self.players.get(&piece.owner_id) else {
            return Vec::new();
        };
        chess::legal_destinations(&self.board, piece, player.facing)
    }

    fn colors(&self) -> BTreeMap<PlayerId, u8> {
        self.players.values().map(|p| (p.id, p.color)).collect()
    }

    pub fn board_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::capture(&self.board, &self.pieces, &self.colors())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            clock_ms: self.clock_ms,
            board: self.board_snapshot(),
            players: self.players.values().map(PlayerSnapshot::from).collect(),
            pieces: self.pieces.values().cloned().collect(),
            winner_id: self.winner,
            game_over: self.over,
        }
    }

    // ---- commands ----

    /// Dispatch a command for `owner`
    pub fn apply(
        &mut self,
        owner: PlayerId,
        command: GameCommand,
    ) -> Result<CommandOutcome, RejectReason> {
        let result = match command {
            GameCommand::SpawnTetromino => self.spawn_tetromino(owner),
            GameCommand::MoveTetromino { dx, dz } => self
                .move_tetromino(owner, dx, dz)
                .map(|_| CommandOutcome::Updated),
            GameCommand::RotateTetromino(direction) => self
                .rotate_tetromino(owner, direction)
                .map(|_| CommandOutcome::Updated),
            GameCommand::HardDrop => self
                .hard_drop(owner)
                .map(|landing| CommandOutcome::Landed { landing }),
            GameCommand::HoldTetromino => self
                .hold_tetromino(owner)
                .map(|_| CommandOutcome::Updated),
            GameCommand::SelectChessPiece { x, y } => self
                .try_select(owner, x, y)
                .map(|piece_id| CommandOutcome::Selected { piece_id }),
            GameCommand::MoveChessPiece { x, y } => self.move_chess_piece(owner, x, y),
        };
        if let Err(reason) = &result {
            log::debug!(
                "player {} {} rejected: {}",
                owner,
                command.as_str(),
                reason.code()
            );
        }
        result
    }

    fn check_actor(&self, owner: PlayerId, phase: Phase) -> Result<(), RejectReason> {
        if self.over {
            return Err(RejectReason::GameOver);
        }
        let player = self
            .players
            .get(&owner)
            .ok_or(RejectReason::UnknownPlayer)?;
        if player.eliminated {
            return Err(RejectReason::Eliminated);
        }
        if player.phase != phase {
            return Err(RejectReason::WrongPhase);
        }
        Ok(())
    }

    fn touch(&mut self, owner: PlayerId) {
        let now = self.clock_ms;
        if let Some(zone) = self.board.home_zone_of_mut(owner) {
            zone.last_activity = now;
        }
    }

    fn active_of(&self, owner: PlayerId) -> Result<Tetromino, RejectReason> {
        self.players
            .get(&owner)
            .and_then(|p| p.active)
            .ok_or(RejectReason::NoActiveTetromino)
    }

    fn set_active(&mut self, owner: PlayerId, piece: Option<Tetromino>) {
        if let Some(player) = self.players.get_mut(&owner) {
            player.active = piece;
        }
    }

    /// Spawn the next tetromino from the owner's bag
    pub fn spawn_tetromino(&mut self, owner: PlayerId) -> Result<CommandOutcome, RejectReason> {
        self.check_actor(owner, Phase::Tetromino)?;
        let player = self
            .players
            .get_mut(&owner)
            .ok_or(RejectReason::UnknownPlayer)?;
        if player.active.is_some() {
            return Err(RejectReason::AlreadyFalling);
        }
        let kind = player.bag.draw();
        self.touch(owner);
        Ok(self.spawn_kind(owner, kind))
    }

    /// Spawn a specific kind without touching the bag (scripted play and replays)
    pub fn spawn_tetromino_kind(
        &mut self,
        owner: PlayerId,
        kind: TetrominoKind,
    ) -> Result<CommandOutcome, RejectReason> {
        self.check_actor(owner, Phase::Tetromino)?;
        if self.active_of(owner).is_ok() {
            return Err(RejectReason::AlreadyFalling);
        }
        self.touch(owner);
        Ok(self.spawn_kind(owner, kind))
    }

    fn fresh_tetromino(&self, owner: PlayerId, kind: TetrominoKind, facing: Facing) -> Tetromino {
        let shape = ShapeMatrix::spawn(kind);
        let origin = tetromino::spawn_origin(&self.board, owner, facing, &shape);
        Tetromino::new(
            self.next_tetromino_id,
            kind,
            owner,
            origin,
            self.config.spawn_height,
        )
    }

    fn spawn_kind(&mut self, owner: PlayerId, kind: TetrominoKind) -> CommandOutcome {
        let Some(facing) = self.players.get(&owner).map(|p| p.facing) else {
            return CommandOutcome::Updated;
        };
        let piece = self.fresh_tetromino(owner, kind, facing);
        self.next_tetromino_id += 1;
        if let Some(player) = self.players.get_mut(&owner) {
            player.spawn_timer_ms = None;
            player.can_hold = true;
        }
        self.events.push(GameEvent::TetrominoSpawned {
            owner_id: owner,
            tetromino_id: piece.id,
            kind,
            cells: piece.cells().to_vec(),
            height: piece.height,
        });

        if tetromino::collides(&self.board, &piece.cells()) {
            let landing = self.disintegrate(owner, &piece, DisintegrationReason::SpawnBlocked);
            return CommandOutcome::Landed { landing };
        }
        log::debug!("player {} spawned {} #{}", owner, kind.as_str(), piece.id);
        self.set_active(owner, Some(piece));
        CommandOutcome::Spawned {
            tetromino_id: piece.id,
        }
    }

    /// Shift the falling tetromino horizontally by (dx, dz)
    pub fn move_tetromino(&mut self, owner: PlayerId, dx: i32, dz: i32) -> Result<(), RejectReason> {
        self.check_actor(owner, Phase::Tetromino)?;
        let piece = self.active_of(owner)?;
        let moved =
            tetromino::try_shift(&self.board, &piece, dx, dz).ok_or(RejectReason::Collision)?;
        self.set_active(owner, Some(moved));
        self.touch(owner);
        Ok(())
    }

    pub fn rotate_tetromino(
        &mut self,
        owner: PlayerId,
        direction: RotateDirection,
    ) -> Result<(), RejectReason> {
        self.check_actor(owner, Phase::Tetromino)?;
        let piece = self.active_of(owner)?;
        let rotated = tetromino::try_rotate(&self.board, &piece, direction)
            .ok_or(RejectReason::RotationBlocked)?;
        self.set_active(owner, Some(rotated));
        self.touch(owner);
        Ok(())
    }

    /// Drop the falling tetromino to height 0 and resolve its landing
    pub fn hard_drop(&mut self, owner: PlayerId) -> Result<Landing, RejectReason> {
        self.check_actor(owner, Phase::Tetromino)?;
        let mut piece = self.active_of(owner)?;
        self.set_active(owner, None);
        piece.height = 0;
        piece.fall_timer_ms = 0;
        self.touch(owner);
        Ok(self.land(owner, piece))
    }

    /// Swap the falling tetromino with the hold slot (once per spawn)
    pub fn hold_tetromino(&mut self, owner: PlayerId) -> Result<(), RejectReason> {
        self.check_actor(owner, Phase::Tetromino)?;
        let current = self.active_of(owner)?;
        let player = self
            .players
            .get(&owner)
            .ok_or(RejectReason::UnknownPlayer)?;
        if !player.can_hold {
            return Err(RejectReason::HoldUnavailable);
        }
        let next_kind = player.hold.unwrap_or_else(|| player.bag.peek());
        let fresh = self.fresh_tetromino(owner, next_kind, player.facing);
        if tetromino::collides(&self.board, &fresh.cells()) {
            return Err(RejectReason::HoldBlocked);
        }

        self.next_tetromino_id += 1;
        if let Some(player) = self.players.get_mut(&owner) {
            if player.hold.is_none() {
                player.bag.draw();
            }
            player.hold = Some(current.kind);
            player.active = Some(fresh);
            player.can_hold = false;
        }
        self.events.push(GameEvent::TetrominoHeld {
            owner_id: owner,
            held: current.kind,
        });
        self.events.push(GameEvent::TetrominoSpawned {
            owner_id: owner,
            tetromino_id: fresh.id,
            kind: fresh.kind,
            cells: fresh.cells().to_vec(),
            height: fresh.height,
        });
        self.touch(owner);
        Ok(())
    }

    /// Select one of the requester's own pieces. Returns false (selection unchanged)
    /// for anything else.
    pub fn select_chess_piece(&mut self, owner: PlayerId, x: i32, y: i32) -> bool {
        self.try_select(owner, x, y).is_ok()
    }

    fn try_select(&mut self, owner: PlayerId, x: i32, y: i32) -> Result<PieceId, RejectReason> {
        self.check_actor(owner, Phase::Chess)?;
        if !self.board.in_bounds(x, y) {
            return Err(RejectReason::OutOfBounds);
        }
        let piece_id = self
            .piece_at(x, y)
            .filter(|p| p.owner_id == owner)
            .map(|p| p.id)
            .ok_or(RejectReason::NotYourPiece)?;
        self.select(owner, piece_id, Coord::new(x, y));
        self.touch(owner);
        Ok(piece_id)
    }

    fn select(&mut self, owner: PlayerId, piece_id: PieceId, at: Coord) {
        if let Some(player) = self.players.get_mut(&owner) {
            player.selected = Some(piece_id);
        }
        self.events.push(GameEvent::ChessPieceSelected {
            owner_id: owner,
            piece_id,
            at,
        });
    }

    /// Move the selected piece to (x, y).
    ///
    /// A friendly destination re-selects that piece instead and keeps the phase.
    pub fn move_chess_piece(
        &mut self,
        owner: PlayerId,
        x: i32,
        y: i32,
    ) -> Result<CommandOutcome, RejectReason> {
        self.check_actor(owner, Phase::Chess)?;
        let to = Coord::new(x, y);
        if !self.board.in_bounds(x, y) {
            return Err(RejectReason::OutOfBounds);
        }
        let Some((selected, facing)) = self
            .players
            .get(&owner)
            .and_then(|p| p.selected.map(|s| (s, p.facing)))
        else {
            return Err(RejectReason::NoSelection);
        };
        let piece = match self.pieces.get(&selected) {
            Some(p) if p.is_active() && p.owner_id == owner => p.clone(),
            _ => {
                if let Some(player) = self.players.get_mut(&owner) {
                    player.selected = None;
                }
                return Err(RejectReason::NoSelection);
            }
        };

        if let Some(friendly) = self.piece_at(x, y).filter(|p| p.owner_id == owner) {
            let piece_id = friendly.id;
            self.select(owner, piece_id, to);
            self.touch(owner);
            return Ok(CommandOutcome::Selected { piece_id });
        }

        let legal = chess::validate_move(&self.board, &piece, facing, to)?;
        let from = piece.position;
        self.transact(|s| s.execute_move(owner, &piece, to, legal))?;

        self.touch(owner);
        self.enter_phase(owner, Phase::Tetromino);
        Ok(CommandOutcome::ChessMoved {
            piece_id: piece.id,
            from,
            to,
            captured_id: match legal.kind {
                MoveKind::Capture(id) => Some(id),
                MoveKind::Quiet => None,
            },
        })
    }

    fn execute_move(
        &mut self,
        owner: PlayerId,
        piece: &ChessPiece,
        to: Coord,
        legal: LegalMove,
    ) -> Result<(), RejectReason> {
        let now = self.clock_ms;
        let mut fallen_king = None;
        let captured_id = match legal.kind {
            MoveKind::Capture(id) => Some(id),
            MoveKind::Quiet => None,
        };
        if let Some(id) = captured_id {
            if let Some(defender) = self.pieces.get_mut(&id) {
                defender.captured_at = Some(now);
                if defender.kind == ChessPieceKind::King {
                    fallen_king = Some(defender.owner_id);
                }
            }
            if let Some(player) = self.players.get_mut(&owner) {
                player.captured.push(id);
            }
        }

        self.board.set_at(piece.position, Cell::Empty);
        let marker = match self.pieces.get_mut(&piece.id) {
            Some(moved) => {
                moved.position = to;
                moved.has_moved = true;
                if let Some(kind) = legal.promotes_to {
                    moved.kind = kind;
                }
                moved.marker()
            }
            None => return Err(RejectReason::NoSelection),
        };
        self.board.set_at(to, marker);
        self.events.push(GameEvent::ChessPieceMoved {
            owner_id: owner,
            piece_id: piece.id,
            from: piece.position,
            to,
            captured_id,
            promoted_to: legal.promotes_to,
        });

        if !orphaned_cells(&self.board, owner, self.king_position(owner)).is_empty() {
            return Err(RejectReason::WouldDisconnect);
        }
        if let Some(loser) = fallen_king {
            self.eliminate(loser, Some(owner), GameOverReason::KingCaptured);
        }
        self.sweep_orphans();
        Ok(())
    }

    // ---- gravity and timers ----

    /// Advance the session clock and every player by `elapsed_ms`
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.advance_clock(elapsed_ms);
        for owner in self.player_ids() {
            self.tick_player(owner, elapsed_ms);
        }
    }

    pub fn advance_clock(&mut self, elapsed_ms: u32) {
        self.clock_ms += elapsed_ms as u64;
    }

    /// Run one player's timers and gravity without touching the session clock
    pub fn tick_player(&mut self, owner: PlayerId, elapsed_ms: u32) {
        if self.over {
            return;
        }
        let due = match self.players.get_mut(&owner) {
            Some(player) => player.tick_timers(elapsed_ms, &self.config),
            None => return,
        };

        if due.timed_out {
            self.force_advance(owner);
            return;
        }
        if due.spawn {
            if let Some(player) = self.players.get_mut(&owner) {
                let kind = player.bag.draw();
                self.spawn_kind(owner, kind);
            }
            return;
        }
        self.apply_gravity(owner, elapsed_ms);
    }

    fn apply_gravity(&mut self, owner: PlayerId, elapsed_ms: u32) {
        let Ok(mut piece) = self.active_of(owner) else {
            return;
        };
        let Some(interval) = self.fall_interval_ms(owner) else {
            return;
        };

        // Someone else may have built under the footprint since the last tick.
        let landed = tetromino::collides(&self.board, &piece.cells())
            || piece.advance(elapsed_ms, interval);
        if landed {
            self.set_active(owner, None);
            self.land(owner, piece);
        } else {
            self.set_active(owner, Some(piece));
        }
    }

    /// Turn time limit hit: push the stalled phase forward
    fn force_advance(&mut self, owner: PlayerId) {
        let Some(phase) = self.players.get(&owner).map(|p| p.phase) else {
            return;
        };
        log::info!("player {} timed out in {} phase", owner, phase.as_str());
        match (phase, self.active_of(owner)) {
            (Phase::Tetromino, Ok(piece)) => {
                self.set_active(owner, None);
                self.disintegrate(owner, &piece, DisintegrationReason::Timeout);
            }
            (phase, _) => self.enter_phase(owner, phase.next()),
        }
    }

    fn enter_phase(&mut self, owner: PlayerId, phase: Phase) {
        let Some(player) = self.players.get_mut(&owner) else {
            return;
        };
        if player.eliminated {
            return;
        }
        if player.enter_phase(phase, &self.config) {
            log::info!("player {} entered {} phase", owner, phase.as_str());
            self.events.push(GameEvent::PhaseChanged {
                owner_id: owner,
                new_phase: phase,
            });
        }
    }

    // ---- landing ----

    fn land(&mut self, owner: PlayerId, piece: Tetromino) -> Landing {
        let king = self.king_position(owner);
        let cells = match tetromino::check_attachment(&self.board, &piece, king) {
            Ok(cells) => cells,
            Err(reason) => return self.disintegrate(owner, &piece, reason),
        };
        if self.transact(|s| s.attach(owner, &piece, &cells)).is_err() {
            return self.disintegrate(owner, &piece, DisintegrationReason::Rejected);
        }
        log::debug!("player {} attached tetromino #{}", owner, piece.id);
        self.enter_phase(owner, Phase::Chess);
        Landing::Attached { cells }
    }

    fn disintegrate(
        &mut self,
        owner: PlayerId,
        piece: &Tetromino,
        reason: DisintegrationReason,
    ) -> Landing {
        match reason {
            DisintegrationReason::SpawnBlocked => {
                log::warn!("player {} spawn blocked, tetromino #{} disintegrated", owner, piece.id)
            }
            _ => log::debug!(
                "player {} tetromino #{} disintegrated: {}",
                owner,
                piece.id,
                reason.as_str()
            ),
        }
        self.events.push(GameEvent::TetrominoDisintegrated {
            owner_id: owner,
            tetromino_id: piece.id,
            reason,
        });
        self.enter_phase(owner, Phase::Chess);
        Landing::Disintegrated { reason }
    }

    fn attach(&mut self, owner: PlayerId, piece: &Tetromino, cells: &[Coord]) -> Result<(), RejectReason> {
        let block = piece.block();
        for &c in cells {
            self.board.set_at(c, block);
        }
        self.events.push(GameEvent::TetrominoAttached {
            owner_id: owner,
            tetromino_id: piece.id,
            kind: piece.kind,
            attachment_points: cells.to_vec(),
        });

        let cleared = row_clear::clear_rows(&mut self.board, self.config.row_clear_threshold);
        if !cleared.is_empty() {
            if let Some(player) = self.players.get_mut(&owner) {
                let (delta, level_changed) = player.stats.record_clear(cleared.rows.len());
                if level_changed {
                    log::info!("player {} reached level {}", owner, player.stats.level);
                }
                self.events.push(GameEvent::RowsCleared {
                    owner_id: owner,
                    rows: cleared.rows.clone(),
                    score_delta: delta,
                    score: player.stats.score,
                    lines: player.stats.lines,
                    level: player.stats.level,
                });
            }
            self.resync_pieces();
        }
        self.sweep_orphans();
        Ok(())
    }

    /// Re-read piece positions from the board after a row rewrite; pieces whose
    /// markers vanished are lost.
    fn resync_pieces(&mut self) {
        let now = self.clock_ms;
        let on_board: BTreeMap<PieceId, Coord> = self
            .board
            .occupied()
            .filter_map(|(at, cell)| cell.piece_id().map(|id| (id, at)))
            .collect();

        let mut fallen_kings = Vec::new();
        for piece in self.pieces.values_mut().filter(|p| p.is_active()) {
            match on_board.get(&piece.id) {
                Some(&at) => piece.position = at,
                None => {
                    piece.captured_at = Some(now);
                    self.events.push(GameEvent::ChessPieceLost {
                        owner_id: piece.owner_id,
                        piece_id: piece.id,
                        at: piece.position,
                    });
                    if piece.kind == ChessPieceKind::King {
                        fallen_kings.push(piece.owner_id);
                    }
                }
            }
        }
        for loser in fallen_kings {
            self.eliminate(loser, None, GameOverReason::KingLost);
        }
    }

    /// Remove every cell that lost its path to its owner's king
    fn sweep_orphans(&mut self) {
        let now = self.clock_ms;
        for owner in self.player_ids() {
            let orphans = orphaned_cells(&self.board, owner, self.king_position(owner));
            if orphans.is_empty() {
                continue;
            }
            for &at in &orphans {
                if let Some(piece) = self
                    .board
                    .get_at(at)
                    .piece_id()
                    .and_then(|id| self.pieces.get_mut(&id))
                {
                    piece.captured_at = Some(now);
                    self.events.push(GameEvent::ChessPieceLost {
                        owner_id: owner,
                        piece_id: piece.id,
                        at,
                    });
                }
                self.board.set_at(at, Cell::Empty);
            }
            log::debug!("player {} lost {} disconnected cells", owner, orphans.len());
            self.events.push(GameEvent::StructureCollapsed {
                owner_id: owner,
                cells: orphans,
            });
        }
    }

    fn eliminate(&mut self, loser: PlayerId, winner: Option<PlayerId>, reason: GameOverReason) {
        let Some(player) = self.players.get_mut(&loser) else {
            return;
        };
        if player.eliminated {
            return;
        }
        player.eliminated = true;
        player.selected = None;
        player.spawn_timer_ms = None;
        let falling = player.active.take();

        if let Some(zone) = self.board.home_zone_of_mut(loser) {
            zone.is_safe = false;
        }
        if let Some(piece) = falling {
            self.events.push(GameEvent::TetrominoDisintegrated {
                owner_id: loser,
                tetromino_id: piece.id,
                reason: DisintegrationReason::Eliminated,
            });
        }
        let remaining: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| !p.eliminated)
            .map(|p| p.id)
            .collect();
        let finished = remaining.len() <= 1;
        let winner = if finished {
            remaining.first().copied().or(winner)
        } else {
            winner
        };

        self.events.push(GameEvent::GameOver {
            winner_id: winner,
            loser_id: loser,
            reason,
        });
        log::info!("player {} eliminated: {:?}", loser, reason);

        if finished {
            self.over = true;
            self.winner = winner;
            log::info!("game over, winner {:?}", self.winner);
        }
    }

    // ---- transactions ----

    fn transact(
        &mut self,
        mutation: impl FnOnce(&mut Self) -> Result<(), RejectReason>,
    ) -> Result<(), RejectReason> {
        let checkpoint = Checkpoint {
            board: self.board.clone(),
            pieces: self.pieces.clone(),
            players: self.players.clone(),
            events: self.events.len(),
            over: self.over,
            winner: self.winner,
        };

        let mut result = mutation(self);
        if result.is_ok() {
            if let Err(violation) = self.verify_invariants() {
                log::error!("invariant violated, mutation rolled back: {}", violation);
                self.violations.push(violation);
                result = Err(RejectReason::InvariantViolation);
            }
        }

        if result.is_err() {
            self.board = checkpoint.board;
            self.pieces = checkpoint.pieces;
            self.players = checkpoint.players;
            self.events.truncate(checkpoint.events);
            self.over = checkpoint.over;
            self.winner = checkpoint.winner;
        }
        result
    }

    /// Check every board invariant against the current state
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        for (at, cell) in self.board.occupied() {
            match cell {
                Cell::ChessPieceMarker { piece_id, owner } => {
                    let consistent = self.pieces.get(&piece_id).is_some_and(|p| {
                        p.is_active() && p.position == at && p.owner_id == owner
                    });
                    if !consistent {
                        return Err(InvariantViolation::DanglingMarker { piece_id, at });
                    }
                }
                Cell::TetrominoBlock { .. } if self.board.in_active_zone(at) => {
                    return Err(InvariantViolation::BlockInHomeZone { at });
                }
                _ => {}
            }
        }

        for piece in self.pieces.values().filter(|p| p.is_active()) {
            if self.board.get_at(piece.position).piece_id() != Some(piece.id) {
                return Err(InvariantViolation::MisplacedPiece {
                    piece_id: piece.id,
                    at: piece.position,
                });
            }
        }

        for player in self.players.values() {
            if !player.eliminated {
                let count = self
                    .pieces
                    .values()
                    .filter(|p| {
                        p.owner_id == player.id && p.kind == ChessPieceKind::King && p.is_active()
                    })
                    .count();
                if count != 1 {
                    return Err(InvariantViolation::KingCount {
                        owner: player.id,
                        count,
                    });
                }
            }
            let orphans = orphaned_cells(&self.board, player.id, self.king_position(player.id));
            if let Some(&at) = orphans.first() {
                return Err(InvariantViolation::Disconnected {
                    owner: player.id,
                    at,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(owner: PlayerId) -> Cell {
        Cell::TetrominoBlock {
            owner,
            kind: TetrominoKind::L,
            color: TetrominoKind::L.color_id(),
        }
    }

    /// 10x20 board, player 1 zone on cols 1..=8 rows 18..=19, lone king at (4, 19)
    fn single_player() -> GameSession {
        let mut session = GameSession::new(GameConfig::with_board(10, 20)).unwrap();
        session
            .join_player_with(
                1,
                Rect::new(1, 18, 8, 2),
                Facing::North,
                &[(ChessPieceKind::King, Coord::new(4, 19))],
            )
            .unwrap();
        session
    }

    /// 10x20 board, player 1 zone on cols 0..=1 rows 18..=19, lone king at (0, 19)
    fn left_edge_player() -> GameSession {
        let mut session = GameSession::new(GameConfig::with_board(10, 20)).unwrap();
        session
            .join_player_with(
                1,
                Rect::new(0, 18, 2, 2),
                Facing::North,
                &[(ChessPieceKind::King, Coord::new(0, 19))],
            )
            .unwrap();
        session
    }

    fn place_piece(session: &mut GameSession, id: PieceId, kind: ChessPieceKind, at: Coord) {
        let piece = ChessPiece::new(id, kind, 1, at);
        session.board.set_at(at, piece.marker());
        session.pieces.insert(id, piece);
    }

    /// Finish the tetromino phase with a piece that cannot attach
    fn to_chess_phase(session: &mut GameSession, owner: PlayerId) {
        session.spawn_tetromino_kind(owner, TetrominoKind::O).unwrap();
        session.move_tetromino(owner, 0, -8).unwrap();
        let landing = session.hard_drop(owner).unwrap();
        assert!(!landing.is_attached());
        assert_eq!(session.player(owner).unwrap().phase, Phase::Chess);
    }

    #[test]
    fn test_default_seats() {
        let mut session = GameSession::new(GameConfig::default()).unwrap();
        session.join_player(1).unwrap();
        session.join_player(2).unwrap();
        assert_eq!(session.join_player(3), Err(SessionError::NoSeatAvailable));
        assert_eq!(session.join_player(1), Err(SessionError::DuplicatePlayer(1)));

        assert_eq!(session.king_position(1), Some(Coord::new(15, 29)));
        assert_eq!(session.king_position(2), Some(Coord::new(15, 0)));
        assert_eq!(session.pieces().len(), 32);
        assert_eq!(session.player(2).unwrap().facing, Facing::South);
        assert!(session.verify_invariants().is_ok());
    }

    #[test]
    fn test_custom_setup_validation() {
        let mut session = GameSession::new(GameConfig::with_board(10, 20)).unwrap();
        let zone = Rect::new(1, 18, 8, 2);
        assert_eq!(
            session.join_player_with(1, zone, Facing::North, &[]),
            Err(SessionError::KingCount(0))
        );
        assert_eq!(
            session.join_player_with(
                1,
                zone,
                Facing::North,
                &[(ChessPieceKind::King, Coord::new(0, 0))]
            ),
            Err(SessionError::BadSetupSquare(Coord::new(0, 0)))
        );
        assert_eq!(
            session.join_player_with(
                1,
                Rect::new(5, 18, 8, 2),
                Facing::North,
                &[(ChessPieceKind::King, Coord::new(6, 19))]
            ),
            Err(SessionError::ZoneOutOfBounds)
        );
        session
            .join_player_with(1, zone, Facing::North, &[(ChessPieceKind::King, Coord::new(4, 19))])
            .unwrap();
        assert_eq!(
            session.join_player_with(
                2,
                Rect::new(0, 17, 3, 2),
                Facing::North,
                &[(ChessPieceKind::King, Coord::new(0, 17))]
            ),
            Err(SessionError::ZoneOverlap)
        );
    }

    #[test]
    fn test_hard_drop_at_spawn_attaches() {
        let mut session = single_player();
        session.spawn_tetromino_kind(1, TetrominoKind::T).unwrap();
        let cells = match session.hard_drop(1).unwrap() {
            Landing::Attached { cells } => cells,
            other => panic!("expected attachment, got {:?}", other),
        };
        for c in &cells {
            assert_eq!(session.board().get_at(*c).owner(), Some(1));
        }
        assert_eq!(session.player(1).unwrap().phase, Phase::Chess);
        assert!(session.active_tetromino(1).is_none());

        let events = session.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::TetrominoAttached { attachment_points, .. } if attachment_points.len() == 4)));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::PhaseChanged {
                new_phase: Phase::Chess,
                ..
            }
        )));
        assert!(session.events().is_empty());
    }

    #[test]
    fn test_unsupported_drop_disintegrates_without_mutation() {
        let mut session = single_player();
        let before = session.board().clone();
        session.spawn_tetromino_kind(1, TetrominoKind::T).unwrap();
        session.move_tetromino(1, 0, -8).unwrap();
        assert_eq!(
            session.preview_landing(1),
            Some(Landing::Disintegrated {
                reason: DisintegrationReason::NotAdjacent
            })
        );
        let landing = session.hard_drop(1).unwrap();
        assert_eq!(
            landing,
            Landing::Disintegrated {
                reason: DisintegrationReason::NotAdjacent
            }
        );
        assert_eq!(session.board(), &before);
        assert_eq!(session.player(1).unwrap().phase, Phase::Chess);
    }

    #[test]
    fn test_row_clear_scores_and_preserves_zone() {
        let mut session = left_edge_player();
        for x in 2..8 {
            session.board.set(x, 19, block(1));
        }
        assert!(session.verify_invariants().is_ok());

        session.spawn_tetromino_kind(1, TetrominoKind::O).unwrap();
        session.move_tetromino(1, 8, 0).unwrap();
        session.move_tetromino(1, 0, 2).unwrap();
        assert!(session.hard_drop(1).unwrap().is_attached());

        let events = session.drain_events();
        let cleared = events.iter().find_map(|e| match e {
            GameEvent::RowsCleared {
                rows, score_delta, ..
            } => Some((rows.clone(), *score_delta)),
            _ => None,
        });
        assert_eq!(cleared, Some((vec![19], 100)));
        assert_eq!(session.player(1).unwrap().stats.score, 100);
        assert_eq!(session.player(1).unwrap().stats.lines, 1);

        // Zone content stays; the king survives in place.
        assert_eq!(session.king_position(1), Some(Coord::new(0, 19)));
        for x in 2..8 {
            assert!(session.board().get(x, 19).is_empty());
        }
        // The top half of the O fell into row 19 with nothing left to hold it.
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::StructureCollapsed { owner_id: 1, cells } if cells.len() == 2)));
        assert!(session.board().get(8, 19).is_empty());
        assert!(session.verify_invariants().is_ok());
    }

    #[test]
    fn test_spawn_and_wrong_phase_rejections() {
        let mut session = single_player();
        assert_eq!(session.hard_drop(1), Err(RejectReason::NoActiveTetromino));
        session.spawn_tetromino_kind(1, TetrominoKind::I).unwrap();
        assert_eq!(
            session.spawn_tetromino(1),
            Err(RejectReason::AlreadyFalling)
        );
        assert_eq!(
            session.move_chess_piece(1, 4, 18),
            Err(RejectReason::WrongPhase)
        );
        assert!(!session.select_chess_piece(1, 4, 19));
        assert_eq!(session.spawn_tetromino(7), Err(RejectReason::UnknownPlayer));
    }

    #[test]
    fn test_lateral_move_into_zone_rejected() {
        let mut session = single_player();
        session.spawn_tetromino_kind(1, TetrominoKind::O).unwrap();
        let before = *session.active_tetromino(1).unwrap();
        assert_eq!(session.move_tetromino(1, 0, 1), Err(RejectReason::Collision));
        assert_eq!(session.active_tetromino(1), Some(&before));
    }

    #[test]
    fn test_hold_swaps_once_per_spawn() {
        let mut session = single_player();
        let next = session.player(1).unwrap().next_kind();
        session.spawn_tetromino_kind(1, TetrominoKind::T).unwrap();
        session.rotate_tetromino(1, RotateDirection::Clockwise).unwrap();
        session.hold_tetromino(1).unwrap();

        let player = session.player(1).unwrap();
        assert_eq!(player.hold, Some(TetrominoKind::T));
        let active = player.active.unwrap();
        assert_eq!(active.kind, next);
        assert_eq!(active.rotation, crate::types::Rotation::R0);
        assert_eq!(active.height, session.config().spawn_height);
        assert_eq!(
            session.hold_tetromino(1),
            Err(RejectReason::HoldUnavailable)
        );
    }

    #[test]
    fn test_hold_rejected_when_fresh_spawn_is_blocked() {
        let mut session = single_player();
        session.spawn_tetromino_kind(1, TetrominoKind::T).unwrap();
        session.move_tetromino(1, 0, -8).unwrap();
        let next = session.player(1).unwrap().next_kind();
        let fresh = session.fresh_tetromino(1, next, Facing::North);
        session.board.set_at(fresh.cells()[0], block(2));
        let falling = *session.active_tetromino(1).unwrap();
        session.drain_events();

        assert_eq!(session.hold_tetromino(1), Err(RejectReason::HoldBlocked));
        let player = session.player(1).unwrap();
        assert_eq!(player.active, Some(falling));
        assert_eq!(player.hold, None);
        assert!(player.can_hold);
        assert_eq!(player.next_kind(), next);
        assert!(session.events().is_empty());
    }

    #[test]
    fn test_gravity_lands_piece() {
        let mut session = single_player();
        session.tick(16);
        let piece = *session.active_tetromino(1).expect("auto spawn on first tick");
        assert_eq!(piece.height, 8);

        session.tick(1000);
        assert_eq!(session.active_tetromino(1).unwrap().height, 7);
        for _ in 0..7 {
            session.tick(1000);
        }
        assert!(session.active_tetromino(1).is_none());
        assert!(session.events().iter().any(|e| matches!(
            e,
            GameEvent::TetrominoAttached { .. } | GameEvent::TetrominoDisintegrated { .. }
        )));
        assert_eq!(session.player(1).unwrap().phase, Phase::Chess);
    }

    #[test]
    fn test_footprint_built_over_disintegrates_on_tick() {
        let mut session = single_player();
        session.spawn_tetromino_kind(1, TetrominoKind::O).unwrap();
        let cell = session.active_tetromino(1).unwrap().cells()[0];
        session.board.set_at(cell, block(2));
        session.tick(16);
        assert!(session.events().iter().any(|e| matches!(
            e,
            GameEvent::TetrominoDisintegrated {
                reason: DisintegrationReason::Collision,
                ..
            }
        )));
    }

    #[test]
    fn test_turn_limit_forces_phase() {
        let config = GameConfig {
            turn_time_limit_ms: Some(500),
            ..GameConfig::with_board(10, 20)
        };
        let mut session = GameSession::new(config).unwrap();
        session
            .join_player_with(
                1,
                Rect::new(1, 18, 8, 2),
                Facing::North,
                &[(ChessPieceKind::King, Coord::new(4, 19))],
            )
            .unwrap();
        session.tick(16);
        assert!(session.active_tetromino(1).is_some());
        session.tick(500);
        assert!(session.events().iter().any(|e| matches!(
            e,
            GameEvent::TetrominoDisintegrated {
                reason: DisintegrationReason::Timeout,
                ..
            }
        )));
        assert_eq!(session.player(1).unwrap().phase, Phase::Chess);

        session.tick(500);
        assert_eq!(session.player(1).unwrap().phase, Phase::Tetromino);
    }

    #[test]
    fn test_move_that_disconnects_own_structure_is_rejected() {
        let mut session = single_player();
        // Knight just outside the zone carries a block further out.
        place_piece(&mut session, 99, ChessPieceKind::Knight, Coord::new(0, 17));
        session.board.set(0, 16, block(1));
        assert!(session.verify_invariants().is_ok());

        to_chess_phase(&mut session, 1);
        assert!(session.select_chess_piece(1, 0, 17));
        let before = session.board().clone();
        assert_eq!(
            session.move_chess_piece(1, 2, 16),
            Err(RejectReason::WouldDisconnect)
        );
        assert_eq!(session.board(), &before);
        assert_eq!(session.piece(99).unwrap().position, Coord::new(0, 17));
        assert_eq!(session.player(1).unwrap().phase, Phase::Chess);
        assert!(session.violations().is_empty());
    }

    #[test]
    fn test_friendly_destination_reselects() {
        let mut session = GameSession::new(GameConfig::with_board(10, 20)).unwrap();
        session
            .join_player_with(
                1,
                Rect::new(1, 18, 8, 2),
                Facing::North,
                &[
                    (ChessPieceKind::King, Coord::new(4, 19)),
                    (ChessPieceKind::Rook, Coord::new(1, 19)),
                ],
            )
            .unwrap();
        to_chess_phase(&mut session, 1);
        assert!(session.select_chess_piece(1, 1, 19));
        let outcome = session.move_chess_piece(1, 4, 19).unwrap();
        let king_id = session.piece_at(4, 19).unwrap().id;
        assert_eq!(outcome, CommandOutcome::Selected { piece_id: king_id });
        assert_eq!(session.player(1).unwrap().selected, Some(king_id));
        assert_eq!(session.player(1).unwrap().phase, Phase::Chess);

        // A completed move returns to the tetromino phase and spawns on the next tick.
        session.move_chess_piece(1, 4, 18).unwrap();
        assert_eq!(session.player(1).unwrap().phase, Phase::Tetromino);
        session.tick(16);
        assert!(session.active_tetromino(1).is_some());
    }

    #[test]
    fn test_violation_rolls_back() {
        let mut session = single_player();
        let before = session.board().clone();
        let result = session.transact(|s| {
            s.board.set(9, 0, block(1));
            Ok(())
        });
        assert_eq!(result, Err(RejectReason::InvariantViolation));
        assert_eq!(session.board(), &before);
        assert_eq!(
            session.violations(),
            &[InvariantViolation::Disconnected {
                owner: 1,
                at: Coord::new(9, 0)
            }]
        );
    }

    #[test]
    fn test_row_clear_loses_pieces_in_the_row_and_lowers_pieces_above() {
        let mut session = left_edge_player();
        place_piece(&mut session, 98, ChessPieceKind::Rook, Coord::new(2, 16));
        place_piece(&mut session, 99, ChessPieceKind::Knight, Coord::new(2, 17));
        for x in 3..9 {
            session.board.set(x, 17, block(1));
        }
        assert!(session.verify_invariants().is_ok());

        // The O lands on cols 0..=1 rows 16..=17 and fills row 17 past the threshold.
        session.spawn_tetromino_kind(1, TetrominoKind::O).unwrap();
        assert!(session.hard_drop(1).unwrap().is_attached());

        let events = session.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::RowsCleared { rows, .. } if rows == &vec![17]
        )));
        assert!(events.iter().any(|e| *e
            == GameEvent::ChessPieceLost {
                owner_id: 1,
                piece_id: 99,
                at: Coord::new(2, 17),
            }));
        assert!(!events
            .iter()
            .any(|e| matches!(e, GameEvent::StructureCollapsed { .. })));
        assert!(!session.piece(99).unwrap().is_active());

        let rook = session.piece(98).unwrap();
        assert!(rook.is_active());
        assert_eq!(rook.position, Coord::new(2, 17));
        assert_eq!(session.piece_at(2, 17).map(|p| p.id), Some(98));
        assert!(session.board().get(2, 16).is_empty());
        assert_eq!(session.board().get(0, 17).owner(), Some(1));
        assert_eq!(session.board().get(1, 17).owner(), Some(1));
        for x in 3..9 {
            assert!(session.board().get(x, 17).is_empty());
        }
        assert_eq!(session.king_position(1), Some(Coord::new(0, 19)));
        assert!(!session.is_over());
        assert!(session.verify_invariants().is_ok());
    }

    #[test]
    fn test_king_lost_to_row_clear_names_the_survivor() {
        let mut session = left_edge_player();
        session
            .join_player_with(
                2,
                Rect::new(8, 0, 2, 2),
                Facing::South,
                &[(ChessPieceKind::King, Coord::new(8, 0))],
            )
            .unwrap();

        // Walk the king out of its zone onto row 17 and build a row beside it.
        let king_id = session.piece_at(0, 19).unwrap().id;
        session.board.set(0, 19, Cell::Empty);
        if let Some(king) = session.pieces.get_mut(&king_id) {
            king.position = Coord::new(2, 17);
            session.board.set_at(king.position, king.marker());
        }
        for x in 3..9 {
            session.board.set(x, 17, block(1));
        }
        assert!(session.verify_invariants().is_ok());

        session.spawn_tetromino_kind(1, TetrominoKind::O).unwrap();
        assert!(session.hard_drop(1).unwrap().is_attached());

        assert!(session.is_over());
        assert_eq!(session.winner(), Some(2));
        assert!(session.player(1).unwrap().eliminated);
        assert!(!session.board().home_zone_of(1).unwrap().is_safe);

        let events = session.drain_events();
        assert!(events.iter().any(|e| *e
            == GameEvent::ChessPieceLost {
                owner_id: 1,
                piece_id: king_id,
                at: Coord::new(2, 17),
            }));
        assert!(events.contains(&GameEvent::GameOver {
            winner_id: Some(2),
            loser_id: 1,
            reason: GameOverReason::KingLost,
        }));
        // What was left of the O lost its king and fell apart.
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::StructureCollapsed { owner_id: 1, cells } if cells.len() == 2)));
        assert!(session.board().occupied().all(|(_, cell)| cell.owner() == Some(2)));
        assert!(session.verify_invariants().is_ok());
    }

    #[test]
    fn test_pawn_reaching_far_row_promotes_to_knight() {
        let mut session = single_player();
        // A column of blocks ties the pawn to the zone.
        for y in 1..18 {
            session.board.set(9, y, block(1));
        }
        place_piece(&mut session, 99, ChessPieceKind::Pawn, Coord::new(8, 1));
        assert!(session.verify_invariants().is_ok());

        to_chess_phase(&mut session, 1);
        assert!(session.select_chess_piece(1, 8, 1));
        session.drain_events();

        let outcome = session.move_chess_piece(1, 8, 0).unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::ChessMoved {
                piece_id: 99,
                from: Coord::new(8, 1),
                to: Coord::new(8, 0),
                captured_id: None,
            }
        );
        let piece = session.piece(99).unwrap();
        assert_eq!(piece.kind, ChessPieceKind::Knight);
        assert_eq!(piece.position, Coord::new(8, 0));
        assert!(session.drain_events().contains(&GameEvent::ChessPieceMoved {
            owner_id: 1,
            piece_id: 99,
            from: Coord::new(8, 1),
            to: Coord::new(8, 0),
            captured_id: None,
            promoted_to: Some(ChessPieceKind::Knight),
        }));
        assert_eq!(session.player(1).unwrap().phase, Phase::Tetromino);
        assert!(session.verify_invariants().is_ok());
    }

    #[test]
    fn test_snapshot_reflects_board() {
        let mut session = single_player();
        session.spawn_tetromino_kind(1, TetrominoKind::T).unwrap();
        session.hard_drop(1).unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.players.len(), 1);
        assert_eq!(snap.players[0].phase, Phase::Chess);
        let king = snap.board.get(4, 19).unwrap();
        assert_eq!(king.subtype, "king");
        assert_eq!(king.color_id, 1);
        assert!(!snap.game_over);
    }
}
