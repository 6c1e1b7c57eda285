//! Adapter module - drive a game session over line-delimited JSON
//!
//! The core crate is synchronous and clock-free. This crate owns a session on a
//! tokio runtime, runs gravity for every seated player, and exposes the command
//! set as a line protocol usable over TCP or stdin/stdout.
//!
//! # Protocol Overview
//!
//! Each line is one JSON object.
//!
//! ## Client → Host
//!
//! Every message carries `player` (the acting player id), an optional `seq`
//! echoed back in the reply, and a `type`:
//!
//! - **join**: take the next free seat with the standard army
//! - **spawn_tetromino**, **hard_drop**, **hold_tetromino**
//! - **move_tetromino** `{dx, dz}`
//! - **rotate_tetromino** `{direction: "clockwise" | "counter_clockwise"}`
//! - **select_chess_piece** / **move_chess_piece** `{x, y}`
//! - **snapshot**: request the full session state
//!
//! ## Host → Client
//!
//! - **reply**: `{ok, seq, outcome?}` or `{ok: false, error: {code, reason?, message}}`
//! - **event**: a game event, for every event of every player
//! - **snapshot**: board grid, players and chess pieces
//!
//! # Environment Variables
//!
//! - `SHAKTRIS_HOST`, `SHAKTRIS_PORT`: TCP bind address (default 127.0.0.1:7878)
//! - `SHAKTRIS_TICK_MS`: gravity task period (default 16)
//! - `SHAKTRIS_EVENT_CAPACITY`: per-subscriber event buffer
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Host: {"player":1,"seq":1,"type":"join"}
//! Host -> Client: {"type":"reply","player":1,"seq":1,"ok":true}
//! Host -> Client: {"type":"event","event":{"type":"tetromino_spawned","ownerId":1,...}}
//! Client -> Host: {"player":1,"seq":2,"type":"move_tetromino","dx":-1}
//! Host -> Client: {"type":"reply","player":1,"seq":2,"ok":true,"outcome":{"result":"updated"}}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use shaktris_core as core;
pub use shaktris_types as types;

pub use protocol::{
    parse_message, ClientCommand, ErrorCode, InboundMessage, OutboundMessage, ReplyMessage,
};
pub use runtime::{HostOptions, SessionHost};
pub use server::{run_server, serve_lines, ServerConfig};
