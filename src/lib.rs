//! Quake 2 family network protocol codec.
//!
//! Covers the wire formats spoken by vanilla 3.20, R1Q2, Q2PRO (and
//! its file-only extended demo variants) and Q2rePRO: handshake
//! string parsing, delta-compressed entity/player-state snapshots,
//! the shared `svc_*`/`clc_*` message set, gamestate streaming and
//! file downloads. See each module for the corresponding piece of the
//! wire format.
//!
//! Dialect differences (coordinate widths, solid packing, effects
//! mask width, deflate support) are captured behind the [`dialect::Dialect`]
//! trait; [`client::ClientContext`] and [`server::ServerContext`] hold
//! a negotiated dialect and dispatch the rest of the codec through it.

pub mod client;
pub mod coords;
pub mod dialect;
pub mod download;
pub mod entity;
pub mod entity_bits;
pub mod entity_wire;
pub mod error;
pub mod gamestate;
pub mod handshake;
pub mod io;
pub mod message;
pub mod message_wire;
pub mod player_wire;
pub mod playerstate;
pub mod protocol;
pub mod server;
pub mod solid;
pub mod tent;
pub mod valenc;
pub mod varint;

pub use error::{Error, Result};
pub use protocol::{GameType, Protocol};
