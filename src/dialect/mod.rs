// dialect/mod.rs -- the `Dialect` capability set.
//
// Replaces the C original's per-protocol function-pointer dispatch
// structs (original_source/inc/q2proto/q2proto_packing.h's
// `_q2proto_packing_entity_dispatch_s` and its player-state/client
// counterparts) with a trait object, the idiomatic Rust rendering of
// "swap in a different vtable for this connection" noted in
// DESIGN.md's Open Question resolution. `ServerContext`/`ClientContext`
// (client.rs/server.rs) hold a `Box<dyn Dialect>` rather than a struct
// of function pointers.

pub mod q2pro;
pub mod q2repro;
pub mod r1q2;
pub mod vanilla;

use crate::coords::Vec3;
use crate::entity_wire::EntityWireOptions;
use crate::message::ServerData;
use crate::player_wire::PlayerWireOptions;
use crate::protocol::Protocol;

/// Capability set every dialect implements (spec §4.4).
pub trait Dialect {
    fn protocol(&self) -> Protocol;

    /// Width options this dialect uses for entity-delta encoding
    /// (spec §4.3).
    fn entity_wire_options(&self) -> EntityWireOptions;

    /// Width/extras options this dialect uses for player-state delta
    /// encoding (spec §3.4/§4.4/§6.2). Vanilla and R1Q2 have no
    /// player-state extras, so the default is the all-off vanilla
    /// encoding.
    fn player_wire_options(&self) -> PlayerWireOptions {
        PlayerWireOptions::default()
    }

    /// Populate a `ServerData` record with this dialect's defaults
    /// and extensions, given the caller-supplied fields it has no way
    /// to infer on its own.
    fn fill_serverdata(
        &self,
        server_count: i32,
        attract_loop: bool,
        game_dir: &str,
        client_num: i16,
        level_name: &str,
    ) -> ServerData;

    /// True if this dialect can negotiate/emit `zpacket`/`zdownload`
    /// deflate-compressed messages.
    fn supports_deflate(&self) -> bool {
        false
    }

    fn pack_solid(&self, mins: Vec3, maxs: Vec3) -> u32 {
        if self.entity_wire_options().long_solid {
            crate::solid::pack_solid_32(mins, maxs) as u32
        } else {
            crate::solid::pack_solid_16(mins, maxs) as u32
        }
    }

    fn unpack_solid(&self, solid: u32) -> (Vec3, Vec3) {
        if self.entity_wire_options().long_solid {
            crate::solid::unpack_solid_32(solid)
        } else {
            crate::solid::unpack_solid_16(solid as u16)
        }
    }

    /// True if `svc_frame`'s clientnum field is a 16-bit short rather
    /// than vanilla's 8-bit byte (spec §4.4: every dialect but Vanilla
    /// and OLD_DEMO widens it).
    fn clientnum_short(&self) -> bool {
        !matches!(self.protocol(), Protocol::Vanilla | Protocol::OldDemo)
    }
}
