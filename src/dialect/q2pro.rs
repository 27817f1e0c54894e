// dialect/q2pro.rs -- Q2PRO (protocol 36), minors 1015..1025.
//
// Grounded on spec §4.4's "Q2PRO" paragraph: short angles, QW netchan
// type, server-state echo, extended layout, zlib downloads, clientnum
// as short, i23 coordinates and extended limits from minor 1024; the
// "extended" game type widens effects to 64 bits and permits
// per-component alpha/scale.

use super::Dialect;
use crate::entity_wire::EntityWireOptions;
use crate::message::{ServerData, ServerDataQ2Pro};
use crate::player_wire::PlayerWireOptions;
use crate::protocol::Protocol;

pub const MINOR_MIN: u16 = 1015;
pub const MINOR_CURRENT: u16 = 1025;
pub const MINOR_EXTENDED_LIMITS: u16 = 1024;

/// Minor protocol version reserved (never negotiated) in the connect
/// handshake's clamping rule (spec §4.7: "the reserved minor is
/// decremented to skip it"). [[judgment call -- filtered corpus names
/// the rule but not this value; see DESIGN.md]]
pub const MINOR_RESERVED: u16 = 1016;

/// Which demo flavor this codec instance speaks, for the extended
/// demo formats that are file-only and never negotiated live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Q2ProVariant {
    Live,
    ExtendedDemo,
    ExtendedV2Demo,
    ExtendedDemoPlayerFog,
}

pub struct Q2Pro {
    pub minor: u16,
    pub variant: Q2ProVariant,
    pub server_state: u8,
    pub qw_mode: bool,
    pub extended_game: bool,
}

impl Q2Pro {
    pub fn new(requested_minor: u16) -> Self {
        Q2Pro {
            minor: requested_minor.clamp(MINOR_MIN, MINOR_CURRENT),
            variant: Q2ProVariant::Live,
            server_state: 0,
            qw_mode: false,
            extended_game: false,
        }
    }

    pub fn extended_limits(&self) -> bool {
        self.minor >= MINOR_EXTENDED_LIMITS
    }
}

impl Dialect for Q2Pro {
    fn protocol(&self) -> Protocol {
        match self.variant {
            Q2ProVariant::Live => Protocol::Q2Pro,
            Q2ProVariant::ExtendedDemo => Protocol::Q2ProExtendedDemo,
            Q2ProVariant::ExtendedV2Demo => Protocol::Q2ProExtendedV2Demo,
            Q2ProVariant::ExtendedDemoPlayerFog => Protocol::Q2ProExtendedDemoPlayerFog,
        }
    }

    fn entity_wire_options(&self) -> EntityWireOptions {
        EntityWireOptions {
            effects64: self.extended_game,
            long_solid: self.extended_limits(),
            i23_coords: self.extended_limits(),
        }
    }

    fn fill_serverdata(
        &self,
        server_count: i32,
        attract_loop: bool,
        game_dir: &str,
        client_num: i16,
        level_name: &str,
    ) -> ServerData {
        ServerData {
            protocol: self.protocol(),
            server_count,
            attract_loop,
            game_dir: game_dir.to_owned(),
            client_num,
            level_name: level_name.to_owned(),
            r1q2: None,
            q2pro: Some(ServerDataQ2Pro {
                server_state: self.server_state,
                qw_mode: self.qw_mode,
                waterjump_hack: false,
                extensions: self.extended_game,
                extensions_v2: self.extended_limits(),
            }),
        }
    }

    fn supports_deflate(&self) -> bool {
        true
    }

    fn player_wire_options(&self) -> PlayerWireOptions {
        PlayerWireOptions {
            small16: false,
            damage_blend: self.extended_limits(),
            clientnum_in_playerstate: true,
            rerelease_extras: false,
        }
    }
}
