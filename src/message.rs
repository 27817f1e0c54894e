// message.rs -- server->client / client->server message model.
//
// The tagged union shape is grounded on
// original_source/inc/q2proto/q2proto_struct_svc.h's
// `q2proto_svc_message_t`; message type IDs are spec §6.2's shared
// low range. Dispatch/match style (one arm per message kind, single
// top-level `match` on the wire ID) is grounded on
// myq2-client/src/cl_parse.rs's `cl_parse_server_message`.

use crate::coords::{ColorDelta, Vec3};
use crate::entity::EntityStateDelta;
use crate::playerstate::PlayerStateDelta;
use crate::protocol::Protocol;
use crate::tent::TeKind;

/// Wire IDs for the shared low range of server→client message types.
/// Higher IDs are dialect-specific and are not given a fixed constant
/// here; each dialect module maps its own extensions.
pub mod svc {
    pub const MUZZLEFLASH: u8 = 1;
    pub const MUZZLEFLASH2: u8 = 2;
    pub const TEMP_ENTITY: u8 = 3;
    pub const LAYOUT: u8 = 4;
    pub const INVENTORY: u8 = 5;
    pub const NOP: u8 = 6;
    pub const DISCONNECT: u8 = 7;
    pub const RECONNECT: u8 = 8;
    pub const SOUND: u8 = 9;
    pub const PRINT: u8 = 10;
    pub const STUFFTEXT: u8 = 11;
    pub const SERVERDATA: u8 = 12;
    pub const CONFIGSTRING: u8 = 13;
    pub const SPAWNBASELINE: u8 = 14;
    pub const CENTERPRINT: u8 = 15;
    pub const DOWNLOAD: u8 = 16;
    pub const PLAYERINFO: u8 = 17;
    pub const PACKETENTITIES: u8 = 18;
    pub const FRAME: u8 = 20;
}

pub const INVENTORY_ITEMS: usize = 256;

bitflags::bitflags! {
    /// Sound message presence bits (spec §6.2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SoundFlags: u8 {
        const VOLUME      = 0x01;
        const ATTENUATION = 0x02;
        const POS         = 0x04;
        const ENT         = 0x08;
        const OFFSET      = 0x10;
    }
}

pub const SOUND_DEFAULT_VOLUME: u8 = 255;
pub const SOUND_DEFAULT_ATTENUATION: u8 = 64;

/// An R1Q2-specific extension to serverdata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerDataR1Q2 {
    pub enhanced: bool,
}

/// A Q2PRO-specific extension to serverdata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerDataQ2Pro {
    pub server_state: u8,
    pub qw_mode: bool,
    pub waterjump_hack: bool,
    pub extensions: bool,
    pub extensions_v2: bool,
}

/// `svc_serverdata`, the first message the client reader ever
/// accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerData {
    pub protocol: Protocol,
    pub server_count: i32,
    pub attract_loop: bool,
    pub game_dir: String,
    pub client_num: i16,
    pub level_name: String,
    pub r1q2: Option<ServerDataR1Q2>,
    pub q2pro: Option<ServerDataQ2Pro>,
}

/// `svc_sound`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sound {
    pub flags: SoundFlags,
    pub index: u8,
    pub volume: u8,
    pub attenuation: u8,
    /// `entity << 3 | (channel & 7)`, present when `ENT` is set.
    pub entity_channel: u16,
    pub position: Option<Vec3>,
    pub offset: u8,
}

/// `svc_muzzleflash` / `svc_muzzleflash2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuzzleFlash {
    pub entity: u16,
    pub weapon: u8,
}

/// `svc_temp_entity`.
#[derive(Debug, Clone, PartialEq)]
pub struct TempEntity {
    pub kind: TeKind,
    pub position1: Vec3,
    pub position2: Vec3,
    pub offset: Vec3,
    pub direction: u8,
    pub count: u8,
    pub color: u8,
    pub entity1: u16,
    pub entity2: u16,
    pub time: f32,
}

/// `svc_configstring`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigString {
    pub index: u16,
    pub value: String,
}

/// `svc_spawnbaseline`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnBaseline {
    pub entity_number: u16,
    pub delta: EntityStateDelta,
}

/// `svc_download`.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub size: i32,
    pub percent: u8,
    pub data: Vec<u8>,
}

/// `svc_frame`, paired with a run of `frame_entity_delta`s terminated
/// by entity number 0 (§4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub server_frame: i32,
    pub delta_frame: i32,
    pub suppress_count: u8,
    pub player_state: PlayerStateDelta,
    pub clientnum: i16,
}

/// A single `frame_entity_delta` pseudo-message within a frame.
/// Entity number 0 is the end-of-run sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntityDelta {
    pub newnum: u16,
    pub delta: Option<EntityStateDelta>,
}

/// A single blend/damage_blend update, colour-delta encoded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlendDelta(pub ColorDelta);

/// `svc_setting` (Q2PRO extension: server push of a named client
/// setting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub index: u32,
    pub value: u32,
}

/// Every server→client message kind this codec understands.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    MuzzleFlash(MuzzleFlash),
    MuzzleFlash2(MuzzleFlash),
    TempEntity(TempEntity),
    Layout(String),
    Inventory([i16; INVENTORY_ITEMS]),
    Nop,
    Disconnect,
    Reconnect,
    Sound(Sound),
    Print { level: u8, text: String },
    StuffText(String),
    ServerData(ServerData),
    ConfigString(ConfigString),
    SpawnBaseline(SpawnBaseline),
    CenterPrint(String),
    Download(Download),
    Frame(Frame),
    Setting(Setting),
}

/// Every client→server message kind this codec understands.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Nop,
    Move { checksum: u8, last_frame: i32 },
    UserInfo(String),
    StringCmd(String),
    Setting(Setting),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_default_flags_match_spec_constants() {
        assert_eq!(SOUND_DEFAULT_VOLUME, 255);
        assert_eq!(SOUND_DEFAULT_ATTENUATION, 64);
    }

    #[test]
    fn sound_ent_field_packs_entity_and_channel() {
        let entity: u16 = 42;
        let channel: u16 = 3;
        let packed = entity << 3 | (channel & 7);
        assert_eq!(packed >> 3, entity);
        assert_eq!(packed & 7, channel);
    }

    #[test]
    fn frame_entity_delta_zero_is_sentinel() {
        let end = FrameEntityDelta {
            newnum: 0,
            delta: None,
        };
        assert_eq!(end.newnum, 0);
        assert!(end.delta.is_none());
    }

    #[test]
    fn svc_ids_match_shared_low_range() {
        assert_eq!(svc::MUZZLEFLASH, 1);
        assert_eq!(svc::SERVERDATA, 12);
        assert_eq!(svc::FRAME, 20);
    }
}
