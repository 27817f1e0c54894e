// playerstate.rs -- packed player state and its delta.
//
// Grounded on original_source/inc/q2proto/q2proto_struct_svc.h's
// `q2proto_playerstate_delta_flags` and `q2proto_svc_playerstate_t`,
// and q2proto_packing.h's `q2proto_packed_player_state_t` (the
// Q2PROTO_STATS=64 stats array in particular). The gun
// offset/angles/viewoffset/kick_angles fields stay `VarSmall` instead
// of plain floats because Q2rePRO carries them at full 16-bit
// precision while every other dialect uses the narrow 8-bit form --
// exactly the distinction `q2proto_coords.h`'s `var_small_offset`/
// `var_small_angle` variant generator exists to capture.

use crate::coords::VarSmall;
use bitflags::bitflags;

pub const STATS_COUNT: usize = 64;

bitflags! {
    /// Presence bits for `PlayerStateDelta` fields, matching
    /// `q2proto_playerstate_delta_flags` exactly. `VIEWHEIGHT`/
    /// `GUNSKIN`/`FOG` are the Q2PRO-v2/Q2rePRO extras spec §4.4/§6.2
    /// name; there is no top-level `DAMAGEBLEND` bit here even though
    /// §6.2's text lists one -- `q2proto_internal_packing.c`'s actual
    /// delta builder resends `damage_blend` unconditionally, gated
    /// only by the dialect's own feature check, the same way `blend`
    /// has no presence bit of its own (see player_wire.rs).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PlayerDeltaFlags: u32 {
        const PM_TYPE       = 0x0000_0001;
        const PM_TIME       = 0x0000_0002;
        const PM_FLAGS      = 0x0000_0004;
        const PM_GRAVITY    = 0x0000_0008;
        const PM_DELTA_ANGLES = 0x0000_0010;
        const VIEWOFFSET    = 0x0000_0020;
        const KICKANGLES    = 0x0000_0040;
        const GUNINDEX      = 0x0000_0080;
        const GUNFRAME      = 0x0000_0100;
        const GUNOFFSET     = 0x0000_0200;
        const GUNANGLES     = 0x0000_0400;
        const FOV           = 0x0000_0800;
        const RDFLAGS       = 0x0000_1000;
        const CLIENTNUM     = 0x0000_2000;
        const VIEWHEIGHT    = 0x0000_4000;
        const GUNSKIN       = 0x0000_8000;
        const FOG           = 0x0001_0000;
    }
}

/// Q2rePRO's player-state fog extra. Weakest-grounded field in this
/// module: the filtered corpus has no concrete struct layout for it,
/// only the field's existence (spec §4.4); shape chosen by analogy to
/// `q2proto_internal_packing.c`'s other per-channel colour fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerFog {
    pub color: [u8; 3],
    pub density: u8,
}

/// A dialect-agnostic, fully quantized player state, the field set of
/// `q2proto_packed_player_state_t`.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedPlayerState {
    pub pm_type: u8,
    pub pm_origin: [i32; 3],
    pub pm_velocity: [i32; 3],
    pub pm_time: u16,
    pub pm_flags: u16,
    pub pm_gravity: i16,
    pub pm_delta_angles: [i16; 3],
    pub viewoffset: [VarSmall; 3],
    pub viewangles: [i16; 3],
    pub kick_angles: [VarSmall; 3],
    pub gunindex: u16,
    pub gunframe: u8,
    pub gunoffset: [VarSmall; 3],
    pub gunangles: [VarSmall; 3],
    pub blend: [u8; 4],
    pub damage_blend: [u8; 4],
    pub fov: u8,
    pub rdflags: u8,
    /// Q2PRO/Q2rePRO player-state clientnum (spec §3.4), distinct from
    /// `Frame::clientnum` which every dialect widens at the wire layer
    /// independently of this field (player_wire.rs).
    pub clientnum: i16,
    /// Q2rePRO rerelease extra.
    pub viewheight: i8,
    /// Q2rePRO rerelease extra, pair-coupled with `gunindex` on the
    /// wire (player_wire.rs): changing either forces both to be resent.
    pub gunskin: u16,
    /// Q2rePRO rerelease extra.
    pub fog: PlayerFog,
    pub stats: [i16; STATS_COUNT],
}

impl Default for PackedPlayerState {
    fn default() -> Self {
        PackedPlayerState {
            pm_type: 0,
            pm_origin: [0; 3],
            pm_velocity: [0; 3],
            pm_time: 0,
            pm_flags: 0,
            pm_gravity: 0,
            pm_delta_angles: [0; 3],
            viewoffset: [VarSmall::Char(0); 3],
            viewangles: [0; 3],
            kick_angles: [VarSmall::Char(0); 3],
            gunindex: 0,
            gunframe: 0,
            gunoffset: [VarSmall::Char(0); 3],
            gunangles: [VarSmall::Char(0); 3],
            blend: [0; 4],
            damage_blend: [0; 4],
            fov: 0,
            rdflags: 0,
            clientnum: 0,
            viewheight: 0,
            gunskin: 0,
            fog: PlayerFog::default(),
            stats: [0; STATS_COUNT],
        }
    }
}

/// The wire-ready delta between two `PackedPlayerState`s. Stats are
/// sent per-index rather than as a block, mirroring
/// `q2proto_svc_playerstate_t`'s `statbits`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStateDelta {
    pub flags: PlayerDeltaFlags,
    pub pm_type: u8,
    pub pm_origin: [i32; 3],
    pub pm_velocity: [i32; 3],
    pub pm_time: u16,
    pub pm_flags: u16,
    pub pm_gravity: i16,
    pub pm_delta_angles: [i16; 3],
    pub viewoffset: [VarSmall; 3],
    pub viewangles: [i16; 3],
    pub kick_angles: [VarSmall; 3],
    pub gunindex: u16,
    pub gunframe: u8,
    pub gunoffset: [VarSmall; 3],
    pub gunangles: [VarSmall; 3],
    pub blend: [u8; 4],
    pub fov: u8,
    pub rdflags: u8,
    pub clientnum: i16,
    pub viewheight: i8,
    pub gunskin: u16,
    pub fog: PlayerFog,
    /// `damage_blend` as a colour-delta: one presence bit per channel,
    /// carried alongside (not gated by) `flags` -- see the
    /// `PlayerDeltaFlags` doc comment above.
    pub damage_blend: [u8; 4],
    pub damage_blend_bits: u8,
    pub statbits: u64,
    pub stats: [i16; STATS_COUNT],
}

/// Compute the delta needed to turn `from` into `to`. `pm_origin` and
/// `pm_velocity` have no presence bit of their own in the wire format
/// (vanilla always resends them), so they're always carried through
/// unconditionally rather than gated by a flag.
pub fn make_delta(from: &PackedPlayerState, to: &PackedPlayerState) -> PlayerStateDelta {
    let mut flags = PlayerDeltaFlags::empty();

    if to.pm_type != from.pm_type {
        flags |= PlayerDeltaFlags::PM_TYPE;
    }
    if to.pm_time != from.pm_time {
        flags |= PlayerDeltaFlags::PM_TIME;
    }
    if to.pm_flags != from.pm_flags {
        flags |= PlayerDeltaFlags::PM_FLAGS;
    }
    if to.pm_gravity != from.pm_gravity {
        flags |= PlayerDeltaFlags::PM_GRAVITY;
    }
    if to.pm_delta_angles != from.pm_delta_angles {
        flags |= PlayerDeltaFlags::PM_DELTA_ANGLES;
    }
    if to.viewoffset != from.viewoffset {
        flags |= PlayerDeltaFlags::VIEWOFFSET;
    }
    if to.kick_angles != from.kick_angles {
        flags |= PlayerDeltaFlags::KICKANGLES;
    }
    if to.gunindex != from.gunindex {
        flags |= PlayerDeltaFlags::GUNINDEX;
    }
    if to.gunframe != from.gunframe {
        flags |= PlayerDeltaFlags::GUNFRAME;
    }
    if to.gunoffset != from.gunoffset {
        flags |= PlayerDeltaFlags::GUNOFFSET;
    }
    if to.gunangles != from.gunangles {
        flags |= PlayerDeltaFlags::GUNANGLES;
    }
    if to.fov != from.fov {
        flags |= PlayerDeltaFlags::FOV;
    }
    if to.rdflags != from.rdflags {
        flags |= PlayerDeltaFlags::RDFLAGS;
    }
    if to.clientnum != from.clientnum {
        flags |= PlayerDeltaFlags::CLIENTNUM;
    }
    if to.viewheight != from.viewheight {
        flags |= PlayerDeltaFlags::VIEWHEIGHT;
    }
    if to.gunskin != from.gunskin {
        flags |= PlayerDeltaFlags::GUNSKIN;
    }
    if to.fog != from.fog {
        flags |= PlayerDeltaFlags::FOG;
    }

    let mut damage_blend_bits = 0u8;
    for i in 0..4 {
        if to.damage_blend[i] != from.damage_blend[i] {
            damage_blend_bits |= 1 << i;
        }
    }

    let mut statbits = 0u64;
    for i in 0..STATS_COUNT {
        if to.stats[i] != from.stats[i] {
            statbits |= 1 << i;
        }
    }

    PlayerStateDelta {
        flags,
        pm_type: to.pm_type,
        pm_origin: to.pm_origin,
        pm_velocity: to.pm_velocity,
        pm_time: to.pm_time,
        pm_flags: to.pm_flags,
        pm_gravity: to.pm_gravity,
        pm_delta_angles: to.pm_delta_angles,
        viewoffset: to.viewoffset,
        viewangles: to.viewangles,
        kick_angles: to.kick_angles,
        gunindex: to.gunindex,
        gunframe: to.gunframe,
        gunoffset: to.gunoffset,
        gunangles: to.gunangles,
        blend: to.blend,
        fov: to.fov,
        rdflags: to.rdflags,
        clientnum: to.clientnum,
        viewheight: to.viewheight,
        gunskin: to.gunskin,
        fog: to.fog,
        damage_blend: to.damage_blend,
        damage_blend_bits,
        statbits,
        stats: to.stats,
    }
}
