// player_wire.rs -- bit-exact read/write of a `PlayerStateDelta`.
//
// Field layout grounded on
// original_source/inc/q2proto/q2proto_struct_svc.h's
// `q2proto_svc_playerstate_t`/`q2proto_playerstate_delta_flags`;
// write-order style (presence mask, then fields in ascending flag-bit
// order, stat mask last) follows the same convention
// `msg_write_delta_entity` uses for entity deltas (entity_wire.rs).

use crate::coords::VarSmall;
use crate::error::Result;
use crate::io::{IoRead, IoReadExt, IoWrite, IoWriteExt};
use crate::playerstate::{PackedPlayerState, PlayerDeltaFlags, PlayerFog, PlayerStateDelta, STATS_COUNT};

/// Per-dialect knobs for the player-state wire codec, mirroring
/// `EntityWireOptions` (entity_wire.rs). Unlike the entity codec, the
/// vanilla/R1Q2 player-state layout took no such options before this;
/// every dialect-varying field below now gates on one of these instead
/// of being hardcoded to the vanilla encoding.
#[derive(Debug, Clone, Copy)]
pub struct PlayerWireOptions {
    /// Q2rePRO: viewoffset/kick_angles/gunoffset/gunangles are sent as
    /// full 16-bit `VarSmall::Short` instead of the 8-bit quarter-unit
    /// `VarSmall::Char` every other dialect uses.
    pub small16: bool,
    /// Q2PRO (extended-limits)/Q2rePRO: resend `damage_blend` as a
    /// colour-delta alongside the mandatory `blend`. No top-level
    /// `PlayerDeltaFlags` bit gates this -- see the flags doc comment
    /// in playerstate.rs.
    pub damage_blend: bool,
    /// Q2PRO/Q2rePRO: player-state carries its own `clientnum`,
    /// distinct from `Frame::clientnum` (message_wire.rs).
    pub clientnum_in_playerstate: bool,
    /// Q2rePRO rerelease extras: `viewheight`, the gunindex/gunskin
    /// pair's `gunskin` half, and `fog`.
    pub rerelease_extras: bool,
}

impl Default for PlayerWireOptions {
    fn default() -> Self {
        PlayerWireOptions {
            small16: false,
            damage_blend: false,
            clientnum_in_playerstate: false,
            rerelease_extras: false,
        }
    }
}

/// Write one player-state delta: presence mask, then fields, then the
/// per-index stat mask and changed stat values.
pub fn write_player_delta(w: &mut dyn IoWrite, delta: &PlayerStateDelta, opts: PlayerWireOptions) -> Result<()> {
    w.write_u32(delta.flags.bits())?;

    if delta.flags.contains(PlayerDeltaFlags::PM_TYPE) {
        w.write_u8(delta.pm_type)?;
    }
    for axis in delta.pm_origin {
        w.write_i32(axis)?;
    }
    for axis in delta.pm_velocity {
        w.write_i32(axis)?;
    }
    if delta.flags.contains(PlayerDeltaFlags::PM_TIME) {
        w.write_u16(delta.pm_time)?;
    }
    if delta.flags.contains(PlayerDeltaFlags::PM_FLAGS) {
        w.write_u16(delta.pm_flags)?;
    }
    if delta.flags.contains(PlayerDeltaFlags::PM_GRAVITY) {
        w.write_i16(delta.pm_gravity)?;
    }
    if delta.flags.contains(PlayerDeltaFlags::PM_DELTA_ANGLES) {
        for a in delta.pm_delta_angles {
            w.write_i16(a)?;
        }
    }
    if delta.flags.contains(PlayerDeltaFlags::VIEWOFFSET) {
        for v in delta.viewoffset {
            write_small(w, v, opts.small16)?;
        }
    }
    for a in delta.viewangles {
        w.write_i16(a)?;
    }
    if delta.flags.contains(PlayerDeltaFlags::KICKANGLES) {
        for v in delta.kick_angles {
            write_small(w, v, opts.small16)?;
        }
    }
    if delta.flags.intersects(PlayerDeltaFlags::GUNINDEX | PlayerDeltaFlags::GUNSKIN) {
        w.write_u16(delta.gunindex)?;
        if opts.rerelease_extras {
            w.write_u16(delta.gunskin)?;
        }
    }
    if delta.flags.contains(PlayerDeltaFlags::GUNFRAME) {
        w.write_u8(delta.gunframe)?;
    }
    if delta.flags.contains(PlayerDeltaFlags::GUNOFFSET) {
        for v in delta.gunoffset {
            write_small(w, v, opts.small16)?;
        }
    }
    if delta.flags.contains(PlayerDeltaFlags::GUNANGLES) {
        for v in delta.gunangles {
            write_small(w, v, opts.small16)?;
        }
    }
    for b in delta.blend {
        w.write_u8(b)?;
    }
    if opts.damage_blend {
        w.write_u8(delta.damage_blend_bits)?;
        for i in 0..4 {
            if delta.damage_blend_bits & (1 << i) != 0 {
                w.write_u8(delta.damage_blend[i])?;
            }
        }
    }
    if delta.flags.contains(PlayerDeltaFlags::FOV) {
        w.write_u8(delta.fov)?;
    }
    if delta.flags.contains(PlayerDeltaFlags::RDFLAGS) {
        w.write_u8(delta.rdflags)?;
    }
    if delta.flags.contains(PlayerDeltaFlags::CLIENTNUM) && opts.clientnum_in_playerstate {
        w.write_i16(delta.clientnum)?;
    }
    if opts.rerelease_extras {
        if delta.flags.contains(PlayerDeltaFlags::VIEWHEIGHT) {
            w.write_i8(delta.viewheight)?;
        }
        if delta.flags.contains(PlayerDeltaFlags::FOG) {
            for c in delta.fog.color {
                w.write_u8(c)?;
            }
            w.write_u8(delta.fog.density)?;
        }
    }

    w.write_u32(delta.statbits as u32)?;
    w.write_u32((delta.statbits >> 32) as u32)?;
    for i in 0..STATS_COUNT {
        if delta.statbits & (1 << i) != 0 {
            w.write_i16(delta.stats[i])?;
        }
    }
    Ok(())
}

fn write_small(w: &mut dyn IoWrite, v: VarSmall, small16: bool) -> Result<()> {
    if small16 {
        w.write_i16(v.as_short())
    } else {
        w.write_i8(v.as_char())
    }
}

fn read_small(r: &mut dyn IoRead, small16: bool) -> Result<VarSmall> {
    if small16 {
        Ok(VarSmall::Short(r.read_i16()?))
    } else {
        Ok(VarSmall::Char(r.read_i8()?))
    }
}

/// Read one player-state delta, applying unconditional fields
/// (pm_origin, pm_velocity, viewangles, blend) against `from` for the
/// fields that have no presence bit of their own.
pub fn read_player_delta(r: &mut dyn IoRead, from: &PackedPlayerState, opts: PlayerWireOptions) -> Result<PlayerStateDelta> {
    let flags = PlayerDeltaFlags::from_bits_truncate(r.read_u32()?);

    let pm_type = if flags.contains(PlayerDeltaFlags::PM_TYPE) {
        r.read_u8()?
    } else {
        from.pm_type
    };

    let mut pm_origin = [0i32; 3];
    for axis in pm_origin.iter_mut() {
        *axis = r.read_i32()?;
    }
    let mut pm_velocity = [0i32; 3];
    for axis in pm_velocity.iter_mut() {
        *axis = r.read_i32()?;
    }

    let pm_time = if flags.contains(PlayerDeltaFlags::PM_TIME) {
        r.read_u16()?
    } else {
        from.pm_time
    };
    let pm_flags = if flags.contains(PlayerDeltaFlags::PM_FLAGS) {
        r.read_u16()?
    } else {
        from.pm_flags
    };
    let pm_gravity = if flags.contains(PlayerDeltaFlags::PM_GRAVITY) {
        r.read_i16()?
    } else {
        from.pm_gravity
    };
    let pm_delta_angles = if flags.contains(PlayerDeltaFlags::PM_DELTA_ANGLES) {
        let mut a = [0i16; 3];
        for x in a.iter_mut() {
            *x = r.read_i16()?;
        }
        a
    } else {
        from.pm_delta_angles
    };
    let viewoffset = if flags.contains(PlayerDeltaFlags::VIEWOFFSET) {
        let mut v = [VarSmall::Char(0); 3];
        for x in v.iter_mut() {
            *x = read_small(r, opts.small16)?;
        }
        v
    } else {
        from.viewoffset
    };

    let mut viewangles = [0i16; 3];
    for a in viewangles.iter_mut() {
        *a = r.read_i16()?;
    }

    let kick_angles = if flags.contains(PlayerDeltaFlags::KICKANGLES) {
        let mut v = [VarSmall::Char(0); 3];
        for x in v.iter_mut() {
            *x = read_small(r, opts.small16)?;
        }
        v
    } else {
        from.kick_angles
    };
    let (gunindex, gunskin) = if flags.intersects(PlayerDeltaFlags::GUNINDEX | PlayerDeltaFlags::GUNSKIN) {
        let gunindex = r.read_u16()?;
        let gunskin = if opts.rerelease_extras { r.read_u16()? } else { from.gunskin };
        (gunindex, gunskin)
    } else {
        (from.gunindex, from.gunskin)
    };
    let gunframe = if flags.contains(PlayerDeltaFlags::GUNFRAME) {
        r.read_u8()?
    } else {
        from.gunframe
    };
    let gunoffset = if flags.contains(PlayerDeltaFlags::GUNOFFSET) {
        let mut v = [VarSmall::Char(0); 3];
        for x in v.iter_mut() {
            *x = read_small(r, opts.small16)?;
        }
        v
    } else {
        from.gunoffset
    };
    let gunangles = if flags.contains(PlayerDeltaFlags::GUNANGLES) {
        let mut v = [VarSmall::Char(0); 3];
        for x in v.iter_mut() {
            *x = read_small(r, opts.small16)?;
        }
        v
    } else {
        from.gunangles
    };

    let mut blend = [0u8; 4];
    for b in blend.iter_mut() {
        *b = r.read_u8()?;
    }

    let mut damage_blend = from.damage_blend;
    let mut damage_blend_bits = 0u8;
    if opts.damage_blend {
        damage_blend_bits = r.read_u8()?;
        for i in 0..4 {
            if damage_blend_bits & (1 << i) != 0 {
                damage_blend[i] = r.read_u8()?;
            }
        }
    }

    let fov = if flags.contains(PlayerDeltaFlags::FOV) {
        r.read_u8()?
    } else {
        from.fov
    };
    let rdflags = if flags.contains(PlayerDeltaFlags::RDFLAGS) {
        r.read_u8()?
    } else {
        from.rdflags
    };
    let clientnum = if flags.contains(PlayerDeltaFlags::CLIENTNUM) && opts.clientnum_in_playerstate {
        r.read_i16()?
    } else {
        from.clientnum
    };

    let mut viewheight = from.viewheight;
    let mut fog = from.fog;
    if opts.rerelease_extras {
        if flags.contains(PlayerDeltaFlags::VIEWHEIGHT) {
            viewheight = r.read_i8()?;
        }
        if flags.contains(PlayerDeltaFlags::FOG) {
            let mut color = [0u8; 3];
            for c in color.iter_mut() {
                *c = r.read_u8()?;
            }
            let density = r.read_u8()?;
            fog = PlayerFog { color, density };
        }
    }

    let lo = r.read_u32()? as u64;
    let hi = r.read_u32()? as u64;
    let statbits = lo | (hi << 32);
    let mut stats = from.stats;
    for i in 0..STATS_COUNT {
        if statbits & (1 << i) != 0 {
            stats[i] = r.read_i16()?;
        }
    }

    Ok(PlayerStateDelta {
        flags,
        pm_type,
        pm_origin,
        pm_velocity,
        pm_time,
        pm_flags,
        pm_gravity,
        pm_delta_angles,
        viewoffset,
        viewangles,
        kick_angles,
        gunindex,
        gunframe,
        gunoffset,
        gunangles,
        blend,
        fov,
        rdflags,
        clientnum,
        viewheight,
        gunskin,
        fog,
        damage_blend,
        damage_blend_bits,
        statbits,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ByteBuf;
    use crate::playerstate::make_delta;

    #[test]
    fn roundtrip_gunframe_and_stat_change() {
        let from = PackedPlayerState::default();
        let mut to = PackedPlayerState::default();
        to.gunframe = 7;
        to.stats[3] = 42;
        let delta = make_delta(&from, &to);

        let mut buf = ByteBuf::new();
        write_player_delta(&mut buf, &delta, PlayerWireOptions::default()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_player_delta(&mut r, &from, PlayerWireOptions::default()).unwrap();

        assert_eq!(read_back.gunframe, 7);
        assert_eq!(read_back.stats[3], 42);
        assert_eq!(read_back.statbits, 1 << 3);
    }

    #[test]
    fn unset_fields_inherit_from_from_state() {
        let mut from = PackedPlayerState::default();
        from.pm_type = 2;
        from.fov = 90;
        let to = from.clone();
        let delta = make_delta(&from, &to);

        let mut buf = ByteBuf::new();
        write_player_delta(&mut buf, &delta, PlayerWireOptions::default()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_player_delta(&mut r, &from, PlayerWireOptions::default()).unwrap();

        assert_eq!(read_back.pm_type, 2);
        assert_eq!(read_back.fov, 90);
    }

    fn q2repro_opts() -> PlayerWireOptions {
        PlayerWireOptions {
            small16: true,
            damage_blend: true,
            clientnum_in_playerstate: true,
            rerelease_extras: true,
        }
    }

    #[test]
    fn q2repro_roundtrips_clientnum_viewheight_gunskin_fog_damage_blend() {
        let from = PackedPlayerState::default();
        let to = PackedPlayerState {
            clientnum: 5,
            viewheight: -3,
            gunskin: 2,
            gunindex: 11,
            fog: PlayerFog { color: [10, 20, 30], density: 4 },
            damage_blend: [1, 2, 3, 4],
            ..PackedPlayerState::default()
        };
        let delta = make_delta(&from, &to);

        let mut buf = ByteBuf::new();
        write_player_delta(&mut buf, &delta, q2repro_opts()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_player_delta(&mut r, &from, q2repro_opts()).unwrap();

        assert_eq!(read_back.clientnum, 5);
        assert_eq!(read_back.viewheight, -3);
        assert_eq!(read_back.gunindex, 11);
        assert_eq!(read_back.gunskin, 2);
        assert_eq!(read_back.fog, PlayerFog { color: [10, 20, 30], density: 4 });
        assert_eq!(read_back.damage_blend, [1, 2, 3, 4]);
    }

    #[test]
    fn gunindex_alone_still_carries_gunskin_when_rerelease_extras() {
        let from = PackedPlayerState::default();
        let to = PackedPlayerState {
            gunindex: 9,
            ..PackedPlayerState::default()
        };
        let delta = make_delta(&from, &to);

        let mut buf = ByteBuf::new();
        write_player_delta(&mut buf, &delta, q2repro_opts()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_player_delta(&mut r, &from, q2repro_opts()).unwrap();

        assert_eq!(read_back.gunindex, 9);
        assert_eq!(read_back.gunskin, from.gunskin);
    }

    #[test]
    fn viewoffset_uses_16bit_when_small16() {
        use crate::coords::VarSmall;

        let from = PackedPlayerState::default();
        let mut to = PackedPlayerState::default();
        to.viewoffset = [VarSmall::Short(1000), VarSmall::Short(-2000), VarSmall::Short(3000)];
        let delta = make_delta(&from, &to);

        let mut buf = ByteBuf::new();
        write_player_delta(&mut buf, &delta, q2repro_opts()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_player_delta(&mut r, &from, q2repro_opts()).unwrap();

        assert_eq!(read_back.viewoffset[0].as_short(), 1000);
        assert_eq!(read_back.viewoffset[1].as_short(), -2000);
        assert_eq!(read_back.viewoffset[2].as_short(), 3000);
    }
}
