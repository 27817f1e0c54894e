// entity_wire.rs -- bit-exact read/write of an `EntityStateDelta`.
//
// Grounded directly on myq2-common/src/common.rs's
// `msg_write_delta_entity` (field write order and conditions) and
// myq2-client/src/cl_ents.rs's `cl_parse_delta` (the matching
// reader, including the old_origin default-to-`from.origin`
// behavior and event zero-suppression). Parameterized over the
// per-dialect width differences spec §4.4 calls out: whether
// `effects` may use the full 64-bit "extended" form, whether `solid`
// is the legacy 16-bit packed box or Q2PRO/Q2rePRO's 32-bit one, and
// whether origin axes use Q2PRO's variable-width "i23" delta/absolute
// coordinate (varint.rs) instead of a fixed-width tick (§4.2/§4.3
// "variant field widths").

use crate::coords::{CoordsDelta, MaybeDiffCoords, Vec3};
use crate::entity::{make_delta, EntityDeltaFlags, EntityStateDelta, PackedEntityState};
use crate::entity_bits::*;
use crate::error::Result;
use crate::io::{IoRead, IoReadExt, IoWrite, IoWriteExt};
use crate::varint::{read_i23_coord, write_i23_coord};

/// Per-dialect entity-wire width options (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct EntityWireOptions {
    /// Extended game type: effects may use its high 32 bits and
    /// alpha/scale are meaningful per-component.
    pub effects64: bool,
    /// Solid is carried as Q2PRO/Q2rePRO's 32-bit packed box rather
    /// than the legacy 16-bit one.
    pub long_solid: bool,
    /// Origin axes use Q2PRO's variable-width "i23" delta/absolute
    /// coordinate instead of a fixed 32-bit tick (Q2PRO minor >= 1024,
    /// "extended limits").
    pub i23_coords: bool,
}

impl Default for EntityWireOptions {
    fn default() -> Self {
        EntityWireOptions {
            effects64: false,
            long_solid: false,
            i23_coords: false,
        }
    }
}

/// Write one entity delta: header (entity number + U_* mask) followed
/// by the present fields, in the same order `msg_write_delta_entity`
/// emits them.
pub fn write_entity_delta(
    w: &mut dyn IoWrite,
    delta: &EntityStateDelta,
    opts: EntityWireOptions,
) -> Result<()> {
    if delta.remove {
        write_entity_header(w, U_REMOVE, delta.entity_number)?;
        return Ok(());
    }

    let coords_delta = delta.origin.delta();
    let angles_delta = delta.angles;

    let mut mask = 0u32;
    if delta.flags.contains(EntityDeltaFlags::MODELINDEX) {
        mask |= U_MODEL;
    }
    if delta.flags.contains(EntityDeltaFlags::MODELINDEX2) {
        mask |= U_MODEL2;
    }
    if delta.flags.contains(EntityDeltaFlags::MODELINDEX3) {
        mask |= U_MODEL3;
    }
    if delta.flags.contains(EntityDeltaFlags::MODELINDEX4) {
        mask |= U_MODEL4;
    }
    if delta.flags.contains(EntityDeltaFlags::FRAME) {
        mask |= if delta.frame > 0xFF { U_FRAME16 } else { U_FRAME8 };
    }
    if delta.flags.contains(EntityDeltaFlags::SKINNUM) {
        mask |= if delta.skinnum > 0xFFFF { U_SKIN8 | U_SKIN16 } else if delta.skinnum > 0xFF { U_SKIN16 } else { U_SKIN8 };
    }
    if delta.flags.contains(EntityDeltaFlags::EFFECTS) {
        mask |= U_EFFECTS8;
        if opts.effects64 && delta.flags.contains(EntityDeltaFlags::EFFECTS_MORE) {
            mask |= U_EFFECTS16;
        }
    }
    if delta.flags.contains(EntityDeltaFlags::RENDERFX) {
        mask |= if delta.renderfx > 0xFF { U_RENDERFX16 } else { U_RENDERFX8 };
    }
    if coords_delta.bits & 0b001 != 0 {
        mask |= U_ORIGIN1;
    }
    if coords_delta.bits & 0b010 != 0 {
        mask |= U_ORIGIN2;
    }
    if coords_delta.bits & 0b100 != 0 {
        mask |= U_ORIGIN3;
    }
    if angles_delta.bits & 0b001 != 0 {
        mask |= U_ANGLE1;
    }
    if angles_delta.bits & 0b010 != 0 {
        mask |= U_ANGLE2;
    }
    if angles_delta.bits & 0b100 != 0 {
        mask |= U_ANGLE3;
    }
    if delta.flags.contains(EntityDeltaFlags::OLD_ORIGIN) {
        mask |= U_OLDORIGIN;
    }
    if delta.flags.contains(EntityDeltaFlags::SOUND) {
        mask |= U_SOUND;
    }
    if delta.event != 0 {
        mask |= U_EVENT;
    }
    if delta.flags.contains(EntityDeltaFlags::SOLID) {
        mask |= U_SOLID;
    }

    write_entity_header(w, mask, delta.entity_number)?;

    if mask & (U_MODEL) != 0 {
        w.write_u8(delta.modelindex as u8)?;
    }
    if mask & U_MODEL2 != 0 {
        w.write_u8(delta.modelindex2 as u8)?;
    }
    if mask & U_MODEL3 != 0 {
        w.write_u8(delta.modelindex3 as u8)?;
    }
    if mask & U_MODEL4 != 0 {
        w.write_u8(delta.modelindex4 as u8)?;
    }
    if mask & U_FRAME8 != 0 {
        w.write_u8(delta.frame as u8)?;
    } else if mask & U_FRAME16 != 0 {
        w.write_u16(delta.frame)?;
    }
    if mask & (U_SKIN8 | U_SKIN16) == (U_SKIN8 | U_SKIN16) {
        w.write_u32(delta.skinnum)?;
    } else if mask & U_SKIN16 != 0 {
        w.write_u16(delta.skinnum as u16)?;
    } else if mask & U_SKIN8 != 0 {
        w.write_u8(delta.skinnum as u8)?;
    }
    if mask & U_EFFECTS8 != 0 {
        if mask & U_EFFECTS16 != 0 {
            w.write_u32(delta.effects as u32)?;
            w.write_u32((delta.effects >> 32) as u32)?;
        } else {
            w.write_u16(delta.effects as u16)?;
        }
    }
    if mask & U_RENDERFX8 != 0 {
        w.write_u8(delta.renderfx as u8)?;
    } else if mask & U_RENDERFX16 != 0 {
        w.write_u16(delta.renderfx as u16)?;
    }
    if mask & U_ORIGIN1 != 0 {
        write_origin_axis(w, &delta.origin, 0, opts.i23_coords)?;
    }
    if mask & U_ORIGIN2 != 0 {
        write_origin_axis(w, &delta.origin, 1, opts.i23_coords)?;
    }
    if mask & U_ORIGIN3 != 0 {
        write_origin_axis(w, &delta.origin, 2, opts.i23_coords)?;
    }
    if mask & U_ANGLE1 != 0 {
        w.write_i8(crate::valenc::angle2char(angles_delta.values[0]))?;
    }
    if mask & U_ANGLE2 != 0 {
        w.write_i8(crate::valenc::angle2char(angles_delta.values[1]))?;
    }
    if mask & U_ANGLE3 != 0 {
        w.write_i8(crate::valenc::angle2char(angles_delta.values[2]))?;
    }
    if mask & U_OLDORIGIN != 0 {
        for axis in delta.old_origin {
            w.write_i32(crate::valenc::coord2int(axis))?;
        }
    }
    if mask & U_SOUND != 0 {
        w.write_u8(delta.sound as u8)?;
    }
    if mask & U_EVENT != 0 {
        w.write_u8(delta.event)?;
    }
    if mask & U_SOLID != 0 {
        if opts.long_solid {
            w.write_u32(delta.solid)?;
        } else {
            w.write_u16(delta.solid as u16)?;
        }
    }

    Ok(())
}

fn write_origin_axis(w: &mut dyn IoWrite, origin: &MaybeDiffCoords, axis: usize, i23: bool) -> Result<()> {
    let (current, prev) = match origin {
        MaybeDiffCoords::Write { current, prev } => (current[axis], prev[axis]),
        // The writer always holds the `Write` view (see `entity::make_delta`);
        // a `Read` view here has no previous value to diff against.
        MaybeDiffCoords::Read(d) => (d.values[axis], 0.0),
    };
    if i23 {
        write_i23_coord(
            w,
            crate::valenc::coord2int(current),
            crate::valenc::coord2int(prev),
        )
    } else {
        w.write_i32(crate::valenc::coord2int(current))
    }
}

/// Read one entity delta, given the `from` packed state to apply
/// old_origin/solid defaults against (the reader has no equivalent of
/// `make_delta`'s `from`/`to` pair; it only ever sees a relative
/// update). Looks up `from` itself once the header reveals which
/// entity the delta belongs to; single-entity callers that already
/// know `from` up front can use [`read_entity_delta`] instead.
pub fn read_entity_delta_with(
    r: &mut dyn IoRead,
    mut lookup: impl FnMut(u16) -> PackedEntityState,
    opts: EntityWireOptions,
) -> Result<Option<EntityStateDelta>> {
    let (mask, number) = read_entity_header(r)?;
    if number == 0 {
        return Ok(None);
    }
    let from = lookup(number);
    let from = &from;
    read_entity_delta_body(r, mask, number, from, opts)
}

/// Read one entity delta when the caller already knows which packed
/// state it applies against (e.g. a spawn baseline, always relative
/// to the zero state).
pub fn read_entity_delta(
    r: &mut dyn IoRead,
    from: &PackedEntityState,
    opts: EntityWireOptions,
) -> Result<Option<EntityStateDelta>> {
    let (mask, number) = read_entity_header(r)?;
    if number == 0 {
        return Ok(None);
    }
    read_entity_delta_body(r, mask, number, from, opts)
}

/// Read one origin axis, returning its decoded value (in coordinate
/// units, not ticks) and whether it is an i23 delta still needing to
/// be added to the previous origin by the caller.
fn read_origin_axis(r: &mut dyn IoRead, i23: bool) -> Result<(f32, bool)> {
    if i23 {
        let (ticks, is_diff) = read_i23_coord(r)?;
        Ok((crate::valenc::int2coord(ticks), is_diff))
    } else {
        Ok((crate::valenc::int2coord(r.read_i32()?), false))
    }
}

fn read_entity_delta_body(
    r: &mut dyn IoRead,
    mask: u32,
    number: u16,
    from: &PackedEntityState,
    opts: EntityWireOptions,
) -> Result<Option<EntityStateDelta>> {
    if mask & U_REMOVE != 0 {
        return Ok(Some(EntityStateDelta {
            entity_number: number,
            flags: EntityDeltaFlags::empty(),
            remove: true,
            modelindex: 0,
            modelindex2: 0,
            modelindex3: 0,
            modelindex4: 0,
            frame: 0,
            skinnum: 0,
            effects: 0,
            renderfx: 0,
            origin: MaybeDiffCoords::Read(Default::default()),
            angles: Default::default(),
            old_origin: from.origin,
            sound: 0,
            loop_volume: 0,
            loop_attenuation: 0,
            event: 0,
            solid: from.solid,
            alpha: from.alpha,
            scale: from.scale,
        }));
    }

    let mut flags = EntityDeltaFlags::empty();
    let mut modelindex = from.modelindex;
    let mut modelindex2 = from.modelindex2;
    let mut modelindex3 = from.modelindex3;
    let mut modelindex4 = from.modelindex4;
    let mut frame = from.frame;
    let mut skinnum = from.skinnum;
    let mut effects = from.effects;
    let mut renderfx = from.renderfx;
    let mut old_origin = from.origin;
    let mut sound = from.sound;
    let mut event = 0u8;
    let mut solid = from.solid;

    if mask & U_MODEL != 0 {
        modelindex = r.read_u8()? as u16;
        flags |= EntityDeltaFlags::MODELINDEX;
    }
    if mask & U_MODEL2 != 0 {
        modelindex2 = r.read_u8()? as u16;
        flags |= EntityDeltaFlags::MODELINDEX2;
    }
    if mask & U_MODEL3 != 0 {
        modelindex3 = r.read_u8()? as u16;
        flags |= EntityDeltaFlags::MODELINDEX3;
    }
    if mask & U_MODEL4 != 0 {
        modelindex4 = r.read_u8()? as u16;
        flags |= EntityDeltaFlags::MODELINDEX4;
    }
    if mask & U_FRAME8 != 0 {
        frame = r.read_u8()? as u16;
        flags |= EntityDeltaFlags::FRAME;
    } else if mask & U_FRAME16 != 0 {
        frame = r.read_u16()?;
        flags |= EntityDeltaFlags::FRAME;
    }
    if mask & (U_SKIN8 | U_SKIN16) == (U_SKIN8 | U_SKIN16) {
        skinnum = r.read_u32()?;
        flags |= EntityDeltaFlags::SKINNUM;
    } else if mask & U_SKIN16 != 0 {
        skinnum = r.read_u16()? as u32;
        flags |= EntityDeltaFlags::SKINNUM;
    } else if mask & U_SKIN8 != 0 {
        skinnum = r.read_u8()? as u32;
        flags |= EntityDeltaFlags::SKINNUM;
    }
    if mask & U_EFFECTS8 != 0 {
        if mask & U_EFFECTS16 != 0 {
            let lo = r.read_u32()?;
            let hi = r.read_u32()?;
            effects = (lo as u64) | ((hi as u64) << 32);
            flags |= EntityDeltaFlags::EFFECTS | EntityDeltaFlags::EFFECTS_MORE;
        } else {
            effects = r.read_u16()? as u64;
            flags |= EntityDeltaFlags::EFFECTS;
        }
    }
    if mask & U_RENDERFX8 != 0 {
        renderfx = r.read_u8()? as u32;
        flags |= EntityDeltaFlags::RENDERFX;
    } else if mask & U_RENDERFX16 != 0 {
        renderfx = r.read_u16()? as u32;
        flags |= EntityDeltaFlags::RENDERFX;
    }

    let mut diff_bits = 0u8;
    let mut is_diff_bits = 0u8;
    let mut diff_values: Vec3 = [0.0; 3];
    if mask & U_ORIGIN1 != 0 {
        diff_bits |= 0b001;
        let (v, is_diff) = read_origin_axis(r, opts.i23_coords)?;
        diff_values[0] = v;
        if is_diff {
            is_diff_bits |= 0b001;
        }
    }
    if mask & U_ORIGIN2 != 0 {
        diff_bits |= 0b010;
        let (v, is_diff) = read_origin_axis(r, opts.i23_coords)?;
        diff_values[1] = v;
        if is_diff {
            is_diff_bits |= 0b010;
        }
    }
    if mask & U_ORIGIN3 != 0 {
        diff_bits |= 0b100;
        let (v, is_diff) = read_origin_axis(r, opts.i23_coords)?;
        diff_values[2] = v;
        if is_diff {
            is_diff_bits |= 0b100;
        }
    }

    let mut angle_bits = 0u8;
    let mut angle_values: Vec3 = [0.0; 3];
    if mask & U_ANGLE1 != 0 {
        angle_bits |= 0b001;
        angle_values[0] = crate::valenc::char2angle(r.read_i8()?);
    }
    if mask & U_ANGLE2 != 0 {
        angle_bits |= 0b010;
        angle_values[1] = crate::valenc::char2angle(r.read_i8()?);
    }
    if mask & U_ANGLE3 != 0 {
        angle_bits |= 0b100;
        angle_values[2] = crate::valenc::char2angle(r.read_i8()?);
    }

    if mask & U_OLDORIGIN != 0 {
        let mut v = [0.0; 3];
        for axis in v.iter_mut() {
            *axis = crate::valenc::int2coord(r.read_i32()?);
        }
        old_origin = v;
        flags |= EntityDeltaFlags::OLD_ORIGIN;
    }
    if mask & U_SOUND != 0 {
        sound = r.read_u8()? as u16;
        flags |= EntityDeltaFlags::SOUND;
    }
    if mask & U_EVENT != 0 {
        event = r.read_u8()?;
    }
    if mask & U_SOLID != 0 {
        solid = if opts.long_solid {
            r.read_u32()?
        } else {
            r.read_u16()? as u32
        };
        flags |= EntityDeltaFlags::SOLID;
    }

    Ok(Some(EntityStateDelta {
        entity_number: number,
        flags,
        remove: false,
        modelindex,
        modelindex2,
        modelindex3,
        modelindex4,
        frame,
        skinnum,
        effects,
        renderfx,
        origin: MaybeDiffCoords::Read(CoordsDelta {
            bits: diff_bits,
            values: diff_values,
            is_diff: is_diff_bits,
        }),
        angles: crate::coords::AnglesDelta {
            bits: angle_bits,
            values: angle_values,
            is_diff: 0,
        },
        old_origin,
        sound,
        loop_volume: from.loop_volume,
        loop_attenuation: from.loop_attenuation,
        event,
        solid,
        alpha: from.alpha,
        scale: from.scale,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ByteBuf;

    #[test]
    fn roundtrip_frame_and_model_change() {
        let from = PackedEntityState::default();
        let to = PackedEntityState {
            modelindex: 5,
            frame: 12,
            ..PackedEntityState::default()
        };
        let delta = make_delta(9, &from, &to);

        let mut buf = ByteBuf::new();
        write_entity_delta(&mut buf, &delta, EntityWireOptions::default()).unwrap();

        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_entity_delta(&mut r, &from, EntityWireOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(read_back.entity_number, 9);
        assert_eq!(read_back.modelindex, 5);
        assert_eq!(read_back.frame, 12);
    }

    #[test]
    fn roundtrip_origin_change_is_lossless_at_eighth_unit() {
        let from = PackedEntityState::default();
        let to = PackedEntityState {
            origin: [8.0, -16.0, 0.0],
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);

        let mut buf = ByteBuf::new();
        write_entity_delta(&mut buf, &delta, EntityWireOptions::default()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_entity_delta(&mut r, &from, EntityWireOptions::default())
            .unwrap()
            .unwrap();
        let resolved = read_back.origin.resolve(from.origin);
        assert_eq!(resolved, to.origin);
    }

    #[test]
    fn origin_change_replaces_rather_than_accumulates_from_nonzero_base() {
        // Classic (non-i23) origin fields are absolute resends, not
        // running deltas -- resolving against a non-zero `from` must
        // land on `to` exactly, not `from + (to - 0)`.
        let from = PackedEntityState {
            origin: [100.0, 200.0, 300.0],
            ..PackedEntityState::default()
        };
        let to = PackedEntityState {
            origin: [108.0, 200.0, 296.0],
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);

        let mut buf = ByteBuf::new();
        write_entity_delta(&mut buf, &delta, EntityWireOptions::default()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_entity_delta(&mut r, &from, EntityWireOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(read_back.origin.resolve(from.origin), to.origin);
    }

    #[test]
    fn i23_small_origin_step_roundtrips_as_two_byte_delta() {
        let opts = EntityWireOptions {
            i23_coords: true,
            ..Default::default()
        };
        let from = PackedEntityState {
            origin: [1000.0, -500.0, 0.0],
            ..PackedEntityState::default()
        };
        let to = PackedEntityState {
            origin: [1008.0, -500.0, 16.0],
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);

        let mut buf = ByteBuf::new();
        write_entity_delta(&mut buf, &delta, opts).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_entity_delta(&mut r, &from, opts).unwrap().unwrap();
        assert_eq!(read_back.origin.resolve(from.origin), to.origin);
    }

    #[test]
    fn i23_large_origin_jump_roundtrips_as_absolute_value() {
        let opts = EntityWireOptions {
            i23_coords: true,
            ..Default::default()
        };
        let from = PackedEntityState::default();
        let to = PackedEntityState {
            origin: [30000.0, 0.0, 0.0],
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);

        let mut buf = ByteBuf::new();
        write_entity_delta(&mut buf, &delta, opts).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_entity_delta(&mut r, &from, opts).unwrap().unwrap();
        assert_eq!(read_back.origin.resolve(from.origin), to.origin);
    }

    #[test]
    fn end_of_list_returns_none() {
        let mut buf = ByteBuf::new();
        buf.write_u8(0).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let from = PackedEntityState::default();
        assert!(read_entity_delta(&mut r, &from, EntityWireOptions::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn wide_effects_requires_effects64_option() {
        let from = PackedEntityState::default();
        let to = PackedEntityState {
            effects: 0x1_0000,
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);

        let mut buf = ByteBuf::new();
        let opts = EntityWireOptions {
            effects64: true,
            ..Default::default()
        };
        write_entity_delta(&mut buf, &delta, opts).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_entity_delta(&mut r, &from, opts).unwrap().unwrap();
        assert_eq!(read_back.effects, 0x1_0000);
    }

    #[test]
    fn event_is_written_but_never_carried_forward() {
        let from = PackedEntityState::default();
        let to = PackedEntityState {
            event: 5,
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);
        let mut buf = ByteBuf::new();
        write_entity_delta(&mut buf, &delta, EntityWireOptions::default()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let read_back = read_entity_delta(&mut r, &from, EntityWireOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(read_back.event, 5);
    }

    #[test]
    fn remove_header_roundtrips_without_fields() {
        let mut buf = ByteBuf::new();
        let delta = EntityStateDelta {
            entity_number: 3,
            flags: EntityDeltaFlags::empty(),
            remove: true,
            modelindex: 0,
            modelindex2: 0,
            modelindex3: 0,
            modelindex4: 0,
            frame: 0,
            skinnum: 0,
            effects: 0,
            renderfx: 0,
            origin: MaybeDiffCoords::Read(Default::default()),
            angles: Default::default(),
            old_origin: [0.0; 3],
            sound: 0,
            loop_volume: 0,
            loop_attenuation: 0,
            event: 0,
            solid: 0,
            alpha: 0,
            scale: 0,
        };
        write_entity_delta(&mut buf, &delta, EntityWireOptions::default()).unwrap();
        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        let from = PackedEntityState::default();
        let read_back = read_entity_delta(&mut r, &from, EntityWireOptions::default())
            .unwrap()
            .unwrap();
        assert!(read_back.remove);
        assert_eq!(read_back.entity_number, 3);
    }
}
