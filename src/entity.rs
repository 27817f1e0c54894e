// entity.rs -- packed entity state and its delta, dialect-agnostic.
//
// Grounded on original_source/inc/q2proto/q2proto_struct_svc.h's
// `q2proto_entity_state_delta_flags` enum and
// `q2proto_entity_state_delta_t` struct, and
// q2proto_packing.h's `q2proto_packed_entity_state_t`. The delta-bits
// enum is modeled with `bitflags` the way myq2-common models its own
// `*_flags` enums (e.g. `NetAdrType`/`SurfaceFlags`-style bit enums),
// and `make_delta` is a pure function over two packed states rather
// than a method on a connection, mirroring `msg_write_delta_entity`
// which likewise takes `from`/`to` structs with no connection state.

use crate::coords::{AnglesDelta, MaybeDiffCoords, Vec3};
use bitflags::bitflags;

bitflags! {
    /// Presence bits for `EntityStateDelta` fields. Exact values match
    /// `q2proto_entity_state_delta_flags` so dialect wire masks line
    /// up with this crate's field-presence mask without translation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntityDeltaFlags: u32 {
        const MODELINDEX      = 0x0000_0001;
        const MODELINDEX2     = 0x0000_0002;
        const MODELINDEX3     = 0x0000_0004;
        const MODELINDEX4     = 0x0000_0008;
        const FRAME           = 0x0000_0010;
        const SKINNUM         = 0x0000_0020;
        const EFFECTS         = 0x0000_0040;
        const EFFECTS_MORE    = 0x0000_0080;
        const RENDERFX        = 0x0000_0100;
        const OLD_ORIGIN      = 0x0000_0200;
        const SOUND           = 0x0000_0400;
        const LOOP_ATTENUATION= 0x0000_0800;
        const LOOP_VOLUME     = 0x0000_1000;
        const EVENT           = 0x0000_2000;
        const SOLID           = 0x0000_4000;
        const ALPHA           = 0x0000_8000;
        const SCALE           = 0x0001_0000;
    }
}

/// A dialect-agnostic, fully decoded/quantized entity state. Exactly
/// the field set of `q2proto_packed_entity_state_t`: already at the
/// wire's numeric precision, so that delta computation never needs to
/// re-open the quantization question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedEntityState {
    pub modelindex: u16,
    pub modelindex2: u16,
    pub modelindex3: u16,
    pub modelindex4: u16,
    pub frame: u16,
    pub skinnum: u32,
    pub effects: u64,
    pub renderfx: u32,
    pub origin: Vec3,
    pub angles: Vec3,
    pub old_origin: Vec3,
    pub sound: u16,
    pub loop_volume: u8,
    pub loop_attenuation: u8,
    pub event: u8,
    pub solid: u32,
    pub alpha: u8,
    pub scale: u8,
}

impl Default for PackedEntityState {
    fn default() -> Self {
        PackedEntityState {
            modelindex: 0,
            modelindex2: 0,
            modelindex3: 0,
            modelindex4: 0,
            frame: 0,
            skinnum: 0,
            effects: 0,
            renderfx: 0,
            origin: [0.0; 3],
            angles: [0.0; 3],
            old_origin: [0.0; 3],
            sound: 0,
            loop_volume: 0,
            loop_attenuation: 0,
            event: 0,
            solid: 0,
            alpha: 0,
            scale: 0,
        }
    }
}

/// The wire-ready delta between two `PackedEntityState`s: a presence
/// mask plus only the fields that changed. `origin` is carried as a
/// `MaybeDiffCoords` since, unlike every other field, its wire
/// encoding differs between "decode a relative delta" and "encode
/// from two known absolutes" (see coords.rs).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityStateDelta {
    pub entity_number: u16,
    pub flags: EntityDeltaFlags,
    pub remove: bool,
    pub modelindex: u16,
    pub modelindex2: u16,
    pub modelindex3: u16,
    pub modelindex4: u16,
    pub frame: u16,
    pub skinnum: u32,
    pub effects: u64,
    pub renderfx: u32,
    pub origin: MaybeDiffCoords,
    pub angles: AnglesDelta,
    pub old_origin: Vec3,
    pub sound: u16,
    pub loop_volume: u8,
    pub loop_attenuation: u8,
    pub event: u8,
    pub solid: u32,
    pub alpha: u8,
    pub scale: u8,
}

/// Compute the delta needed to turn `from` into `to`, setting a flag
/// (and carrying the new value) for each field that changed. Mirrors
/// `msg_write_delta_entity`'s field-by-field comparison, minus the
/// actual byte writing, which belongs to the dialect layer.
pub fn make_delta(entity_number: u16, from: &PackedEntityState, to: &PackedEntityState) -> EntityStateDelta {
    let mut flags = EntityDeltaFlags::empty();

    if to.modelindex != from.modelindex {
        flags |= EntityDeltaFlags::MODELINDEX;
    }
    if to.modelindex2 != from.modelindex2 {
        flags |= EntityDeltaFlags::MODELINDEX2;
    }
    if to.modelindex3 != from.modelindex3 {
        flags |= EntityDeltaFlags::MODELINDEX3;
    }
    if to.modelindex4 != from.modelindex4 {
        flags |= EntityDeltaFlags::MODELINDEX4;
    }
    if to.frame != from.frame {
        flags |= EntityDeltaFlags::FRAME;
    }
    if to.skinnum != from.skinnum {
        flags |= EntityDeltaFlags::SKINNUM;
    }
    if to.effects != from.effects {
        flags |= EntityDeltaFlags::EFFECTS;
        if to.effects > 0xFFFF {
            flags |= EntityDeltaFlags::EFFECTS_MORE;
        }
    }
    if to.renderfx != from.renderfx {
        flags |= EntityDeltaFlags::RENDERFX;
    }
    if to.old_origin != from.old_origin {
        flags |= EntityDeltaFlags::OLD_ORIGIN;
    }
    if to.sound != from.sound {
        flags |= EntityDeltaFlags::SOUND;
    }
    if to.loop_attenuation != from.loop_attenuation {
        flags |= EntityDeltaFlags::LOOP_ATTENUATION;
    }
    if to.loop_volume != from.loop_volume {
        flags |= EntityDeltaFlags::LOOP_VOLUME;
    }
    if to.event != 0 {
        flags |= EntityDeltaFlags::EVENT;
    }
    if to.solid != from.solid {
        flags |= EntityDeltaFlags::SOLID;
    }
    if to.alpha != from.alpha {
        flags |= EntityDeltaFlags::ALPHA;
    }
    if to.scale != from.scale {
        flags |= EntityDeltaFlags::SCALE;
    }

    EntityStateDelta {
        entity_number,
        flags,
        remove: false,
        modelindex: to.modelindex,
        modelindex2: to.modelindex2,
        modelindex3: to.modelindex3,
        modelindex4: to.modelindex4,
        frame: to.frame,
        skinnum: to.skinnum,
        effects: to.effects,
        renderfx: to.renderfx,
        origin: MaybeDiffCoords::Write {
            prev: from.origin,
            current: to.origin,
        },
        angles: AnglesDelta::make(from.angles, to.angles),
        old_origin: to.old_origin,
        sound: to.sound,
        loop_volume: to.loop_volume,
        loop_attenuation: to.loop_attenuation,
        event: if to.event != 0 { to.event } else { 0 },
        solid: to.solid,
        alpha: to.alpha,
        scale: to.scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_states_produce_empty_delta() {
        let s = PackedEntityState::default();
        let delta = make_delta(1, &s, &s);
        assert!(delta.flags.is_empty());
        assert!(!delta.remove);
    }

    #[test]
    fn frame_change_sets_frame_flag_only() {
        let from = PackedEntityState::default();
        let to = PackedEntityState {
            frame: 7,
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);
        assert_eq!(delta.flags, EntityDeltaFlags::FRAME);
        assert_eq!(delta.frame, 7);
    }

    #[test]
    fn wide_effects_sets_effects_more() {
        let from = PackedEntityState::default();
        let to = PackedEntityState {
            effects: 0x1_0000,
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);
        assert!(delta.flags.contains(EntityDeltaFlags::EFFECTS));
        assert!(delta.flags.contains(EntityDeltaFlags::EFFECTS_MORE));
    }

    #[test]
    fn event_is_never_sticky() {
        let from = PackedEntityState {
            event: 3,
            ..PackedEntityState::default()
        };
        let to = PackedEntityState::default();
        let delta = make_delta(1, &from, &to);
        assert!(!delta.flags.contains(EntityDeltaFlags::EVENT));
        assert_eq!(delta.event, 0);
    }

    #[test]
    fn origin_change_is_a_write_side_maybe_diff() {
        let from = PackedEntityState {
            origin: [0.0, 0.0, 0.0],
            ..PackedEntityState::default()
        };
        let to = PackedEntityState {
            origin: [10.0, 0.0, 0.0],
            ..PackedEntityState::default()
        };
        let delta = make_delta(1, &from, &to);
        assert_eq!(delta.origin.delta().bits, 0b001);
    }
}
