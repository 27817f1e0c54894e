// coords.rs -- variant scalar types for coordinates, angles, small
// offsets/angles and colors, plus their delta/maybe-diff wrappers.
//
// Grounded on original_source/inc/q2proto/q2proto_coords.h. The C
// header builds these with a `_GENERATE_VARIANT_FUNCTIONS` macro that
// stamps out a float/int/short getter+setter pair per component; here
// that becomes a small enum that remembers which representation it
// was constructed from and converts through valenc.rs on demand,
// which is the same "remembers its own wire width" idea the header
// encodes through its tagged union members.

use crate::valenc::{
    angle2char, angle2short, blend2byte, byte2blend, char2angle, char2small, coord2int,
    int2coord, short2angle, small2char,
};

/// A single coordinate component, tagged by the wire width it was
/// last encoded/decoded at. `Float` values round-trip exactly;
/// `Int`/`Short` values are lossy in the direction their name implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarCoord {
    Float(f32),
    /// 1/8-unit integer tick (vanilla/R1Q2 wire format).
    Int(i32),
    /// Unscaled 32-bit integer (Q2rePRO full-precision wire format).
    IntUnscaled(i32),
    /// Unscaled 16-bit integer (Q2rePRO compact wire format).
    ShortUnscaled(i16),
}

impl VarCoord {
    pub fn get(self) -> f32 {
        match self {
            VarCoord::Float(v) => v,
            VarCoord::Int(v) => int2coord(v),
            VarCoord::IntUnscaled(v) => v as f32,
            VarCoord::ShortUnscaled(v) => v as f32,
        }
    }

    pub fn as_int(self) -> i32 {
        match self {
            VarCoord::Int(v) => v,
            other => coord2int(other.get()),
        }
    }

    pub fn as_int_unscaled(self) -> i32 {
        match self {
            VarCoord::IntUnscaled(v) => v,
            other => other.get() as i32,
        }
    }

    pub fn as_short_unscaled(self) -> i16 {
        match self {
            VarCoord::ShortUnscaled(v) => v,
            other => other.get() as i16,
        }
    }
}

/// A single angle component, analogous to `VarCoord`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarAngle {
    Float(f32),
    /// 16-bit "short angle" (most dialects).
    Short(i16),
    /// 8-bit "char angle" (compact wire format, e.g. delta_angles).
    Char(i8),
}

impl VarAngle {
    pub fn get(self) -> f32 {
        match self {
            VarAngle::Float(v) => v,
            VarAngle::Short(v) => short2angle(v),
            VarAngle::Char(v) => char2angle(v),
        }
    }

    pub fn as_short(self) -> i16 {
        match self {
            VarAngle::Short(v) => v,
            other => angle2short(other.get()),
        }
    }

    pub fn as_char(self) -> i8 {
        match self {
            VarAngle::Char(v) => v,
            other => angle2char(other.get()),
        }
    }
}

/// Small offset/angle component (viewoffset, kick_angles, gunoffset,
/// gunangles): a narrow quarter-unit quantity, optionally carried at
/// full 16-bit precision by Q2rePRO.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarSmall {
    Float(f32),
    /// 8-bit quarter-unit representation (most dialects).
    Char(i8),
    /// Full-precision 16-bit representation (Q2rePRO viewoffset/
    /// gunoffset/kick_angles/gunangles).
    Short(i16),
}

impl VarSmall {
    pub fn get(self) -> f32 {
        match self {
            VarSmall::Float(v) => v,
            VarSmall::Char(v) => char2small(v),
            VarSmall::Short(v) => v as f32 * (1.0 / 256.0),
        }
    }

    pub fn as_char(self) -> i8 {
        match self {
            VarSmall::Char(v) => v,
            other => small2char(other.get()),
        }
    }

    pub fn as_short(self) -> i16 {
        match self {
            VarSmall::Short(v) => v,
            other => (other.get() * 256.0) as i16,
        }
    }
}

/// Blend/color component (screen blend, damage blend).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarColor {
    Float(f32),
    Byte(u8),
}

impl VarColor {
    pub fn get(self) -> f32 {
        match self {
            VarColor::Float(v) => v,
            VarColor::Byte(v) => byte2blend(v),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            VarColor::Byte(v) => v,
            other => blend2byte(other.get()),
        }
    }
}

/// A 3-component vector of plain floats, the form most call sites
/// consume once decoded.
pub type Vec3 = [f32; 3];

/// A 3-component coordinate delta: per-axis presence bits plus the
/// values for the axes that changed. Mirrors
/// `q2proto_coords_delta_t`'s `Q2PROTO_SET_COORDS_DELTA` /
/// `APPLY_COORDS_DELTA` macro pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoordsDelta {
    pub bits: u8,
    pub values: Vec3,
    /// Per-axis: when the corresponding `bits` bit is set, whether
    /// `values[i]` is an additive difference from the base (Q2PRO's
    /// i23 delta form) rather than the absolute replacement value
    /// every other wire form sends. Mirrors `q2proto_maybe_diff_coords_t`'s
    /// `read.diff_bits`.
    pub is_diff: u8,
}

impl CoordsDelta {
    /// Compute the delta between `from` and `to`, setting a bit for
    /// each axis that differs. Always an absolute (non-i23) delta;
    /// i23-encoded deltas are constructed directly by the wire reader.
    pub fn make(from: Vec3, to: Vec3) -> CoordsDelta {
        let mut bits = 0u8;
        let mut values = [0.0; 3];
        for i in 0..3 {
            if from[i] != to[i] {
                bits |= 1 << i;
                values[i] = to[i];
            }
        }
        CoordsDelta {
            bits,
            values,
            is_diff: 0,
        }
    }

    /// Apply this delta on top of `base`, returning the resulting
    /// vector. Axes with no bit set keep `base`'s value; axes marked
    /// in `is_diff` are added to `base` rather than replacing it.
    pub fn apply(&self, base: Vec3) -> Vec3 {
        let mut out = base;
        for i in 0..3 {
            if self.bits & (1 << i) != 0 {
                if self.is_diff & (1 << i) != 0 {
                    out[i] += self.values[i];
                } else {
                    out[i] = self.values[i];
                }
            }
        }
        out
    }
}

/// An angles delta, identical in shape to `CoordsDelta`.
pub type AnglesDelta = CoordsDelta;

/// An RGBA color delta: one presence bit per channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorDelta {
    pub bits: u8,
    pub values: [f32; 4],
}

impl ColorDelta {
    pub fn make(from: [f32; 4], to: [f32; 4]) -> ColorDelta {
        let mut bits = 0u8;
        let mut values = [0.0; 4];
        for i in 0..4 {
            if from[i] != to[i] {
                bits |= 1 << i;
                values[i] = to[i];
            }
        }
        ColorDelta { bits, values }
    }

    pub fn apply(&self, base: [f32; 4]) -> [f32; 4] {
        let mut out = base;
        for i in 0..4 {
            if self.bits & (1 << i) != 0 {
                out[i] = self.values[i];
            }
        }
        out
    }
}

/// The origin field of an entity delta is special-cased in the wire
/// format: the reader only ever sees "this axis changed by this much
/// relative to last frame" (a `CoordsDelta`), while the writer has
/// both the previous and current absolute positions on hand and must
/// derive the delta itself. `q2proto_maybe_diff_coords_t` models this
/// as a C union tagged by which side is active; here it's a proper
/// Rust enum instead of an untagged union.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaybeDiffCoords {
    /// Decode-side view: the delta as read off the wire.
    Read(CoordsDelta),
    /// Encode-side view: previous and current absolute positions, from
    /// which the delta is computed lazily.
    Write { prev: Vec3, current: Vec3 },
}

impl MaybeDiffCoords {
    /// Resolve to the delta that would be (or was) written to the
    /// wire.
    pub fn delta(&self) -> CoordsDelta {
        match self {
            MaybeDiffCoords::Read(d) => *d,
            MaybeDiffCoords::Write { prev, current } => CoordsDelta::make(*prev, *current),
        }
    }

    /// Apply this delta's effect on top of `base`: an i23-diff axis is
    /// added to `base`, any other present axis replaces it outright --
    /// mirrors `q2proto_maybe_read_diff_apply_float`'s distinction
    /// between "add the diff" and "take the known current value".
    pub fn resolve(&self, base: Vec3) -> Vec3 {
        match self {
            MaybeDiffCoords::Read(d) => d.apply(base),
            MaybeDiffCoords::Write { current, .. } => *current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_coord_int_roundtrip() {
        let c = VarCoord::Int(64);
        assert_eq!(c.get(), 8.0);
        assert_eq!(c.as_int(), 64);
    }

    #[test]
    fn var_coord_float_passthrough() {
        let c = VarCoord::Float(12.5);
        assert_eq!(c.get(), 12.5);
    }

    #[test]
    fn var_angle_short_roundtrip() {
        let a = VarAngle::Short(angle2short(90.0));
        assert!((a.get() - 90.0).abs() < 0.01);
    }

    #[test]
    fn var_small_char_roundtrip() {
        let s = VarSmall::Char(small2char(4.0));
        assert_eq!(s.get(), 4.0);
    }

    #[test]
    fn var_color_roundtrip_endpoints() {
        assert_eq!(VarColor::Byte(255).get(), 1.0);
        assert_eq!(VarColor::Byte(0).get(), 0.0);
    }

    #[test]
    fn coords_delta_only_changed_axes() {
        let from = [1.0, 2.0, 3.0];
        let to = [1.0, 5.0, 3.0];
        let delta = CoordsDelta::make(from, to);
        assert_eq!(delta.bits, 0b010);
        assert_eq!(delta.apply(from), to);
    }

    #[test]
    fn coords_delta_no_change_is_empty() {
        let v = [1.0, 2.0, 3.0];
        let delta = CoordsDelta::make(v, v);
        assert_eq!(delta.bits, 0);
    }

    #[test]
    fn color_delta_roundtrip() {
        let from = [0.0, 0.0, 0.0, 0.0];
        let to = [1.0, 0.0, 0.5, 0.0];
        let delta = ColorDelta::make(from, to);
        assert_eq!(delta.bits, 0b0101);
        assert_eq!(delta.apply(from), to);
    }

    #[test]
    fn maybe_diff_coords_read_diff_bit_adds_to_base() {
        let delta = CoordsDelta {
            bits: 0b001,
            values: [5.0, 0.0, 0.0],
            is_diff: 0b001,
        };
        let m = MaybeDiffCoords::Read(delta);
        assert_eq!(m.resolve([10.0, 20.0, 30.0]), [15.0, 20.0, 30.0]);
    }

    #[test]
    fn maybe_diff_coords_read_without_diff_bit_replaces_base() {
        let delta = CoordsDelta {
            bits: 0b001,
            values: [5.0, 0.0, 0.0],
            is_diff: 0,
        };
        let m = MaybeDiffCoords::Read(delta);
        assert_eq!(m.resolve([10.0, 20.0, 30.0]), [5.0, 20.0, 30.0]);
    }

    #[test]
    fn maybe_diff_coords_write_takes_current() {
        let m = MaybeDiffCoords::Write {
            prev: [1.0, 1.0, 1.0],
            current: [2.0, 2.0, 2.0],
        };
        assert_eq!(m.resolve([99.0, 99.0, 99.0]), [2.0, 2.0, 2.0]);
        assert_eq!(m.delta().bits, 0b111);
    }
}
