// solid.rs -- bbox <-> packed "solid" value conversions.
//
// `pack_solid_16`/`unpack_solid_16` are a direct port of
// original_source/src/q2proto_solid.c's `q2proto_pack_solid_16` /
// `q2proto_unpack_solid_16`. The 32-bit variants have no surviving C
// source in the filtered original_source pack; they're designed here
// by the same clamp-and-pack shape, widened to the field widths
// Q2rePRO's larger wire format allows (documented as a judgment call
// in DESIGN.md, not a literal port).

/// Pack an axis-aligned bounding box into the legacy 16-bit `solid`
/// value used by vanilla/R1Q2/Q2PRO. `mins`/`maxs` are the entity's
/// local-space bounding box.
pub fn pack_solid_16(mins: [f32; 3], maxs: [f32; 3]) -> u16 {
    let mut x = (maxs[0] / 8.0) as i32;
    let mut zd = (-mins[2] / 8.0) as i32;
    let mut zu = ((maxs[2] + 32.0) / 8.0) as i32;

    x = x.clamp(1, 31);
    zd = zd.clamp(1, 31);
    zu = zu.clamp(1, 63);

    ((zu as u16) << 10) | ((zd as u16) << 5) | (x as u16)
}

/// Unpack a legacy 16-bit `solid` value back into an axis-aligned
/// bounding box. Lossy: only an approximation of the original box
/// survives encoding.
pub fn unpack_solid_16(solid: u16) -> ([f32; 3], [f32; 3]) {
    let x = (8 * (solid & 31)) as f32;
    let zd = (8 * ((solid >> 5) & 31)) as f32;
    let zu = (8 * ((solid >> 10) & 63)) as f32 - 32.0;

    ([-x, -x, -zd], [x, x, zu])
}

/// Pack an axis-aligned bounding box into Q2rePRO's wider 32-bit
/// `solid` value: same per-axis layout as the 16-bit form, but with
/// each axis carried at full 1/8-unit integer precision instead of a
/// narrow clamped field.
pub fn pack_solid_32(mins: [f32; 3], maxs: [f32; 3]) -> u32 {
    let mut x = (maxs[0] / 8.0) as i32;
    let mut zd = (-mins[2] / 8.0) as i32;
    let mut zu = ((maxs[2] + 32.0) / 8.0) as i32;

    x = x.clamp(1, 1023);
    zd = zd.clamp(1, 1023);
    zu = zu.clamp(1, 2047);

    ((zu as u32) << 20) | ((zd as u32) << 10) | (x as u32)
}

/// Unpack a Q2rePRO 32-bit `solid` value back into an axis-aligned
/// bounding box.
pub fn unpack_solid_32(solid: u32) -> ([f32; 3], [f32; 3]) {
    let x = (8 * (solid & 1023)) as f32;
    let zd = (8 * ((solid >> 10) & 1023)) as f32;
    let zu = (8 * ((solid >> 20) & 2047)) as f32 - 32.0;

    ([-x, -x, -zd], [x, x, zu])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_solid_16_known_value() {
        let mins = [-16.0, -16.0, -24.0];
        let maxs = [16.0, 16.0, 32.0];
        let packed = pack_solid_16(mins, maxs);
        assert_eq!(packed, 0x2062);
    }

    #[test]
    fn solid_16_roundtrip_approximate() {
        let mins = [-16.0, -16.0, -24.0];
        let maxs = [16.0, 16.0, 32.0];
        let packed = pack_solid_16(mins, maxs);
        let (out_mins, out_maxs) = unpack_solid_16(packed);
        assert_eq!(out_mins, mins);
        assert_eq!(out_maxs, maxs);
    }

    #[test]
    fn solid_16_clamps_oversized_box() {
        let packed = pack_solid_16([-9999.0, -9999.0, -9999.0], [9999.0, 9999.0, 9999.0]);
        let (mins, maxs) = unpack_solid_16(packed);
        assert_eq!(maxs[0], 8.0 * 31.0);
        assert_eq!(mins[2], -8.0 * 31.0);
        assert_eq!(maxs[2], 8.0 * 63.0 - 32.0);
    }

    #[test]
    fn solid_32_roundtrip_wider_range() {
        let mins = [-128.0, -128.0, -64.0];
        let maxs = [128.0, 128.0, 96.0];
        let packed = pack_solid_32(mins, maxs);
        let (out_mins, out_maxs) = unpack_solid_32(packed);
        assert_eq!(out_mins, mins);
        assert_eq!(out_maxs, maxs);
    }
}
