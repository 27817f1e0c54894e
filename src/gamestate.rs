// gamestate.rs -- resumable configstrings+spawnbaselines writer.
//
// Grounded on spec §4.5 and §4.8's gamestate-cursor state machine;
// the "flush and retry with the same cursor" contract mirrors
// `write_entity_header`'s own NOT_ENOUGH_PACKET_SPACE-on-overflow
// shape in entity_bits.rs, generalized from a single header write to
// a whole streamed list.

use crate::entity::PackedEntityState;
use crate::entity_wire::{write_entity_delta, EntityWireOptions};
use crate::error::{Error, Result};
use crate::io::{ByteBuf, IoWrite};
use crate::message::ConfigString;

/// Cursor into an in-progress gamestate stream. Left pointing at the
/// first un-emitted element whenever a write returns
/// `NotEnoughPacketSpace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GamestateCursor {
    configstring_idx: usize,
    baseline_idx: usize,
}

impl GamestateCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self, configstrings: &[ConfigString], baselines: &[PackedEntityState]) -> bool {
        self.configstring_idx >= configstrings.len() && self.baseline_idx >= baselines.len()
    }
}

/// Stream as many configstrings and spawn baselines as fit in the
/// current output buffer, advancing `cursor` as each one is written.
/// Returns `Ok(())` once both lists are fully consumed (terminal
/// success); returns `Err(NotEnoughPacketSpace)` the moment a single
/// element doesn't fit, leaving `cursor` pointing at it so the caller
/// can flush the packet and call again.
pub fn write_gamestate(
    w: &mut dyn IoWrite,
    cursor: &mut GamestateCursor,
    configstrings: &[ConfigString],
    baselines: &[PackedEntityState],
    opts: EntityWireOptions,
) -> Result<()> {
    while cursor.configstring_idx < configstrings.len() {
        let cs = &configstrings[cursor.configstring_idx];
        write_one_configstring(w, cs)?;
        cursor.configstring_idx += 1;
    }

    while cursor.baseline_idx < baselines.len() {
        let zero = PackedEntityState::default();
        let baseline = &baselines[cursor.baseline_idx];
        let delta = crate::entity::make_delta(cursor.baseline_idx as u16 + 1, &zero, baseline);

        // Encode into a scratch buffer first so a baseline that
        // doesn't fit is never partially copied into `w`; without
        // this, a NotEnoughPacketSpace partway through the delta's
        // fields would leave `w` holding a truncated entity and the
        // cursor pointing at the same (now half-written) baseline.
        let mut scratch = ByteBuf::new();
        write_entity_delta(&mut scratch, &delta, opts)?;
        let encoded = scratch.into_bytes();
        if w.write_available() < encoded.len() {
            return Err(Error::NotEnoughPacketSpace);
        }
        w.write_raw(&encoded, None)?;
        cursor.baseline_idx += 1;
    }

    Ok(())
}

fn write_one_configstring(w: &mut dyn IoWrite, cs: &ConfigString) -> Result<()> {
    use crate::io::IoWriteExt;
    let needed = 2 + cs.value.len() + 1;
    if w.write_available() < needed {
        return Err(Error::NotEnoughPacketSpace);
    }
    w.write_u16(cs.index)?;
    w.write_string(&cs.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ByteBuf;

    fn sample_configstrings(n: usize) -> Vec<ConfigString> {
        (0..n)
            .map(|i| ConfigString {
                index: i as u16,
                value: format!("cs{i}"),
            })
            .collect()
    }

    #[test]
    fn full_write_in_one_call_reaches_done() {
        let mut buf = ByteBuf::new();
        let mut cursor = GamestateCursor::new();
        let css = sample_configstrings(3);
        let baselines = vec![PackedEntityState::default()];
        write_gamestate(&mut buf, &mut cursor, &css, &baselines, EntityWireOptions::default()).unwrap();
        assert!(cursor.is_done(&css, &baselines));
    }

    #[test]
    fn packet_space_exhaustion_stops_mid_stream_and_resumes() {
        let css = sample_configstrings(5);
        let baselines: Vec<PackedEntityState> = Vec::new();

        let mut cursor = GamestateCursor::new();
        let mut buf = ByteBuf::with_capacity_limit(8);
        let err = write_gamestate(&mut buf, &mut cursor, &css, &baselines, EntityWireOptions::default())
            .unwrap_err();
        assert_eq!(err, Error::NotEnoughPacketSpace);
        assert!(!cursor.is_done(&css, &baselines));

        let stopped_at = cursor.configstring_idx;
        let mut buf2 = ByteBuf::new();
        write_gamestate(&mut buf2, &mut cursor, &css, &baselines, EntityWireOptions::default()).unwrap();
        assert!(cursor.is_done(&css, &baselines));
        assert!(stopped_at < css.len());
    }

    #[test]
    fn oversized_baseline_leaves_no_partial_bytes_in_the_packet() {
        let css: Vec<ConfigString> = Vec::new();
        let mut baseline = PackedEntityState::default();
        baseline.frame = 5;
        baseline.origin = [10.0, 0.0, 0.0];
        let baselines = vec![baseline];

        let mut cursor = GamestateCursor::new();
        let mut buf = ByteBuf::with_capacity_limit(1);
        let err = write_gamestate(&mut buf, &mut cursor, &css, &baselines, EntityWireOptions::default())
            .unwrap_err();
        assert_eq!(err, Error::NotEnoughPacketSpace);
        assert_eq!(cursor.baseline_idx, 0);
        assert!(buf.bytes().is_empty());
    }

    #[test]
    fn empty_lists_are_immediately_done() {
        let mut cursor = GamestateCursor::new();
        let css: Vec<ConfigString> = Vec::new();
        let baselines: Vec<PackedEntityState> = Vec::new();
        let mut buf = ByteBuf::new();
        write_gamestate(&mut buf, &mut cursor, &css, &baselines, EntityWireOptions::default()).unwrap();
        assert!(cursor.is_done(&css, &baselines));
    }
}
