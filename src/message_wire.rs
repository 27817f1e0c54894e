// message_wire.rs -- shared svc_*/clc_* message read/write, the part
// of the wire format common to every dialect.
//
// Grounded on myq2-client/src/cl_parse.rs's per-`svc_*` message
// parse functions (`cl_parse_download`/`cl_parse_baseline`/
// `cl_parse_config_string`/`cl_parse_start_sound_packet`) and the
// `svc_*` string table used there for error messages; write-side
// mirrored from the same file's structure. Dialect-specific pieces
// (serverdata extensions, frame/player-state width options, solid
// width) are threaded in by the caller rather than duplicated here.

use crate::entity::PackedEntityState;
use crate::entity_wire::{read_entity_delta_with, write_entity_delta, EntityWireOptions};
use crate::error::{Error, Result};
use crate::io::{IoRead, IoReadExt, IoWrite, IoWriteExt};
use crate::message::*;
use crate::playerstate::PackedPlayerState;
use crate::player_wire::{read_player_delta, write_player_delta, PlayerWireOptions};
use crate::tent::TeKind;

/// Read one `svc_*` message given its already-consumed wire ID.
/// `serverdata`/`frame` are handled by the dialect layer (they need
/// dialect-specific extra fields and the entity-delta sub-stream
/// respectively) and never reach this function.
pub fn read_common_server_message(
    id: u8,
    r: &mut dyn IoRead,
) -> Result<Option<ServerMessage>> {
    use ServerMessage::*;
    let msg = match id {
        svc::NOP => Nop,
        svc::DISCONNECT => Disconnect,
        svc::RECONNECT => Reconnect,
        svc::MUZZLEFLASH => MuzzleFlash(read_muzzleflash(r)?),
        svc::MUZZLEFLASH2 => MuzzleFlash2(read_muzzleflash(r)?),
        svc::TEMP_ENTITY => TempEntity(read_temp_entity(r)?),
        svc::LAYOUT => Layout(r.read_string()?.to_owned()),
        svc::CENTERPRINT => CenterPrint(r.read_string()?.to_owned()),
        svc::STUFFTEXT => StuffText(r.read_string()?.to_owned()),
        svc::PRINT => {
            let level = r.read_u8()?;
            let text = r.read_string()?.to_owned();
            Print { level, text }
        }
        svc::CONFIGSTRING => {
            let index = r.read_u16()?;
            let value = r.read_string()?.to_owned();
            ConfigString(self::ConfigString { index, value })
        }
        svc::SOUND => Sound(read_sound(r)?),
        svc::DOWNLOAD => Download(read_download(r)?),
        svc::INVENTORY => {
            let mut items = [0i16; INVENTORY_ITEMS];
            for it in items.iter_mut() {
                *it = r.read_i16()?;
            }
            Inventory(items)
        }
        _ => return Ok(None),
    };
    Ok(Some(msg))
}

pub fn write_common_server_message(w: &mut dyn IoWrite, msg: &ServerMessage) -> Result<bool> {
    use ServerMessage::*;
    match msg {
        Nop => w.write_u8(svc::NOP)?,
        Disconnect => w.write_u8(svc::DISCONNECT)?,
        Reconnect => w.write_u8(svc::RECONNECT)?,
        MuzzleFlash(m) => {
            w.write_u8(svc::MUZZLEFLASH)?;
            write_muzzleflash(w, m)?;
        }
        MuzzleFlash2(m) => {
            w.write_u8(svc::MUZZLEFLASH2)?;
            write_muzzleflash(w, m)?;
        }
        TempEntity(t) => {
            w.write_u8(svc::TEMP_ENTITY)?;
            write_temp_entity(w, t)?;
        }
        Layout(s) => {
            w.write_u8(svc::LAYOUT)?;
            w.write_string(s)?;
        }
        CenterPrint(s) => {
            w.write_u8(svc::CENTERPRINT)?;
            w.write_string(s)?;
        }
        StuffText(s) => {
            w.write_u8(svc::STUFFTEXT)?;
            w.write_string(s)?;
        }
        Print { level, text } => {
            w.write_u8(svc::PRINT)?;
            w.write_u8(*level)?;
            w.write_string(text)?;
        }
        ConfigString(cs) => {
            w.write_u8(svc::CONFIGSTRING)?;
            w.write_u16(cs.index)?;
            w.write_string(&cs.value)?;
        }
        Sound(s) => {
            w.write_u8(svc::SOUND)?;
            write_sound(w, s)?;
        }
        Download(d) => {
            w.write_u8(svc::DOWNLOAD)?;
            write_download(w, d)?;
        }
        Inventory(items) => {
            w.write_u8(svc::INVENTORY)?;
            for it in items {
                w.write_i16(*it)?;
            }
        }
        ServerData(_) | SpawnBaseline(_) | Frame(_) | Setting(_) => return Ok(false),
    }
    Ok(true)
}

fn read_muzzleflash(r: &mut dyn IoRead) -> Result<MuzzleFlash> {
    Ok(MuzzleFlash {
        entity: r.read_u16()?,
        weapon: r.read_u8()?,
    })
}

fn write_muzzleflash(w: &mut dyn IoWrite, m: &MuzzleFlash) -> Result<()> {
    w.write_u16(m.entity)?;
    w.write_u8(m.weapon)
}

fn read_position(r: &mut dyn IoRead) -> Result<[f32; 3]> {
    let mut p = [0.0; 3];
    for axis in p.iter_mut() {
        *axis = crate::valenc::int2coord(r.read_i32()?);
    }
    Ok(p)
}

fn read_direction(r: &mut dyn IoRead) -> Result<u8> {
    let direction = r.read_u8()?;
    if direction >= 162 {
        return Err(Error::BadData(format!("direction index {direction} out of range")));
    }
    Ok(direction)
}

/// `TE_STEAM`'s field order (entity1, count, position1, direction,
/// color, entity2, [time]) doesn't fit either of the two orderings
/// every other kind uses, so it is read/written directly rather than
/// through the generic [`crate::tent::TentFields`]-driven path.
fn read_temp_entity_steam(r: &mut dyn IoRead) -> Result<TempEntity> {
    let entity1 = r.read_u16()?;
    let count = r.read_u8()?;
    let position1 = read_position(r)?;
    let direction = read_direction(r)?;
    let color = r.read_u8()?;
    let entity2 = r.read_u16()?;
    let time = r.read_f32()?;
    Ok(TempEntity {
        kind: TeKind::Steam,
        position1,
        position2: [0.0; 3],
        offset: [0.0; 3],
        direction,
        count,
        color,
        entity1,
        entity2,
        time,
    })
}

fn write_temp_entity_steam(w: &mut dyn IoWrite, t: &TempEntity) -> Result<()> {
    w.write_u8(TeKind::Steam as u8)?;
    w.write_u16(t.entity1)?;
    w.write_u8(t.count)?;
    for axis in t.position1 {
        w.write_i32(crate::valenc::coord2int(axis))?;
    }
    if t.direction >= 162 {
        return Err(Error::InvalidArgument(format!(
            "direction index {} out of range",
            t.direction
        )));
    }
    w.write_u8(t.direction)?;
    w.write_u8(t.color)?;
    w.write_u16(t.entity2)?;
    w.write_f32(t.time)
}

fn read_temp_entity(r: &mut dyn IoRead) -> Result<TempEntity> {
    let wire = r.read_u8()?;
    let kind = TeKind::from_wire(wire).ok_or_else(|| Error::BadData(format!("unknown TE_* {wire}")))?;
    if kind == TeKind::Steam {
        return read_temp_entity_steam(r);
    }
    let f = kind.fields();

    let mut position1 = [0.0; 3];
    let mut position2 = [0.0; 3];
    let mut offset = [0.0; 3];
    let mut direction = 0u8;
    let mut count = 0u8;
    let mut color = 0u8;
    let mut entity1 = 0u16;
    let mut entity2 = 0u16;
    let time = 0.0f32;

    if f.count_leads && f.count {
        count = r.read_u8()?;
    }
    if f.entities_lead {
        if f.entity1 {
            entity1 = r.read_u16()?;
        }
        if f.entity2 {
            entity2 = r.read_u16()?;
        }
    }
    if f.position1 {
        position1 = read_position(r)?;
    }
    if f.position2 {
        position2 = read_position(r)?;
    }
    if f.offset {
        offset = read_position(r)?;
    }
    if f.direction {
        direction = read_direction(r)?;
    }
    if f.count && !f.count_leads {
        count = r.read_u8()?;
    }
    if f.color {
        color = r.read_u8()?;
    }
    if !f.entities_lead {
        if f.entity1 {
            entity1 = r.read_u16()?;
        }
        if f.entity2 {
            entity2 = r.read_u16()?;
        }
    }

    Ok(TempEntity {
        kind,
        position1,
        position2,
        offset,
        direction,
        count,
        color,
        entity1,
        entity2,
        time,
    })
}

fn write_temp_entity(w: &mut dyn IoWrite, t: &TempEntity) -> Result<()> {
    if t.kind == TeKind::Steam {
        return write_temp_entity_steam(w, t);
    }
    w.write_u8(t.kind as u8)?;
    let f = t.kind.fields();

    if f.count_leads && f.count {
        w.write_u8(t.count)?;
    }
    if f.entities_lead {
        if f.entity1 {
            w.write_u16(t.entity1)?;
        }
        if f.entity2 {
            w.write_u16(t.entity2)?;
        }
    }
    if f.position1 {
        for axis in t.position1 {
            w.write_i32(crate::valenc::coord2int(axis))?;
        }
    }
    if f.position2 {
        for axis in t.position2 {
            w.write_i32(crate::valenc::coord2int(axis))?;
        }
    }
    if f.offset {
        for axis in t.offset {
            w.write_i32(crate::valenc::coord2int(axis))?;
        }
    }
    if f.direction {
        if t.direction >= 162 {
            return Err(Error::InvalidArgument(format!(
                "direction index {} out of range",
                t.direction
            )));
        }
        w.write_u8(t.direction)?;
    }
    if f.count && !f.count_leads {
        w.write_u8(t.count)?;
    }
    if f.color {
        w.write_u8(t.color)?;
    }
    if !f.entities_lead {
        if f.entity1 {
            w.write_u16(t.entity1)?;
        }
        if f.entity2 {
            w.write_u16(t.entity2)?;
        }
    }
    Ok(())
}

fn read_sound(r: &mut dyn IoRead) -> Result<Sound> {
    let flags = SoundFlags::from_bits_truncate(r.read_u8()?);
    let index = r.read_u8()?;
    let volume = if flags.contains(SoundFlags::VOLUME) {
        r.read_u8()?
    } else {
        SOUND_DEFAULT_VOLUME
    };
    let attenuation = if flags.contains(SoundFlags::ATTENUATION) {
        r.read_u8()?
    } else {
        SOUND_DEFAULT_ATTENUATION
    };
    let offset = if flags.contains(SoundFlags::OFFSET) {
        r.read_u8()?
    } else {
        0
    };
    let entity_channel = if flags.contains(SoundFlags::ENT) {
        r.read_u16()?
    } else {
        0
    };
    let position = if flags.contains(SoundFlags::POS) {
        let mut p = [0.0; 3];
        for axis in p.iter_mut() {
            *axis = crate::valenc::int2coord(r.read_i32()?);
        }
        Some(p)
    } else {
        None
    };

    Ok(Sound {
        flags,
        index,
        volume,
        attenuation,
        entity_channel,
        position,
        offset,
    })
}

fn write_sound(w: &mut dyn IoWrite, s: &Sound) -> Result<()> {
    w.write_u8(s.flags.bits())?;
    w.write_u8(s.index)?;
    if s.flags.contains(SoundFlags::VOLUME) {
        w.write_u8(s.volume)?;
    }
    if s.flags.contains(SoundFlags::ATTENUATION) {
        w.write_u8(s.attenuation)?;
    }
    if s.flags.contains(SoundFlags::OFFSET) {
        w.write_u8(s.offset)?;
    }
    if s.flags.contains(SoundFlags::ENT) {
        w.write_u16(s.entity_channel)?;
    }
    if s.flags.contains(SoundFlags::POS) {
        let p = s.position.ok_or_else(|| {
            Error::InvalidArgument("POS flag set without a position".into())
        })?;
        for axis in p {
            w.write_i32(crate::valenc::coord2int(axis))?;
        }
    }
    Ok(())
}

fn read_download(r: &mut dyn IoRead) -> Result<Download> {
    let size = r.read_i32()?;
    let percent = r.read_u8()?;
    if size <= 0 {
        return Ok(Download {
            size,
            percent,
            data: Vec::new(),
        });
    }
    let data = r.read_raw(size as usize, None)?.to_vec();
    Ok(Download { size, percent, data })
}

fn write_download(w: &mut dyn IoWrite, d: &Download) -> Result<()> {
    w.write_i32(d.size)?;
    w.write_u8(d.percent)?;
    if d.size > 0 {
        w.write_raw(&d.data, None)?;
    }
    Ok(())
}

/// Write the entity-delta sub-stream of a `svc_frame` message (the
/// `packetentities` payload), terminated by the end-of-list sentinel.
pub fn write_frame_entities(
    w: &mut dyn IoWrite,
    deltas: &[crate::entity::EntityStateDelta],
    opts: EntityWireOptions,
) -> Result<()> {
    for d in deltas {
        write_entity_delta(w, d, opts)?;
    }
    crate::entity_bits::write_entity_header(w, 0, 0)
}

/// Read the entity-delta sub-stream of a `svc_frame` message until the
/// end-of-list sentinel, resolving each delta against `baseline` (a
/// lookup of the previous packed state for the entity it updates).
pub fn read_frame_entities(
    r: &mut dyn IoRead,
    lookup: impl FnMut(u16) -> PackedEntityState,
    opts: EntityWireOptions,
) -> Result<Vec<crate::entity::EntityStateDelta>> {
    let mut out = Vec::new();
    let mut lookup = lookup;
    while let Some(delta) = read_entity_delta_with(r, &mut lookup, opts)? {
        out.push(delta);
    }
    Ok(out)
}

/// Write a whole `svc_frame`: the frame header, the player-state
/// delta, the clientnum field at the width this dialect negotiated,
/// then the entity-delta sub-stream. The `svc_frame` id byte itself is
/// written first, matching every other `write_*` helper in this file.
pub fn write_frame(
    w: &mut dyn IoWrite,
    frame: &Frame,
    entities: &[crate::entity::EntityStateDelta],
    clientnum_short: bool,
    opts: EntityWireOptions,
    player_opts: PlayerWireOptions,
) -> Result<()> {
    w.write_u8(svc::FRAME)?;
    w.write_i32(frame.server_frame)?;
    w.write_i32(frame.delta_frame)?;
    w.write_u8(frame.suppress_count)?;
    write_player_delta(w, &frame.player_state, player_opts)?;
    if clientnum_short {
        w.write_i16(frame.clientnum)?;
    } else {
        w.write_u8(frame.clientnum as u8)?;
    }
    write_frame_entities(w, entities, opts)
}

/// Read a whole `svc_frame`, given its id byte already consumed.
/// `player_baseline` and `entity_lookup` are the caller-owned state the
/// player-state delta and each entity delta resolve against; this
/// function never maintains history of its own (spec's packed states
/// are pure containers, not codec-owned state).
pub fn read_frame(
    r: &mut dyn IoRead,
    player_baseline: &PackedPlayerState,
    entity_lookup: impl FnMut(u16) -> PackedEntityState,
    clientnum_short: bool,
    opts: EntityWireOptions,
    player_opts: PlayerWireOptions,
) -> Result<(Frame, Vec<crate::entity::EntityStateDelta>)> {
    let server_frame = r.read_i32()?;
    let delta_frame = r.read_i32()?;
    let suppress_count = r.read_u8()?;
    let player_state = read_player_delta(r, player_baseline, player_opts)?;
    let clientnum = if clientnum_short {
        r.read_i16()?
    } else {
        r.read_u8()? as i16
    };
    let entities = read_frame_entities(r, entity_lookup, opts)?;
    Ok((
        Frame {
            server_frame,
            delta_frame,
            suppress_count,
            player_state,
            clientnum,
        },
        entities,
    ))
}
