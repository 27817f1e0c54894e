// dialect/r1q2.rs -- R1Q2 (protocol 35).
//
// Grounded on spec §4.4's "R1Q2" paragraph: protocol-minor negotiated
// in [MINOR_MIN, MINOR_CURRENT]; 32-bit ("long") solid from minor
// 1905; deflate support; `zpacket`/`zdownload` messages.

use super::Dialect;
use crate::entity_wire::EntityWireOptions;
use crate::error::{Error, Result};
use crate::io::{IoRead, IoReadExt, IoWrite, IoWriteExt};
use crate::message::{Download, ServerData, ServerDataR1Q2};
use crate::protocol::Protocol;
#[cfg(feature = "deflate")]
use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
#[cfg(feature = "deflate")]
use std::io::{Read as _, Write as _};

pub const MINOR_MIN: u16 = 1903;
pub const MINOR_CURRENT: u16 = 1905;
pub const MINOR_LONG_SOLID: u16 = 1905;
pub const MINOR_UCMD: u16 = 1904;

/// R1Q2 message ids beyond the shared `svc::*` range (spec §6.2:
/// "higher IDs are dialect-specific"). [[judgment call -- the filtered
/// corpus names `zpacket`/`zdownload` but not their numeric ids; see
/// DESIGN.md]]
pub const SVC_ZPACKET: u8 = 23;
pub const SVC_ZDOWNLOAD: u8 = 24;

/// Write a `zpacket`: a whole already-serialized message run, deflated
/// and framed with its compressed/uncompressed lengths (spec §4.4).
/// Refuses with `Error::AlreadyCompressed` when deflating doesn't
/// shrink `payload` -- the concrete trigger for that error (spec §7).
#[cfg(feature = "deflate")]
pub fn write_zpacket(w: &mut dyn IoWrite, payload: &[u8]) -> Result<()> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(payload).map_err(|e| Error::Io(e.to_string()))?;
    let compressed = enc.finish().map_err(|e| Error::Io(e.to_string()))?;
    if compressed.len() >= payload.len() {
        return Err(Error::AlreadyCompressed);
    }
    w.write_u8(SVC_ZPACKET)?;
    w.write_u16(compressed.len() as u16)?;
    w.write_u16(payload.len() as u16)?;
    w.write_raw(&compressed, None)
}

#[cfg(not(feature = "deflate"))]
pub fn write_zpacket(_w: &mut dyn IoWrite, _payload: &[u8]) -> Result<()> {
    Err(Error::DeflateNotSupported)
}

/// Read a `zpacket` payload back out, given its id byte already
/// consumed. Returns the inflated message run for the caller to feed
/// back through the ordinary message reader.
#[cfg(feature = "deflate")]
pub fn read_zpacket(r: &mut dyn IoRead) -> Result<Vec<u8>> {
    let compressed_len = r.read_u16()? as usize;
    let uncompressed_len = r.read_u16()? as usize;
    let compressed = r.read_raw(compressed_len, None)?;
    let mut dec = DeflateDecoder::new(compressed);
    let mut out = Vec::with_capacity(uncompressed_len);
    dec.read_to_end(&mut out).map_err(|e| Error::Io(e.to_string()))?;
    Ok(out)
}

#[cfg(not(feature = "deflate"))]
pub fn read_zpacket(_r: &mut dyn IoRead) -> Result<Vec<u8>> {
    Err(Error::DeflateNotSupported)
}

/// Write a `zdownload`: identical field shape to `svc_download`
/// (message_wire.rs's `write_download`), just always deflate-compressed
/// and tagged with its own id.
pub fn write_zdownload(w: &mut dyn IoWrite, download: &Download) -> Result<()> {
    w.write_u8(SVC_ZDOWNLOAD)?;
    w.write_i32(download.size)?;
    w.write_u8(download.percent)?;
    if download.size > 0 {
        w.write_raw(&download.data, None)?;
    }
    Ok(())
}

/// Read a `zdownload`, given its id byte already consumed.
pub fn read_zdownload(r: &mut dyn IoRead) -> Result<Download> {
    let size = r.read_i32()?;
    let percent = r.read_u8()?;
    if size <= 0 {
        return Ok(Download { size, percent, data: Vec::new() });
    }
    let data = r.read_raw(size as usize, None)?.to_vec();
    Ok(Download { size, percent, data })
}

pub struct R1Q2 {
    pub minor: u16,
    pub enhanced: bool,
}

impl R1Q2 {
    pub fn new(requested_minor: u16) -> Self {
        R1Q2 {
            minor: requested_minor.clamp(MINOR_MIN, MINOR_CURRENT),
            enhanced: true,
        }
    }

    pub fn supports_long_solid(&self) -> bool {
        self.minor >= MINOR_LONG_SOLID
    }

    pub fn supports_ucmd(&self) -> bool {
        self.minor >= MINOR_UCMD
    }
}

impl Dialect for R1Q2 {
    fn protocol(&self) -> Protocol {
        Protocol::R1Q2
    }

    fn entity_wire_options(&self) -> EntityWireOptions {
        EntityWireOptions {
            effects64: false,
            long_solid: self.supports_long_solid(),
            i23_coords: false,
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
            r1q2: Some(ServerDataR1Q2 {
                enhanced: self.enhanced,
            }),
            q2pro: None,
        }
    }

    fn supports_deflate(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_clamps_to_supported_range() {
        assert_eq!(R1Q2::new(1800).minor, MINOR_MIN);
        assert_eq!(R1Q2::new(9999).minor, MINOR_CURRENT);
        assert_eq!(R1Q2::new(1904).minor, 1904);
    }

    #[test]
    fn long_solid_only_from_minor_1905() {
        assert!(!R1Q2::new(1904).supports_long_solid());
        assert!(R1Q2::new(1905).supports_long_solid());
    }

    #[test]
    fn ucmd_from_minor_1904() {
        assert!(!R1Q2::new(1903).supports_ucmd());
        assert!(R1Q2::new(1904).supports_ucmd());
    }

    #[test]
    fn fills_r1q2_extension() {
        let sd = R1Q2::new(1905).fill_serverdata(1, false, "baseq2", 0, "q2dm1");
        assert!(sd.r1q2.unwrap().enhanced);
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn zpacket_roundtrips_a_compressible_payload() {
        use crate::io::ByteBuf;

        let payload = vec![7u8; 512];
        let mut buf = ByteBuf::new();
        write_zpacket(&mut buf, &payload).unwrap();

        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        assert_eq!(r.read_u8().unwrap(), SVC_ZPACKET);
        let out = read_zpacket(&mut r).unwrap();
        assert_eq!(out, payload);
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn zpacket_refuses_incompressible_payload() {
        let payload: Vec<u8> = (0..64).map(|i: u8| i.wrapping_mul(173).wrapping_add(1)).collect();
        let mut buf = crate::io::ByteBuf::new();
        let err = write_zpacket(&mut buf, &payload).unwrap_err();
        assert!(matches!(err, Error::AlreadyCompressed));
    }

    #[test]
    fn zdownload_roundtrips() {
        use crate::io::ByteBuf;

        let download = Download {
            size: 4,
            percent: 50,
            data: vec![1, 2, 3, 4],
        };
        let mut buf = ByteBuf::new();
        write_zdownload(&mut buf, &download).unwrap();

        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        assert_eq!(r.read_u8().unwrap(), SVC_ZDOWNLOAD);
        let read_back = read_zdownload(&mut r).unwrap();
        assert_eq!(read_back, download);
    }
}
