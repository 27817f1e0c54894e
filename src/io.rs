// io.rs -- byte-level transport abstraction consumed by the codec.
//
// In the C original (q2proto_io.h) this is a set of externally
// provided functions taking an opaque `uintptr_t io_arg`. Per the
// function-pointer-dispatch design note, that becomes a pair of
// traits here; dialects and the higher-level state machines take
// `&mut dyn IoRead` / `&mut dyn IoWrite` rather than being generic
// over a concrete transport, mirroring how myq2-common's net.rs
// registers platform callbacks instead of calling sockets directly.

use crate::error::{Error, Result};

/// Read-side transport primitives. All multi-byte integers are
/// little-endian on the wire.
pub trait IoRead {
    fn read_u8(&mut self) -> Result<u8>;
    fn read_u16(&mut self) -> Result<u16>;
    fn read_u32(&mut self) -> Result<u32>;

    /// Read a NUL-terminated string. The returned slice must remain
    /// valid until the caller is done processing the current message.
    fn read_string(&mut self) -> Result<&str>;

    /// Read `size` bytes of raw data. If `readcount` is `None`, exactly
    /// `size` bytes must be available; otherwise short reads are
    /// permitted and the number of bytes actually read is reported in
    /// `*readcount`.
    fn read_raw(&mut self, size: usize, readcount: Option<&mut usize>) -> Result<&[u8]>;

    /// Latched error from the last operation on this transport, for
    /// implementations that prefer to report errors out of band.
    fn get_error(&self) -> Option<Error> {
        None
    }

    #[cfg(feature = "shownet")]
    fn shownet_check(&self, _level: i32) -> bool {
        false
    }

    #[cfg(feature = "shownet")]
    fn shownet(&mut self, _level: i32, _offset: usize, _msg: &str) {}
}

/// Write-side transport primitives.
pub trait IoWrite {
    fn write_u8(&mut self, v: u8) -> Result<()>;
    fn write_u16(&mut self, v: u16) -> Result<()>;
    fn write_u32(&mut self, v: u32) -> Result<()>;

    /// Reserve `size` bytes in the output buffer and return a mutable
    /// view onto them, to be filled in directly by the caller.
    fn write_reserve_raw(&mut self, size: usize) -> Result<&mut [u8]>;

    /// Write up to `size` bytes. If `written` is `None`, exactly
    /// `size` bytes must be written or this is an error; otherwise a
    /// partial write is permitted and reported through `*written`.
    fn write_raw(&mut self, data: &[u8], written: Option<&mut usize>) -> Result<()>;

    fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_raw(s.as_bytes(), None)?;
        self.write_u8(0)
    }

    /// Conservative estimate of remaining output space. More may
    /// become available once compression is applied.
    fn write_available(&self) -> usize;

    fn get_error(&self) -> Option<Error> {
        None
    }
}

/// Signed-integer and float helpers built on the unsigned primitives
/// above, via bit-casting exactly like `MSG_ReadChar`/`MSG_WriteLong`
/// in myq2-common's `common.rs`.
pub trait IoReadExt: IoRead {
    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }
    fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }
    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }
    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }
}
impl<T: IoRead + ?Sized> IoReadExt for T {}

pub trait IoWriteExt: IoWrite {
    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_u8(v as u8)
    }
    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write_u16(v as u16)
    }
    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_u32(v as u32)
    }
    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_u32(v.to_bits())
    }
}
impl<T: IoWrite + ?Sized> IoWriteExt for T {}

/// A simple in-memory `IoRead`/`IoWrite` implementation over a
/// `Vec<u8>`/byte slice, used by tests and by small standalone tools.
/// Reads are strict (`read_raw` with no `readcount` must see the full
/// slice); writes grow the backing vector and never run out of space
/// unless `max_size` caps it, which is what `NOT_ENOUGH_PACKET_SPACE`
/// tests exercise.
pub struct ByteBuf {
    data: Vec<u8>,
    read_pos: usize,
    max_size: Option<usize>,
}

impl ByteBuf {
    pub fn new() -> Self {
        ByteBuf {
            data: Vec::new(),
            read_pos: 0,
            max_size: None,
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        ByteBuf {
            data,
            read_pos: 0,
            max_size: None,
        }
    }

    pub fn with_capacity_limit(max_size: usize) -> Self {
        ByteBuf {
            data: Vec::new(),
            read_pos: 0,
            max_size: Some(max_size),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_pos
    }

    fn ensure_space(&mut self, n: usize) -> Result<()> {
        if let Some(max) = self.max_size {
            if self.data.len() + n > max {
                return Err(Error::NotEnoughPacketSpace);
            }
        }
        Ok(())
    }
}

impl Default for ByteBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl IoRead for ByteBuf {
    fn read_u8(&mut self) -> Result<u8> {
        if self.read_pos >= self.data.len() {
            return Err(Error::NoMoreInput);
        }
        let v = self.data[self.read_pos];
        self.read_pos += 1;
        Ok(v)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_raw(2, None)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_raw(4, None)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_string(&mut self) -> Result<&str> {
        let start = self.read_pos;
        let nul = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::NoMoreInput)?;
        self.read_pos = start + nul + 1;
        std::str::from_utf8(&self.data[start..start + nul])
            .map_err(|e| Error::BadData(e.to_string()))
    }

    fn read_raw(&mut self, size: usize, readcount: Option<&mut usize>) -> Result<&[u8]> {
        let avail = self.data.len() - self.read_pos;
        let n = match readcount {
            Some(ref rc) => {
                let n = size.min(avail);
                **rc = n;
                n
            }
            None => {
                if avail < size {
                    return Err(Error::NoMoreInput);
                }
                size
            }
        };
        let start = self.read_pos;
        self.read_pos += n;
        Ok(&self.data[start..start + n])
    }
}

impl IoWrite for ByteBuf {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.ensure_space(1)?;
        self.data.push(v);
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_raw(&v.to_le_bytes(), None)
    }

    fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_raw(&v.to_le_bytes(), None)
    }

    fn write_reserve_raw(&mut self, size: usize) -> Result<&mut [u8]> {
        self.ensure_space(size)?;
        let start = self.data.len();
        self.data.resize(start + size, 0);
        Ok(&mut self.data[start..start + size])
    }

    fn write_raw(&mut self, data: &[u8], written: Option<&mut usize>) -> Result<()> {
        match written {
            Some(w) => {
                let room = self.max_size.map(|m| m.saturating_sub(self.data.len()));
                let n = room.map(|r| data.len().min(r)).unwrap_or(data.len());
                self.data.extend_from_slice(&data[..n]);
                *w = n;
                Ok(())
            }
            None => {
                self.ensure_space(data.len())?;
                self.data.extend_from_slice(data);
                Ok(())
            }
        }
    }

    fn write_available(&self) -> usize {
        match self.max_size {
            Some(max) => max.saturating_sub(self.data.len()),
            None => usize::MAX - self.data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_primitives() {
        let mut buf = ByteBuf::new();
        buf.write_u8(7).unwrap();
        buf.write_u16(0x1234).unwrap();
        buf.write_u32(0xdead_beef).unwrap();
        buf.write_string("hello").unwrap();

        let mut r = ByteBuf::from_bytes(buf.into_bytes());
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(r.read_string().unwrap(), "hello");
    }

    #[test]
    fn read_past_end_is_no_more_input() {
        let mut r = ByteBuf::from_bytes(vec![1]);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_u8().unwrap_err(), Error::NoMoreInput);
    }

    #[test]
    fn write_overflow_is_not_enough_packet_space() {
        let mut buf = ByteBuf::with_capacity_limit(2);
        buf.write_u8(1).unwrap();
        buf.write_u8(2).unwrap();
        assert_eq!(buf.write_u8(3).unwrap_err(), Error::NotEnoughPacketSpace);
    }

    #[test]
    fn partial_read_reports_short_count() {
        let mut r = ByteBuf::from_bytes(vec![1, 2, 3]);
        let mut n = 0usize;
        let data = r.read_raw(10, Some(&mut n)).unwrap().to_vec();
        assert_eq!(n, 3);
        assert_eq!(data, vec![1, 2, 3]);
    }
}
