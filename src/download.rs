// download.rs -- file download state machine.
//
// Grounded on myq2-client/src/cl_parse.rs's `cl_parse_download`/
// `cl_parse_zdownload` (progress-percent calculation and logging
// format) and myq2-common/src/compression.rs (deflate session
// shape: lazy open, `MIN_COMPRESS_SIZE`/`COMPRESS_THRESHOLD_PERCENT`
// gating, `flate2::write::DeflateEncoder` as the backing primitive).

use crate::error::{Error, Result};
use log::{debug, trace};

#[cfg(feature = "deflate")]
use flate2::{write::DeflateEncoder, Compression};
#[cfg(feature = "deflate")]
use std::io::Write as _;

/// Fixed header budget reserved around each download chunk's payload
/// (size + percent + a little slack for the message id/length
/// prefix), spec §4.6.
pub const CHUNK_HEADER_BUDGET: usize = 6;

/// Compression policy for an in-progress download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressMode {
    /// Never deflate, regardless of dialect support.
    Never,
    /// Deflate iff the negotiated dialect advertises support.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DownloadPhase {
    Fresh,
    Active,
    Complete,
    Aborted,
    Dropped,
}

/// A single file download in progress.
pub struct DownloadState {
    phase: DownloadPhase,
    data: Vec<u8>,
    transferred: usize,
    mode: CompressMode,
    dialect_supports_deflate: bool,
    #[cfg(feature = "deflate")]
    deflate_session: Option<DeflateEncoder<Vec<u8>>>,
}

impl DownloadState {
    pub fn new(data: Vec<u8>, mode: CompressMode, dialect_supports_deflate: bool) -> Self {
        DownloadState {
            phase: DownloadPhase::Fresh,
            data,
            transferred: 0,
            mode,
            dialect_supports_deflate,
            #[cfg(feature = "deflate")]
            deflate_session: None,
        }
    }

    pub fn total(&self) -> usize {
        self.data.len()
    }

    pub fn transferred(&self) -> usize {
        self.transferred
    }

    fn should_compress(&self) -> bool {
        match self.mode {
            CompressMode::Never => false,
            CompressMode::Auto => self.dialect_supports_deflate,
        }
    }

    /// Percent complete: `min(99, floor(100*transferred/total))` while
    /// active, 100 once complete.
    pub fn percent(&self) -> u8 {
        if self.phase == DownloadPhase::Complete {
            return 100;
        }
        if self.data.is_empty() {
            return 0;
        }
        let pct = (100 * self.transferred) / self.data.len();
        pct.min(99) as u8
    }

    /// Emit the next chunk sized to fit in `remaining_packet_space`
    /// bytes once the header budget is subtracted. On success returns
    /// the chunk bytes and advances `transferred`. When this call's
    /// chunk reaches the end of the data, `transferred` is advanced
    /// past it and the bytes come back inside
    /// `Err(DownloadComplete(chunk))` instead of `Ok` -- the caller
    /// still has a message to write, it is just the last one.
    pub fn next_chunk(&mut self, remaining_packet_space: usize) -> Result<Vec<u8>> {
        if self.phase == DownloadPhase::Fresh {
            self.phase = DownloadPhase::Active;
            trace!("download: starting, {} bytes total", self.data.len());
        }
        if self.phase != DownloadPhase::Active {
            return Err(Error::BadCommand("download not active".into()));
        }

        let budget = remaining_packet_space.saturating_sub(CHUNK_HEADER_BUDGET);
        if budget == 0 {
            return Err(Error::NotEnoughPacketSpace);
        }

        let remaining = self.data.len() - self.transferred;
        let chunk_len = remaining.min(budget);
        if chunk_len == 0 && remaining > 0 {
            return Err(Error::NotEnoughPacketSpace);
        }

        let chunk = if self.should_compress() {
            self.compress_chunk(chunk_len)?
        } else {
            self.data[self.transferred..self.transferred + chunk_len].to_vec()
        };

        self.transferred += chunk_len;
        if self.transferred >= self.data.len() {
            self.phase = DownloadPhase::Complete;
            debug!("download: complete, {} bytes", self.transferred);
            return Err(Error::DownloadComplete(chunk));
        }
        Ok(chunk)
    }

    #[cfg(feature = "deflate")]
    fn compress_chunk(&mut self, chunk_len: usize) -> Result<Vec<u8>> {
        if self.deflate_session.is_none() {
            self.deflate_session = Some(DeflateEncoder::new(Vec::new(), Compression::default()));
        }
        let session = self.deflate_session.as_mut().unwrap();
        session
            .write_all(&self.data[self.transferred..self.transferred + chunk_len])
            .map_err(|e| Error::Io(e.to_string()))?;
        session.flush().map_err(|e| Error::Io(e.to_string()))?;
        let produced = std::mem::take(session.get_mut());
        Ok(produced)
    }

    #[cfg(not(feature = "deflate"))]
    fn compress_chunk(&mut self, _chunk_len: usize) -> Result<Vec<u8>> {
        Err(Error::DeflateNotSupported)
    }

    pub fn abort(&mut self) {
        self.phase = DownloadPhase::Aborted;
    }

    pub fn is_complete(&self) -> bool {
        self.phase == DownloadPhase::Complete
    }

    pub fn is_aborted(&self) -> bool {
        self.phase == DownloadPhase::Aborted
    }

    /// Release the deflate session. Idempotent; callers must invoke
    /// this on every exit path (spec §5).
    pub fn end(&mut self) {
        if self.phase == DownloadPhase::Dropped {
            return;
        }
        #[cfg(feature = "deflate")]
        {
            self.deflate_session = None;
        }
        self.phase = DownloadPhase::Dropped;
    }
}

impl Drop for DownloadState {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_download_completes_immediately() {
        let mut dl = DownloadState::new(vec![1, 2, 3, 4], CompressMode::Never, false);
        let err = dl.next_chunk(100).unwrap_err();
        match err {
            Error::DownloadComplete(chunk) => assert_eq!(chunk, vec![1, 2, 3, 4]),
            other => panic!("expected DownloadComplete, got {other:?}"),
        }
        assert!(dl.is_complete());
        assert_eq!(dl.percent(), 100);
    }

    #[test]
    fn chunked_download_reports_increasing_percent() {
        let data = vec![0u8; 100];
        let mut dl = DownloadState::new(data, CompressMode::Never, false);

        let chunk1 = dl.next_chunk(10 + CHUNK_HEADER_BUDGET).unwrap();
        assert_eq!(chunk1.len(), 10);
        assert_eq!(dl.transferred(), 10);
        assert_eq!(dl.percent(), 10);

        let chunk2 = dl.next_chunk(10 + CHUNK_HEADER_BUDGET).unwrap();
        assert_eq!(chunk2.len(), 10);
        assert_eq!(dl.percent(), 20);
    }

    #[test]
    fn not_enough_space_does_not_advance_transferred() {
        let mut dl = DownloadState::new(vec![0u8; 10], CompressMode::Never, false);
        let before = dl.transferred();
        let err = dl.next_chunk(CHUNK_HEADER_BUDGET).unwrap_err();
        assert_eq!(err, Error::NotEnoughPacketSpace);
        assert_eq!(dl.transferred(), before);
    }

    #[test]
    fn percent_caps_at_99_while_active() {
        let data = vec![0u8; 100];
        let mut dl = DownloadState::new(data, CompressMode::Never, false);
        dl.next_chunk(99 + CHUNK_HEADER_BUDGET).unwrap();
        assert_eq!(dl.percent(), 99);
    }

    #[test]
    fn abort_marks_state_aborted() {
        let mut dl = DownloadState::new(vec![1, 2, 3], CompressMode::Never, false);
        dl.abort();
        assert!(dl.is_aborted());
    }

    #[test]
    fn never_mode_ignores_dialect_support() {
        let dl = DownloadState::new(vec![1], CompressMode::Never, true);
        assert!(!dl.should_compress());
    }

    #[test]
    fn auto_mode_follows_dialect_support() {
        let dl = DownloadState::new(vec![1], CompressMode::Auto, true);
        assert!(dl.should_compress());
        let dl2 = DownloadState::new(vec![1], CompressMode::Auto, false);
        assert!(!dl2.should_compress());
    }

    #[test]
    fn end_is_idempotent() {
        let mut dl = DownloadState::new(vec![1], CompressMode::Never, false);
        dl.end();
        dl.end();
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn compress_chunk_returns_deflated_bytes_not_raw_input() {
        let data = vec![0u8; 64];
        let mut dl = DownloadState::new(data.clone(), CompressMode::Auto, true);
        let produced = dl.compress_chunk(data.len()).unwrap();
        assert_ne!(produced, data);
    }
}
