// error.rs -- codec error taxonomy
//
// A single Result-bubbling discipline, replacing the optional
// setjmp/longjmp escape hatch of the C original. Every codec entry
// point returns a Result<_, Error>; callers drop the current message
// on BadData/BadCommand and keep the context valid for the next call.

use thiserror::Error;

/// Error codes surfaced by the codec.
///
/// `NoMoreInput`, `NotEnoughPacketSpace` and `DownloadComplete` are
/// normal control-flow signals, not failures; the rest terminate the
/// current message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The byte stream is exhausted at a message boundary.
    #[error("no more input")]
    NoMoreInput,

    /// Wire data violates the protocol (impossible flag, out-of-range
    /// value, malformed number).
    #[error("bad data: {0}")]
    BadData(String),

    /// Unknown message ID at a top-level boundary.
    #[error("bad command: {0}")]
    BadCommand(String),

    /// The first message on a client reader was not serverdata or
    /// stufftext.
    #[error("expected serverdata")]
    ExpectedServerdata,

    /// Handshake requested a dialect not in the accepted list, or a
    /// feature not implemented by the negotiated dialect.
    #[error("protocol not supported: {0}")]
    ProtocolNotSupported(String),

    /// The challenge's protocol list and the caller's accepted list
    /// are disjoint.
    #[error("no acceptable protocol")]
    NoAcceptableProtocol,

    /// Writer cannot fit the next unit into the current output
    /// buffer; caller must flush and retry.
    #[error("not enough packet space")]
    NotEnoughPacketSpace,

    /// Non-fatal terminal success for the download state machine.
    /// Carries the final chunk's bytes, which still need to be
    /// written by the caller -- this call was the last one, so there
    /// is no further `Ok` chunk to receive them.
    #[error("download complete")]
    DownloadComplete(Vec<u8>),

    /// `zpacket` wrapping refused because the payload was itself
    /// already compressed or would not benefit.
    #[error("already compressed")]
    AlreadyCompressed,

    /// Caller requested compression on a build or dialect without it.
    #[error("deflate not supported")]
    DeflateNotSupported,

    /// Caller-supplied buffer is null or zero-sized.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error surfaced by the caller's `IoRead`/`IoWrite` impl.
    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for signals that are normal control flow, not failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoMoreInput | Error::NotEnoughPacketSpace | Error::DownloadComplete(_)
        )
    }
}
