/// Errors that can occur while marshalling values on a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading or writing.
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete value was received.
    #[error("connection closed (incomplete value)")]
    ConnectionClosed,

    /// A telemetry block payload does not fit the 16-bit length field or the
    /// receiver's limit.
    #[error("block too large ({size} bytes, max {max})")]
    BlockTooLarge { size: usize, max: usize },

    /// `send_bytes` was asked for more bytes than the buffer holds.
    #[error("requested {size} bytes from a {len}-byte buffer")]
    SizeExceedsBuffer { size: usize, len: usize },
}

impl CodecError {
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::ConnectionClosed
        } else {
            Self::Io(err)
        }
    }

    pub(crate) fn from_write(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::WriteZero {
            Self::ConnectionClosed
        } else {
            Self::Io(err)
        }
    }
}

/// Hand a codec failure to an `std::io` caller without losing its kind, so a
/// peer hanging up still reads as a disconnect.
impl From<CodecError> for std::io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(err) => err,
            closed @ CodecError::ConnectionClosed => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, closed)
            }
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
