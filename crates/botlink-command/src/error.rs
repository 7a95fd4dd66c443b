use crate::code::CommandCode;

/// Errors that end a listen cycle.
///
/// Nothing here is recovered locally; the control loop decides whether to
/// run another cycle.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Reading the frame or its payload, or writing a reply, failed.
    #[error("stream error: {0}")]
    Codec(#[from] botlink_codec::CodecError),

    /// A collaborator failed while executing a command.
    #[error("{code} failed: {source}")]
    Collaborator {
        code: CommandCode,
        source: std::io::Error,
    },

    /// A `MOVE` instruction has more segments than its `u16` count can
    /// describe.
    #[error("MOVE instruction has {count} segments, max {max}")]
    TooManySegments { count: usize, max: usize },
}

impl CommandError {
    /// True when the peer went away rather than the link misbehaving.
    pub fn is_disconnect(&self) -> bool {
        match self {
            CommandError::Codec(botlink_codec::CodecError::ConnectionClosed) => true,
            CommandError::Codec(botlink_codec::CodecError::Io(err))
            | CommandError::Collaborator { source: err, .. } => matches!(
                err.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CommandError>;
