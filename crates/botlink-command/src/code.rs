use std::fmt;
use std::str::FromStr;

/// Start-of-frame byte. Also forces resynchronization when it shows up
/// inside a command code.
pub const SENTINEL: u8 = b'!';

/// The closed command vocabulary.
///
/// Codes are case-sensitive ASCII. The 3-byte codes never consume a fourth
/// byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// `CLR`: reset the tracked pose.
    Clear,
    /// `PIC`: capture an image.
    Picture,
    /// `POS`: report the pose.
    Position,
    /// `MOVE`: hand a speed instruction to the motion collaborator.
    Move,
    /// `STOP`: halt motion and report the pose.
    Stop,
    /// `SCAN`: full rotational distance scan.
    Scan,
    /// `BEEP`: play a tone.
    Beep,
}

impl CommandCode {
    pub const ALL: [CommandCode; 7] = [
        CommandCode::Clear,
        CommandCode::Picture,
        CommandCode::Position,
        CommandCode::Move,
        CommandCode::Stop,
        CommandCode::Scan,
        CommandCode::Beep,
    ];

    /// Match a 3-byte code.
    pub fn from_short(code: &[u8; 3]) -> Option<Self> {
        match code {
            b"CLR" => Some(CommandCode::Clear),
            b"PIC" => Some(CommandCode::Picture),
            b"POS" => Some(CommandCode::Position),
            _ => None,
        }
    }

    /// Match a 4-byte code.
    pub fn from_long(code: &[u8; 4]) -> Option<Self> {
        match code {
            b"MOVE" => Some(CommandCode::Move),
            b"STOP" => Some(CommandCode::Stop),
            b"SCAN" => Some(CommandCode::Scan),
            b"BEEP" => Some(CommandCode::Beep),
            _ => None,
        }
    }

    /// The code bytes as sent after the sentinel.
    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandCode::Clear => "CLR",
            CommandCode::Picture => "PIC",
            CommandCode::Position => "POS",
            CommandCode::Move => "MOVE",
            CommandCode::Stop => "STOP",
            CommandCode::Scan => "SCAN",
            CommandCode::Beep => "BEEP",
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a name outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command code: {0}")]
pub struct UnknownCode(pub String);

impl FromStr for CommandCode {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownCode(s.to_string()))
    }
}
