/// Byte order of multi-byte numbers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// The byte order shared by the robot and every host.
///
/// There is no negotiation. The firmware runs on a little-endian Cortex-M and
/// stores values in native order, so the wire is little-endian.
pub const WIRE_BYTE_ORDER: ByteOrder = ByteOrder::Little;

impl ByteOrder {
    pub fn f32_to_bytes(self, value: f32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    pub fn f32_from_bytes(self, bytes: [u8; 4]) -> f32 {
        match self {
            ByteOrder::Little => f32::from_le_bytes(bytes),
            ByteOrder::Big => f32::from_be_bytes(bytes),
        }
    }

    pub fn u16_to_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    pub fn u16_from_bytes(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(bytes),
            ByteOrder::Big => u16::from_be_bytes(bytes),
        }
    }

    pub fn i16_to_bytes(self, value: i16) -> [u8; 2] {
        self.u16_to_bytes(value as u16)
    }

    pub fn i16_from_bytes(self, bytes: [u8; 2]) -> i16 {
        self.u16_from_bytes(bytes) as i16
    }
}
