//! Status byte constants and classification

use super::MessageType;

/// Creates a status byte constant
macro_rules! status_byte {
    ($(#[$doc:meta])* $const_name:ident, $value:expr_2021) => {
        $(#[$doc])*
        pub const $const_name: u8 = $value;
    };
}

status_byte!(
    /// Start of a System Exclusive message ("SOX")
    SYSEX_START,
    0xF0
);
status_byte!(
    /// End of a System Exclusive message ("EOX")
    SYSEX_END,
    0xF7
);
status_byte!(
    /// Bit that marks a status byte
    STATUS_BIT,
    0x80
);
status_byte!(
    /// Mask applied to every data byte put on the wire
    DATA_MASK,
    0x7F
);
status_byte!(
    /// Mask selecting the channel nibble of a channel voice status
    CHANNEL_MASK,
    0x0F
);

/// Returns true if the msb of a byte is set, marking it as a status byte
pub fn is_status(byte: u8) -> bool {
    byte & STATUS_BIT != 0
}

/// Clamps a value to the 7 bits a MIDI data byte can carry
pub fn data_byte(value: u8) -> u8 {
    value & DATA_MASK
}

/// Lower 7 bits of a 14 bit value, sent first on the wire
pub fn lsb(value: u16) -> u8 {
    data_byte(value as u8)
}

/// Upper 7 bits of a 14 bit value, sent second on the wire
pub fn msb(value: u16) -> u8 {
    data_byte((value >> 7) as u8)
}

/// Joins two 7 bit data bytes, least significant first, into a 14 bit value
pub fn join_14bit(lsb: u8, msb: u8) -> u16 {
    u16::from(data_byte(lsb)) | (u16::from(data_byte(msb)) << 7)
}

/// What role a status byte plays in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    /// Single byte real-time message, may appear between any two bytes
    Realtime(MessageType),
    /// 0xF9 and 0xFD, reserved real-time slots
    UndefinedRealtime,
    /// 0xF0
    SysexStart,
    /// 0xF7
    SysexEnd,
    /// Time code, song position, song select and tune request
    SystemCommon(MessageType),
    /// 0xF4 and 0xF5, reserved system common slots
    UndefinedSystemCommon,
    /// 0x80-0xEF, carrying the channel in the low nibble
    ChannelVoice(MessageType, u8),
}

impl StatusClass {
    /// Classifies a byte whose msb is set
    pub(crate) fn of(status: u8) -> Self {
        match status {
            SYSEX_START => Self::SysexStart,
            SYSEX_END => Self::SysexEnd,
            0xF9 | 0xFD => Self::UndefinedRealtime,
            0xF4 | 0xF5 => Self::UndefinedSystemCommon,
            _ => match MessageType::try_from(status) {
                Ok(kind) if kind.is_realtime() => Self::Realtime(kind),
                Ok(kind) if kind.is_channel_voice() => {
                    Self::ChannelVoice(kind, status & CHANNEL_MASK)
                }
                Ok(kind) => Self::SystemCommon(kind),
                Err(_) => Self::UndefinedSystemCommon,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{join_14bit, lsb, msb, StatusClass};
    use crate::message::MessageType;

    #[test]
    fn fourteen_bit_values_split_lsb_first() {
        let value = 0x2001;

        assert_eq!(lsb(value), 0x01);
        assert_eq!(msb(value), 0x40);
        assert_eq!(join_14bit(0x01, 0x40), value)
    }

    #[test]
    fn fourteen_bit_split_drops_out_of_range_bits() {
        assert_eq!(msb(0xFFFF), 0x7F);
        assert_eq!(join_14bit(0xFF, 0xFF), 0x3FFF)
    }

    #[test]
    fn status_bytes_are_classified() {
        assert_eq!(
            StatusClass::of(0x93),
            StatusClass::ChannelVoice(MessageType::NoteOn, 3)
        );
        assert_eq!(
            StatusClass::of(0xF8),
            StatusClass::Realtime(MessageType::TimingClock)
        );
        assert_eq!(
            StatusClass::of(0xF2),
            StatusClass::SystemCommon(MessageType::SongPosition)
        );
        assert_eq!(StatusClass::of(0xF0), StatusClass::SysexStart);
        assert_eq!(StatusClass::of(0xF7), StatusClass::SysexEnd);
        assert_eq!(StatusClass::of(0xFD), StatusClass::UndefinedRealtime);
        assert_eq!(StatusClass::of(0xF5), StatusClass::UndefinedSystemCommon)
    }
}
