//! USB-MIDI event packets
//!
//! USB-MIDI carries MIDI over fixed 4 byte packets. The first byte holds the cable number in its
//! high nibble and a Code Index Number (CIN) in its low nibble, and the CIN says how many of the
//! following three bytes are MIDI data. Unused bytes are padded with zeros.

use crate::{
    encoder::RawMessage,
    message::{MessageType, MidiMessage},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Code Index Number, classifying the payload of a USB-MIDI event packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum CodeIndex {
    /// Reserved for miscellaneous function codes
    Miscellaneous = 0x0,
    /// Reserved for cable events
    CableEvent = 0x1,
    /// Two byte System Common message
    SystemCommon2 = 0x2,
    /// Three byte System Common message
    SystemCommon3 = 0x3,
    /// SysEx starts or continues, three bytes
    SysexStart = 0x4,
    /// Single byte System Common message, or SysEx ends with one byte
    SysexEnd1 = 0x5,
    /// SysEx ends with two bytes
    SysexEnd2 = 0x6,
    /// SysEx ends with three bytes
    SysexEnd3 = 0x7,
    /// Note Off
    NoteOff = 0x8,
    /// Note On
    NoteOn = 0x9,
    /// Polyphonic Key Pressure
    PolyphonicPressure = 0xA,
    /// Control Change
    ControlChange = 0xB,
    /// Program Change
    ProgramChange = 0xC,
    /// Channel Pressure
    ChannelPressure = 0xD,
    /// Pitch Bend Change
    PitchBend = 0xE,
    /// Single byte
    SingleByte = 0xF,
}

impl CodeIndex {
    /// How many of the three payload bytes carry MIDI data
    pub fn payload_len(self) -> usize {
        match self {
            Self::Miscellaneous | Self::CableEvent => 0,
            Self::SysexEnd1 | Self::SingleByte => 1,
            Self::SystemCommon2
            | Self::SysexEnd2
            | Self::ProgramChange
            | Self::ChannelPressure => 2,
            _ => 3,
        }
    }

    /// Returns true for the codes reserved for future use, which carry no MIDI data
    pub fn is_reserved(self) -> bool {
        matches!(self, Self::Miscellaneous | Self::CableEvent)
    }

    /// The code for a message that fits into a single packet. System Exclusive messages span
    /// several packets and return `None`
    pub fn for_message(message: &MidiMessage<'_>) -> Option<Self> {
        let kind = message.message_type();
        let code = match kind {
            MessageType::Sysex => return None,
            MessageType::TuneRequest => Self::SysexEnd1,
            MessageType::TimeCodeQuarterFrame | MessageType::SongSelect => Self::SystemCommon2,
            MessageType::SongPosition => Self::SystemCommon3,
            voice if voice.is_channel_voice() => Self::from((voice as u8) >> 4),
            _ => Self::SingleByte,
        };

        Some(code)
    }

    /// The code for the last packet of a SysEx message holding `len` bytes, 0xF7 included
    pub fn sysex_end(len: usize) -> Self {
        match len {
            1 => Self::SysexEnd1,
            2 => Self::SysexEnd2,
            _ => Self::SysexEnd3,
        }
    }
}

impl From<u8> for CodeIndex {
    /// Reads the code from the low nibble, the high nibble is ignored
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Self::Miscellaneous,
            0x1 => Self::CableEvent,
            0x2 => Self::SystemCommon2,
            0x3 => Self::SystemCommon3,
            0x4 => Self::SysexStart,
            0x5 => Self::SysexEnd1,
            0x6 => Self::SysexEnd2,
            0x7 => Self::SysexEnd3,
            0x8 => Self::NoteOff,
            0x9 => Self::NoteOn,
            0xA => Self::PolyphonicPressure,
            0xB => Self::ControlChange,
            0xC => Self::ProgramChange,
            0xD => Self::ChannelPressure,
            0xE => Self::PitchBend,
            _ => Self::SingleByte,
        }
    }
}

/// A 4 byte USB-MIDI event packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UsbPacket([u8; 4]);

impl UsbPacket {
    /// Size of a packet on the wire
    pub const LEN: usize = 4;

    /// Builds a packet from a cable number (0-15), a code and up to three payload bytes. Missing
    /// payload bytes are zero, extra bytes are ignored
    pub fn new(cable: u8, code: CodeIndex, payload: &[u8]) -> Self {
        let mut bytes = [((cable & 0x0F) << 4) | code as u8, 0, 0, 0];
        let n = payload.len().min(3);
        bytes[1..=n].copy_from_slice(&payload[..n]);

        Self(bytes)
    }

    /// The single packet carrying a fixed length message, `None` for System Exclusive messages.
    /// Data bytes are masked to 7 bits
    pub fn for_message(cable: u8, message: &MidiMessage<'_>) -> Option<Self> {
        let code = CodeIndex::for_message(message)?;
        let raw = RawMessage::fixed(message)?;

        Some(Self::new(cable, code, raw.as_slice()))
    }

    /// Cable number from the high nibble of the first byte
    pub fn cable(&self) -> u8 {
        self.0[0] >> 4
    }

    /// Code Index Number from the low nibble of the first byte
    pub fn code_index(&self) -> CodeIndex {
        CodeIndex::from(self.0[0])
    }

    /// The payload bytes that carry MIDI data according to the code
    pub fn payload(&self) -> &[u8] {
        &self.0[1..=self.code_index().payload_len()]
    }

    /// Raw packet bytes
    pub fn to_bytes(self) -> [u8; 4] {
        self.0
    }

    /// Raw packet bytes, borrowed
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for UsbPacket {
    fn from(value: [u8; 4]) -> Self {
        Self(value)
    }
}

/// A message decoded from USB-MIDI packets, along with the cable it arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UsbMessage<'a> {
    /// Cable number (0-15)
    pub cable: u8,
    /// The decoded message
    #[cfg_attr(feature = "serde", serde(borrow))]
    pub message: MidiMessage<'a>,
}
