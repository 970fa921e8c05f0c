//! MIDI message definitions: the [`MessageType`] tag and the [`MidiMessage`] payload enum

use status::{is_status, join_14bit, CHANNEL_MASK, SYSEX_END, SYSEX_START};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod status;

/// The kind of a MIDI message. Each tag's value is the status byte that introduces it, with the
/// channel nibble cleared for channel voice messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum MessageType {
    /// Channel voice: Note Off
    NoteOff = 0x80,
    /// Channel voice: Note On
    NoteOn = 0x90,
    /// Channel voice: Polyphonic Key Pressure (aftertouch)
    PolyphonicPressure = 0xA0,
    /// Channel voice: Control Change
    ControlChange = 0xB0,
    /// Channel voice: Program Change
    ProgramChange = 0xC0,
    /// Channel voice: Channel Pressure (aftertouch)
    ChannelPressure = 0xD0,
    /// Channel voice: Pitch Bend Change
    PitchBend = 0xE0,
    /// System Exclusive
    Sysex = 0xF0,
    /// System common: MIDI Time Code Quarter Frame
    TimeCodeQuarterFrame = 0xF1,
    /// System common: Song Position Pointer
    SongPosition = 0xF2,
    /// System common: Song Select
    SongSelect = 0xF3,
    /// System common: Tune Request
    TuneRequest = 0xF6,
    /// System real-time: Timing Clock
    TimingClock = 0xF8,
    /// System real-time: Start
    Start = 0xFA,
    /// System real-time: Continue
    Continue = 0xFB,
    /// System real-time: Stop
    Stop = 0xFC,
    /// System real-time: Active Sensing
    ActiveSense = 0xFE,
    /// System real-time: System Reset
    SystemReset = 0xFF,
}

impl MessageType {
    /// Number of data bytes that follow the status byte. System Exclusive messages have a variable
    /// length and report 0
    pub fn data_len(self) -> usize {
        match self {
            Self::NoteOff
            | Self::NoteOn
            | Self::PolyphonicPressure
            | Self::ControlChange
            | Self::PitchBend
            | Self::SongPosition => 2,
            Self::ProgramChange
            | Self::ChannelPressure
            | Self::TimeCodeQuarterFrame
            | Self::SongSelect => 1,
            _ => 0,
        }
    }

    /// Returns true for messages addressed to one of the 16 channels
    pub fn is_channel_voice(self) -> bool {
        (self as u8) < SYSEX_START
    }

    /// Returns true for single byte messages that may interrupt any other message
    pub fn is_realtime(self) -> bool {
        (self as u8) >= 0xF8
    }
}

/// Error type for a status byte that does not start any known message
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unsupported MIDI status byte 0x{0:02X}")]
pub struct UnsupportedStatusCode(pub u8);

impl TryFrom<u8> for MessageType {
    type Error = UnsupportedStatusCode;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0x80..=0x8F => Self::NoteOff,
            0x90..=0x9F => Self::NoteOn,
            0xA0..=0xAF => Self::PolyphonicPressure,
            0xB0..=0xBF => Self::ControlChange,
            0xC0..=0xCF => Self::ProgramChange,
            0xD0..=0xDF => Self::ChannelPressure,
            0xE0..=0xEF => Self::PitchBend,
            0xF0 => Self::Sysex,
            0xF1 => Self::TimeCodeQuarterFrame,
            0xF2 => Self::SongPosition,
            0xF3 => Self::SongSelect,
            0xF6 => Self::TuneRequest,
            0xF8 => Self::TimingClock,
            0xFA => Self::Start,
            0xFB => Self::Continue,
            0xFC => Self::Stop,
            0xFE => Self::ActiveSense,
            0xFF => Self::SystemReset,
            _ => return Err(UnsupportedStatusCode(value)),
        };

        Ok(kind)
    }
}

/// A single MIDI message.
///
/// Values are stored as given. Anything that does not fit into 7 bits (or 14 bits for pitch bend
/// and song position) is masked off when the message is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MidiMessage<'a> {
    /// Note Off
    /// This message is sent when a note is released
    NoteOff {
        /// Channel (0-15)
        channel: u8,
        /// Note number (0-127)
        note: u8,
        /// Release velocity (0-127)
        velocity: u8,
    },
    /// Note On
    /// This message is sent when a note is depressed. A velocity of zero is commonly treated as a
    /// note off by receivers, but is decoded as a `NoteOn` here
    NoteOn {
        /// Channel (0-15)
        channel: u8,
        /// Note number (0-127)
        note: u8,
        /// Velocity (0-127)
        velocity: u8,
    },
    /// Polyphonic Key Pressure
    PolyphonicPressure {
        /// Channel (0-15)
        channel: u8,
        /// Note number (0-127)
        note: u8,
        /// Pressure value (0-127)
        pressure: u8,
    },
    /// Control Change
    /// This message is sent when a controller value changes. Controllers include devices such as
    /// pedals and levers
    ControlChange {
        /// Channel (0-15)
        channel: u8,
        /// Controller number (0-127)
        controller: u8,
        /// New value (0-127)
        value: u8,
    },
    /// Program Change
    ProgramChange {
        /// Channel (0-15)
        channel: u8,
        /// Program number (0-127)
        program: u8,
    },
    /// Channel Pressure
    ChannelPressure {
        /// Channel (0-15)
        channel: u8,
        /// Pressure value (0-127)
        pressure: u8,
    },
    /// Pitch Bend Change, a fourteen bit value centered on 0x2000
    PitchBend {
        /// Channel (0-15)
        channel: u8,
        /// Bend value (0-16383)
        value: u16,
    },
    /// System Exclusive message. The payload excludes the 0xF0 and 0xF7 framing bytes
    Sysex {
        /// Payload bytes
        data: &'a [u8],
    },
    /// MIDI Time Code Quarter Frame
    TimeCodeQuarterFrame {
        /// Message type nibble and value nibble (0-127)
        value: u8,
    },
    /// Song Position Pointer, in MIDI beats since the start of the song
    SongPosition {
        /// Position (0-16383)
        position: u16,
    },
    /// Song Select
    SongSelect {
        /// Song number (0-127)
        song: u8,
    },
    /// Tune Request
    TuneRequest,
    /// Timing Clock, sent 24 times per quarter note
    TimingClock,
    /// Start the current sequence
    Start,
    /// Continue the current sequence
    Continue,
    /// Stop the current sequence
    Stop,
    /// Active Sensing
    ActiveSense,
    /// System Reset
    SystemReset,
}

impl<'a> MidiMessage<'a> {
    /// Builds a message from its tag and raw data bytes. `data` holds the first and second data
    /// byte as they arrived, `sysex` is only read for [`MessageType::Sysex`]
    pub(crate) fn from_parts(
        kind: MessageType,
        channel: u8,
        data: [u8; 2],
        sysex: &'a [u8],
    ) -> Self {
        let [first, second] = data;

        match kind {
            MessageType::NoteOff => Self::NoteOff {
                channel,
                note: first,
                velocity: second,
            },
            MessageType::NoteOn => Self::NoteOn {
                channel,
                note: first,
                velocity: second,
            },
            MessageType::PolyphonicPressure => Self::PolyphonicPressure {
                channel,
                note: first,
                pressure: second,
            },
            MessageType::ControlChange => Self::ControlChange {
                channel,
                controller: first,
                value: second,
            },
            MessageType::ProgramChange => Self::ProgramChange {
                channel,
                program: first,
            },
            MessageType::ChannelPressure => Self::ChannelPressure {
                channel,
                pressure: first,
            },
            MessageType::PitchBend => Self::PitchBend {
                channel,
                value: join_14bit(first, second),
            },
            MessageType::Sysex => Self::Sysex { data: sysex },
            MessageType::TimeCodeQuarterFrame => Self::TimeCodeQuarterFrame { value: first },
            MessageType::SongPosition => Self::SongPosition {
                position: join_14bit(first, second),
            },
            MessageType::SongSelect => Self::SongSelect { song: first },
            MessageType::TuneRequest => Self::TuneRequest,
            MessageType::TimingClock => Self::TimingClock,
            MessageType::Start => Self::Start,
            MessageType::Continue => Self::Continue,
            MessageType::Stop => Self::Stop,
            MessageType::ActiveSense => Self::ActiveSense,
            MessageType::SystemReset => Self::SystemReset,
        }
    }

    /// Returns the message's tag
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::NoteOff { .. } => MessageType::NoteOff,
            Self::NoteOn { .. } => MessageType::NoteOn,
            Self::PolyphonicPressure { .. } => MessageType::PolyphonicPressure,
            Self::ControlChange { .. } => MessageType::ControlChange,
            Self::ProgramChange { .. } => MessageType::ProgramChange,
            Self::ChannelPressure { .. } => MessageType::ChannelPressure,
            Self::PitchBend { .. } => MessageType::PitchBend,
            Self::Sysex { .. } => MessageType::Sysex,
            Self::TimeCodeQuarterFrame { .. } => MessageType::TimeCodeQuarterFrame,
            Self::SongPosition { .. } => MessageType::SongPosition,
            Self::SongSelect { .. } => MessageType::SongSelect,
            Self::TuneRequest => MessageType::TuneRequest,
            Self::TimingClock => MessageType::TimingClock,
            Self::Start => MessageType::Start,
            Self::Continue => MessageType::Continue,
            Self::Stop => MessageType::Stop,
            Self::ActiveSense => MessageType::ActiveSense,
            Self::SystemReset => MessageType::SystemReset,
        }
    }

    /// Channel of a channel voice message, `None` for system messages
    pub fn channel(&self) -> Option<u8> {
        match *self {
            Self::NoteOff { channel, .. }
            | Self::NoteOn { channel, .. }
            | Self::PolyphonicPressure { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelPressure { channel, .. }
            | Self::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// The status byte that starts this message on the wire
    pub fn status_byte(&self) -> u8 {
        let tag = self.message_type() as u8;
        match self.channel() {
            Some(channel) => tag | (channel & CHANNEL_MASK),
            None => tag,
        }
    }

    /// Returns true for single byte messages that may interrupt any other message
    pub fn is_realtime(&self) -> bool {
        self.message_type().is_realtime()
    }

    /// Returns true for messages addressed to one of the 16 channels
    pub fn is_channel_voice(&self) -> bool {
        self.message_type().is_channel_voice()
    }
}

/// Error type for parsing a single message out of a byte slice
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    /// There were no bytes to parse
    #[error("No bytes to parse a MIDI message from")]
    Empty,
    /// The message did not start with a status byte
    #[error("Expected a status byte, found data byte 0x{0:02X}")]
    MissingStatus(u8),
    /// The leading status byte does not start a message
    #[error("Invalid status byte: {0}")]
    UnsupportedStatus(#[from] UnsupportedStatusCode),
    /// A status byte showed up where a data byte was expected
    #[error("Unexpected status byte 0x{0:02X} inside message data")]
    UnexpectedStatus(u8),
    /// The slice ended before the message was complete
    #[error("Message needs {expected} bytes but only {found} were given")]
    Truncated {
        /// Bytes the message requires, status byte included
        expected: usize,
        /// Bytes that were available
        found: usize,
    },
    /// Bytes remained after a complete message
    #[error("{0} trailing bytes after a complete message")]
    TrailingBytes(usize),
    /// A System Exclusive message was not closed with 0xF7
    #[error("Missing end of System Exclusive Message 0xF7 byte")]
    MissingEndOfExclusive,
}

/// Parses a slice holding exactly one complete message, status byte first. Real-time bytes
/// interleaved with the message are rejected as [`MessageError::UnexpectedStatus`], even inside a
/// SysEx payload; use the [`Decoder`](crate::decoder::Decoder) for live streams.
impl<'a> TryFrom<&'a [u8]> for MidiMessage<'a> {
    type Error = MessageError;
    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        let (&status, data) = value.split_first().ok_or(MessageError::Empty)?;
        if !is_status(status) {
            return Err(MessageError::MissingStatus(status));
        }

        let kind = MessageType::try_from(status)?;

        if kind == MessageType::Sysex {
            let end = data
                .iter()
                .position(|&byte| byte == SYSEX_END)
                .ok_or(MessageError::MissingEndOfExclusive)?;

            let payload = &data[..end];
            if let Some(&byte) = payload.iter().find(|&&byte| is_status(byte)) {
                return Err(MessageError::UnexpectedStatus(byte));
            }

            let trailing = data.len() - end - 1;
            if trailing > 0 {
                return Err(MessageError::TrailingBytes(trailing));
            }

            return Ok(Self::Sysex { data: payload });
        }

        let needed = kind.data_len();
        if data.len() < needed {
            return Err(MessageError::Truncated {
                expected: needed + 1,
                found: value.len(),
            });
        }
        if data.len() > needed {
            return Err(MessageError::TrailingBytes(data.len() - needed));
        }
        if let Some(&byte) = data.iter().find(|&&byte| is_status(byte)) {
            return Err(MessageError::UnexpectedStatus(byte));
        }

        let mut raw = [0u8; 2];
        raw[..needed].copy_from_slice(data);

        let channel = if kind.is_channel_voice() {
            status & CHANNEL_MASK
        } else {
            0
        };

        Ok(Self::from_parts(kind, channel, raw, &[]))
    }
}
