//! MIDI message encoder
//!
//! Turns a [`MidiMessage`] into its canonical byte sequence. Running status is never produced on
//! output, every message carries its own status byte. A message is either written whole or not
//! at all: its size is checked against the sink's [`Capacity`](crate::Capacity) before anything
//! is written.

use thiserror::Error;

use crate::{
    message::{
        status::{data_byte, lsb, msb, SYSEX_END, SYSEX_START},
        MidiMessage,
    },
    writer::MidiSink,
};

pub mod usb;

/// Payload bytes masked per write when encoding SysEx
const SYSEX_CHUNK: usize = 64;

/// Error type for encoding into a sink
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The sink's remaining capacity cannot hold the whole message, nothing was written
    #[error("Message needs {required} bytes but the sink only has room for {available}")]
    InsufficientCapacity {
        /// Bytes the message needs
        required: usize,
        /// Bytes the sink had room for
        available: usize,
    },
}

/// A fixed length message laid out as it goes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawMessage {
    /// Status byte followed by up to two data bytes
    bytes: [u8; 3],
    /// Number of valid bytes
    len: usize,
}

impl RawMessage {
    /// Lays out every message kind except System Exclusive, which returns `None`
    pub(crate) fn fixed(message: &MidiMessage<'_>) -> Option<Self> {
        let (first, second) = match *message {
            MidiMessage::Sysex { .. } => return None,
            MidiMessage::NoteOff { note, velocity, .. }
            | MidiMessage::NoteOn { note, velocity, .. } => (note, velocity),
            MidiMessage::PolyphonicPressure { note, pressure, .. } => (note, pressure),
            MidiMessage::ControlChange {
                controller, value, ..
            } => (controller, value),
            MidiMessage::ProgramChange { program, .. } => (program, 0),
            MidiMessage::ChannelPressure { pressure, .. } => (pressure, 0),
            MidiMessage::PitchBend { value, .. } => (lsb(value), msb(value)),
            MidiMessage::TimeCodeQuarterFrame { value } => (value, 0),
            MidiMessage::SongPosition { position } => (lsb(position), msb(position)),
            MidiMessage::SongSelect { song } => (song, 0),
            _ => (0, 0),
        };

        Some(Self {
            bytes: [message.status_byte(), data_byte(first), data_byte(second)],
            len: 1 + message.message_type().data_len(),
        })
    }

    /// The bytes to put on the wire
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Fails unless the sink has room for `required` more bytes
pub(crate) fn ensure_capacity<W: MidiSink + ?Sized>(
    sink: &W,
    required: usize,
) -> Result<(), EncodeError> {
    let capacity = sink.capacity();
    if capacity.admits(required) {
        Ok(())
    } else {
        Err(EncodeError::InsufficientCapacity {
            required,
            available: capacity.remaining().unwrap_or(usize::MAX),
        })
    }
}

/// Encodes a single message into `sink`, returning the number of bytes the sink accepted.
///
/// Fixed length messages are handed to the sink in one write. SysEx messages are written as the
/// 0xF0 marker, the payload and the 0xF7 marker; if the sink accepts fewer bytes than offered
/// the encoder stops there and reports what was written. Every data byte is masked to 7 bits.
pub fn encode<W: MidiSink + ?Sized>(
    sink: &mut W,
    message: &MidiMessage<'_>,
) -> Result<usize, EncodeError> {
    match RawMessage::fixed(message) {
        Some(raw) => {
            let bytes = raw.as_slice();
            ensure_capacity(sink, bytes.len())?;

            Ok(sink.write(bytes))
        }
        None => match *message {
            MidiMessage::Sysex { data } => encode_sysex(sink, data),
            _ => Ok(0),
        },
    }
}

/// Writes a framed, masked SysEx payload
fn encode_sysex<W: MidiSink + ?Sized>(sink: &mut W, data: &[u8]) -> Result<usize, EncodeError> {
    let required = data.len() + 2;
    ensure_capacity(sink, required)?;

    let mut written = sink.write(&[SYSEX_START]);
    if written < 1 {
        return Ok(written);
    }

    let mut masked = [0u8; SYSEX_CHUNK];
    for chunk in data.chunks(SYSEX_CHUNK) {
        for (dst, &src) in masked.iter_mut().zip(chunk) {
            *dst = data_byte(src);
        }

        let n = sink.write(&masked[..chunk.len()]);
        written += n;
        if n < chunk.len() {
            tracing::debug!("sysex write stopped after {written} of {required} bytes");
            return Ok(written);
        }
    }

    written += sink.write(&[SYSEX_END]);

    Ok(written)
}

impl MidiMessage<'_> {
    /// Encodes the message into `sink`, see [`encode`]
    pub fn encode<W: MidiSink + ?Sized>(&self, sink: &mut W) -> Result<usize, EncodeError> {
        encode(sink, self)
    }

    /// Encodes the message into `sink` as USB-MIDI packets, see [`usb::encode_usb`]
    pub fn encode_usb<W: MidiSink + ?Sized>(
        &self,
        sink: &mut W,
        cable: u8,
    ) -> Result<usize, EncodeError> {
        usb::encode_usb(sink, self, cable)
    }
}

#[cfg(test)]
mod tests {
    use super::{encode, EncodeError};
    use crate::{message::MidiMessage, reader::Limited, writer::BufferSink};

    #[test]
    fn note_on_encodes_with_channel() {
        let mut bytes: Vec<u8> = Vec::new();
        let message = MidiMessage::NoteOn {
            channel: 2,
            note: 48,
            velocity: 10,
        };

        assert_eq!(encode(&mut bytes, &message), Ok(3));
        assert_eq!(bytes, vec![0x92, 48, 10])
    }

    #[test]
    fn data_bytes_are_masked_to_seven_bits() {
        let mut bytes: Vec<u8> = Vec::new();
        let message = MidiMessage::ControlChange {
            channel: 0,
            controller: 0xFF,
            value: 0x80,
        };

        encode(&mut bytes, &message).expect("Encode into vector");
        assert_eq!(bytes, vec![0xB0, 0x7F, 0x00])
    }

    #[test]
    fn fourteen_bit_values_go_lsb_first() {
        let mut bytes: Vec<u8> = Vec::new();

        encode(&mut bytes, &MidiMessage::PitchBend { channel: 15, value: 0x3FFF })
            .expect("Encode pitch bend");
        encode(&mut bytes, &MidiMessage::SongPosition { position: 0x0081 })
            .expect("Encode song position");

        assert_eq!(bytes, vec![0xEF, 0x7F, 0x7F, 0xF2, 0x01, 0x01])
    }

    #[test]
    fn single_byte_messages_encode_status_only() {
        let mut bytes: Vec<u8> = Vec::new();

        encode(&mut bytes, &MidiMessage::TuneRequest).expect("Encode tune request");
        encode(&mut bytes, &MidiMessage::TimingClock).expect("Encode clock");
        encode(&mut bytes, &MidiMessage::SystemReset).expect("Encode reset");

        assert_eq!(bytes, vec![0xF6, 0xF8, 0xFF])
    }

    #[test]
    fn message_larger_than_capacity_writes_nothing() {
        let mut buf = [0u8; 2];
        let mut sink = BufferSink::new(&mut buf);
        let message = MidiMessage::NoteOff {
            channel: 0,
            note: 60,
            velocity: 0,
        };

        assert_eq!(
            encode(&mut sink, &message),
            Err(EncodeError::InsufficientCapacity {
                required: 3,
                available: 2
            })
        );
        assert!(sink.is_empty())
    }

    #[test]
    fn sysex_is_framed_and_masked() {
        let mut bytes: Vec<u8> = Vec::new();
        let message = MidiMessage::Sysex {
            data: &[0x0A, 0x8C, 0x0A, 0x0B],
        };

        assert_eq!(encode(&mut bytes, &message), Ok(6));
        assert_eq!(bytes, vec![0xF0, 0x0A, 0x0C, 0x0A, 0x0B, 0xF7])
    }

    #[test]
    fn empty_sysex_is_just_framing() {
        let mut bytes: Vec<u8> = Vec::new();

        assert_eq!(encode(&mut bytes, &MidiMessage::Sysex { data: &[] }), Ok(2));
        assert_eq!(bytes, vec![0xF0, 0xF7])
    }

    #[test]
    fn long_sysex_spanning_chunks_is_written_whole() {
        let payload: Vec<u8> = (0..200u8).map(|i| i & 0x7F).collect();
        let mut bytes: Vec<u8> = Vec::new();

        assert_eq!(
            encode(&mut bytes, &MidiMessage::Sysex { data: &payload }),
            Ok(202)
        );
        assert_eq!(bytes[0], 0xF0);
        assert_eq!(&bytes[1..201], &payload[..]);
        assert_eq!(bytes[201], 0xF7)
    }

    #[test]
    fn sysex_larger_than_capacity_writes_nothing() {
        let mut sink = Limited::new(Vec::<u8>::new(), 5);
        let message = MidiMessage::Sysex {
            data: b"More than 6 bytes",
        };

        assert_eq!(
            encode(&mut sink, &message),
            Err(EncodeError::InsufficientCapacity {
                required: 19,
                available: 5
            })
        );
        assert!(sink.into_inner().is_empty())
    }

    #[test]
    fn method_form_matches_free_function() {
        let mut bytes: Vec<u8> = Vec::new();
        let message = MidiMessage::ChannelPressure {
            channel: 9,
            pressure: 33,
        };

        assert_eq!(message.encode(&mut bytes), Ok(2));
        assert_eq!(bytes, vec![0xD9, 33])
    }
}
