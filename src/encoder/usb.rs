//! USB-MIDI packet encoder

use crate::{
    encoder::{ensure_capacity, EncodeError},
    message::{
        status::{data_byte, SYSEX_END, SYSEX_START},
        MidiMessage,
    },
    usb::{CodeIndex, UsbPacket},
    writer::MidiSink,
};

/// Number of packets needed to carry a SysEx payload of `len` bytes plus its two framing bytes
pub fn sysex_packet_count(len: usize) -> usize {
    (len + 2).div_ceil(3)
}

/// Iterator over the packets of one SysEx message
///
/// The payload is framed as `0xF0 payload 0xF7` and cut into runs of three bytes. Every packet
/// but the last uses [`CodeIndex::SysexStart`]; the last one says how many of its bytes are used.
#[derive(Debug, Clone)]
pub struct SysexPackets<'a> {
    /// Payload, framing excluded
    data: &'a [u8],
    /// Cable number for every packet
    cable: u8,
    /// Index into the framed sequence, where 0 is the 0xF0 marker
    position: usize,
}

impl<'a> SysexPackets<'a> {
    /// Packets carrying `data` on `cable`
    pub fn new(data: &'a [u8], cable: u8) -> Self {
        Self {
            data,
            cable,
            position: 0,
        }
    }

    /// Length of the framed sequence
    fn framed_len(&self) -> usize {
        self.data.len() + 2
    }

    /// Byte `index` of the framed sequence
    fn framed_byte(&self, index: usize) -> u8 {
        if index == 0 {
            SYSEX_START
        } else if index > self.data.len() {
            SYSEX_END
        } else {
            data_byte(self.data[index - 1])
        }
    }
}

impl Iterator for SysexPackets<'_> {
    type Item = UsbPacket;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.framed_len();
        if self.position >= total {
            return None;
        }

        let end = (self.position + 3).min(total);
        let mut payload = [0u8; 3];
        for (slot, index) in payload.iter_mut().zip(self.position..end) {
            *slot = self.framed_byte(index);
        }

        let len = end - self.position;
        let code = if end == total {
            CodeIndex::sysex_end(len)
        } else {
            CodeIndex::SysexStart
        };
        self.position = end;

        Some(UsbPacket::new(self.cable, code, &payload[..len]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.framed_len() - self.position.min(self.framed_len())).div_ceil(3);
        (left, Some(left))
    }
}

impl ExactSizeIterator for SysexPackets<'_> {}

/// Encodes a single message into `sink` as USB-MIDI event packets on `cable` (0-15), returning
/// the number of bytes the sink accepted, a multiple of four unless a write came up short.
///
/// Fixed length messages take exactly one packet. SysEx messages take
/// [`sysex_packet_count`] packets, all of which are checked against the sink's capacity before
/// the first one is written.
pub fn encode_usb<W: MidiSink + ?Sized>(
    sink: &mut W,
    message: &MidiMessage<'_>,
    cable: u8,
) -> Result<usize, EncodeError> {
    if let MidiMessage::Sysex { data } = *message {
        return encode_sysex_usb(sink, data, cable);
    }

    match UsbPacket::for_message(cable, message) {
        Some(packet) => {
            ensure_capacity(sink, UsbPacket::LEN)?;
            Ok(sink.write(packet.as_bytes()))
        }
        None => Ok(0),
    }
}

/// Writes every packet of a SysEx message, stopping at the first short write
fn encode_sysex_usb<W: MidiSink + ?Sized>(
    sink: &mut W,
    data: &[u8],
    cable: u8,
) -> Result<usize, EncodeError> {
    let packets = SysexPackets::new(data, cable);
    ensure_capacity(sink, packets.len() * UsbPacket::LEN)?;

    let mut written = 0;
    for packet in packets {
        let n = sink.write(packet.as_bytes());
        written += n;
        if n < UsbPacket::LEN {
            tracing::debug!("usb sysex write stopped after {written} bytes");
            break;
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::{encode_usb, sysex_packet_count, SysexPackets};
    use crate::{
        encoder::EncodeError, message::MidiMessage, reader::Limited, usb::CodeIndex,
        writer::BufferSink,
    };

    #[test]
    fn note_on_fits_one_packet() {
        let mut bytes: Vec<u8> = Vec::new();
        let message = MidiMessage::NoteOn {
            channel: 1,
            note: 60,
            velocity: 127,
        };

        assert_eq!(encode_usb(&mut bytes, &message, 0), Ok(4));
        assert_eq!(bytes, vec![0x09, 0x91, 60, 127])
    }

    #[test]
    fn realtime_messages_use_single_byte_code() {
        let mut bytes: Vec<u8> = Vec::new();

        encode_usb(&mut bytes, &MidiMessage::Start, 5).expect("Encode start");
        assert_eq!(bytes, vec![0x5F, 0xFA, 0x00, 0x00])
    }

    #[test]
    fn song_position_uses_three_byte_system_code() {
        let mut bytes: Vec<u8> = Vec::new();

        encode_usb(&mut bytes, &MidiMessage::SongPosition { position: 0x2001 }, 0)
            .expect("Encode song position");
        assert_eq!(bytes, vec![0x03, 0xF2, 0x01, 0x40])
    }

    #[test]
    fn packet_count_covers_framing() {
        assert_eq!(sysex_packet_count(0), 1);
        assert_eq!(sysex_packet_count(1), 1);
        assert_eq!(sysex_packet_count(2), 2);
        assert_eq!(sysex_packet_count(4), 2);
        assert_eq!(sysex_packet_count(5), 3)
    }

    #[test]
    fn short_sysex_fits_one_packet() {
        let mut bytes: Vec<u8> = Vec::new();

        encode_usb(&mut bytes, &MidiMessage::Sysex { data: &[] }, 0).expect("Encode empty");
        encode_usb(&mut bytes, &MidiMessage::Sysex { data: &[0x42] }, 0).expect("Encode one");

        assert_eq!(
            bytes,
            vec![0x06, 0xF0, 0xF7, 0x00, 0x07, 0xF0, 0x42, 0xF7]
        )
    }

    #[test]
    fn five_byte_sysex_spans_three_packets() {
        let data = [1u8, 2, 3, 4, 5];
        let packets: Vec<[u8; 4]> = SysexPackets::new(&data, 1)
            .map(|packet| packet.to_bytes())
            .collect();

        assert_eq!(
            packets,
            vec![
                [0x14, 0xF0, 1, 2],
                [0x14, 3, 4, 5],
                [0x15, 0xF7, 0x00, 0x00],
            ]
        )
    }

    #[test]
    fn sysex_end_code_tracks_leftover_bytes() {
        let codes = |len: usize| {
            let data = vec![0x11; len];
            SysexPackets::new(&data, 0)
                .last()
                .map(|packet| packet.code_index())
        };

        assert_eq!(codes(3), Some(CodeIndex::SysexEnd2));
        assert_eq!(codes(4), Some(CodeIndex::SysexEnd3));
        assert_eq!(codes(5), Some(CodeIndex::SysexEnd1))
    }

    #[test]
    fn sysex_packets_report_exact_length() {
        let data = [0u8; 10];
        let mut packets = SysexPackets::new(&data, 0);

        assert_eq!(packets.len(), 4);
        packets.next();
        assert_eq!(packets.len(), 3)
    }

    #[test]
    fn sysex_larger_than_capacity_writes_nothing() {
        let mut buf = [0u8; 8];
        let mut sink = BufferSink::new(&mut buf);

        assert_eq!(
            encode_usb(&mut sink, &MidiMessage::Sysex { data: &[1, 2, 3, 4, 5] }, 0),
            Err(EncodeError::InsufficientCapacity {
                required: 12,
                available: 8
            })
        );
        assert!(sink.is_empty())
    }

    #[test]
    fn packet_larger_than_capacity_writes_nothing() {
        let mut sink = Limited::new(Vec::<u8>::new(), 3);

        assert_eq!(
            encode_usb(&mut sink, &MidiMessage::Stop, 0),
            Err(EncodeError::InsufficientCapacity {
                required: 4,
                available: 3
            })
        )
    }
}
