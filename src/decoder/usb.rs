//! USB-MIDI packet decoding on top of the byte decoder

use crate::{
    decoder::{Completed, Decoder},
    reader::MidiSource,
    usb::{UsbMessage, UsbPacket},
};

impl Decoder<'_> {
    /// Pulls 4 byte USB-MIDI event packets from `source` until a message completes, returning it
    /// along with the cable number of the packet that completed it.
    ///
    /// Returns `None` once the source can't deliver a whole packet. A short read drops the
    /// partial packet.
    pub fn decode_usb<S: MidiSource + ?Sized>(&mut self, source: &mut S) -> Option<UsbMessage<'_>> {
        let mut bytes = [0u8; UsbPacket::LEN];

        loop {
            if !source.capacity().admits(UsbPacket::LEN) {
                return None;
            }

            let read = source.read(&mut bytes);
            if read < UsbPacket::LEN {
                if read > 0 {
                    tracing::trace!("dropping partial usb packet of {read} bytes");
                }
                return None;
            }

            let packet = UsbPacket::from(bytes);
            if let Some(done) = self.feed_packet(&packet) {
                return Some(UsbMessage {
                    cable: packet.cable(),
                    message: self.completed(done),
                });
            }
        }
    }

    /// Feeds a single packet, returning the message it completes if any
    pub fn push_usb(&mut self, packet: UsbPacket) -> Option<UsbMessage<'_>> {
        self.feed_packet(&packet).map(|done| UsbMessage {
            cable: packet.cable(),
            message: self.completed(done),
        })
    }

    /// Feeds the payload bytes the packet's code marks as used, stopping at the first message
    fn feed_packet(&mut self, packet: &UsbPacket) -> Option<Completed> {
        let code = packet.code_index();
        if code.is_reserved() {
            tracing::trace!("ignoring usb packet with reserved code {code:?}");
            return None;
        }

        packet.payload().iter().find_map(|&byte| self.feed(byte))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        decoder::Decoder,
        encoder::usb::encode_usb,
        message::MidiMessage,
        reader::{BufferSource, Limited},
        usb::{UsbMessage, UsbPacket},
    };

    #[test]
    fn channel_message_packet_decodes_with_cable() {
        let bytes = [0x39, 0x93, 0x3C, 0x64];
        let mut source = BufferSource::new(&bytes);
        let mut decoder = Decoder::new();

        assert_eq!(
            decoder.decode_usb(&mut source),
            Some(UsbMessage {
                cable: 3,
                message: MidiMessage::NoteOn {
                    channel: 3,
                    note: 0x3C,
                    velocity: 0x64
                }
            })
        )
    }

    #[test]
    fn padding_bytes_are_not_fed() {
        let bytes = [0x0C, 0xC0, 0x05, 0x7F, 0x0C, 0xC0, 0x06, 0x00];
        let mut source = BufferSource::new(&bytes);
        let mut decoder = Decoder::new();

        for program in [5, 6] {
            assert_eq!(
                decoder.decode_usb(&mut source).map(|usb| usb.message),
                Some(MidiMessage::ProgramChange {
                    channel: 0,
                    program
                })
            );
        }
    }

    #[test]
    fn reserved_packets_are_skipped() {
        let bytes = [0x00, 0x90, 0x40, 0x40, 0x1F, 0xF8, 0x00, 0x00];
        let mut source = BufferSource::new(&bytes);
        let mut decoder = Decoder::new();

        assert_eq!(
            decoder.decode_usb(&mut source),
            Some(UsbMessage {
                cable: 1,
                message: MidiMessage::TimingClock
            })
        )
    }

    #[test]
    fn sysex_packets_round_trip() {
        let payload = [1u8, 2, 3, 4, 5];
        let mut packets: Vec<u8> = Vec::new();
        encode_usb(&mut packets, &MidiMessage::Sysex { data: &payload }, 7)
            .expect("Encode sysex");
        assert_eq!(packets.len(), 12);

        let mut buf = [0u8; 16];
        let mut source = BufferSource::new(&packets);
        let mut decoder = Decoder::with_sysex_buffer(&mut buf);

        assert_eq!(
            decoder.decode_usb(&mut source),
            Some(UsbMessage {
                cable: 7,
                message: MidiMessage::Sysex { data: &payload }
            })
        );
        assert!(source.is_empty())
    }

    #[test]
    fn short_sysex_packets_round_trip() {
        let mut decoder = Decoder::new();

        let empty = UsbPacket::from([0x06, 0xF0, 0xF7, 0x00]);
        assert_eq!(
            decoder.push_usb(empty).map(|usb| usb.message),
            Some(MidiMessage::Sysex { data: &[] })
        )
    }

    /// SysEx of five bytes on cable 2 with a clock packet after its first packet
    const INTERLEAVED_SYSEX: [u8; 16] = [
        0x24, 0xF0, 0x01, 0x02, 0x2F, 0xF8, 0x00, 0x00, 0x24, 0x03, 0x04, 0x05, 0x25, 0xF7, 0x00,
        0x00,
    ];

    #[test]
    fn clock_packet_inside_sysex_keeps_payload() {
        let mut buf = [0u8; 8];
        let mut source = BufferSource::new(&INTERLEAVED_SYSEX);
        let mut decoder = Decoder::with_sysex_buffer(&mut buf);

        assert_eq!(
            decoder.decode_usb(&mut source),
            Some(UsbMessage {
                cable: 2,
                message: MidiMessage::TimingClock
            })
        );
        assert_eq!(
            decoder.decode_usb(&mut source),
            Some(UsbMessage {
                cable: 2,
                message: MidiMessage::Sysex {
                    data: &[1, 2, 3, 4, 5]
                }
            })
        );
        assert!(!decoder.sysex_truncated())
    }

    #[test]
    fn oversized_usb_sysex_is_truncated() {
        let mut buf = [0u8; 3];
        let mut source = BufferSource::new(&INTERLEAVED_SYSEX);
        let mut decoder = Decoder::with_sysex_buffer(&mut buf);

        decoder.decode_usb(&mut source).expect("Timing clock");
        assert_eq!(
            decoder.decode_usb(&mut source).map(|usb| usb.message),
            Some(MidiMessage::Sysex { data: &[1, 2, 3] })
        );
        assert!(decoder.sysex_truncated())
    }

    #[test]
    fn usb_sysex_without_buffer_has_empty_payload() {
        let mut source = BufferSource::new(&INTERLEAVED_SYSEX);
        let mut decoder = Decoder::new();

        assert_eq!(
            decoder.decode_usb(&mut source).map(|usb| usb.message),
            Some(MidiMessage::TimingClock)
        );
        assert_eq!(
            decoder.decode_usb(&mut source).map(|usb| usb.message),
            Some(MidiMessage::Sysex { data: &[] })
        );
        assert!(decoder.sysex_truncated())
    }

    #[test]
    fn partial_packet_ends_decoding() {
        let bytes = [0x09, 0x90, 0x40];
        let mut source = BufferSource::new(&bytes);
        let mut decoder = Decoder::new();

        assert_eq!(decoder.decode_usb(&mut source), None)
    }

    #[test]
    fn budget_below_a_packet_reads_nothing() {
        let bytes = [0x0F, 0xFA, 0x00, 0x00];
        let mut source = Limited::new(BufferSource::new(&bytes), 3);
        let mut decoder = Decoder::new();

        assert_eq!(decoder.decode_usb(&mut source), None);
        assert_eq!(source.into_inner().position(), 0)
    }
}
