//! Running status decoder
//!
//! The [`Decoder`] is a byte at a time state machine. It assembles the message in progress from
//! a status byte and its data bytes, re-applies the last channel voice status when a sender
//! omits it, lets real-time bytes through without disturbing anything, and collects System
//! Exclusive payloads into a buffer lent by the caller.

use crate::{
    message::{
        status::{is_status, StatusClass},
        MessageType, MidiMessage,
    },
    reader::MidiSource,
};

pub mod usb;

/// What the decoder is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// The next byte should be a status byte, or a data byte restarting running status
    ExpectingStatus,
    /// Data bytes of the pending message are still missing
    AccumulatingData {
        /// Data bytes still to come
        remaining: usize,
    },
    /// Inside `0xF0 ... 0xF7`
    AccumulatingSysex,
    /// After an undefined status, data bytes are dropped until the next status byte
    Discarding,
}

/// A message finished by the last byte. Carries no borrow so the decoder can be mutated while
/// producing it and read afterwards to build the [`MidiMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completed {
    /// A real-time message, which never touches the pending message
    Realtime(MessageType),
    /// The pending message
    Message,
    /// The System Exclusive payload collected so far
    Sysex,
}

/// Caller lent storage for System Exclusive payloads
#[derive(Debug)]
struct SysexBuffer<'buf> {
    /// The lent buffer
    data: &'buf mut [u8],
    /// Bytes collected for the current message
    len: usize,
    /// Whether bytes of the current message were dropped for lack of room
    truncated: bool,
}

impl<'buf> SysexBuffer<'buf> {
    /// Wraps an empty buffer around `data`
    fn new(data: &'buf mut [u8]) -> Self {
        Self {
            data,
            len: 0,
            truncated: false,
        }
    }

    /// Forgets the current message
    fn clear(&mut self) {
        self.len = 0;
        self.truncated = false;
    }

    /// Appends a byte, or drops it and marks the message truncated when the buffer is full
    fn push(&mut self, byte: u8) {
        match self.data.get_mut(self.len) {
            Some(slot) => {
                *slot = byte;
                self.len += 1;
            }
            None => {
                if !self.truncated {
                    tracing::debug!(
                        "sysex buffer of {} bytes is full, dropping the rest of the message",
                        self.data.len()
                    );
                }
                self.truncated = true;
            }
        }
    }

    /// The collected payload
    fn contents(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

/// A streaming MIDI decoder
///
/// Feed it bytes with [`Decoder::decode`] from a [`MidiSource`], or one at a time with
/// [`Decoder::push`]. Partial messages are kept across calls, so a source that runs dry in the
/// middle of a message can simply be decoded from again once more bytes are available.
///
/// Returned messages borrow the decoder, SysEx payloads point into the buffer given to
/// [`Decoder::with_sysex_buffer`].
#[derive(Debug)]
pub struct Decoder<'buf> {
    /// What the next byte is expected to be
    state: DecoderState,
    /// Tag of the pending message
    kind: MessageType,
    /// Channel of the pending message, 0 for system messages
    channel: u8,
    /// Data bytes of the pending message
    data: [u8; 2],
    /// Last channel voice status, reused for data bytes that arrive without a status
    running_status: Option<(MessageType, u8)>,
    /// System Exclusive storage
    sysex: SysexBuffer<'buf>,
}

impl Default for Decoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'buf> Decoder<'buf> {
    /// A decoder without SysEx storage. System Exclusive messages are still recognized and
    /// returned, with an empty payload
    pub fn new() -> Self {
        Self::with_sysex_buffer(Default::default())
    }

    /// A decoder that collects System Exclusive payloads into `buffer`. Longer payloads are
    /// truncated to the buffer's length, see [`Decoder::sysex_truncated`]
    pub fn with_sysex_buffer(buffer: &'buf mut [u8]) -> Self {
        Self {
            state: DecoderState::ExpectingStatus,
            kind: MessageType::NoteOff,
            channel: 0,
            data: [0; 2],
            running_status: None,
            sysex: SysexBuffer::new(buffer),
        }
    }

    /// Pulls bytes from `source` until a message completes.
    ///
    /// Returns `None` once the source's capacity is used up or a read comes up short. Whatever
    /// was assembled so far is kept, and the next call continues from there.
    pub fn decode<S: MidiSource + ?Sized>(&mut self, source: &mut S) -> Option<MidiMessage<'_>> {
        let mut byte = [0u8; 1];

        loop {
            if !source.capacity().admits(1) || source.read(&mut byte) < 1 {
                return None;
            }

            if let Some(done) = self.feed(byte[0]) {
                return Some(self.completed(done));
            }
        }
    }

    /// Feeds a single byte, returning the message it completes if any
    pub fn push(&mut self, byte: u8) -> Option<MidiMessage<'_>> {
        self.feed(byte).map(|done| self.completed(done))
    }

    /// Drops the pending message, running status and any unfinished SysEx
    pub fn reset(&mut self) {
        self.state = DecoderState::ExpectingStatus;
        self.running_status = None;
        self.data = [0; 2];
        self.sysex.clear();
    }

    /// Returns if the most recent System Exclusive message lost bytes because the buffer was too
    /// small
    pub fn sysex_truncated(&self) -> bool {
        self.sysex.truncated
    }

    /// Length of the lent SysEx buffer
    pub fn sysex_capacity(&self) -> usize {
        self.sysex.data.len()
    }

    /// Advances the state machine by one byte
    pub(crate) fn feed(&mut self, byte: u8) -> Option<Completed> {
        if is_status(byte) {
            self.feed_status(byte)
        } else {
            self.feed_data(byte)
        }
    }

    /// Builds the message that `done` refers to
    pub(crate) fn completed(&self, done: Completed) -> MidiMessage<'_> {
        match done {
            Completed::Realtime(kind) => MidiMessage::from_parts(kind, 0, [0; 2], &[]),
            Completed::Message => MidiMessage::from_parts(self.kind, self.channel, self.data, &[]),
            Completed::Sysex => MidiMessage::Sysex {
                data: self.sysex.contents(),
            },
        }
    }

    /// Handles a byte with the msb set
    fn feed_status(&mut self, status: u8) -> Option<Completed> {
        let class = StatusClass::of(status);

        match class {
            StatusClass::Realtime(kind) => return Some(Completed::Realtime(kind)),
            StatusClass::UndefinedRealtime => {
                tracing::trace!("ignoring undefined real-time byte 0x{status:02X}");
                return None;
            }
            _ => {}
        }

        if self.state == DecoderState::AccumulatingSysex && class != StatusClass::SysexEnd {
            tracing::debug!(
                "status 0x{status:02X} abandoned an unfinished sysex after {} bytes",
                self.sysex.len
            );
        }

        match class {
            StatusClass::SysexStart => {
                self.running_status = None;
                self.sysex.clear();
                self.state = DecoderState::AccumulatingSysex;
                None
            }
            StatusClass::SysexEnd if self.state == DecoderState::AccumulatingSysex => {
                self.state = DecoderState::ExpectingStatus;
                Some(Completed::Sysex)
            }
            StatusClass::SysexEnd => {
                tracing::trace!("stray end of exclusive outside a sysex");
                self.running_status = None;
                self.state = DecoderState::ExpectingStatus;
                None
            }
            StatusClass::SystemCommon(kind) => {
                self.running_status = None;
                self.begin(kind, 0)
            }
            StatusClass::UndefinedSystemCommon => {
                tracing::debug!("discarding data after undefined status 0x{status:02X}");
                self.running_status = None;
                self.state = DecoderState::Discarding;
                None
            }
            StatusClass::ChannelVoice(kind, channel) => {
                self.running_status = Some((kind, channel));
                self.begin(kind, channel)
            }
            StatusClass::Realtime(_) | StatusClass::UndefinedRealtime => None,
        }
    }

    /// Handles a byte with the msb clear
    fn feed_data(&mut self, byte: u8) -> Option<Completed> {
        match self.state {
            DecoderState::AccumulatingSysex => {
                self.sysex.push(byte);
                None
            }
            DecoderState::AccumulatingData { remaining } => self.store(byte, remaining),
            DecoderState::ExpectingStatus => match self.running_status {
                Some((kind, channel)) => {
                    self.begin(kind, channel);
                    self.store(byte, kind.data_len())
                }
                None => {
                    tracing::trace!("dropping data byte 0x{byte:02X} without a status");
                    None
                }
            },
            DecoderState::Discarding => {
                tracing::trace!("discarding data byte 0x{byte:02X}");
                None
            }
        }
    }

    /// Makes `kind` the pending message. Messages without data bytes complete right away
    fn begin(&mut self, kind: MessageType, channel: u8) -> Option<Completed> {
        self.kind = kind;
        self.channel = channel;
        self.data = [0; 2];

        match kind.data_len() {
            0 => {
                self.state = DecoderState::ExpectingStatus;
                Some(Completed::Message)
            }
            remaining => {
                self.state = DecoderState::AccumulatingData { remaining };
                None
            }
        }
    }

    /// Stores the next data byte of the pending message, `remaining` counting this one
    fn store(&mut self, byte: u8, remaining: usize) -> Option<Completed> {
        let index = self.kind.data_len().saturating_sub(remaining);
        if let Some(slot) = self.data.get_mut(index) {
            *slot = byte;
        }

        if remaining <= 1 {
            self.state = DecoderState::ExpectingStatus;
            Some(Completed::Message)
        } else {
            self.state = DecoderState::AccumulatingData {
                remaining: remaining - 1,
            };
            None
        }
    }
}
