//! The `MidiSink` trait is the output side of the codec: the encoder turns a [`MidiMessage`] into
//! canonical bytes and hands them to a sink, which may be a fixed buffer, a growable `Vec<u8>`
//! or anything implementing [`std::io::Write`]. `MidiWriteable` is a convenience on top of it for
//! when the bytes are simply wanted as a vector.

use std::io::{ErrorKind, Write};

use crate::{encoder::encode, message::MidiMessage, reader::Limited, usb::UsbPacket, Capacity};

/// A sink for raw MIDI bytes that the encoder pushes into
pub trait MidiSink {
    /// Writes up to `buf.len()` bytes from `buf`, returning how many were actually written
    fn write(&mut self, buf: &[u8]) -> usize;

    /// Remaining byte budget of the sink
    fn capacity(&self) -> Capacity {
        Capacity::Unlimited
    }
}

impl<W: MidiSink + ?Sized> MidiSink for &mut W {
    fn write(&mut self, buf: &[u8]) -> usize {
        (**self).write(buf)
    }

    fn capacity(&self) -> Capacity {
        (**self).capacity()
    }
}

impl MidiSink for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> usize {
        self.extend_from_slice(buf);
        buf.len()
    }
}

/// A sink that sequentially fills a borrowed byte buffer. Its capacity is the space left
#[derive(Debug)]
pub struct BufferSink<'a> {
    /// The complete buffer
    data: &'a mut [u8],
    /// Bytes filled so far
    position: usize,
}

impl<'a> BufferSink<'a> {
    /// Creates a sink filling `data` from the start
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// The bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.data[..self.position]
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.position
    }

    /// Returns if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Rewinds to the start of the buffer so it can be filled again
    pub fn clear(&mut self) {
        self.position = 0;
    }
}

impl MidiSink for BufferSink<'_> {
    fn write(&mut self, buf: &[u8]) -> usize {
        let free = &mut self.data[self.position..];
        let n = buf.len().min(free.len());

        free[..n].copy_from_slice(&buf[..n]);
        self.position += n;

        n
    }

    fn capacity(&self) -> Capacity {
        Capacity::Limited(self.data.len() - self.position)
    }
}

/// Adapts any [`std::io::Write`] into a [`MidiSink`] with unlimited capacity
///
/// Interrupted writes are retried, any other I/O error ends the write early and is logged.
#[derive(Debug)]
pub struct IoSink<W> {
    /// Wrapped writer
    inner: W,
}

impl<W: Write> IoSink<W> {
    /// Wraps a writer
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Flushes the wrapped writer
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }

    /// Gets a reference to the wrapped writer
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwraps the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> MidiSink for IoSink<W> {
    fn write(&mut self, buf: &[u8]) -> usize {
        let mut written = 0;

        while written < buf.len() {
            match self.inner.write(&buf[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("midi sink write failed: {e}");
                    break;
                }
            }
        }

        written
    }
}

impl<W: MidiSink> MidiSink for Limited<W> {
    fn write(&mut self, buf: &[u8]) -> usize {
        let n = self.allowance(buf.len());
        let written = self.inner.write(&buf[..n]);
        self.budget.consume(written);

        written
    }

    fn capacity(&self) -> Capacity {
        self.combined(self.inner.capacity())
    }
}

/// A trait for types that can be encoded as MIDI-format bytes.
pub trait MidiWriteable {
    /// Converts the data to a MIDI format byte sequence
    fn to_midi_bytes(self) -> Vec<u8>;
}

impl MidiWriteable for MidiMessage<'_> {
    fn to_midi_bytes(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3);
        encode(&mut bytes, &self).map(|_| bytes).unwrap_or_default()
    }
}

impl MidiWriteable for UsbPacket {
    fn to_midi_bytes(self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }
}
