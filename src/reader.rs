//! MIDI byte source trait, allows for in memory byte spans, files or any `std::io::Read` to be
//! decoded

use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read},
    path::Path,
};

use crate::Capacity;

/// A source of raw MIDI bytes that the decoder pulls from
///
/// A read that delivers fewer bytes than requested means "no more data right now". The decoder
/// gives up on the current call and resumes from its saved state the next time it's called.
pub trait MidiSource {
    /// Reads up to `buf.len()` bytes into `buf`, returning how many were actually read
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Remaining byte budget of the source
    fn capacity(&self) -> Capacity {
        Capacity::Unlimited
    }
}

impl<S: MidiSource + ?Sized> MidiSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }

    fn capacity(&self) -> Capacity {
        (**self).capacity()
    }
}

/// A source that sequentially consumes a borrowed byte buffer. Its capacity is the number of
/// bytes not yet read
#[derive(Debug, Clone)]
pub struct BufferSource<'a> {
    /// The complete buffer
    data: &'a [u8],
    /// Bytes consumed so far
    position: usize,
}

impl<'a> BufferSource<'a> {
    /// Creates a source reading `data` from the start
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes that haven't been read yet
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Number of bytes read so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns if every byte has been read
    pub fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }
}

impl MidiSource for BufferSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let remaining = self.remaining();
        let n = buf.len().min(remaining.len());

        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;

        n
    }

    fn capacity(&self) -> Capacity {
        Capacity::Limited(self.data.len() - self.position)
    }
}

/// Adapts any [`std::io::Read`] into a [`MidiSource`] with unlimited capacity
///
/// Interrupted reads are retried, any other I/O error ends the read early and is logged.
#[derive(Debug)]
pub struct IoSource<R> {
    /// Wrapped reader
    inner: R,
}

impl<R: Read> IoSource<R> {
    /// Wraps a reader
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Gets a reference to the wrapped reader
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwraps the reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> MidiSource for IoSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut filled = 0;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!("midi source read failed: {e}");
                    break;
                }
            }
        }

        filled
    }
}

/// Wraps a source or sink with a byte budget that shrinks as bytes pass through it
#[derive(Debug, Clone)]
pub struct Limited<T> {
    /// Wrapped source or sink
    pub(crate) inner: T,
    /// Bytes still allowed through
    pub(crate) budget: Capacity,
}

impl<T> Limited<T> {
    /// Allows at most `limit` bytes to pass through `inner`
    pub fn new(inner: T, limit: usize) -> Self {
        Self {
            inner,
            budget: Capacity::from(limit),
        }
    }

    /// Bytes still allowed through
    pub fn remaining(&self) -> usize {
        self.budget.remaining().unwrap_or(usize::MAX)
    }

    /// Unwraps the source or sink
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// How many of `requested` bytes the budget lets through
    pub(crate) fn allowance(&self, requested: usize) -> usize {
        requested.min(self.remaining())
    }

    /// The tighter of the wrapped capacity and the budget
    pub(crate) fn combined(&self, inner: Capacity) -> Capacity {
        inner.min(self.budget)
    }
}

impl<S: MidiSource> MidiSource for Limited<S> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = self.allowance(buf.len());
        let read = self.inner.read(&mut buf[..n]);
        self.budget.consume(read);

        read
    }

    fn capacity(&self) -> Capacity {
        self.combined(self.inner.capacity())
    }
}

/// Trait that allows for different types to be opened as a MIDI byte source
pub trait MidiReadable {
    /// Error type that may be returned while opening the source
    type Error;
    /// The source type produced
    type Source: MidiSource;
    /// Opens the type as a byte source
    fn midi_source(self) -> Result<Self::Source, Self::Error>;
}

impl<PATH> MidiReadable for PATH
where
    PATH: AsRef<Path>,
{
    type Error = std::io::Error;
    type Source = IoSource<BufReader<File>>;
    fn midi_source(self) -> Result<Self::Source, Self::Error> {
        let file = File::open(self.as_ref())?;
        Ok(IoSource::new(BufReader::new(file)))
    }
}
