//! Bit-level streams over byte sinks and sources.
//!
//! `BitOutputStream` packs integers of any width up to 64 bits into a byte
//! sink and `BitInputStream` unpacks them again. Both operate MSB-first: writing
//! value=0b101 with width 3 emits bits 1, 0, 1 in that order, and values wider
//! than the space left in the current byte straddle the byte boundary.
//!
//! # Padding Rules
//! - `BitOutputStream`: pads an incomplete final byte with trailing zeros on close
//! - `BitInputStream`: cannot tell padding from data; the payload format must
//!   carry its own terminator (the end-of-message sentinel)
//!
//! # Example
//! ```
//! use treecode_core::bitio::{BitInputStream, BitOutputStream};
//!
//! let mut bytes = Vec::new();
//! let mut out = BitOutputStream::from_writer(&mut bytes);
//! out.write(0b101, 3).unwrap();
//! out.write(0b11, 2).unwrap();
//! out.close().unwrap();
//! drop(out);
//! // 10111 -> padded to 10111000
//! assert_eq!(bytes, vec![0b1011_1000]);
//!
//! let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
//! assert_eq!(input.read(3).unwrap(), 0b101);
//! assert_eq!(input.read(2).unwrap(), 0b11);
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{BitIoError, Result};

/// Bits per byte written to or read from the underlying stream.
const FULL_BYTE: u32 = 8;

/// Widest value a single read or write can carry.
const MAX_BITS: u32 = 64;

/// Default cap on the number of bytes an output stream will emit (16 MiB).
pub const DEFAULT_BYTE_LIMIT: u64 = 16 * 1024 * 1024;

/// Mask selecting the low `num_bits` bits of a u64.
#[inline]
fn low_mask(num_bits: u32) -> u64 {
    if num_bits >= MAX_BITS {
        u64::MAX
    } else {
        (1u64 << num_bits) - 1
    }
}

/// How a `BitInputStream` behaves when asked for bits past the end of its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Every missing bit reads as 0. Callers detect exhaustion with `eof()`.
    #[default]
    Lenient,
    /// Reading a missing bit fails with `BitIoError::UnexpectedEof`.
    Strict,
}

/// Packs bits MSB-first into a byte sink.
///
/// # Invariants
/// - `bit_count` is always in 0..=7; a full byte is emitted immediately
/// - `bit_buffer` holds `bit_count` valid bits, right-aligned
/// - once `bytes_written` reaches `byte_limit` the next write closes the
///   stream and every later write is discarded
#[derive(Debug)]
pub struct BitOutputStream<W: Write = BufWriter<File>> {
    /// Destination, `None` while closed
    sink: Option<W>,
    /// Pending bits not yet forming a whole byte
    bit_buffer: u8,
    /// Number of valid bits in `bit_buffer` (0-7)
    bit_count: u8,
    /// Bytes emitted since the last open
    bytes_written: u64,
    /// Safety cap on `bytes_written`
    byte_limit: u64,
}

impl BitOutputStream<BufWriter<File>> {
    /// Create (truncating) the file at `path` and open a stream on it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut stream = Self::new();
        stream.open(path)?;
        Ok(stream)
    }

    /// Open `path` for writing, closing (and flushing) any current sink first.
    ///
    /// The stream state is reset on success; on failure the stream stays closed.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.close()?;
        let file = File::create(path.as_ref())?;
        log::debug!("opened bit output stream on {}", path.as_ref().display());
        self.attach(BufWriter::new(file));
        Ok(())
    }
}

impl<W: Write> BitOutputStream<W> {
    /// Create a stream that is not yet open. Writes are ignored until a sink
    /// is attached.
    pub fn new() -> Self {
        Self {
            sink: None,
            bit_buffer: 0,
            bit_count: 0,
            bytes_written: 0,
            byte_limit: DEFAULT_BYTE_LIMIT,
        }
    }

    /// Open a stream over an arbitrary writer.
    pub fn from_writer(sink: W) -> Self {
        let mut stream = Self::new();
        stream.attach(sink);
        stream
    }

    /// Replace the safety cap on the number of bytes this stream may emit.
    pub fn with_byte_limit(mut self, byte_limit: u64) -> Self {
        self.byte_limit = byte_limit;
        self
    }

    fn attach(&mut self, sink: W) {
        self.sink = Some(sink);
        self.bit_buffer = 0;
        self.bit_count = 0;
        self.bytes_written = 0;
    }

    /// Whether a sink is attached.
    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Bytes emitted since the stream was opened.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Bits waiting in the buffer for the next byte boundary.
    pub fn buffered_bits(&self) -> u32 {
        self.bit_count as u32
    }

    /// Append the low `num_bits` bits of `value`, most significant first.
    ///
    /// Higher bits of `value` are ignored. Writes to a closed stream, and
    /// zero-width writes, do nothing.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if `num_bits > 64`
    /// - `Error::Io` if the sink rejects a byte
    pub fn write(&mut self, value: u64, num_bits: u32) -> Result<()> {
        if num_bits > MAX_BITS {
            return Err(BitIoError::InvalidBitCount(num_bits).into());
        }

        let mut remaining = num_bits;

        while remaining > 0 && self.is_open() {
            if self.bytes_written >= self.byte_limit {
                log::warn!(
                    "bit output stream reached its {} byte limit and is being closed",
                    self.byte_limit
                );
                return self.close();
            }

            let value = value & low_mask(remaining);
            let free = FULL_BYTE - self.bit_count as u32;

            if remaining < free {
                // Not enough for a whole byte; buffer it all
                self.bit_buffer = (self.bit_buffer << remaining) | value as u8;
                self.bit_count += remaining as u8;
                return Ok(());
            }

            // Top `free` bits complete the current byte, the rest go round again
            let shift = remaining - free;
            let prefix = (value >> shift) as u32;
            let byte = ((self.bit_buffer as u32) << free) | prefix;
            self.emit(byte as u8)?;
            remaining = shift;
        }

        Ok(())
    }

    fn emit(&mut self, byte: u8) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&[byte])?;
            self.bytes_written += 1;
        }
        self.bit_buffer = 0;
        self.bit_count = 0;
        Ok(())
    }

    /// Pad any buffered bits with trailing zeros, emit that byte, flush and
    /// release the sink.
    ///
    /// Calling `close` on a closed stream is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.sink.is_none() {
            return Ok(());
        }

        if self.bit_count != 0 {
            let padded = self.bit_buffer << (FULL_BYTE - self.bit_count as u32);
            self.emit(padded)?;
        }

        if let Some(mut sink) = self.sink.take() {
            sink.flush()?;
        }
        log::debug!(
            "closed bit output stream after {} bytes",
            self.bytes_written
        );
        Ok(())
    }

    /// Close the stream and hand back the sink.
    ///
    /// # Errors
    /// `BitIoError::StreamClosed` if there is no sink to return.
    pub fn finish(mut self) -> Result<W> {
        if self.bit_count != 0 {
            let padded = self.bit_buffer << (FULL_BYTE - self.bit_count as u32);
            self.emit(padded)?;
        }
        let mut sink = self.sink.take().ok_or(BitIoError::StreamClosed)?;
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> Default for BitOutputStream<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Drop for BitOutputStream<W> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("failed to flush bit output stream on drop: {}", err);
        }
    }
}

/// Unpacks bits MSB-first from a byte source.
///
/// One byte is always prefetched, so `eof()` turns true only once the last
/// bit of the last byte has been consumed.
///
/// # Invariants
/// - `bit_count` is 0 only while closed or once the source is exhausted
/// - `exhausted` is set when a prefetch found no further byte
#[derive(Debug)]
pub struct BitInputStream<R: Read = BufReader<File>> {
    /// Origin of the bytes, `None` while closed
    source: Option<R>,
    /// Unconsumed bits of the current byte, right-aligned
    bit_buffer: u8,
    /// Number of valid bits in `bit_buffer` (0-8)
    bit_count: u8,
    /// A prefetch has hit the end of the source
    exhausted: bool,
    /// Bytes fetched since the last open
    bytes_read: u64,
    /// Past-end behaviour
    mode: ReadMode,
}

impl BitInputStream<BufReader<File>> {
    /// Open the file at `path` for bit-level reading.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut stream = Self::new();
        stream.open(path)?;
        Ok(stream)
    }

    /// Open `path`, closing any current source first, and prefetch its first
    /// byte.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.close();
        let file = File::open(path.as_ref())?;
        log::debug!("opened bit input stream on {}", path.as_ref().display());
        self.attach(BufReader::new(file))
    }
}

impl<R: Read> BitInputStream<R> {
    /// Create a stream that is not yet open.
    pub fn new() -> Self {
        Self {
            source: None,
            bit_buffer: 0,
            bit_count: 0,
            exhausted: false,
            bytes_read: 0,
            mode: ReadMode::default(),
        }
    }

    /// Open a stream over an arbitrary reader, prefetching its first byte.
    pub fn from_reader(source: R) -> Result<Self> {
        let mut stream = Self::new();
        stream.attach(source)?;
        Ok(stream)
    }

    /// Select the past-end behaviour.
    pub fn with_mode(mut self, mode: ReadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Change the past-end behaviour of an existing stream.
    pub fn set_mode(&mut self, mode: ReadMode) {
        self.mode = mode;
    }

    /// Current past-end behaviour.
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    fn attach(&mut self, source: R) -> Result<()> {
        self.source = Some(source);
        self.bit_buffer = 0;
        self.bit_count = 0;
        self.exhausted = false;
        self.bytes_read = 0;
        self.prefetch()
    }

    /// Refill the buffer with the next byte once it has run dry.
    fn prefetch(&mut self) -> Result<()> {
        if self.bit_count != 0 {
            return Ok(());
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(());
        };

        let mut byte = [0u8; 1];
        loop {
            match source.read(&mut byte) {
                Ok(0) => {
                    self.bit_buffer = 0;
                    self.exhausted = true;
                    return Ok(());
                }
                Ok(_) => {
                    self.bit_buffer = byte[0];
                    self.bit_count = FULL_BYTE as u8;
                    self.bytes_read += 1;
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Whether a source is attached.
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Bytes fetched from the source since it was opened.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// True when no buffered bits remain and the source is used up.
    ///
    /// A closed stream reports end of data.
    pub fn eof(&self) -> bool {
        self.bit_count == 0 && (self.exhausted || self.source.is_none())
    }

    /// Read a single bit.
    ///
    /// Past the end of the source this yields `false` in lenient mode and
    /// fails in strict mode.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.source.is_none() {
            return Err(BitIoError::StreamClosed.into());
        }

        if self.bit_count == 0 {
            return match self.mode {
                ReadMode::Lenient => {
                    log::trace!("zero-filling read past end of bit input stream");
                    Ok(false)
                }
                ReadMode::Strict => Err(BitIoError::UnexpectedEof.into()),
            };
        }

        self.bit_count -= 1;
        let bit = (self.bit_buffer >> self.bit_count) & 1;
        self.bit_buffer &= ((1u16 << self.bit_count) - 1) as u8;

        if self.bit_count == 0 {
            self.prefetch()?;
        }

        Ok(bit == 1)
    }

    /// Read `num_bits` bits (0-64) and assemble them MSB-first.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if `num_bits > 64`
    /// - `BitIoError::StreamClosed` if the stream is not open
    /// - `BitIoError::UnexpectedEof` in strict mode when the source runs out
    pub fn read(&mut self, num_bits: u32) -> Result<u64> {
        if num_bits > MAX_BITS {
            return Err(BitIoError::InvalidBitCount(num_bits).into());
        }

        let mut result = 0u64;
        for _ in 0..num_bits {
            result = (result << 1) | self.read_bit()? as u64;
        }
        Ok(result)
    }

    /// Release the source and clear the end-of-source flag so the stream can
    /// be reopened.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            log::debug!("closed bit input stream after {} bytes", self.bytes_read);
        }
        self.bit_buffer = 0;
        self.bit_count = 0;
        self.exhausted = false;
    }
}

impl<R: Read> Default for BitInputStream<R> {
    fn default() -> Self {
        Self::new()
    }
}
