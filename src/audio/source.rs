//! Fixed-size block reads from a raw PCM byte stream

use bytes::Bytes;
use std::io::{ErrorKind, Read};

/// Outcome of one block read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete block
    Full(Bytes),
    /// The stream ended after this many bytes; they are discarded
    Partial(usize),
    /// Nothing was available, the stream is at its end
    Empty,
}

impl ReadOutcome {
    pub fn is_full(&self) -> bool {
        matches!(self, ReadOutcome::Full(_))
    }
}

/// Reads `chunk_size` byte blocks, retrying short reads until the block
/// is complete or the stream ends.
pub struct BlockReader<R> {
    inner: R,
    chunk_size: usize,
    bytes_read: u64,
}

impl<R: Read> BlockReader<R> {
    pub fn new(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size,
            bytes_read: 0,
        }
    }

    /// Read the next block. Blocks until it is full or the stream ends.
    pub fn read_block(&mut self) -> std::io::Result<ReadOutcome> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;

        while filled < self.chunk_size {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        self.bytes_read += filled as u64;

        Ok(match filled {
            0 => ReadOutcome::Empty,
            n if n == self.chunk_size => ReadOutcome::Full(Bytes::from(buf)),
            n => ReadOutcome::Partial(n),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total bytes consumed from the stream
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_full_then_partial_then_empty() {
        let mut reader = BlockReader::new(Cursor::new(vec![1u8; 10]), 4);

        assert_eq!(reader.read_block().unwrap(), ReadOutcome::Full(Bytes::from(vec![1u8; 4])));
        assert!(reader.read_block().unwrap().is_full());
        assert_eq!(reader.read_block().unwrap(), ReadOutcome::Partial(2));
        assert_eq!(reader.read_block().unwrap(), ReadOutcome::Empty);
        assert_eq!(reader.read_block().unwrap(), ReadOutcome::Empty);
        assert_eq!(reader.bytes_read(), 10);
    }

    #[test]
    fn test_joins_short_reads() {
        let data: Vec<u8> = (0..8).collect();
        let trickle = Trickle { data: data.clone(), pos: 0, step: 3 };
        let mut reader = BlockReader::new(trickle, 8);

        assert_eq!(reader.read_block().unwrap(), ReadOutcome::Full(Bytes::from(data)));
    }
}
