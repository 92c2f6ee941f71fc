//! The server side of a replay session, as far as the loader is concerned: a size followed by
//! that many bytes of replay data.

use std::io::{self, Read};

/// A source of replay data.
pub trait Connection {
  /// Reads the size in bytes of the replay data that follows.
  fn read_replay_size(&mut self) -> io::Result<u32>;

  /// Fills `buffer` completely with replay data. A short read is an error.
  fn read_replay_data(&mut self, buffer: &mut [u8]) -> io::Result<()>;
}

/**
  A connection over any byte stream. The replay size is a little-endian `u32`, followed
  immediately by the replay data.

  Timeouts belong to the stream (for instance `TcpStream::set_read_timeout`) and surface here as
  ordinary I/O errors.
*/
#[derive(Debug)]
pub struct StreamConnection<R> {
  reader: R
}

impl<R: Read> StreamConnection<R> {
  pub fn new(reader: R) -> StreamConnection<R> {
    StreamConnection{ reader }
  }

  pub fn into_inner(self) -> R {
    self.reader
  }
}

impl<R: Read> Connection for StreamConnection<R> {
  fn read_replay_size(&mut self) -> io::Result<u32> {
    let mut size = [0u8; 4];
    self.reader.read_exact(&mut size)?;
    Ok(u32::from_le_bytes(size))
  }

  fn read_replay_data(&mut self, buffer: &mut [u8]) -> io::Result<()> {
    self.reader.read_exact(buffer)
  }
}
