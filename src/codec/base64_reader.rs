// std
use std::io::{self, ErrorKind, Read};
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::_prelude::*;

/// Returned (inside an [`io::Error`] of kind [`ErrorKind::InvalidInput`]) when a read buffer
/// cannot hold a single base64 quantum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Read buffer of {len} bytes cannot hold a 4-byte base64 quantum.")]
pub struct ShortBuffer {
	/// Length of the rejected buffer.
	pub len: usize,
}

/// [`Read`] adapter that standard-base64 encodes its source lazily.
///
/// Each `read(buf)` pulls up to `buf.len() / 4 * 3` raw bytes, filling that chunk unless the
/// source ends, so `=` padding can only appear in the final read.
pub struct Base64Reader<R> {
	source: R,
	raw: Vec<u8>,
	pending: Option<io::Error>,
	finished: bool,
}
impl<R> Base64Reader<R>
where
	R: Read,
{
	/// Wraps `source`.
	pub fn new(source: R) -> Self {
		Self { source, raw: Vec::new(), pending: None, finished: false }
	}

	/// Returns the wrapped source.
	pub fn into_inner(self) -> R {
		self.source
	}

	fn fill_raw(&mut self, capacity: usize) -> io::Result<usize> {
		self.raw.resize(capacity, 0);

		let mut filled = 0;

		while filled < capacity {
			match self.source.read(&mut self.raw[filled..]) {
				Ok(0) => {
					self.finished = true;

					break;
				},
				Ok(n) => filled += n,
				Err(e) if e.kind() == ErrorKind::Interrupted => continue,
				Err(e) if filled == 0 => return Err(e),
				Err(e) => {
					// Flush what was read; the error surfaces on the next call.
					self.pending = Some(e);

					break;
				},
			}
		}

		Ok(filled)
	}
}
impl<R> Read for Base64Reader<R>
where
	R: Read,
{
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if buf.len() < 4 {
			return Err(io::Error::new(ErrorKind::InvalidInput, ShortBuffer { len: buf.len() }));
		}
		if let Some(e) = self.pending.take() {
			return Err(e);
		}
		if self.finished {
			return Ok(0);
		}

		let filled = self.fill_raw(buf.len() / 4 * 3)?;

		if filled == 0 {
			return Ok(0);
		}

		STANDARD.encode_slice(&self.raw[..filled], buf).map_err(io::Error::other)
	}
}
impl<R> Debug for Base64Reader<R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Base64Reader").field("finished", &self.finished).finish_non_exhaustive()
	}
}
