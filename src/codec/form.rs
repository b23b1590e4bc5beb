// std
use std::{
	collections::btree_map,
	io::{self, ErrorKind, Read, Write},
	iter::FusedIterator,
	vec,
};
// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
// self
use crate::{_prelude::*, codec::Base64Reader};

/// Size of each read from a streamed value.
pub const CHUNK_SIZE: usize = 512;

/// Bytes left unescaped in keys and values; space is handled separately as `+`.
const FORM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Source of one form value.
pub enum FormValue {
	/// In-memory scalar.
	Text(String),
	/// Byte stream read and escaped incrementally while the body is produced.
	Stream(Box<dyn Read + Send>),
}
impl FormValue {
	/// Wraps a reader as a streamed value.
	pub fn stream(reader: impl 'static + Read + Send) -> Self {
		Self::Stream(Box::new(reader))
	}
}
impl Debug for FormValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Stream(_) => f.write_str("Stream(..)"),
		}
	}
}
impl From<String> for FormValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<&str> for FormValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
impl From<&String> for FormValue {
	fn from(value: &String) -> Self {
		Self::Text(value.clone())
	}
}
macro_rules! impl_from_integer {
	($($ty:ty),+) => {
		$(
			impl From<$ty> for FormValue {
				fn from(value: $ty) -> Self {
					Self::Text(value.to_string())
				}
			}
		)+
	};
}
impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Builder for `application/x-www-form-urlencoded` bodies whose values may be streams.
///
/// Keys are emitted in byte-lexicographic order; repeated keys keep their insertion order.
/// Streamed values are read [`CHUNK_SIZE`] bytes at a time and never held in memory whole.
///
/// ```
/// use athena_client::codec::FormEncoder;
///
/// let mut form = FormEncoder::new();
///
/// form.add("b", "x y").add("a", 1).add("b", "&");
///
/// let mut body = Vec::new();
///
/// form.encode(&mut body).unwrap();
///
/// assert_eq!(body, b"a=1&b=x+y&b=%26");
/// ```
#[derive(Default)]
pub struct FormEncoder {
	entries: BTreeMap<String, Vec<FormValue>>,
}
impl FormEncoder {
	/// Creates an empty encoder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `value` under `key`.
	pub fn add(&mut self, key: impl Into<String>, value: impl Into<FormValue>) -> &mut Self {
		self.entries.entry(key.into()).or_default().push(value.into());

		self
	}

	/// Builder-style variant of [`Self::add`].
	pub fn with(mut self, key: impl Into<String>, value: impl Into<FormValue>) -> Self {
		self.add(key, value);

		self
	}

	/// Appends a streamed value read from `reader`.
	pub fn add_stream(
		&mut self,
		key: impl Into<String>,
		reader: impl 'static + Read + Send,
	) -> &mut Self {
		self.add(key, FormValue::stream(reader))
	}

	/// Appends `reader`'s bytes as a lazily base64-encoded value.
	pub fn add_base64(
		&mut self,
		key: impl Into<String>,
		reader: impl 'static + Read + Send,
	) -> &mut Self {
		self.add_stream(key, Base64Reader::new(reader))
	}

	/// Number of distinct keys.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` when no value has been added.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Turns the encoder into a lazy sequence of encoded chunks.
	pub fn into_chunks(self) -> FormChunks {
		FormChunks {
			entries: self.entries.into_iter(),
			current: None,
			stream: None,
			scratch: Vec::new(),
			wrote_pair: false,
			done: false,
		}
	}

	/// Writes the encoded body into `writer` and returns the number of bytes written.
	///
	/// A stream read failure aborts encoding with that error; bytes already written stay in
	/// `writer`.
	pub fn encode<W>(self, writer: &mut W) -> io::Result<u64>
	where
		W: ?Sized + Write,
	{
		let mut written = 0;

		for chunk in self.into_chunks() {
			let chunk = chunk?;

			writer.write_all(&chunk)?;

			written += chunk.len() as u64;
		}

		writer.flush()?;

		Ok(written)
	}
}
impl Debug for FormEncoder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_map().entries(self.entries.iter()).finish()
	}
}

/// Pull-based, fused sequence of encoded body chunks produced by [`FormEncoder::into_chunks`].
///
/// Each item is either a `key=` prefix (with its `&` separator and any text value) or one
/// escaped [`CHUNK_SIZE`] slice of a streamed value. The first read error is yielded once and
/// ends the sequence.
pub struct FormChunks {
	entries: btree_map::IntoIter<String, Vec<FormValue>>,
	current: Option<(Vec<u8>, vec::IntoIter<FormValue>)>,
	stream: Option<Box<dyn Read + Send>>,
	scratch: Vec<u8>,
	wrote_pair: bool,
	done: bool,
}
impl FormChunks {
	fn next_stream_chunk(&mut self) -> Option<io::Result<Vec<u8>>> {
		let reader = self.stream.as_mut()?;

		self.scratch.resize(CHUNK_SIZE, 0);

		loop {
			match reader.read(&mut self.scratch) {
				Ok(0) => {
					self.stream = None;

					return None;
				},
				Ok(n) => {
					let mut out = Vec::with_capacity(n * 3);

					escape_into(&mut out, &self.scratch[..n]);

					return Some(Ok(out));
				},
				Err(e) if e.kind() == ErrorKind::Interrupted => continue,
				Err(e) => {
					self.stream = None;
					self.done = true;

					return Some(Err(e));
				},
			}
		}
	}

	fn next_pair(&mut self) -> Option<Vec<u8>> {
		loop {
			if let Some((key, values)) = self.current.as_mut()
				&& let Some(value) = values.next()
			{
				let mut out = Vec::with_capacity(key.len() + 2);

				if self.wrote_pair {
					out.push(b'&');
				}

				out.extend_from_slice(key);
				out.push(b'=');

				match value {
					FormValue::Text(text) => escape_into(&mut out, text.as_bytes()),
					FormValue::Stream(reader) => self.stream = Some(reader),
				}

				self.wrote_pair = true;

				return Some(out);
			}

			let (key, values) = self.entries.next()?;
			let mut escaped = Vec::with_capacity(key.len());

			escape_into(&mut escaped, key.as_bytes());

			self.current = Some((escaped, values.into_iter()));
		}
	}
}
impl Iterator for FormChunks {
	type Item = io::Result<Vec<u8>>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		if let Some(chunk) = self.next_stream_chunk() {
			return Some(chunk);
		}
		if self.done {
			return None;
		}

		match self.next_pair() {
			Some(chunk) => Some(Ok(chunk)),
			None => {
				self.done = true;

				None
			},
		}
	}
}
impl FusedIterator for FormChunks {}
impl Debug for FormChunks {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FormChunks")
			.field("streaming", &self.stream.is_some())
			.field("done", &self.done)
			.finish_non_exhaustive()
	}
}

fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
	for piece in percent_encoding::percent_encode(bytes, FORM) {
		if piece == "%20" {
			out.push(b'+');
		} else {
			out.extend_from_slice(piece.as_bytes());
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io::Cursor;
	// crates.io
	use base64::{Engine, engine::general_purpose::STANDARD};
	// self
	use super::*;

	fn encode_to_string(form: FormEncoder) -> String {
		let mut body = Vec::new();
		let written = form.encode(&mut body).expect("Encoding in-memory values should not fail.");

		assert_eq!(written, body.len() as u64);

		String::from_utf8(body).expect("Form output should be ASCII.")
	}

	#[test]
	fn text_values_are_escaped_and_sorted() {
		let mut form = FormEncoder::new();

		form.add("str2", "#$%#%^").add("str1", "test @#$").add("str1", "!@#%  ()*");

		assert_eq!(form.len(), 2);
		assert_eq!(
			encode_to_string(form),
			"str1=test+%40%23%24&str1=%21%40%23%25++%28%29%2A&str2=%23%24%25%23%25%5E"
		);
	}

	#[test]
	fn keys_unreserved_and_integers() {
		let form = FormEncoder::new().with("a key", "-_.~").with("n", 42_u32).with("m", -7_i64);

		assert_eq!(encode_to_string(form), "a+key=-_.~&m=-7&n=42");
	}

	#[test]
	fn empty_encoder_writes_nothing() {
		let form = FormEncoder::new();

		assert!(form.is_empty());
		assert_eq!(encode_to_string(form), "");
		assert!(FormEncoder::new().into_chunks().next().is_none());
	}

	#[test]
	fn output_is_deterministic() {
		let build = || {
			FormEncoder::new()
				.with("z", "1")
				.with("a", "2")
				.with("m", FormValue::stream(Cursor::new(b"hello world".to_vec())))
		};

		assert_eq!(encode_to_string(build()), encode_to_string(build()));
		assert_eq!(encode_to_string(build()), "a=2&m=hello+world&z=1");
	}

	#[test]
	fn streams_are_chunked() {
		let payload = vec![b'/'; CHUNK_SIZE * 2 + 10];
		let chunks = FormEncoder::new()
			.with("blob", FormValue::stream(Cursor::new(payload)))
			.with("tail", "t")
			.into_chunks()
			.collect::<io::Result<Vec<_>>>()
			.expect("In-memory streams should not fail.");
		let lengths = chunks.iter().map(Vec::len).collect::<Vec<_>>();

		assert_eq!(lengths, [5, CHUNK_SIZE * 3, CHUNK_SIZE * 3, 30, 7]);
		assert_eq!(chunks[1], b"%2F".repeat(CHUNK_SIZE));
	}

	#[test]
	fn base64_values_stream_through() {
		let payload = (0..2_000).map(|i| (i % 256) as u8).collect::<Vec<_>>();
		let mut form = FormEncoder::new();

		form.add_base64("attachmentcontents", Cursor::new(payload.clone()));

		let body = encode_to_string(form);
		let value = body.strip_prefix("attachmentcontents=").expect("Key prefix should lead.");
		let expected =
			STANDARD.encode(&payload).replace('+', "%2B").replace('/', "%2F").replace('=', "%3D");

		assert_eq!(value, expected);
	}

	#[test]
	fn read_error_aborts_after_partial_output() {
		struct Failing;
		impl Read for Failing {
			fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
				Err(io::Error::new(ErrorKind::ConnectionReset, "attachment source failed"))
			}
		}

		let form =
			FormEncoder::new().with("a", "1").with("b", FormValue::stream(Failing)).with("c", "3");
		let mut body = Vec::new();
		let err = form.encode(&mut body).expect_err("Stream failure should abort encoding.");

		assert_eq!(err.kind(), ErrorKind::ConnectionReset);
		assert_eq!(body, b"a=1&b=");

		let mut chunks =
			FormEncoder::new().with("b", FormValue::stream(Failing)).with("c", "3").into_chunks();

		assert!(matches!(chunks.next(), Some(Ok(_))));
		assert!(matches!(chunks.next(), Some(Err(_))));
		assert!(chunks.next().is_none());
		assert!(chunks.next().is_none());
	}

	#[test]
	fn interrupted_reads_are_retried() {
		struct Flaky {
			interrupted: bool,
			inner: Cursor<Vec<u8>>,
		}
		impl Read for Flaky {
			fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
				if !self.interrupted {
					self.interrupted = true;

					return Err(io::Error::from(ErrorKind::Interrupted));
				}

				self.inner.read(buf)
			}
		}

		let form = FormEncoder::new().with(
			"k",
			FormValue::stream(Flaky { interrupted: false, inner: Cursor::new(b"ok".to_vec()) }),
		);

		assert_eq!(encode_to_string(form), "k=ok");
	}
}
