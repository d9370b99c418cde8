//! Length-prefixed binary records with a magic header and CRC-32 trailer.
//!
//! Layout of every record written through this module:
//!
//! ```text
//! magic   [u8; 8]
//! version u16 (LE)
//! payload ...
//! crc32   u32 (LE) over the payload bytes only
//! ```
//!
//! All integers and floats are little endian. Sequences are prefixed with a
//! `u32` element count, strings with a `u32` byte length.

use glam::DVec3;
use thiserror::Error;

use crate::octree::SpatialKey;

const MAGIC_LEN: usize = 8;
const HEADER_LEN: usize = MAGIC_LEN + 2;
const TRAILER_LEN: usize = 4;

/// Failure to decode a binary record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
	#[error("unexpected end of record: needed {needed} bytes, {remaining} remaining")]
	UnexpectedEof { needed: usize, remaining: usize },
	#[error("bad magic: expected {expected:?}")]
	BadMagic { expected: &'static [u8; MAGIC_LEN] },
	#[error("unsupported format version {found} (supported: {supported})")]
	UnsupportedVersion { found: u16, supported: u16 },
	#[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
	ChecksumMismatch { stored: u32, computed: u32 },
	#[error("string is not valid UTF-8")]
	InvalidUtf8,
	#[error("{0} trailing bytes after record")]
	TrailingBytes(usize),
	#[error("invalid record: {0}")]
	Invalid(String),
}

/// Append-only record encoder.
pub struct Encoder {
	buf: Vec<u8>,
}

impl Encoder {
	/// Start a record with the given magic and version.
	pub fn new(magic: &[u8; MAGIC_LEN], version: u16) -> Self {
		let mut buf = Vec::with_capacity(256);
		buf.extend_from_slice(magic);
		buf.extend_from_slice(&version.to_le_bytes());
		Self { buf }
	}

	pub fn put_u8(&mut self, v: u8) {
		self.buf.push(v);
	}

	pub fn put_u16(&mut self, v: u16) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn put_u32(&mut self, v: u32) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn put_f64(&mut self, v: f64) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	/// Write a sequence length. Panics in debug builds past `u32::MAX`.
	pub fn put_len(&mut self, len: usize) {
		debug_assert!(len <= u32::MAX as usize, "sequence too long for u32 prefix");
		self.put_u32(len as u32);
	}

	pub fn put_str(&mut self, s: &str) {
		self.put_len(s.len());
		self.buf.extend_from_slice(s.as_bytes());
	}

	pub fn put_key(&mut self, key: SpatialKey) {
		self.put_u16(key.x);
		self.put_u16(key.y);
		self.put_u16(key.z);
	}

	pub fn put_point(&mut self, p: DVec3) {
		self.put_f64(p.x);
		self.put_f64(p.y);
		self.put_f64(p.z);
	}

	/// Seal the record with the payload checksum and return its bytes.
	pub fn finish(mut self) -> Vec<u8> {
		let crc = crc32fast::hash(&self.buf[HEADER_LEN..]);
		self.buf.extend_from_slice(&crc.to_le_bytes());
		self.buf
	}
}

/// Cursor over the payload of a verified record.
pub struct Decoder<'a> {
	payload: &'a [u8],
	pos: usize,
}

impl<'a> Decoder<'a> {
	/// Validate magic, version and checksum, then position at the payload.
	pub fn open(
		bytes: &'a [u8],
		magic: &'static [u8; MAGIC_LEN],
		version: u16,
	) -> Result<Self, DecodeError> {
		if bytes.len() < HEADER_LEN + TRAILER_LEN {
			return Err(DecodeError::UnexpectedEof {
				needed: HEADER_LEN + TRAILER_LEN,
				remaining: bytes.len(),
			});
		}
		if &bytes[..MAGIC_LEN] != magic {
			return Err(DecodeError::BadMagic { expected: magic });
		}
		let found = u16::from_le_bytes([bytes[MAGIC_LEN], bytes[MAGIC_LEN + 1]]);
		if found != version {
			return Err(DecodeError::UnsupportedVersion {
				found,
				supported: version,
			});
		}

		let (body, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
		let payload = &body[HEADER_LEN..];
		let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
		let computed = crc32fast::hash(payload);
		if stored != computed {
			return Err(DecodeError::ChecksumMismatch { stored, computed });
		}

		Ok(Self { payload, pos: 0 })
	}

	fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
		let remaining = self.payload.len() - self.pos;
		if n > remaining {
			return Err(DecodeError::UnexpectedEof {
				needed: n,
				remaining,
			});
		}
		let slice = &self.payload[self.pos..self.pos + n];
		self.pos += n;
		Ok(slice)
	}

	fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
		let mut out = [0u8; N];
		out.copy_from_slice(self.take(N)?);
		Ok(out)
	}

	pub fn u8(&mut self) -> Result<u8, DecodeError> {
		Ok(self.take(1)?[0])
	}

	pub fn u16(&mut self) -> Result<u16, DecodeError> {
		Ok(u16::from_le_bytes(self.take_array()?))
	}

	pub fn u32(&mut self) -> Result<u32, DecodeError> {
		Ok(u32::from_le_bytes(self.take_array()?))
	}

	pub fn f64(&mut self) -> Result<f64, DecodeError> {
		Ok(f64::from_le_bytes(self.take_array()?))
	}

	/// Read a sequence length, rejecting counts that cannot fit in the rest
	/// of the payload given a minimum encoded element size.
	pub fn seq_len(&mut self, min_elem_size: usize) -> Result<usize, DecodeError> {
		let len = self.u32()? as usize;
		let remaining = self.payload.len() - self.pos;
		if len.saturating_mul(min_elem_size.max(1)) > remaining {
			return Err(DecodeError::UnexpectedEof {
				needed: len.saturating_mul(min_elem_size.max(1)),
				remaining,
			});
		}
		Ok(len)
	}

	pub fn str(&mut self) -> Result<&'a str, DecodeError> {
		let len = self.seq_len(1)?;
		std::str::from_utf8(self.take(len)?).map_err(|_| DecodeError::InvalidUtf8)
	}

	pub fn key(&mut self) -> Result<SpatialKey, DecodeError> {
		Ok(SpatialKey::new(self.u16()?, self.u16()?, self.u16()?))
	}

	pub fn point(&mut self) -> Result<DVec3, DecodeError> {
		Ok(DVec3::new(self.f64()?, self.f64()?, self.f64()?))
	}

	/// Require the whole payload to have been consumed.
	pub fn finish(self) -> Result<(), DecodeError> {
		match self.payload.len() - self.pos {
			0 => Ok(()),
			n => Err(DecodeError::TrailingBytes(n)),
		}
	}
}
