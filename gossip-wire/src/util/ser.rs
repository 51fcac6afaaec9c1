//! A very simple serialization framework used to read and write gossip wire structs.
//!
//! All integers are big-endian on the wire. Reads are bounds-checked: a read that would pass the
//! end of the underlying buffer fails with [`DecodeError::ShortRead`] rather than returning short
//! data.

use std::io::{Read, Write};

use crate::ln::msgs::DecodeError;

/// A trait that is similar to [`std::io::Write`], the target of [`Writeable`] serialization.
///
/// An impl is provided for any type that also impls [`std::io::Write`].
pub trait Writer {
	/// Writes the given buf out. See [`std::io::Write::write_all`] for more.
	fn write_all(&mut self, buf: &[u8]) -> Result<(), std::io::Error>;
}

impl<W: Write> Writer for W {
	#[inline]
	fn write_all(&mut self, buf: &[u8]) -> Result<(), std::io::Error> {
		<Self as Write>::write_all(self, buf)
	}
}

/// A trait that gossip wire structs implement allowing them to be written out to a [`Writer`].
pub trait Writeable {
	/// Writes `self` out to the given [`Writer`].
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), std::io::Error>;

	/// Writes `self` out to a `Vec<u8>`.
	fn encode(&self) -> Vec<u8> {
		let mut msg = Vec::new();
		// Writes into a Vec cannot fail
		self.write(&mut msg).unwrap();
		msg
	}
}

/// A trait that gossip wire structs implement allowing them to be read in from a
/// [`std::io::Read`].
pub trait Readable
where
	Self: Sized,
{
	/// Reads a `Self` in from the given [`Read`].
	fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError>;
}

macro_rules! impl_writeable_primitive {
	($val_type:ty, $len:expr) => {
		impl Writeable for $val_type {
			#[inline]
			fn write<W: Writer>(&self, writer: &mut W) -> Result<(), std::io::Error> {
				writer.write_all(&self.to_be_bytes())
			}
		}
		impl Readable for $val_type {
			#[inline]
			fn read<R: Read>(reader: &mut R) -> Result<$val_type, DecodeError> {
				let mut buf = [0; $len];
				reader.read_exact(&mut buf)?;
				Ok(<$val_type>::from_be_bytes(buf))
			}
		}
	};
}

impl_writeable_primitive!(u64, 8);
impl_writeable_primitive!(u32, 4);
impl_writeable_primitive!(u16, 2);

impl Writeable for u8 {
	#[inline]
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), std::io::Error> {
		writer.write_all(&[*self])
	}
}
impl Readable for u8 {
	#[inline]
	fn read<R: Read>(reader: &mut R) -> Result<u8, DecodeError> {
		let mut buf = [0; 1];
		reader.read_exact(&mut buf)?;
		Ok(buf[0])
	}
}

macro_rules! impl_array {
	($size:expr) => {
		impl Writeable for [u8; $size] {
			#[inline]
			fn write<W: Writer>(&self, w: &mut W) -> Result<(), std::io::Error> {
				w.write_all(self)
			}
		}

		impl Readable for [u8; $size] {
			#[inline]
			fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
				let mut buf = [0u8; $size];
				r.read_exact(&mut buf)?;
				Ok(buf)
			}
		}
	};
}

impl_array!(3); // for rgb
impl_array!(4); // for IPv4
impl_array!(10); // for OnionV2
impl_array!(16); // for IPv6
impl_array!(32); // for chain hashes & node aliases
impl_array!(33); // for node ids
impl_array!(35); // for OnionV3

// 16-bit length-prefixed opaque byte strings, as used for feature bitmaps and address lists.
impl Writeable for Vec<u8> {
	#[inline]
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), std::io::Error> {
		(self.len() as u16).write(w)?;
		w.write_all(self)
	}
}

impl Readable for Vec<u8> {
	#[inline]
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let len: u16 = Readable::read(r)?;
		let mut ret = vec![0; len as usize];
		r.read_exact(&mut ret)?;
		Ok(ret)
	}
}

#[cfg(test)]
mod tests {
	use super::{Readable, Writeable};
	use crate::ln::msgs::DecodeError;
	use std::io::Cursor;

	#[test]
	fn primitives_are_big_endian() {
		assert_eq!(0x0102u16.encode(), vec![1, 2]);
		assert_eq!(0x01020304u32.encode(), vec![1, 2, 3, 4]);
		assert_eq!(0x0102030405060708u64.encode(), vec![1, 2, 3, 4, 5, 6, 7, 8]);

		let mut cursor = Cursor::new(vec![0x26, 0x07]);
		let port: u16 = Readable::read(&mut cursor).unwrap();
		assert_eq!(port, 9735);
	}

	#[test]
	fn short_reads_never_return_partial_data() {
		let mut cursor = Cursor::new(vec![0u8; 3]);
		let res: Result<u32, _> = Readable::read(&mut cursor);
		match res {
			Err(DecodeError::ShortRead) => {},
			other => panic!("expected ShortRead, got {:?}", other),
		}
	}

	#[test]
	fn length_prefixed_vec() {
		let bytes = vec![0xde, 0xad, 0xbe, 0xef];
		assert_eq!(bytes.encode(), vec![0, 4, 0xde, 0xad, 0xbe, 0xef]);

		// The declared length exceeds the available data
		let mut cursor = Cursor::new(vec![0, 5, 1, 2]);
		let res: Result<Vec<u8>, _> = Readable::read(&mut cursor);
		match res {
			Err(DecodeError::ShortRead) => {},
			other => panic!("expected ShortRead, got {:?}", other),
		}
	}
}
