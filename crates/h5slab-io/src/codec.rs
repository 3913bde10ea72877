//! Little-endian element codecs for the transfer engine.
//!
//! [`encoder`] and [`decoder`] build the closures [`h5slab_format::encode`]
//! and [`h5slab_format::decode`] take for plain numeric element types. A
//! vector element of `n` scalars is just `n` consecutive scalars, so the same
//! codecs serve any type size factor.

use byteorder::{ByteOrder, LittleEndian};
use h5slab_format::stream::{ReadStream, WriteStream};
use h5slab_format::Result;

/// A fixed-size scalar with a little-endian byte encoding.
pub trait ScalarCodec: Copy + Default {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decode `dst.len()` values from `src`, which holds exactly that many.
    fn decode_le(src: &[u8], dst: &mut [Self]);

    /// Encode `src` into `dst`, which holds exactly `src.len() * SIZE` bytes.
    fn encode_le(src: &[Self], dst: &mut [u8]);
}

impl ScalarCodec for u8 {
    const SIZE: usize = 1;

    fn decode_le(src: &[u8], dst: &mut [Self]) {
        dst.copy_from_slice(src);
    }

    fn encode_le(src: &[Self], dst: &mut [u8]) {
        dst.copy_from_slice(src);
    }
}

impl ScalarCodec for i8 {
    const SIZE: usize = 1;

    fn decode_le(src: &[u8], dst: &mut [Self]) {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = s as i8;
        }
    }

    fn encode_le(src: &[Self], dst: &mut [u8]) {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = s as u8;
        }
    }
}

macro_rules! scalar_codec {
    ($($ty:ty => $read:ident, $write:ident;)*) => {
        $(
            impl ScalarCodec for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                fn decode_le(src: &[u8], dst: &mut [Self]) {
                    LittleEndian::$read(src, dst);
                }

                fn encode_le(src: &[Self], dst: &mut [u8]) {
                    LittleEndian::$write(src, dst);
                }
            }
        )*
    };
}

scalar_codec! {
    u16 => read_u16_into, write_u16_into;
    i16 => read_i16_into, write_i16_into;
    u32 => read_u32_into, write_u32_into;
    i32 => read_i32_into, write_i32_into;
    u64 => read_u64_into, write_u64_into;
    i64 => read_i64_into, write_i64_into;
    f32 => read_f32_into, write_f32_into;
    f64 => read_f64_into, write_f64_into;
}

/// Encoder writing values as consecutive little-endian scalars.
pub fn encoder<T: ScalarCodec>() -> impl FnMut(&[T], &mut dyn WriteStream) -> Result<()> {
    let mut scratch = Vec::new();
    move |values: &[T], stream: &mut dyn WriteStream| {
        scratch.clear();
        scratch.resize(values.len() * T::SIZE, 0u8);
        T::encode_le(values, &mut scratch);
        stream.write_all(&scratch)?;
        Ok(())
    }
}

/// Decoder reading consecutive little-endian scalars into the target slice.
pub fn decoder<T: ScalarCodec>() -> impl FnMut(&mut dyn ReadStream, &mut [T]) -> Result<()> {
    let mut scratch = Vec::new();
    move |stream: &mut dyn ReadStream, target: &mut [T]| {
        scratch.clear();
        scratch.resize(target.len() * T::SIZE, 0u8);
        stream.read_exact(&mut scratch)?;
        T::decode_le(&scratch, target);
        Ok(())
    }
}

/// Encode a whole slice into a fresh byte vector.
pub fn to_le_bytes<T: ScalarCodec>(values: &[T]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * T::SIZE];
    T::encode_le(values, &mut bytes);
    bytes
}

/// Decode a byte slice holding a whole number of values.
pub fn from_le_bytes<T: ScalarCodec>(bytes: &[u8]) -> Vec<T> {
    let mut values = vec![T::default(); bytes.len() / T::SIZE];
    T::decode_le(&bytes[..values.len() * T::SIZE], &mut values);
    values
}
