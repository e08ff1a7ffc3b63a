//! Fixed-width unsigned index types and their big-endian on-disk encoding.
//!
//! A `Stock` is parametric over an index type `I`; this module supplies the
//! `FixedWidthInt` bound, modeled as a type parameter, for the four widths a
//! `Stock` supports.

/// An unsigned integer usable as a stock index: fixed width, big-endian
/// encodable, convertible to/from `u64` for arithmetic on slot counts.
pub trait FixedWidthInt: Copy + Eq + Ord + std::hash::Hash + std::fmt::Debug + 'static {
    /// Encoded width in bytes; one of 1, 2, 4, 8.
    const WIDTH: usize;

    fn to_be_bytes_vec(self) -> Vec<u8>;
    fn from_be_bytes_slice(bytes: &[u8]) -> Self;
    fn to_u64(self) -> u64;
    fn from_u64(value: u64) -> Self;
}

macro_rules! impl_fixed_width_int {
    ($ty:ty, $width:expr) => {
        impl FixedWidthInt for $ty {
            const WIDTH: usize = $width;

            fn to_be_bytes_vec(self) -> Vec<u8> {
                self.to_be_bytes().to_vec()
            }

            fn from_be_bytes_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $width];
                buf.copy_from_slice(&bytes[..$width]);
                <$ty>::from_be_bytes(buf)
            }

            fn to_u64(self) -> u64 {
                self as u64
            }

            fn from_u64(value: u64) -> Self {
                value as $ty
            }
        }
    };
}

impl_fixed_width_int!(u8, 1);
impl_fixed_width_int!(u16, 2);
impl_fixed_width_int!(u32, 4);
impl_fixed_width_int!(u64, 8);

/// Big-endian fixed-width encoder/decoder, dispatched on `I::WIDTH`.
///
/// This is a thin, zero-sized wrapper around the inherent `to_be_bytes`/
/// `from_be_bytes` methods already provided by [`FixedWidthInt`] — useful in
/// generic contexts (e.g. [`crate::free_list::FreeListStack`]) where a
/// value-level codec handle reads more naturally than calling trait methods
/// directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexCodec<I>(std::marker::PhantomData<I>);

impl<I: FixedWidthInt> IndexCodec<I> {
    pub fn new() -> Self {
        IndexCodec(std::marker::PhantomData)
    }

    pub fn width(&self) -> usize {
        I::WIDTH
    }

    pub fn encode(&self, value: I) -> Vec<u8> {
        value.to_be_bytes_vec()
    }

    pub fn decode(&self, bytes: &[u8]) -> I {
        I::from_be_bytes_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_all_widths() {
        assert_eq!(u8::from_be_bytes_slice(&1u8.to_be_bytes_vec()), 1u8);
        assert_eq!(u16::from_be_bytes_slice(&1234u16.to_be_bytes_vec()), 1234u16);
        assert_eq!(
            u32::from_be_bytes_slice(&0xdead_beefu32.to_be_bytes_vec()),
            0xdead_beefu32
        );
        assert_eq!(
            u64::from_be_bytes_slice(&0x0123_4567_89ab_cdefu64.to_be_bytes_vec()),
            0x0123_4567_89ab_cdefu64
        );
    }

    #[test]
    fn codec_big_endian() {
        let codec: IndexCodec<u32> = IndexCodec::new();
        assert_eq!(codec.encode(1), vec![0, 0, 0, 1]);
        assert_eq!(codec.decode(&[0, 0, 1, 0]), 256);
    }
}
