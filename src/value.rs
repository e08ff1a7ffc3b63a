//! The `ValueEncoder` contract clients implement to store an opaque,
//! fixed-size record in a `Stock`.

use crate::error::StockError;

/// Encodes and decodes a client value `V` to/from a fixed-size byte buffer.
///
/// `ENCODED_SIZE` is constant per encoder *type*: a statically fixed
/// encoded size. Implementors must guarantee
/// `store`/`load` never read or write outside a buffer of exactly
/// `ENCODED_SIZE` bytes.
pub trait ValueEncoder<V> {
    const ENCODED_SIZE: usize;

    fn store(buf: &mut [u8], value: &V) -> Result<(), StockError>;
    fn load(buf: &[u8]) -> Result<V, StockError>;

    /// The zero record — a buffer of `ENCODED_SIZE` zero bytes — decoded.
    /// Stocks never need to construct this through `store`; it is what a
    /// lazily-initialized slot reads as.
    fn zero() -> V {
        let buf = vec![0u8; Self::ENCODED_SIZE];
        // A conforming encoder must be able to decode the all-zero buffer;
        // this is exercised by every Stock test fixture.
        Self::load(&buf).expect("zero record must decode")
    }
}

/// A ready-made [`ValueEncoder`] for plain fixed-size byte arrays, usable
/// directly by trie-node callers that just want to store raw bytes.
pub struct FixedBytes<const N: usize>;

impl<const N: usize> ValueEncoder<[u8; N]> for FixedBytes<N> {
    const ENCODED_SIZE: usize = N;

    fn store(buf: &mut [u8], value: &[u8; N]) -> Result<(), StockError> {
        if buf.len() != N {
            return Err(StockError::other(format!(
                "buffer size {} does not match encoded size {}",
                buf.len(),
                N
            )));
        }
        buf.copy_from_slice(value);
        Ok(())
    }

    fn load(buf: &[u8]) -> Result<[u8; N], StockError> {
        if buf.len() != N {
            return Err(StockError::other(format!(
                "buffer size {} does not match encoded size {}",
                buf.len(),
                N
            )));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(buf);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_bytes_round_trip() {
        let mut buf = [0u8; 4];
        FixedBytes::<4>::store(&mut buf, &[1, 2, 3, 4]).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(FixedBytes::<4>::load(&buf).unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn zero_value_is_all_zero_bytes() {
        assert_eq!(FixedBytes::<4>::zero(), [0, 0, 0, 0]);
    }
}
