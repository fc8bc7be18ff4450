//! Fixed little-endian wire types for the setup-phase collectives.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// A count (e.g. interface points on one rank) carried on the wire.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u64,
}

const_assert_eq!(std::mem::size_of::<WireCount>(), 8);

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }

    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// Decode a buffer of [`WireCount`] records that arrived as raw bytes.
///
/// The buffer is copied first since received bytes carry no alignment guarantee.
pub fn decode_counts(raw: &[u8]) -> Vec<usize> {
    let mut out = vec![WireCount::default(); raw.len() / std::mem::size_of::<WireCount>()];
    let width = out.len() * std::mem::size_of::<WireCount>();
    cast_slice_mut(&mut out).copy_from_slice(&raw[..width]);
    out.iter().map(WireCount::get).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_survive_byte_encoding() {
        let counts = [WireCount::new(0), WireCount::new(3), WireCount::new(1 << 40)];
        let bytes = cast_slice(&counts).to_vec();
        assert_eq!(decode_counts(&bytes), vec![0, 3, 1 << 40]);
    }
}
