//! Typed collectives over a [`Communicator`].
//!
//! These are the synchronization points of the setup phase: every rank must
//! call them in the same order, and each call blocks until all ranks arrive.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, cast_slice, decode_counts};
use crate::fsi_error::FsiError;

/// Tag of the payload exchange in [`allgather_lists`].
pub const LIST_TAG: CommTag = CommTag::new(0xF5A2);

/// Gather one count per rank; entry `k` is the value reported by rank `k`.
pub fn allgather_counts<C>(comm: &C, local: usize) -> Result<Vec<usize>, FsiError>
where
    C: Communicator + ?Sized,
{
    let n_ranks = comm.size().max(1);
    let send = [WireCount::new(local)];
    let mut recv = vec![0u8; n_ranks * std::mem::size_of::<WireCount>()];
    comm.allgather(cast_slice(&send), &mut recv)?;
    Ok(decode_counts(&recv))
}

/// Offsets of an exclusive prefix sum: `offsets[0] = 0`,
/// `offsets[k] = counts[0] + … + counts[k-1]`.
pub fn exclusive_prefix_sum(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len());
    let mut total = 0usize;
    for &c in counts {
        offsets.push(total);
        total += c;
    }
    offsets
}

/// Rank offset and global total for a locally counted quantity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RankSlice {
    pub offset: usize,
    pub local: usize,
    pub total: usize,
}

/// Allgather `local` and compute this rank's offset and the global total.
pub fn rank_slice<C>(comm: &C, local: usize) -> Result<RankSlice, FsiError>
where
    C: Communicator + ?Sized,
{
    let counts = allgather_counts(comm, local)?;
    let offsets = exclusive_prefix_sum(&counts);
    let rank = comm.rank();
    let offset = offsets.get(rank).copied().ok_or(FsiError::MapMismatch {
        what: "rank within communicator",
        expected: counts.len(),
        found: rank,
    })?;
    Ok(RankSlice {
        offset,
        local,
        total: counts.iter().sum(),
    })
}

/// Gather a variable-length id list from every rank; entry `k` is rank `k`'s list.
///
/// Lengths travel first through [`allgather_counts`], then each rank sends its
/// payload to every peer.
pub fn allgather_lists<C>(comm: &C, local: &[usize]) -> Result<Vec<Vec<usize>>, FsiError>
where
    C: Communicator + ?Sized,
{
    let counts = allgather_counts(comm, local.len())?;
    let me = comm.rank();
    let width = std::mem::size_of::<WireCount>();
    let payload: Vec<WireCount> = local.iter().map(|&id| WireCount::new(id)).collect();
    let tag = LIST_TAG.as_u16();

    let mut pending = Vec::with_capacity(counts.len());
    for (peer, &n) in counts.iter().enumerate() {
        if peer == me {
            continue;
        }
        let mut scratch = vec![0u8; n * width];
        pending.push((peer, n, comm.irecv(peer, tag, &mut scratch)));
    }
    let sends: Vec<_> = (0..counts.len())
        .filter(|&p| p != me)
        .map(|peer| comm.isend(peer, tag, cast_slice(&payload)))
        .collect();

    let mut lists = vec![Vec::new(); counts.len()];
    lists[me] = local.to_vec();
    for (peer, n, handle) in pending {
        let raw = handle.wait().ok_or_else(|| FsiError::CommError {
            peer,
            message: "id list: no data received".into(),
        })?;
        if raw.len() != n * width {
            return Err(FsiError::BufferSizeMismatch {
                peer,
                expected: n * width,
                got: raw.len(),
            });
        }
        lists[peer] = decode_counts(&raw);
    }
    for s in sends {
        let _ = s.wait();
    }
    Ok(lists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;

    #[test]
    fn prefix_sum_starts_at_zero() {
        assert_eq!(exclusive_prefix_sum(&[2, 0, 3, 1]), vec![0, 2, 2, 5]);
        assert!(exclusive_prefix_sum(&[]).is_empty());
    }

    #[test]
    fn serial_rank_slice_owns_everything() {
        let s = rank_slice(&NoComm, 7).unwrap();
        assert_eq!(s, RankSlice { offset: 0, local: 7, total: 7 });
    }

    #[test]
    fn lists_are_gathered_by_rank() {
        use crate::algs::communicator::LocalComm;
        let handles: Vec<_> = LocalComm::world(3)
            .into_iter()
            .map(|comm| {
                std::thread::spawn(move || {
                    let local: Vec<usize> = (0..comm.rank()).map(|i| 10 * comm.rank() + i).collect();
                    allgather_lists(&comm, &local).unwrap()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), vec![vec![], vec![10], vec![20, 21]]);
        }
    }
}
