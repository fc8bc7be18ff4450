//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Handles are **waitable**: `isend`/`irecv` return immediately and the caller
//! calls `.wait()` before it trusts that the buffer is ready. There is no
//! cancellation and no timeout; a missing message stalls the waiting rank.
//!
//! The two collectives the FSI setup needs (allgather for prefix sums and a
//! barrier) are provided methods built on the point-to-point primitives.
//! Backends with native collectives (MPI) override them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::fsi_error::FsiError;

/// Typed message tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    #[inline]
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Tags reserved for the provided collectives.
pub const ALLGATHER_TAG: CommTag = CommTag::new(0xF5A0);
pub const BARRIER_TAG: CommTag = CommTag::new(0xF5A1);

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Message-passing interface used by the distributed setup phase.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// Rank of this process (or simulated process).
    fn rank(&self) -> usize;
    /// Number of ranks in the communicator.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Gather `send` from every rank into `recv`, ordered by rank.
    ///
    /// `recv.len()` must equal `size() * send.len()`.
    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), FsiError> {
        let n = self.size().max(1);
        let chunk = send.len();
        if recv.len() != n * chunk {
            return Err(FsiError::LengthMismatch {
                what: "allgather receive buffer",
                expected: n * chunk,
                found: recv.len(),
            });
        }
        let me = self.rank();
        recv[me * chunk..(me + 1) * chunk].copy_from_slice(send);
        if n == 1 {
            return Ok(());
        }

        let tag = ALLGATHER_TAG.as_u16();
        let mut pending = Vec::with_capacity(n - 1);
        for peer in (0..n).filter(|&p| p != me) {
            let mut scratch = vec![0u8; chunk];
            pending.push((peer, self.irecv(peer, tag, &mut scratch)));
        }
        let sends: Vec<_> = (0..n)
            .filter(|&p| p != me)
            .map(|peer| self.isend(peer, tag, send))
            .collect();

        for (peer, handle) in pending {
            let data = handle.wait().ok_or_else(|| FsiError::CommError {
                peer,
                message: "allgather: no data received".into(),
            })?;
            if data.len() != chunk {
                return Err(FsiError::BufferSizeMismatch {
                    peer,
                    expected: chunk,
                    got: data.len(),
                });
            }
            recv[peer * chunk..(peer + 1) * chunk].copy_from_slice(&data);
        }
        for s in sends {
            let _ = s.wait();
        }
        Ok(())
    }

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> Result<(), FsiError> {
        let n = self.size().max(1);
        if n == 1 {
            return Ok(());
        }
        let tag = BARRIER_TAG.as_u16();
        let me = self.rank();
        if me == 0 {
            for peer in 1..n {
                let mut token = [0u8; 1];
                self.irecv(peer, tag, &mut token)
                    .wait()
                    .ok_or_else(|| FsiError::CommError {
                        peer,
                        message: "barrier: missing arrival token".into(),
                    })?;
            }
            let releases: Vec<_> = (1..n).map(|peer| self.isend(peer, tag, &[1])).collect();
            for r in releases {
                let _ = r.wait();
            }
        } else {
            let _ = self.isend(0, tag, &[0]).wait();
            let mut token = [0u8; 1];
            self.irecv(0, tag, &mut token)
                .wait()
                .ok_or_else(|| FsiError::CommError {
                    peer: 0,
                    message: "barrier: missing release token".into(),
                })?;
        }
        Ok(())
    }
}

/// Compile-time no-op comm for pure serial runs: one rank, no peers.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- LocalComm: ranks simulated by threads of one process ---
type Key = (u64, usize, usize, u16); // (world, src, dst, tag)

static MAILBOX: Lazy<DashMap<Key, VecDeque<Bytes>>> = Lazy::new(DashMap::new);
static NEXT_WORLD: AtomicU64 = AtomicU64::new(1);

/// Receive handle for [`LocalComm`]; polls the mailbox on `wait`.
///
/// The whole message is returned, whatever the receive buffer size, so
/// callers can detect a size mismatch.
pub struct LocalHandle {
    key: Key,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            let popped = MAILBOX
                .get_mut(&self.key)
                .and_then(|mut queue| queue.pop_front());
            if let Some(bytes) = popped {
                // the shard guard is released; drop the queue if drained
                MAILBOX.remove_if(&self.key, |_, queue| queue.is_empty());
                return Some(bytes.to_vec());
            }
            std::thread::yield_now();
        }
    }
}

/// Intra-process communicator: each rank lives on its own thread.
///
/// Messages between the same (src, dst, tag) are delivered in FIFO order.
#[derive(Clone, Debug)]
pub struct LocalComm {
    world: u64,
    rank: usize,
    size: usize,
}

impl LocalComm {
    /// Rank handle in the shared default world (world id 0).
    pub fn new(rank: usize, size: usize) -> Self {
        Self {
            world: 0,
            rank,
            size,
        }
    }

    /// Create `size` rank handles in a fresh, isolated world.
    pub fn world(size: usize) -> Vec<Self> {
        let world = NEXT_WORLD.fetch_add(1, Ordering::Relaxed);
        (0..size).map(|rank| Self { world, rank, size }).collect()
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.world, self.rank, peer, tag);
        MAILBOX
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            key: (self.world, peer, self.rank, tag),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;
    use std::sync::Arc;

    /// MPI world communicator. Point-to-point sends are blocking standard-mode
    /// sends; receives complete on `wait`.
    #[derive(Clone)]
    pub struct MpiComm {
        _universe: Arc<Universe>,
        world: Arc<SimpleCommunicator>,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, FsiError> {
            let universe = mpi::initialize().ok_or_else(|| FsiError::CommError {
                peer: 0,
                message: "MPI already initialised".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                _universe: Arc::new(universe),
                world: Arc::new(world),
                rank,
                size,
            })
        }
    }

    pub struct MpiRecv {
        world: Arc<SimpleCommunicator>,
        peer: usize,
        tag: u16,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            let (msg, _status) = self
                .world
                .process_at_rank(self.peer as i32)
                .receive_vec_with_tag::<u8>(self.tag as i32);
            Some(msg)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
        }

        fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> MpiRecv {
            MpiRecv {
                world: self.world.clone(),
                peer,
                tag,
            }
        }

        fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), FsiError> {
            if recv.len() != self.size * send.len() {
                return Err(FsiError::LengthMismatch {
                    what: "allgather receive buffer",
                    expected: self.size * send.len(),
                    found: recv.len(),
                });
            }
            self.world.all_gather_into(send, recv);
            Ok(())
        }

        fn barrier(&self) -> Result<(), FsiError> {
            self.world.barrier();
            Ok(())
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_roundtrip_two_ranks() {
        let comms = LocalComm::world(2);
        let mut recv_buf = [0u8; 4];
        let recv_handle = comms[1].irecv(0, 7, &mut recv_buf);
        comms[0].isend(1, 7, &[1, 2, 3, 4]).wait();
        let data = recv_handle
            .wait()
            .expect("Expected to receive data from rank 0");
        recv_buf.copy_from_slice(&data);
        assert_eq!(&recv_buf, &[1, 2, 3, 4]);
    }

    #[test]
    fn oversized_message_is_delivered_whole() {
        let comms = LocalComm::world(2);
        let mut small = [0u8; 4];
        let handle = comms[1].irecv(0, 9, &mut small);
        comms[0].isend(1, 9, &[1, 2, 3, 4, 5]);
        assert_eq!(handle.wait().unwrap(), vec![1, 2, 3, 4, 5]);
        assert!(!MAILBOX.contains_key(&(comms[0].world, 0, 1, 9)));
    }

    #[test]
    fn allgather_detects_mismatched_chunks() {
        let comms = LocalComm::world(2);
        let errs: Vec<FsiError> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let chunk = 3 - comm.rank();
                        let mut out = vec![0u8; 2 * chunk];
                        comm.allgather(&vec![1u8; chunk], &mut out).unwrap_err()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(matches!(
            errs[0],
            FsiError::BufferSizeMismatch { peer: 1, expected: 3, got: 2 }
        ));
        assert!(matches!(
            errs[1],
            FsiError::BufferSizeMismatch { peer: 0, expected: 2, got: 3 }
        ));
    }

    #[test]
    fn nocomm_allgather_copies_own_chunk() {
        let mut out = [0u8; 3];
        NoComm.allgather(&[9, 8, 7], &mut out).unwrap();
        assert_eq!(out, [9, 8, 7]);
        NoComm.barrier().unwrap();
    }

    #[test]
    fn allgather_rejects_wrong_buffer() {
        let mut out = [0u8; 2];
        let err = NoComm.allgather(&[1, 2, 3], &mut out).unwrap_err();
        assert!(matches!(err, FsiError::LengthMismatch { .. }));
    }
}
