use std::thread;

use fsi_blocks::algs::collective::{allgather_counts, allgather_lists, rank_slice};
use fsi_blocks::algs::communicator::{CommTag, Communicator, LocalComm, NoComm, Wait};

fn on_ranks<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(LocalComm) -> T + Send + Sync + Copy + 'static,
{
    let handles: Vec<_> = LocalComm::world(n)
        .into_iter()
        .map(|comm| thread::spawn(move || f(comm)))
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn local_fifo_order() {
    let tag = CommTag(0x1001);
    let comms = LocalComm::world(2);
    for i in 0..10u8 {
        comms[0].isend(1, tag.as_u16(), &[i]).wait();
    }
    let mut out = Vec::new();
    for _ in 0..10 {
        let mut b = [0u8; 1];
        let h = comms[1].irecv(0, tag.as_u16(), &mut b);
        out.push(h.wait().unwrap()[0]);
    }
    assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
}

#[test]
fn worlds_are_isolated() {
    let a = LocalComm::world(2);
    let b = LocalComm::world(2);
    a[0].isend(1, 7, &[1]).wait();
    b[0].isend(1, 7, &[2]).wait();
    let mut buf = [0u8; 1];
    assert_eq!(b[1].irecv(0, 7, &mut buf).wait().unwrap(), vec![2]);
    assert_eq!(a[1].irecv(0, 7, &mut buf).wait().unwrap(), vec![1]);
}

#[test]
fn counts_and_offsets_agree_on_every_rank() {
    let slices = on_ranks(4, |comm| {
        let local = comm.rank() * 2 + 1;
        let counts = allgather_counts(&comm, local).unwrap();
        comm.barrier().unwrap();
        (counts, rank_slice(&comm, local).unwrap())
    });
    for (rank, (counts, slice)) in slices.iter().enumerate() {
        assert_eq!(counts, &vec![1, 3, 5, 7]);
        assert_eq!(slice.offset, [0, 1, 4, 9][rank]);
        assert_eq!(slice.total, 16);
    }
}

#[test]
fn variable_length_lists() {
    let lists = on_ranks(3, |comm| {
        let mine: Vec<usize> = (0..comm.rank()).map(|i| 10 * comm.rank() + i).collect();
        allgather_lists(&comm, &mine).unwrap()
    });
    let expected = vec![vec![], vec![10], vec![20, 21]];
    assert!(lists.iter().all(|l| l == &expected));
}

#[test]
fn serial_collectives_are_trivial() {
    let slice = rank_slice(&NoComm, 5).unwrap();
    assert_eq!((slice.offset, slice.total), (0, 5));
    assert_eq!(allgather_lists(&NoComm, &[3, 1]).unwrap(), vec![vec![3, 1]]);
}
