//! Batch sampler ordering.

use std::collections::HashSet;

use framefold::{BatchSampler, FramefoldError};

#[test]
fn twelve_frames_in_five_stripes() {
    let sampler = BatchSampler::new(12, 5).unwrap();
    assert_eq!(sampler.rows(), 3);
    assert_eq!(sampler.len(), 15);
    assert_eq!(sampler.row(0), Some(vec![0, 3, 6, 9, 12]));

    let order: Vec<u64> = sampler.iter().collect();
    assert_eq!(
        order,
        vec![0, 3, 6, 9, 12, 1, 4, 7, 10, 13, 2, 5, 8, 11, 14]
    );
}

#[test]
fn every_index_below_the_total_is_visited_once() {
    let sampler = BatchSampler::new(101, 7).unwrap();
    let order: Vec<u64> = sampler.iter().collect();
    let seen: HashSet<u64> = order.iter().copied().filter(|&i| i < 101).collect();

    assert_eq!(seen.len(), 101);
    assert_eq!(order.len() as u64, sampler.len());
    assert!(order.iter().all(|&i| i < sampler.len()));
}

#[test]
fn each_column_walks_consecutive_indices() {
    let sampler = BatchSampler::new(40, 4).unwrap();
    let rows: Vec<Vec<u64>> = (0..sampler.rows())
        .map(|row| sampler.row(row).unwrap())
        .collect();

    for stripe in 0..4 {
        for pair in rows.windows(2) {
            assert_eq!(pair[1][stripe], pair[0][stripe] + 1);
        }
    }
}

#[test]
fn batch_size_one_is_the_identity_order() {
    let sampler = BatchSampler::new(6, 1).unwrap();
    assert_eq!((&sampler).into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn batch_larger_than_dataset_gives_one_row() {
    let sampler = BatchSampler::new(3, 5).unwrap();
    assert_eq!(sampler.rows(), 1);
    assert_eq!(sampler.row(0), Some(vec![0, 1, 2, 3, 4]));
    assert_eq!(sampler.row(1), None);
}

#[test]
fn zero_batch_size_is_rejected() {
    assert!(matches!(
        BatchSampler::new(10, 0),
        Err(FramefoldError::InvalidBatchSize)
    ));
}
