// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use libfuzzer_sys::fuzz_target;
use seqclust_core::{Euclidean, ExecutionContext, ReproMode, SegError, SequenceView};
use seqclust_fit::{InitMethod, OrderedClustering};

fn build_repro_mode(seed: u8) -> ReproMode {
    match seed % 3 {
        0 => ReproMode::Strict,
        1 => ReproMode::Balanced,
        _ => ReproMode::Fast,
    }
}

fn build_init_method(seed: u8) -> InitMethod {
    match seed % 3 {
        0 => InitMethod::Default,
        1 => InitMethod::TraceSegmentation,
        _ => InitMethod::EqualResample,
    }
}

fn build_threshold(mode_seed: u8, value_seed: u8) -> f64 {
    match mode_seed % 6 {
        0 => f64::from(value_seed) / 255.0,
        1 => -f64::from(value_seed),
        2 => f64::from(value_seed),
        3 => f64::NAN,
        4 => f64::INFINITY,
        _ => 0.0,
    }
}

fn build_value(mode_seed: u8, raw: f64, raw_seed: i16) -> f64 {
    match mode_seed % 8 {
        0 => raw,
        1 => f64::from(raw_seed) / 8.0,
        2 => 0.0,
        3 => f64::from(raw_seed) * 1.0e150,
        4 => f64::NAN,
        _ => (raw_seed % 5) as f64,
    }
}

fn build_partition(cursor: &mut common::ByteCursor<'_>, n: usize) -> Option<Vec<usize>> {
    if cursor.next_u8() % 3 != 0 {
        return None;
    }
    let parts = common::bounded(cursor.next_u8(), 1, 8);
    let mut lengths = Vec::with_capacity(parts);
    let mut remaining = n;
    for idx in 0..parts {
        let len = if idx + 1 == parts {
            remaining
        } else {
            common::bounded(cursor.next_u8(), 0, remaining.min(16))
        };
        lengths.push(len);
        remaining -= len;
    }
    if cursor.next_u8() & 1 == 1 {
        lengths.push(common::bounded(cursor.next_u8(), 0, 3));
    }
    Some(lengths)
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);

    let d = common::bounded(cursor.next_u8(), 1, 4);
    let n = common::bounded(cursor.next_u8(), 0, 96);
    let raw = common::decode_f64_chunks(&cursor.take_padded(n * d * 8), n * d);

    let mut values = Vec::with_capacity(n * d);
    for &value in &raw {
        values.push(build_value(cursor.next_u8(), value, cursor.next_i16()));
    }

    let Ok(view) = SequenceView::new(&values, n, d) else {
        return;
    };

    let math = Euclidean::new(build_repro_mode(cursor.next_u8()));
    let num_segments = usize::from(cursor.next_u8());
    let threshold = build_threshold(cursor.next_u8(), cursor.next_u8());
    let Ok(mut clustering) = OrderedClustering::new(view, math, num_segments, threshold) else {
        return;
    };

    if clustering
        .initialize(build_init_method(cursor.next_u8()))
        .is_err()
    {
        return;
    }

    let partition = build_partition(&mut cursor, n);
    match clustering.fit(partition.as_deref(), &ExecutionContext::new()) {
        Ok(report) => {
            let boundaries = clustering.boundaries();
            assert_eq!(boundaries.first().copied(), Some(0));
            assert!(boundaries.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(boundaries.last().is_some_and(|&last| last < n));
            assert!(report.stats.sweeps <= seqclust_fit::MAX_SWEEPS);
            let _ = clustering.result();
        }
        Err(SegError::EmptyCluster { segment }) => {
            assert!(segment < partition.as_ref().map_or(usize::MAX, Vec::len));
        }
        Err(_) => {}
    }
});
