// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Merge and windowing properties of the band engine

use controlbands_core::{BandEngine, MemoryErrorSink, Summary, WindowedSeries, D2};
use proptest::prelude::*;
use std::sync::Arc;

const EXAMPLE_DATA: [f64; 10] = [49.6, 47.6, 49.9, 51.3, 47.8, 51.2, 52.6, 52.4, 53.6, 52.1];
const DAY: f64 = 86_400.0;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn test_nist_example_in_one_summary() {
    let summary = Summary::from_values(None, EXAMPLE_DATA);

    assert_eq!(summary.item_count(), 10);
    assert_eq!(summary.range_count(), 9);
    assert!((summary.mean() - 50.81).abs() < 0.005);
    assert!((summary.dispersion() - 1.8778 / D2).abs() < 0.00005);
}

#[test]
fn test_bincode_round_trip_is_exact() {
    let summary = Summary::from_values(None, EXAMPLE_DATA);
    let bytes = bincode::serialize(&summary).unwrap();
    let restored: Summary = bincode::deserialize(&bytes).unwrap();

    assert_eq!(restored.item_count(), summary.item_count());
    assert_eq!(restored.item_sum().to_bits(), summary.item_sum().to_bits());
    assert_eq!(restored.range_count(), summary.range_count());
    assert_eq!(restored.range_sum().to_bits(), summary.range_sum().to_bits());
    assert_eq!(restored.last_value(), summary.last_value());
}

#[test]
fn test_window_scenario_with_fresh_values() {
    let now = 1_700_000_000.0;
    let sink = Arc::new(MemoryErrorSink::new());
    let engine: BandEngine<&'static str> = BandEngine::builder()
        .retention_secs(2.0 * DAY + 300.0)
        .error_sink(sink.clone())
        .build()
        .unwrap();

    let history: WindowedSeries = [
        (now - 3.0 * DAY, Summary::from_values(None, [1.0, 2.0, 3.0])),
        (now - 2.0 * DAY, Summary::from_values(Some(3.0), [4.0, 5.0])),
        (now - DAY, Summary::from_values(Some(5.0), [6.0, 7.0, 8.0])),
    ]
    .into_iter()
    .collect();
    engine.registry().insert_series("A", history);

    let expected_prior = Summary::from_values(Some(3.0), [4.0, 5.0, 6.0, 7.0, 8.0]);
    assert_eq!(engine.combined(&"A", now), expected_prior);

    let bands = engine.process(&"A", now, [5.0]);
    assert_eq!(bands.len(), 1);
    assert!(close(bands[0].mean, 6.0));
    assert!(close(bands[0].dispersion, expected_prior.dispersion()));

    let after = engine.combined(&"A", now);
    assert!(close(after.mean(), 35.0 / 6.0));
    assert!(sink.is_empty());
}

proptest! {
    #[test]
    fn merge_of_split_matches_single_pass(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200),
        split in any::<prop::sample::Index>(),
    ) {
        let at = split.index(values.len() + 1);
        let (head, tail) = values.split_at(at);

        let whole = Summary::from_values(None, values.iter().copied());
        let first = Summary::from_values(None, head.iter().copied());
        let second = Summary::from_values(first.last_value(), tail.iter().copied());
        let merged = first.merge(&second);

        prop_assert_eq!(merged.item_count(), whole.item_count());
        prop_assert_eq!(merged.range_count(), whole.range_count());
        prop_assert_eq!(merged.last_value(), whole.last_value());
        prop_assert!(close(merged.mean(), whole.mean()) || (merged.mean() - whole.mean()).abs() < 1e-6);
        prop_assert!((merged.dispersion() - whole.dispersion()).abs() < 1e-6);
    }

    #[test]
    fn merge_is_associative(
        a in prop::collection::vec(-1.0e3f64..1.0e3, 0..20),
        b in prop::collection::vec(-1.0e3f64..1.0e3, 0..20),
        c in prop::collection::vec(-1.0e3f64..1.0e3, 0..20),
    ) {
        let sa = Summary::from_values(None, a);
        let sb = Summary::from_values(sa.last_value(), b);
        let sc = Summary::from_values(sb.last_value(), c);

        let left = sa.merge(&sb).merge(&sc);
        let right = sa.merge(&sb.merge(&sc));

        prop_assert_eq!(left.item_count(), right.item_count());
        prop_assert_eq!(left.range_count(), right.range_count());
        prop_assert_eq!(left.last_value(), right.last_value());
        prop_assert!((left.item_sum() - right.item_sum()).abs() < 1e-6);
        prop_assert!((left.range_sum() - right.range_sum()).abs() < 1e-6);
    }

    #[test]
    fn batch_results_only_see_earlier_values(
        history in prop::collection::vec(-100.0f64..100.0, 1..30),
        batch in prop::collection::vec(-100.0f64..100.0, 1..30),
    ) {
        let now = 1_700_000_000.0;
        let engine: BandEngine<u32> = BandEngine::new(DAY).unwrap();
        engine.process(&7, now - 10.0, history.iter().copied());

        let bands = engine.process(&7, now, batch.iter().copied());
        prop_assert_eq!(bands.len(), batch.len());

        let mut seen = history.clone();
        for (band, value) in bands.iter().zip(&batch) {
            let expected = Summary::from_values(None, seen.iter().copied());
            prop_assert_eq!(band.value, *value);
            prop_assert!((band.mean - expected.mean()).abs() < 1e-9);
            prop_assert!((band.dispersion - expected.dispersion()).abs() < 1e-9);
            seen.push(*value);
        }
    }
}
