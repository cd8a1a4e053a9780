use super::*;

use proptest::prelude::*;

use crate::query::PeakOrigin;

fn point(rt: f64, mz: f64, intensity: f32) -> PeakPoint {
    PeakPoint {
        scan: 0,
        rt,
        mz,
        intensity,
    }
}

fn peak_set(points: Vec<PeakPoint>, precursors: Vec<PrecursorMarker>, spectra: usize) -> PeakSet {
    PeakSet {
        points,
        precursors,
        spectra,
        origin: PeakOrigin::Stream,
    }
}

#[test]
fn test_quality_parse() {
    assert_eq!("fine".parse::<Quality>().unwrap(), Quality::Fine);
    assert_eq!("Coarse".parse::<Quality>().unwrap(), Quality::Coarse);
    assert!("ultra".parse::<Quality>().is_err());
    assert_eq!(Quality::Medium.to_string(), "medium");
}

#[test]
fn test_grid_shape_follows_density() {
    let config = AggregationConfig::default();
    assert_eq!(grid_shape(400, 250.0, &config), (400, 250));
    assert_eq!(grid_shape(3, 5.0, &config), (100, 100));
    assert_eq!(grid_shape(50_000, 1_800.0, &config), (1_000, 1_000));

    let fine = AggregationConfig {
        quality: Quality::Fine,
        ..Default::default()
    };
    assert_eq!(grid_shape(400, 250.0, &fine), (800, 500));

    let coarse = AggregationConfig {
        quality: Quality::Coarse,
        ..Default::default()
    };
    assert_eq!(grid_shape(400, 250.0, &coarse), (200, 125));
}

#[test]
fn test_cells_are_log_of_sum() {
    let bounds = Rect::new((0.0, 10.0), (100.0, 200.0));
    let points = vec![
        point(0.5, 105.0, 60.0),
        point(0.7, 109.0, 40.0),
        point(9.9, 199.0, 1_000.0),
    ];
    let grid = aggregate(&points, &bounds, 10, 10);

    assert_eq!(grid.values.len(), 100);
    assert_eq!(grid.value(0, 0), Some(2.0));
    assert_eq!(grid.value(9, 9), Some(3.0));
    assert_eq!(grid.value(5, 5), Some(0.0));
    assert_eq!(grid.occupied(), 2);
    assert_eq!(grid.value(10, 0), None);
}

#[test]
fn test_upper_bounds_inclusive_and_outside_ignored() {
    let bounds = Rect::new((0.0, 4.0), (0.0, 4.0));
    let points = vec![
        point(4.0, 4.0, 10.0),
        point(4.1, 2.0, 10.0),
        point(2.0, -0.1, 10.0),
    ];
    let grid = aggregate(&points, &bounds, 4, 4);
    assert_eq!(grid.value(3, 3), Some(1.0));
    assert_eq!(grid.occupied(), 1);
    assert_eq!(grid.rt_edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(grid.mz_edges.len(), 5);
}

#[test]
fn test_zero_span_bounds() {
    let bounds = Rect::new((5.0, 5.0), (300.0, 300.0));
    let grid = aggregate(&[point(5.0, 300.0, 100.0)], &bounds, 3, 3);
    assert_eq!(grid.value(0, 0), Some(2.0));
}

#[test]
fn test_markers_suppressed_over_limit() {
    let bounds = Rect::new((0.0, 10.0), (100.0, 500.0));
    let markers: Vec<PrecursorMarker> = (0..6)
        .map(|i| PrecursorMarker {
            scan: i,
            rt: i as f64,
            precursor_mz: 150.0,
        })
        .collect();
    let outside = PrecursorMarker {
        scan: 99,
        rt: 20.0,
        precursor_mz: 150.0,
    };
    let mut all = markers.clone();
    all.push(outside);
    let peaks = peak_set(vec![point(1.0, 120.0, 5.0)], all, 1);

    let config = AggregationConfig::default();
    let view = build_map(&peaks, bounds, None, &config);
    assert_eq!(view.precursor_markers.as_deref(), Some(markers.as_slice()));

    let strict = AggregationConfig {
        marker_limit: 5,
        ..Default::default()
    };
    let view = build_map(&peaks, bounds, None, &strict);
    assert!(view.precursor_markers.is_none());
    assert_eq!(view.grid.occupied(), 1);
}

#[test]
fn test_overlays_keep_geometry() {
    let bounds = Rect::new((0.0, 10.0), (100.0, 500.0));
    let highlight = Rect::new((4.0, 2.0), (250.0, 200.0));
    let peaks = peak_set(vec![point(3.0, 210.0, 9.0)], Vec::new(), 1);

    let view = build_map(&peaks, bounds, Some(highlight), &AggregationConfig::default());
    assert_eq!(view.overlays.len(), 2);
    assert_eq!(view.overlays[0].kind, OverlayKind::Highlight);
    assert_eq!(view.overlays[0].rect.rt_min, 2.0);
    assert_eq!(view.overlays[0].rect.mz_max, 250.0);
    assert_eq!(view.overlays[1].kind, OverlayKind::QueryBounds);
    assert_eq!(view.overlays[1].rect, bounds);
    assert_eq!((view.grid.width, view.grid.height), (100, 400));
}

fn arb_points() -> impl Strategy<Value = Vec<PeakPoint>> {
    prop::collection::vec(
        (0.0f64..10.0, 100.0f64..200.0, 0.0f32..1.0e6).prop_map(|(rt, mz, i)| point(rt, mz, i)),
        0..200,
    )
}

proptest! {
    #[test]
    fn prop_binning_ignores_input_order(
        (points, shuffled) in arb_points().prop_flat_map(|p| (Just(p.clone()), Just(p).prop_shuffle()))
    ) {
        let bounds = Rect::new((0.0, 10.0), (100.0, 200.0));
        let a = aggregate(&points, &bounds, 17, 23);
        let b = aggregate(&shuffled, &bounds, 17, 23);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_grid_values_finite(points in arb_points()) {
        let bounds = Rect::new((0.0, 10.0), (100.0, 200.0));
        let grid = aggregate(&points, &bounds, 11, 13);
        prop_assert_eq!(grid.values.len(), 11 * 13);
        prop_assert!(grid.values.iter().all(|v| v.is_finite()));
    }
}
