//! Integration tests over fixed reference inputs

use linkview_core::axis::{Axis, AxisType, Orientation};
use linkview_core::graph::{ChangeGraph, ChangeKind, Recorder};
use linkview_core::session::Session;
use linkview_core::variable::Variable;
use linkview_stats::{BinSpec, Binning, KaplanMeier, Observation, DEFAULT_MAX_BINS};
use rstest::rstest;

fn on_ladder(step: f64) -> bool {
    let mantissa = step / 10f64.powf(step.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .any(|nice| (mantissa - nice).abs() < 1e-6)
}

// === Tick Distance ===

#[rstest]
#[case(100.0, 500.0, 50.0, 20.0, 10.0)]
#[case(1.0, 200.0, 40.0, 10.0, 0.1)]
#[case(1000.0, 300.0, 50.0, 25.0, 100.0)]
#[case(8.0, 800.0, 50.0, 40.0, 1.0)]
fn test_tick_distance(
    #[case] v_len: f64,
    #[case] g_len: f64,
    #[case] mean_px: f64,
    #[case] min_px: f64,
    #[case] expected: f64,
) {
    let mut graph = ChangeGraph::new();
    let mut axis = Axis::new(&mut graph, Orientation::Horizontal, AxisType::Numeric);
    axis.set_geometry(&mut graph, Orientation::Horizontal, 0.0, g_len)
        .unwrap();
    axis.set_value_range(&mut graph, 0.0, v_len).unwrap();

    let step = axis.sensible_tick_distance(mean_px, min_px);
    assert!((step - expected).abs() < expected * 1e-9, "step {}", step);
    assert!(on_ladder(step));

    let spacing = step / v_len * g_len;
    assert!(spacing <= 2.0 * mean_px && spacing >= mean_px / 2.0);
}

#[test]
fn test_tick_distance_degenerate_range() {
    let mut graph = ChangeGraph::new();
    let mut axis = Axis::new(&mut graph, Orientation::Horizontal, AxisType::Numeric);
    axis.set_geometry(&mut graph, Orientation::Horizontal, 0.0, 400.0)
        .unwrap();
    axis.set_value_range(&mut graph, 5.0, 0.0).unwrap();
    assert_eq!(axis.sensible_tick_distance(50.0, 20.0), 1.0);
}

// === Batching ===

#[test]
fn test_batch_of_five_mutations_notifies_once() {
    let mut graph = ChangeGraph::new();
    let mut var = Variable::numeric(&mut graph, "x");
    let recorder = Recorder::new();
    let observer = graph.add_observer_node("recorder", recorder.clone());
    graph.register(observer, var.node());

    graph
        .batch(|g| {
            for i in 0..5 {
                var.append(g, f64::from(i))?;
            }
            Ok::<_, linkview_core::error::LinkviewError>(())
        })
        .unwrap()
        .unwrap();

    assert_eq!(recorder.count(), 1);
    assert_eq!(recorder.messages()[0].kind, ChangeKind::VariableContent);
    assert_eq!(var.len(), 5);
}

// === Binning ===

#[test]
fn test_binning_reference_example() {
    let spec = BinSpec::new(0.0, 10.0).unwrap();
    let values = [0.0, 5.0, 10.0, 19.0, 20.0];
    let binning =
        Binning::build(spec, 20.0, DEFAULT_MAX_BINS, values.iter().copied().enumerate()).unwrap();

    assert_eq!(binning.bin(0), Some(&[0, 1][..]));
    assert_eq!(binning.bin(1), Some(&[2, 3][..]));
    assert_eq!(binning.bin(2), Some(&[4][..]));
    assert_eq!(binning.max_count(), 2);
    assert_eq!(binning.total(), 5);
}

#[test]
fn test_binning_rejects_vanishing_width() {
    let spec = BinSpec::new(0.0, 1e-300).unwrap();
    assert!(spec.bin_count(11.0, DEFAULT_MAX_BINS).is_err());
    assert!(Binning::build(spec, 11.0, DEFAULT_MAX_BINS, [(0, 0.0), (1, 11.0)]).is_err());
}

// === Kaplan-Meier ===

#[test]
fn test_km_drops_only_at_event_times() {
    let observations = vec![
        Observation::new(1.0, true),
        Observation::new(2.0, true),
        Observation::new(2.0, false),
        Observation::new(3.0, true),
    ];
    let km = KaplanMeier::estimate(observations.clone());
    let steps = km.steps();

    for pair in steps.windows(2) {
        assert!(pair[1].survival <= pair[0].survival);
        if pair[1].survival < pair[0].survival {
            let time = pair[1].time;
            assert!(observations.iter().any(|o| o.time == time && o.event));
        }
    }
    assert!((km.survival_at(2.5) - 0.5).abs() < 1e-12);
    assert_eq!(km.survival_at(3.0), 0.0);
}

#[test]
fn test_km_flat_over_censored_times() {
    let km = KaplanMeier::estimate(vec![
        Observation::new(1.0, true),
        Observation::new(2.0, false),
        Observation::new(4.0, true),
    ]);
    let before = km.survival_at(1.5);
    assert_eq!(km.survival_at(2.0), before);
    assert_eq!(km.survival_at(3.9), before);
}

// === Session round trip ===

#[test]
fn test_session_factor_barchart() {
    let mut session = Session::default();
    let added = session
        .add_factor("grade", &[2, 0, 1, 2, 2], &["low", "mid", "high"])
        .unwrap();
    let plot = session.barchart(added.dataset, added.variable).unwrap();
    let mask = session.dataset(added.dataset).unwrap().mask();

    let labels: Vec<String> = plot.bars(mask).into_iter().map(|b| b.label).collect();
    assert_eq!(labels, vec!["low", "mid", "high"]);
    assert_eq!(plot.bars(mask)[2].count, 3);
}
