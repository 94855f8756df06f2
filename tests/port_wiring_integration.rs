//! Integration tests for positional port pairing between sources and the muxer

mod common;

use common::builders::{RecordingSink, TraceDirBuilder};
use common::plugins::{ctf_plugin, utils_plugin, FsSourceClass, LiveCounter, MuxerClass};
use common::test_registry;
use proptest::prelude::*;
use std::sync::Arc;
use tracegraph::graph::{GraphError, PortDirection};
use tracegraph::{PluginRegistry, PluginSet, PullStatus, TraceContextBuilder, TraceError};

/// Trace directory with `streams` single-event streams, timestamps interleaved.
fn multi_stream_trace(streams: usize) -> tempfile::TempDir {
    (0..streams)
        .fold(TraceDirBuilder::new(), |builder, i| {
            builder.stream(&[(i as u64 + 1, "tick")])
        })
        .build()
}

fn registry_with_max_inputs(max_inputs: usize, live: &LiveCounter) -> PluginSet {
    let set = PluginSet::new();
    set.register(ctf_plugin(FsSourceClass {
        live: live.clone(),
        ..Default::default()
    }));
    set.register(utils_plugin(MuxerClass {
        max_inputs: Some(max_inputs),
        live: live.clone(),
        ..Default::default()
    }));
    set
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_each_output_port_paired_by_index(streams in 1usize..8) {
        let set = test_registry();
        let trace = multi_stream_trace(streams);

        let ctx = TraceContextBuilder::with_registry(&set)
            .input(trace.path())
            .build(RecordingSink::default())
            .unwrap();

        let graph = ctx.graph();
        let source = ctx.source_components()[0];
        let filter = ctx.filter_component();
        prop_assert_eq!(graph.output_port_count(source).unwrap(), streams);

        let wired: Vec<_> = graph
            .connections()
            .iter()
            .filter(|c| c.upstream.component == source)
            .collect();
        prop_assert_eq!(wired.len(), streams);
        for (i, conn) in wired.iter().enumerate() {
            prop_assert_eq!(conn.upstream, source.output(i));
            prop_assert_eq!(conn.downstream, filter.input(i));
        }

        // One more connection links the muxer to the sink.
        prop_assert_eq!(graph.connections().len(), streams + 1);
        // The muxer keeps one free input after wiring.
        prop_assert_eq!(graph.input_port_count(filter).unwrap(), streams + 1);
    }

    #[test]
    fn test_too_few_muxer_inputs_is_a_connection_failure(
        streams in 2usize..8,
        shortfall in 1usize..4,
    ) {
        let max_inputs = streams.saturating_sub(shortfall).max(1);
        let live = LiveCounter::default();
        let set = registry_with_max_inputs(max_inputs, &live);
        let trace = multi_stream_trace(streams);

        let err = TraceContextBuilder::with_registry(&set)
            .input(trace.path())
            .build(RecordingSink::default())
            .err()
            .unwrap();

        match err {
            TraceError::PortConnection { upstream, downstream, source } => {
                prop_assert_eq!(upstream, "input");
                prop_assert_eq!(downstream, "muxer");
                let is_out_of_range = matches!(
                    source,
                    GraphError::PortOutOfRange {
                        direction: PortDirection::Input,
                        index,
                        count,
                        ..
                    } if index == max_inputs && count == max_inputs
                );
                prop_assert!(is_out_of_range);
            }
            other => prop_assert!(false, "unexpected error: {}", other),
        }
        prop_assert_eq!(live.get(), 0);
    }
}

#[test]
fn test_streams_merged_in_timestamp_order() {
    let set = test_registry();
    let trace = TraceDirBuilder::new()
        .stream(&[(10, "a0"), (40, "a1"), (50, "a2")])
        .stream(&[(20, "b0"), (30, "b1"), (60, "b2")])
        .build();
    let mut sink = RecordingSink::default();

    let mut ctx = TraceContextBuilder::with_registry(&set)
        .input(trace.path())
        .build(&mut sink)
        .unwrap();
    while ctx.pull().unwrap() == PullStatus::HasMessages {}
    ctx.destroy();

    assert_eq!(sink.event_names(), vec!["a0", "b0", "b1", "a1", "a2", "b2"]);
    let timestamps: Vec<_> = sink.messages.iter().filter_map(|m| m.timestamp()).collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_multiple_inputs_use_consecutive_muxer_ports() {
    let set = test_registry();
    let first = multi_stream_trace(2);
    let second = TraceDirBuilder::new().stream(&[(5, "late")]).build();
    let mut sink = RecordingSink::default();

    let mut ctx = TraceContextBuilder::with_registry(&set)
        .inputs([first.path(), second.path()])
        .build(&mut sink)
        .unwrap();

    let graph = ctx.graph();
    let sources = ctx.source_components().to_vec();
    assert_eq!(sources.len(), 2);
    assert_eq!(graph.component_name(sources[0]), Some("input"));
    assert_eq!(graph.component_name(sources[1]), Some("input-1"));

    let filter = ctx.filter_component();
    let downstream_of_second: Vec<_> = graph
        .connections()
        .iter()
        .filter(|c| c.upstream.component == sources[1])
        .map(|c| c.downstream)
        .collect();
    assert_eq!(downstream_of_second, vec![filter.input(2)]);

    while ctx.pull().unwrap() == PullStatus::HasMessages {}
    ctx.destroy();
    assert_eq!(sink.event_names(), vec!["tick", "tick", "late"]);
}

/// Strong counts of both namespaces and both classes held by `set`.
fn handle_counts(set: &PluginSet) -> [usize; 4] {
    let ctf = set.find_plugin("ctf").unwrap();
    let utils = set.find_plugin("utils").unwrap();
    let fs = ctf.source_class("fs").unwrap();
    let muxer = utils.filter_class("muxer").unwrap();
    [
        Arc::strong_count(&ctf),
        Arc::strong_count(&utils),
        Arc::strong_count(&fs),
        Arc::strong_count(&muxer),
    ]
}

fn registry_with_muxer(muxer: MuxerClass, live: &LiveCounter) -> PluginSet {
    let set = PluginSet::new();
    set.register(ctf_plugin(FsSourceClass {
        live: live.clone(),
        ..Default::default()
    }));
    set.register(utils_plugin(muxer));
    set
}

#[test]
fn test_muxer_instantiation_failure_releases_source() {
    let live = LiveCounter::default();
    let set = registry_with_muxer(
        MuxerClass {
            broken: true,
            live: live.clone(),
            ..Default::default()
        },
        &live,
    );
    let baseline = handle_counts(&set);
    let trace = multi_stream_trace(2);
    let mut sink = RecordingSink::default();

    let err = TraceContextBuilder::with_registry(&set)
        .input(trace.path())
        .build(&mut sink)
        .err()
        .unwrap();
    assert!(matches!(err, TraceError::ComponentCreation { ref name, .. } if name == "muxer"));

    assert_eq!(live.get(), 0);
    assert_eq!(handle_counts(&set), baseline);
    // The sink was never added to the graph.
    assert_eq!(sink.initialized, 0);
    assert_eq!(sink.finalized, 0);
    assert_eq!(sink.consume_calls, 0);
}

#[test]
fn test_muxer_without_output_port_releases_everything() {
    let live = LiveCounter::default();
    let set = registry_with_muxer(
        MuxerClass {
            no_output: true,
            live: live.clone(),
            ..Default::default()
        },
        &live,
    );
    let baseline = handle_counts(&set);
    let trace = multi_stream_trace(1);
    let mut sink = RecordingSink::default();

    let err = TraceContextBuilder::with_registry(&set)
        .input(trace.path())
        .build(&mut sink)
        .err()
        .unwrap();
    match err {
        TraceError::PortConnection {
            upstream,
            downstream,
            source,
        } => {
            assert_eq!(upstream, "muxer");
            assert_eq!(downstream, "simple sink");
            assert!(matches!(
                source,
                GraphError::PortOutOfRange {
                    direction: PortDirection::Output,
                    index: 0,
                    count: 0,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(live.get(), 0);
    assert_eq!(handle_counts(&set), baseline);
    // Added but never run: finalized on teardown without being initialized.
    assert_eq!(sink.initialized, 0);
    assert_eq!(sink.finalized, 1);
    assert_eq!(sink.consume_calls, 0);
}
