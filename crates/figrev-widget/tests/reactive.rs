//! The reactive loop end to end: a widget edit re-runs the producing
//! function and the resulting artifact republishes through the pipeline.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use figrev_core::{
    Artifact, ChartArtifact, MemoryStore, PublishEngine, RenderOptions, Store,
    build_default_registry,
};
use figrev_model::{
    ExecutionTrigger, FindByName, ParamSpec, ParamValue, PublishConfig,
};
use figrev_widget::{ParamSet, Producer, WidgetChannel};

fn engine(store: &Rc<MemoryStore>) -> PublishEngine {
    let config = PublishConfig::default()
        .with_analysis(FindByName::new("Study").create_if_missing());
    PublishEngine::new(
        Rc::clone(store) as Rc<dyn Store>,
        build_default_registry(),
        config,
        "session-1",
    )
}

/// Producing function: a chart whose point count follows the `points`
/// parameter.
fn producer() -> Producer {
    Box::new(|values: &BTreeMap<String, ParamValue>| {
        let count = values["points"].as_number().unwrap_or(1.0) as usize;
        let points = (0..count).map(|i| (i as f64, (i * i) as f64)).collect();
        Rc::new(ChartArtifact::figure(points)) as Rc<dyn Artifact>
    })
}

#[test]
fn slider_edit_republishes_on_the_same_figure() {
    let store = Rc::new(MemoryStore::new());
    let mut engine = engine(&store);

    let mut params = ParamSet::new();
    params.insert("points", ParamSpec::slider(3.0, 1.0, 10.0, 1.0));
    let mut channel = WidgetChannel::new(params, producer());

    // Initial cell run publishes the first rendering.
    engine.begin_cell(Some("abc"), Some("reactive(points = 3)"));
    let rerun = channel
        .edit("points", ParamValue::Number(3.0), Instant::now())
        .unwrap()
        .expect("slider edits are immediate");
    engine.observe(Rc::clone(&rerun.artifact)).unwrap();
    let first = engine
        .publish(None, None, &RenderOptions::default())
        .unwrap();
    engine.end_cell(&RenderOptions::default());

    // A later edit re-executes and republishes without re-running the cell.
    engine.begin_cell(Some("abc"), None);
    let rerun = channel
        .edit("points", ParamValue::Number(7.0), Instant::now())
        .unwrap()
        .expect("slider edits are immediate");
    assert_eq!(
        rerun.trigger,
        ExecutionTrigger::ParamEdit {
            param: "points".to_string()
        }
    );
    engine.observe(Rc::clone(&rerun.artifact)).unwrap();
    let second = engine
        .publish(None, None, &RenderOptions::default())
        .unwrap();
    engine.end_cell(&RenderOptions::default());

    assert_eq!(second.revision.figure.id, first.revision.figure.id);
    assert_eq!(second.revision.sequence, first.revision.sequence + 1);
    assert_eq!(store.submitted().len(), 2);
}

#[test]
fn debounced_text_edits_produce_exactly_one_publish() {
    let store = Rc::new(MemoryStore::new());
    let mut engine = engine(&store);

    let mut params = ParamSet::new();
    params.insert("points", ParamSpec::slider(2.0, 1.0, 10.0, 1.0));
    params.insert("caption", ParamSpec::text(""));
    let mut channel =
        WidgetChannel::with_debounce(params, producer(), Duration::from_millis(300));

    let start = Instant::now();
    for (offset, text) in [(0u64, "t"), (40, "tu"), (80, "tum")] {
        assert!(
            channel
                .edit(
                    "caption",
                    ParamValue::Text(text.to_string()),
                    start + Duration::from_millis(offset),
                )
                .unwrap()
                .is_none()
        );
    }

    engine.begin_cell(Some("abc"), None);
    let mut published = 0;
    for tick in [150u64, 250, 500, 600] {
        if let Some(rerun) = channel.poll(start + Duration::from_millis(tick)).unwrap() {
            engine.observe(Rc::clone(&rerun.artifact)).unwrap();
            engine
                .publish(None, None, &RenderOptions::default())
                .unwrap();
            published += 1;
        }
    }
    engine.end_cell(&RenderOptions::default());

    assert_eq!(published, 1);
    assert_eq!(store.submitted().len(), 1);
    assert_eq!(
        channel.params().get("caption").unwrap().value,
        ParamValue::Text("tum".to_string())
    );
}
