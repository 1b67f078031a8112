// Drives every engine through the public API and the layout manager.

use facetview::layout::treemap::TREEMAP_TAG;
use facetview::layout::{
    BoxConstraints, EngineSelector, LayoutBox, LayoutConfig, LayoutContext, LayoutEngine, LayoutError, LayoutManager,
    LayoutOptions, LayoutRequest, ScrambleLayout, StateSelector,
};
use facetview::meta::MetaModel;
use facetview::model::{CardRendering, Dimensions, ModelStore, RawModel, SuperModel};
use facetview::pipeline::{Artifact, RenderingPipeline};
use serde_json::json;

fn meta() -> MetaModel {
    MetaModel::from_json(&json!({
        "name": {"label": "Name", "kind": "string"},
        "size": {"label": "Size", "kind": "number"},
        "genre": {"label": "Genre", "kind": "category", "isHierarchy": true},
        "parent": {"label": "Parent", "kind": "string", "isLink": true},
    }))
    .unwrap()
}

/// A 50x30 card decoded from JSON attributes.
fn card(attrs: serde_json::Value) -> SuperModel {
    let raw: RawModel = serde_json::from_value(attrs).unwrap();
    SuperModel::from_raw(raw, Box::new(CardRendering::new(50.0, 30.0))).unwrap()
}

fn models(cards: Vec<serde_json::Value>) -> ModelStore {
    cards.into_iter().map(card).collect()
}

fn position(models: &ModelStore, id: &str) -> Option<(f64, f64)> {
    models
        .get(id)
        .and_then(|m| m.rendering().position())
        .map(|p| (p.top, p.left))
}

fn run(
    manager: &mut LayoutManager,
    engine: &str,
    state: Option<serde_json::Value>,
    bbox: LayoutBox,
    models: &mut ModelStore,
    meta: &MetaModel,
) -> Result<bool, LayoutError> {
    let request = LayoutRequest {
        engine: EngineSelector::Named(engine),
        state: state.as_ref().map_or(StateSelector::Keep, StateSelector::Set),
        options: LayoutOptions {
            click_selection: true,
            ..LayoutOptions::default()
        },
        ..LayoutRequest::default()
    };
    manager.layout(&request, bbox, models, meta).map(|r| r.realign)
}

#[test]
fn flow_sorts_and_wraps() {
    let meta = meta();
    let mut models = models(vec![
        json!({"id": "three", "size": 3}),
        json!({"id": "one", "size": 1}),
        json!({"id": "two", "size": 2}),
    ]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());

    run(&mut manager, "flow", Some(json!({"order": "size"})), LayoutBox::full(500.0, 500.0), &mut models, &meta).unwrap();
    assert_eq!(position(&models, "one"), Some((0.0, 0.0)));
    assert_eq!(position(&models, "two"), Some((0.0, 55.0)));
    assert_eq!(position(&models, "three"), Some((0.0, 110.0)));

    // only two cards fit in 120px
    run(&mut manager, "flow", None, LayoutBox::full(120.0, 500.0), &mut models, &meta).unwrap();
    assert_eq!(position(&models, "two"), Some((0.0, 55.0)));
    assert_eq!(position(&models, "three"), Some((35.0, 0.0)));
}

#[test]
fn constraints_offset_the_box() {
    let meta = meta();
    let mut models = models(vec![json!({"id": "a", "size": 1})]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
    let constraints = BoxConstraints {
        top: Some(100.0),
        left: Some(0.05),
        ..BoxConstraints::default()
    };
    let bbox = LayoutBox::new(1000.0, 800.0, &constraints);
    assert_eq!((bbox.left, bbox.width), (50.0, 950.0));

    run(&mut manager, "flow", None, bbox, &mut models, &meta).unwrap();
    assert_eq!(position(&models, "a"), Some((100.0, 50.0)));
}

#[test]
fn buckets_group_under_headers() {
    let meta = meta();
    let mut models = models(vec![
        json!({"id": "r1", "genre": ["Rock"]}),
        json!({"id": "j1", "genre": ["Jazz"]}),
        json!({"id": "r2", "genre": ["Rock"]}),
        json!({"id": "none"}),
    ]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
    run(&mut manager, "bucket", Some(json!({"bucketBy": "genre"})), LayoutBox::full(800.0, 600.0), &mut models, &meta)
        .unwrap();

    let mut headers: Vec<(String, Vec<String>)> = manager
        .pipeline()
        .artifacts()
        .iter()
        .filter_map(|a| match a {
            Artifact::BucketHeader { label, selection, .. } => Some((
                label.to_string(),
                selection.iter().map(|id| id.to_string()).collect(),
            )),
            _ => None,
        })
        .collect();
    headers.sort();
    assert_eq!(
        headers,
        vec![
            ("Jazz".to_string(), vec!["j1".to_string()]),
            ("Nothing".to_string(), vec!["none".to_string()]),
            ("Rock".to_string(), vec!["r1".to_string(), "r2".to_string()]),
        ]
    );
    let (r1_top, _) = position(&models, "r1").unwrap();
    let (r2_top, _) = position(&models, "r2").unwrap();
    assert_eq!(r1_top, r2_top);
}

#[test]
fn tree_follows_parent_links() {
    let meta = meta();
    let mut models = models(vec![
        json!({"id": "a", "parent": "b"}),
        json!({"id": "b", "parent": "c"}),
        json!({"id": "c"}),
    ]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
    let state = json!({"parentKey": "parent", "direction": "ver"});
    run(&mut manager, "tree", Some(state), LayoutBox::full(800.0, 600.0), &mut models, &meta).unwrap();

    let (_, a) = position(&models, "a").unwrap();
    let (_, b) = position(&models, "b").unwrap();
    let (_, c) = position(&models, "c").unwrap();
    assert!(c < b && b < a);
    let connectors = manager
        .pipeline()
        .artifacts()
        .iter()
        .filter(|a| matches!(a, Artifact::Connector { .. }))
        .count();
    assert_eq!(connectors, 4);

    let mut selection = manager.extend_selection("c");
    selection.sort();
    assert_eq!(selection, vec!["a", "b", "c"]);
}

#[test]
fn tree_cycles_leave_positions_alone() {
    let meta = meta();
    let mut models = models(vec![json!({"id": "a", "parent": "b"}), json!({"id": "b", "parent": "a"})]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
    let request = LayoutRequest {
        engine: EngineSelector::Named("tree"),
        ..LayoutRequest::default()
    };
    let state = json!({"parentKey": "parent"});
    run(&mut manager, "tree", Some(state), LayoutBox::full(800.0, 600.0), &mut models, &meta).unwrap();
    assert_eq!(position(&models, "a"), None);

    let report = manager.layout(&request, LayoutBox::full(800.0, 600.0), &mut models, &meta).unwrap();
    assert!(report.instructions.is_empty());
    assert!(manager.pipeline().artifacts().is_empty());
}

#[test]
fn treemap_conserves_the_box_area() {
    let meta = meta();
    let mut models = models(vec![
        json!({"id": "a", "size": 50}),
        json!({"id": "b", "size": 25}),
        json!({"id": "c", "size": 25}),
    ]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
    let realign = run(&mut manager, "treemap", None, LayoutBox::full(100.0, 100.0), &mut models, &meta).unwrap();
    assert!(!realign);

    let rect = |id: &str| {
        let (top, left) = position(&models, id).unwrap();
        let dims = models.get(id).unwrap().dimensions();
        (top, left, dims.width, dims.height)
    };
    assert_eq!(rect("a"), (0.0, 0.0, 50.0, 100.0));
    assert_eq!(rect("b"), (0.0, 50.0, 50.0, 50.0));
    assert_eq!(rect("c"), (50.0, 50.0, 50.0, 50.0));
    let total: f64 = ["a", "b", "c"].iter().map(|&id| rect(id)).map(|(_, _, w, h)| w * h).sum();
    assert_eq!(total, 100.0 * 100.0);
}

#[test]
fn treemap_hides_empty_areas_until_switched_away() {
    let meta = meta();
    let mut models = models(vec![json!({"id": "a", "size": 10}), json!({"id": "b", "size": 0})]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());

    assert!(run(&mut manager, "treemap", None, LayoutBox::full(100.0, 100.0), &mut models, &meta).unwrap());
    assert!(models.get("b").unwrap().is_filtered(Some(TREEMAP_TAG)));
    assert_eq!(models.get("a").unwrap().dimensions(), Dimensions::new(100.0, 100.0));

    assert!(run(&mut manager, "flow", None, LayoutBox::full(100.0, 100.0), &mut models, &meta).unwrap());
    assert!(!models.get("b").unwrap().is_filtered(None));
    assert_eq!(models.get("a").unwrap().dimensions(), Dimensions::new(50.0, 30.0));
    assert!(position(&models, "b").is_some());
}

#[test]
fn invalid_states_are_rejected_without_side_effects() {
    let meta = meta();
    let mut models = models(vec![json!({"id": "a", "size": 1})]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
    let bbox = LayoutBox::full(100.0, 100.0);

    let err = run(&mut manager, "tree", Some(json!({"parentKey": "size"})), bbox, &mut models, &meta);
    assert!(matches!(err, Err(LayoutError::RejectedState("tree"))));
    assert_eq!(manager.engine_state("tree"), Some(json!({"direction": "ver", "parentKey": "genre"})));
    assert_eq!(manager.current_engine_name(), None);

    let err = run(&mut manager, "bucket", Some(json!({"bucketBy": "missing"})), bbox, &mut models, &meta);
    assert!(matches!(err, Err(LayoutError::RejectedState("bucket"))));
    assert!(matches!(
        run(&mut manager, "pie", None, bbox, &mut models, &meta),
        Err(LayoutError::UnknownEngine(_))
    ));
    assert_eq!(position(&models, "a"), None);
}

#[test]
fn current_engine_sticks_and_resets_on_request() {
    let meta = meta();
    let mut models = models(vec![json!({"id": "a", "name": "x", "size": 1})]);
    let mut manager = LayoutManager::new(&meta, LayoutConfig::default());
    let bbox = LayoutBox::full(100.0, 100.0);

    run(&mut manager, "flow", Some(json!({"order": "size", "reverse": true})), bbox, &mut models, &meta).unwrap();
    let again = LayoutRequest::default();
    assert_eq!(manager.layout(&again, bbox, &mut models, &meta).unwrap().engine, "flow");
    assert_eq!(manager.engine_state("flow").unwrap()["reverse"], true);

    let reset = LayoutRequest {
        state: StateSelector::Reset,
        ..LayoutRequest::default()
    };
    manager.layout(&reset, bbox, &mut models, &meta).unwrap();
    assert_eq!(manager.engine_state("flow"), Some(json!({"order": "name", "reverse": false})));
}

#[test]
fn seeded_scrambles_repeat_within_the_box() {
    let meta = meta();
    let mut models = models((0..20).map(|i| json!({"id": i})).collect());
    let visible = models.available_ids();
    let bbox = LayoutBox::full(600.0, 300.0);

    let scatter = |seed: u64, models: &mut ModelStore| {
        let mut pipeline = RenderingPipeline::new();
        let mut engine = ScrambleLayout::with_seed(seed);
        let mut ctx = LayoutContext {
            pipeline: &mut pipeline,
            bbox,
            visible: &visible,
            models,
            meta: &meta,
            options: LayoutOptions::default(),
        };
        engine.layout(&mut ctx);
        visible
            .iter()
            .map(|id| pipeline.position_of(id).unwrap())
            .collect::<Vec<_>>()
    };
    let first = scatter(7, &mut models);
    assert_eq!(first, scatter(7, &mut models));
    for (top, left) in first {
        assert!((10.0..=190.0).contains(&top), "top {top}");
        assert!((20.0..=380.0).contains(&left), "left {left}");
    }
}
