/// Diagnostic tool: runs one layout pass over a JSON dataset and prints
/// what the engine asked the renderings to do.
///
/// Usage: debug-layout <dataset.json> [width] [height]
///
/// The dataset is `{"metamodel": {...}, "models": [...], "engine": "...", "state": {...}}`;
/// `engine` and `state` are optional. Models may carry `width`/`height`
/// attributes to size their cards.
use std::path::PathBuf;

use anyhow::Context;
use facetview::layout::{EngineSelector, LayoutBox, LayoutConfig, LayoutManager, LayoutRequest, StateSelector};
use facetview::meta::MetaModel;
use facetview::model::{CardRendering, ModelStore, RawModel, SuperModel};
use facetview::pipeline::{Artifact, Instruction};
use serde::Deserialize;

const DEFAULT_CARD: (f64, f64) = (120.0, 80.0);

#[derive(Debug, Deserialize)]
struct Dataset {
    metamodel: serde_json::Value,
    models: Vec<RawModel>,
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    state: Option<serde_json::Value>,
    #[serde(default)]
    config: Option<LayoutConfig>,
}

fn card_for(raw: &RawModel) -> CardRendering {
    let dim = |key: &str, default: f64| {
        raw.attributes
            .get(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    };
    CardRendering::new(dim("width", DEFAULT_CARD.0), dim("height", DEFAULT_CARD.1))
}

fn parse_dim(arg: Option<String>, default: f64) -> anyhow::Result<f64> {
    match arg {
        Some(s) => s.parse().with_context(|| format!("Invalid box dimension '{s}'")),
        None => Ok(default),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("facetview=debug".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .context("Usage: debug-layout <dataset.json> [width] [height]")?;
    let width = parse_dim(args.next(), 1280.0)?;
    let height = parse_dim(args.next(), 800.0)?;

    let text = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let dataset: Dataset =
        serde_json::from_str(&text).with_context(|| format!("Failed to decode {}", path.display()))?;
    let meta = MetaModel::from_json(&dataset.metamodel).context("Failed to decode the metamodel")?;

    let mut models = ModelStore::new();
    for raw in dataset.models {
        let card = card_for(&raw);
        match SuperModel::from_raw(raw, Box::new(card)) {
            Some(model) => models.insert(model),
            None => tracing::warn!("Skipping a model without id"),
        }
    }

    println!("=== DIAGNOSTIC: dataset → layout ===");
    println!("Dataset: {}", path.display());
    println!("[1] {} metamodel keys, {} models", meta.len(), models.len());

    let config = dataset.config.unwrap_or_default();
    let mut manager = LayoutManager::new(&meta, config);
    println!("[2] Engines: {}", manager.engine_names().join(", "));

    let request = LayoutRequest {
        engine: dataset
            .engine
            .as_deref()
            .map_or(EngineSelector::Default, EngineSelector::Named),
        state: dataset.state.as_ref().map_or(StateSelector::Keep, StateSelector::Set),
        ..LayoutRequest::default()
    };
    let report = manager.layout(&request, LayoutBox::full(width, height), &mut models, &meta)?;

    println!(
        "[3] Layout '{}' in {width}x{height}, state {}",
        report.engine,
        manager.engine_state(report.engine).unwrap_or_default()
    );
    println!("\n[4] {} instructions:", report.instructions.len());
    for instruction in &report.instructions {
        match instruction {
            Instruction::Move {
                id, top, left, z_index, ..
            } => println!("    move   {id:<16} top={top:.1} left={left:.1} z={z_index:?}"),
            Instruction::Resize { id, width, height } => {
                println!("    resize {id:<16} {width:.1}x{height:.1}")
            }
            Instruction::Style { id, style } => {
                let props: Vec<String> = style.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                println!("    style  {id:<16} {}", props.join("; "))
            }
        }
    }

    let artifacts = manager.pipeline().artifacts();
    println!("\n[5] {} artifacts:", artifacts.len());
    for artifact in artifacts {
        match artifact {
            Artifact::BucketHeader {
                label, top, left, selection,
            } => println!("    header    '{label}' top={top:.1} left={left:.1} ({} models)", selection.len()),
            Artifact::Connector {
                top,
                left,
                width,
                height,
            } => println!("    connector top={top:.1} left={left:.1} {width:.1}x{height:.1}"),
            Artifact::SyntheticNode {
                label,
                top,
                left,
                width,
                height,
                ..
            } => println!("    node      '{label}' top={top:.1} left={left:.1} {width:.1}x{height:.1}"),
        }
    }

    if report.realign {
        let hidden = models.iter().filter(|m| m.is_filtered(None)).count();
        println!("\n[6] Visibility realign requested, {hidden} models filtered");
    }

    Ok(())
}
