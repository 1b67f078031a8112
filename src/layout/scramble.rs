use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{LayoutContext, LayoutEngine, LayoutOutcome};

/// Leaves every model where it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl LayoutEngine for NoLayout {
    fn name(&self) -> &'static str {
        "no"
    }

    fn layout(&mut self, _ctx: &mut LayoutContext<'_>) -> LayoutOutcome {
        LayoutOutcome::CLEAN
    }
}

/// Scatters models at random around the upper-left third of the box.
#[derive(Debug, Clone)]
pub struct ScrambleLayout {
    rng: StdRng,
}

impl Default for ScrambleLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrambleLayout {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible scrambling.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl LayoutEngine for ScrambleLayout {
    fn name(&self) -> &'static str {
        "scramble"
    }

    fn layout(&mut self, ctx: &mut LayoutContext<'_>) -> LayoutOutcome {
        if ctx.options.filter {
            // re-layouting because of filtering doesn't affect the layout
            return LayoutOutcome::CLEAN;
        }
        let (width, height) = (ctx.bbox.width, ctx.bbox.height);
        let max_width = (width * 0.3).round();
        let max_height = (height * 0.3).round();
        for id in ctx.visible {
            let top = (height / 3.0 + self.rng.gen::<f64>() * max_height * 2.0 - max_height).round();
            let left = (width / 3.0 + self.rng.gen::<f64>() * max_width * 2.0 - max_width).round();
            ctx.pipeline.move_to(id, ctx.bbox.top + top, ctx.bbox.left + left, None, None);
        }
        LayoutOutcome::CLEAN
    }
}
