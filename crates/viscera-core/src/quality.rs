/// Frame-budget controller for the engine's substep and relaxation counts.
///
/// Feeds on measured `update` times. Over budget it sheds relaxation passes
/// first and substeps second. After `restore_after` consecutive frames well
/// under budget it adds back one substep, then one pass at a time.
#[derive(Clone, Debug)]
pub struct QualityController {
    /// Target update time in milliseconds.
    pub budget_ms: f32,
    pub min_substeps: u32,
    pub max_substeps: u32,
    pub min_passes: u32,
    pub max_passes: u32,
    /// Frames under 60% of budget needed before quality goes back up.
    pub restore_after: u32,
    pub enabled: bool,
    substeps: u32,
    passes: u32,
    /// Smoothed update time.
    ema_ms: f32,
    calm_frames: u32,
}

impl QualityController {
    pub fn new(max_substeps: u32, max_passes: u32) -> Self {
        Self {
            budget_ms: 8.0,
            min_substeps: 1,
            max_substeps,
            min_passes: 2,
            max_passes,
            restore_after: 30,
            enabled: false,
            substeps: max_substeps,
            passes: max_passes,
            ema_ms: 0.0,
            calm_frames: 0,
        }
    }

    pub fn substeps(&self) -> u32 {
        if self.enabled {
            self.substeps
        } else {
            self.max_substeps
        }
    }

    pub fn passes(&self) -> u32 {
        if self.enabled {
            self.passes
        } else {
            self.max_passes
        }
    }

    pub fn smoothed_ms(&self) -> f32 {
        self.ema_ms
    }

    /// Record one frame's update time.
    pub fn record(&mut self, frame_ms: f32) {
        if !self.enabled || !frame_ms.is_finite() {
            return;
        }
        self.ema_ms = self.ema_ms * 0.7 + frame_ms * 0.3;

        if self.ema_ms > self.budget_ms {
            self.calm_frames = 0;
            if self.passes > self.min_passes {
                self.passes -= 1;
            } else if self.substeps > self.min_substeps {
                self.substeps -= 1;
            }
            return;
        }

        if self.ema_ms >= self.budget_ms * 0.6 {
            self.calm_frames = 0;
            return;
        }

        self.calm_frames += 1;
        if self.calm_frames < self.restore_after {
            return;
        }
        self.calm_frames = 0;
        if self.substeps < self.max_substeps {
            self.substeps += 1;
        } else if self.passes < self.max_passes {
            self.passes += 1;
        }
    }

    /// Back to full quality.
    pub fn reset(&mut self) {
        self.substeps = self.max_substeps;
        self.passes = self.max_passes;
        self.ema_ms = 0.0;
        self.calm_frames = 0;
    }
}
