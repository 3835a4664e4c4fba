use crate::error::GraphError;

/// Lower gradient bound applied by default.
pub const MIN_RANGE: f64 = -10.;
/// Upper gradient bound applied by default.
pub const MAX_RANGE: f64 = 10.;

/// Symmetric or asymmetric interval gradients are clamped into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipRange {
    pub min: f64,
    pub max: f64,
}

impl ClipRange {
    pub fn new(min: f64, max: f64) -> Result<Self, GraphError> {
        if !min.is_finite() || !max.is_finite() || max < min {
            return Err(GraphError::InvalidClipRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn clip(&self, grad: f64) -> f64 {
        if grad < self.min {
            self.min
        } else if grad > self.max {
            self.max
        } else {
            // NaN falls through untouched
            grad
        }
    }
}

impl Default for ClipRange {
    fn default() -> Self {
        Self {
            min: MIN_RANGE,
            max: MAX_RANGE,
        }
    }
}

/// When the reverse pass clamps gradients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClipMode {
    /// Clamp an operand right after every contribution added to it. A node with
    /// many parents is clamped once per parent, so the order of contributions
    /// matters.
    #[default]
    PerUpdate,
    /// Accumulate raw contributions and clamp each reached node once after the
    /// walk.
    EndOfPass,
    Disabled,
}

/// Construction-time settings of a [`crate::Tape`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TapeConfig {
    /// Maximum number of nodes; `None` lets the tape grow without bound.
    pub max_nodes: Option<usize>,
    pub clip_range: ClipRange,
    pub clip_mode: ClipMode,
}

impl TapeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_nodes(mut self, limit: usize) -> Self {
        self.max_nodes = Some(limit);
        self
    }

    pub fn clip_range(mut self, range: ClipRange) -> Self {
        self.clip_range = range;
        self
    }

    pub fn clip_mode(mut self, mode: ClipMode) -> Self {
        self.clip_mode = mode;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), GraphError> {
        ClipRange::new(self.clip_range.min, self.clip_range.max).map(|_| ())
    }
}
