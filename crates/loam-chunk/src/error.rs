use loam_world::ChunkCoord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("chunk dimensions {sx}x{sy}x{sz} are too small to generate")]
    InvalidDimensions { sx: usize, sy: usize, sz: usize },
    #[error("invalid worldgen parameters: {0}")]
    InvalidParams(String),
    #[error("step `{step}` failed for chunk {coord}: {source}")]
    Step {
        step: &'static str,
        coord: ChunkCoord,
        source: Box<GenerationError>,
    },
}

impl GenerationError {
    /// Attach the failing step, unless the error already names one.
    pub fn in_step(self, step: &'static str, coord: ChunkCoord) -> Self {
        match self {
            e @ GenerationError::Step { .. } => e,
            other => GenerationError::Step {
                step,
                coord,
                source: Box::new(other),
            },
        }
    }

    /// Name of the step that failed, when known.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            GenerationError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}
