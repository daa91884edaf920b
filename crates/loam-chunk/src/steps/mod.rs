//! The four standard generation steps.

mod biome;
mod caves;
mod terrain;
mod trees;

pub use biome::BiomeStep;
pub use caves::CaveStep;
pub use terrain::{TerrainStep, column_height};
pub use trees::TreeStep;
