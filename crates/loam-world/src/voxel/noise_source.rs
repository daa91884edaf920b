use crate::noise::{NoiseField, to_unit};
use crate::worldgen::WorldGenParams;

/// Seeded noise fields used by generation; built once per worker and reused.
pub struct NoiseSource {
    pub seed: i32,
    pub terrain: NoiseField,
    pub elevation: NoiseField,
    pub temperature: NoiseField,
    pub moisture: NoiseField,
    pub caves: NoiseField,
    climate_contrast: f32,
}

impl NoiseSource {
    pub fn new(seed: i32, params: &WorldGenParams) -> Self {
        Self {
            seed,
            terrain: NoiseField::new(seed, &params.height_noise),
            elevation: NoiseField::new(seed ^ 0x51C7_0E2B, &params.elevation_noise),
            temperature: NoiseField::new(seed ^ 0x1203_5F31, &params.temperature_noise),
            moisture: NoiseField::new(((seed as u32) ^ 0x92E3_A1B2u32) as i32, &params.moisture_noise),
            caves: NoiseField::new(seed ^ 41_337, &params.cave_noise),
            climate_contrast: params.climate_contrast,
        }
    }

    /// `(elevation, temperature, moisture)` at a world column, each in `[0, 1]`.
    pub fn climate(&self, wx: f32, wz: f32) -> (f32, f32, f32) {
        let k = self.climate_contrast;
        (
            to_unit(self.elevation.get_2d(wx, wz) * k),
            to_unit(self.temperature.get_2d(wx, wz) * k),
            to_unit(self.moisture.get_2d(wx, wz) * k),
        )
    }
}
