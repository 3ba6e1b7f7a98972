// scene/assets.rs - Environment map and model loading

use std::path::{Path, PathBuf};
use image::ImageFormat;

use crate::config::SceneConfig;
use crate::error_handling::{RendererError, Result};
use super::model::SceneModel;

/// Equirectangular HDR environment in linear RGB
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 3]>,
}

impl EnvironmentMap {
    pub fn from_hdr_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)?.to_rgb32f();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            pixels: image.pixels().map(|p| p.0).collect(),
        })
    }

    /// Uniform grey environment, used when no map is available
    pub fn uniform(value: f32) -> Self {
        Self { width: 1, height: 1, pixels: vec![[value; 3]] }
    }

    fn average_rows(&self, rows: std::ops::Range<u32>) -> [f32; 3] {
        let width = self.width as usize;
        let mut sum = [0.0f64; 3];
        let mut count = 0usize;
        for row in rows {
            let start = row as usize * width;
            for pixel in self.pixels.iter().skip(start).take(width) {
                for c in 0..3 {
                    sum[c] += pixel[c] as f64;
                }
                count += 1;
            }
        }
        if count == 0 {
            return [0.0; 3];
        }
        sum.map(|s| (s / count as f64) as f32)
    }

    /// Mean radiance of the upper hemisphere
    pub fn sky_irradiance(&self) -> [f32; 3] {
        let half = (self.height + 1) / 2;
        self.average_rows(0..half)
    }

    /// Mean radiance of the lower hemisphere
    pub fn ground_irradiance(&self) -> [f32; 3] {
        let half = self.height / 2;
        self.average_rows(half..self.height)
    }
}

pub struct SceneAssets {
    pub environment: EnvironmentMap,
    pub model: SceneModel,
}

/// Fetches the scene's files from the asset root
#[derive(Debug, Clone)]
pub struct AssetLoader {
    environment_file: PathBuf,
    model_file: PathBuf,
}

impl AssetLoader {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            environment_file: config.environment_file(),
            model_file: config.model_file(),
        }
    }

    /// Environment first, then the model; the first failure aborts the load
    pub async fn load(&self) -> Result<SceneAssets> {
        let hdr = read(&self.environment_file).await?;
        let environment = EnvironmentMap::from_hdr_bytes(&hdr)?;
        log::info!(
            "Loaded environment {} ({}x{})",
            self.environment_file.display(),
            environment.width,
            environment.height
        );

        let glb = read(&self.model_file).await?;
        let model = SceneModel::from_gltf_bytes(&glb)?;
        if model.animations.is_empty() {
            log::info!("{} has no animation clips; it will render in its rest pose", self.model_file.display());
        }

        Ok(SceneAssets { environment, model })
    }
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| RendererError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode linear pixels as Radiance HDR, for fixtures
#[cfg(test)]
pub(crate) fn encode_hdr(width: usize, height: usize, pixels: &[[f32; 3]]) -> Vec<u8> {
    let rgb: Vec<image::Rgb<f32>> = pixels.iter().map(|&p| image::Rgb(p)).collect();
    let mut bytes = Vec::new();
    image::codecs::hdr::HdrEncoder::new(&mut bytes)
        .encode(&rgb, width, height)
        .unwrap();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hemisphere_averages() {
        let hdr = encode_hdr(2, 2, &[[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [0.25, 0.25, 0.25], [0.25, 0.25, 0.25]]);
        let env = EnvironmentMap::from_hdr_bytes(&hdr).unwrap();
        assert_eq!((env.width, env.height), (2, 2));

        let sky = env.sky_irradiance();
        let ground = env.ground_irradiance();
        assert!((sky[0] - 1.0).abs() < 0.02);
        assert!((ground[1] - 0.25).abs() < 0.02);
    }

    #[test]
    fn test_rejects_non_hdr() {
        assert!(matches!(
            EnvironmentMap::from_hdr_bytes(b"nope"),
            Err(RendererError::ImageError(_))
        ));
    }

    #[tokio::test]
    async fn test_model_without_clips_loads() {
        let root = std::env::temp_dir().join(format!("scroll-scene-static-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("studio_small_09_1k.hdr"), encode_hdr(1, 1, &[[0.5, 0.5, 0.5]])).unwrap();
        std::fs::write(root.join("skull2.glb"), crate::scene::model::test_static_gltf()).unwrap();

        let config = SceneConfig { asset_root: root, ..Default::default() };
        let assets = AssetLoader::new(&config).load().await.unwrap();
        assert!(assets.model.animations.is_empty());
        assert_eq!(assets.model.vertex_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let config = SceneConfig {
            asset_root: PathBuf::from("/nonexistent-scroll-scene"),
            ..Default::default()
        };
        match AssetLoader::new(&config).load().await {
            Err(RendererError::Io { path, .. }) => assert!(path.ends_with("studio_small_09_1k.hdr")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
