//! Authoring-time previews of a single chunk.
//!
//! Renders a chunk's height map as an image (grayscale, layer colours or the
//! falloff map), or builds its mesh at an editor LOD and reports statistics.

use std::fmt;
use std::str::FromStr;

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use super::GenerationPipeline;
use crate::core::{ChunkCoord, Error, Result};
use crate::math::inverse_lerp;
use crate::mesh::TerrainMesh;
use crate::terrain::{HeightMap, TextureSettings, falloff};

/// What to draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewMode {
    NoiseMap,
    ColourMap,
    FalloffMap,
    Mesh,
}

impl FromStr for PreviewMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "noise" | "noisemap" | "noise_map" => Ok(PreviewMode::NoiseMap),
            "colour" | "color" | "colourmap" | "colour_map" => Ok(PreviewMode::ColourMap),
            "falloff" | "falloffmap" | "falloff_map" => Ok(PreviewMode::FalloffMap),
            "mesh" => Ok(PreviewMode::Mesh),
            other => Err(Error::Config(format!("unknown preview mode '{}'", other))),
        }
    }
}

impl fmt::Display for PreviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreviewMode::NoiseMap => "noise",
            PreviewMode::ColourMap => "colour",
            PreviewMode::FalloffMap => "falloff",
            PreviewMode::Mesh => "mesh",
        };
        f.write_str(name)
    }
}

/// Summary of a built mesh
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeshStats {
    pub coord: [i32; 2],
    pub lod: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub skirt_vertices: usize,
    pub min_height: f32,
    pub max_height: f32,
}

impl MeshStats {
    pub fn from_mesh(coord: ChunkCoord, mesh: &TerrainMesh) -> Self {
        let (min_height, max_height) = mesh
            .vertices
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v.y), hi.max(v.y)));
        Self {
            coord: coord.to_array(),
            lod: mesh.lod,
            vertices: mesh.vertex_count(),
            triangles: mesh.triangle_count(),
            skirt_vertices: mesh.skirt_vertices.len(),
            min_height,
            max_height,
        }
    }
}

/// Result of rendering one chunk
#[derive(Clone, Debug)]
pub enum Preview {
    Image(RgbImage),
    Mesh(MeshStats),
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Grayscale image of `height_map`, black at its minimum and white at its maximum
pub fn noise_image(height_map: &HeightMap) -> RgbImage {
    let (min, max) = (height_map.min_value(), height_map.max_value());
    RgbImage::from_fn(height_map.width() as u32, height_map.height() as u32, |x, y| {
        let v = to_byte(inverse_lerp(min, max, height_map.get(x as usize, y as usize)));
        Rgb([v, v, v])
    })
}

/// Height map shaded with the texture layers over `[min_height, max_height]`
pub fn colour_image(height_map: &HeightMap, texture: &TextureSettings, min_height: f32, max_height: f32) -> RgbImage {
    RgbImage::from_fn(height_map.width() as u32, height_map.height() as u32, |x, y| {
        let [r, g, b] = texture.colour_for_height(height_map.get(x as usize, y as usize), min_height, max_height);
        Rgb([to_byte(r), to_byte(g), to_byte(b)])
    })
}

/// Grayscale falloff map of `size` x `size`
pub fn falloff_image(size: usize) -> RgbImage {
    let values = falloff::generate(size, size);
    RgbImage::from_fn(size as u32, size as u32, |x, y| {
        let v = to_byte(values[y as usize * size + x as usize]);
        Rgb([v, v, v])
    })
}

/// Render chunk `coord` in `mode`; `editor_lod` is used for [`PreviewMode::Mesh`]
pub fn render(
    pipeline: &GenerationPipeline,
    texture: &TextureSettings,
    mode: PreviewMode,
    coord: ChunkCoord,
    editor_lod: usize,
) -> Preview {
    match mode {
        PreviewMode::FalloffMap => Preview::Image(falloff_image(pipeline.mesh_settings().vertices_per_line())),
        PreviewMode::NoiseMap => Preview::Image(noise_image(&pipeline.height_map(coord))),
        PreviewMode::ColourMap => {
            let elevation = pipeline.elevation();
            Preview::Image(colour_image(
                &pipeline.height_map(coord),
                texture,
                elevation.min_height(),
                elevation.max_height(),
            ))
        }
        PreviewMode::Mesh => {
            let mesh = pipeline.generate_chunk(coord, editor_lod).mesh;
            Preview::Mesh(MeshStats::from_mesh(coord, &mesh))
        }
    }
}

/// Render and write a PNG (image modes) to `path`
pub fn save_image(image: &RgbImage, path: impl AsRef<std::path::Path>) -> Result<()> {
    image.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IVec2;
    use crate::mesh::MeshSettings;
    use crate::terrain::{ElevationSettings, TextureLayer};

    fn pipeline() -> GenerationPipeline {
        GenerationPipeline::new(ElevationSettings::default(), MeshSettings::new(0, 1.0).unwrap())
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("noise".parse::<PreviewMode>().unwrap(), PreviewMode::NoiseMap);
        assert_eq!("Color".parse::<PreviewMode>().unwrap(), PreviewMode::ColourMap);
        assert_eq!("falloff_map".parse::<PreviewMode>().unwrap(), PreviewMode::FalloffMap);
        assert_eq!(PreviewMode::Mesh.to_string().parse::<PreviewMode>().unwrap(), PreviewMode::Mesh);
        assert!("terrain".parse::<PreviewMode>().is_err());
    }

    #[test]
    fn test_noise_image_spans_range() {
        let map = HeightMap::from_values(2, 2, vec![0.0, 5.0, 10.0, 2.5]).unwrap();
        let image = noise_image(&map);
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(0, 1), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_colour_image_uses_layers() {
        let texture = TextureSettings {
            layers: vec![
                TextureLayer::new("low", [1.0, 0.0, 0.0], 0.0, 0.0),
                TextureLayer::new("high", [0.0, 0.0, 1.0], 0.5, 0.0),
            ],
        };
        let map = HeightMap::from_values(2, 1, vec![1.0, 9.0]).unwrap();
        let image = colour_image(&map, &texture, 0.0, 10.0);
        assert_eq!(image.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_falloff_image_dark_centre() {
        let image = falloff_image(21);
        assert!(image.get_pixel(10, 10)[0] < 10);
        assert_eq!(image.get_pixel(0, 10)[0], 255);
    }

    #[test]
    fn test_render_modes() {
        let p = pipeline();
        let texture = TextureSettings::default();
        match render(&p, &texture, PreviewMode::NoiseMap, IVec2::ZERO, 0) {
            Preview::Image(image) => assert_eq!(image.dimensions(), (53, 53)),
            other => panic!("unexpected preview {:?}", other),
        }
        match render(&p, &texture, PreviewMode::Mesh, IVec2::new(1, 1), 2) {
            Preview::Mesh(stats) => {
                assert_eq!(stats.coord, [1, 1]);
                assert_eq!(stats.lod, 2);
                assert_eq!(stats.skirt_vertices, 4 * 53 - 4);
                assert!(stats.min_height <= stats.max_height);
            }
            other => panic!("unexpected preview {:?}", other),
        }
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("falloff.png");
        save_image(&falloff_image(8), &path).unwrap();
        assert!(path.exists());
    }
}
