//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use firethorn::{ContextConfig, RenderContext};
use firethorn::device::DeviceStats;

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Temporary asset directory, removed on drop.
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!(
            "firethorn-test-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&root).expect("create temp asset dir");
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn prepare(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create asset subdir");
        }
        path
    }

    /// Write a solid-color RGBA PNG.
    pub fn write_png(&self, name: &str, width: u32, height: u32, rgba: [u8; 4]) -> PathBuf {
        let path = self.prepare(name);
        image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
            .save(&path)
            .expect("write png");
        path
    }

    /// Write a single-channel grayscale PNG.
    pub fn write_gray_png(&self, name: &str, width: u32, height: u32, value: u8) -> PathBuf {
        let path = self.prepare(name);
        image::GrayImage::from_pixel(width, height, image::Luma([value]))
            .save(&path)
            .expect("write gray png");
        path
    }

    /// Write a two-channel (gray + alpha) PNG.
    pub fn write_gray_alpha_png(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.prepare(name);
        image::GrayAlphaImage::from_pixel(width, height, image::LumaA([128, 255]))
            .save(&path)
            .expect("write gray-alpha png");
        path
    }

    /// Write a text file (shader sources).
    pub fn write_text(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.prepare(name);
        std::fs::write(&path, contents).expect("write text file");
        path
    }

    /// Write a one-triangle glTF model (`<name>.gltf` plus `<name>.bin`).
    ///
    /// With `texture`, the primitive's material references that image file by
    /// URI; the caller is responsible for writing the PNG itself.
    pub fn write_triangle_gltf(&self, name: &str, texture: Option<&str>) -> PathBuf {
        // Positions (3 x vec3), texcoords (3 x vec2), indices (3 x u32).
        let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let texcoords: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let indices: [u32; 3] = [0, 1, 2];

        let mut bin: Vec<u8> = Vec::new();
        bin.extend_from_slice(bytemuck::cast_slice(&positions));
        bin.extend_from_slice(bytemuck::cast_slice(&texcoords));
        bin.extend_from_slice(bytemuck::cast_slice(&indices));
        assert_eq!(bin.len(), 72);
        std::fs::write(self.prepare(&format!("{name}.bin")), &bin).expect("write bin");

        let material_json = match texture {
            Some(image) => format!(
                r#",
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }} }}],
  "textures": [{{ "source": 0 }}],
  "images": [{{ "uri": "{image}" }}]"#
            ),
            None => String::new(),
        };
        let material_ref = if texture.is_some() { r#", "material": 0"# } else { "" };

        let json = format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "buffers": [{{ "uri": "{name}.bin", "byteLength": 72 }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 24 }},
    {{ "buffer": 0, "byteOffset": 60, "byteLength": 12 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" }},
    {{ "bufferView": 2, "componentType": 5125, "count": 3, "type": "SCALAR" }}
  ],
  "meshes": [{{ "name": "{name}", "primitives": [{{ "attributes": {{ "POSITION": 0, "TEXCOORD_0": 1 }}, "indices": 2{material_ref} }}] }}],
  "nodes": [{{ "mesh": 0 }}],
  "scenes": [{{ "nodes": [0] }}],
  "scene": 0{material_json}
}}
"#
        );
        self.write_text(&format!("{name}.gltf"), &json)
    }
}

impl Drop for AssetDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Headless context rooted at the asset directory.
pub fn context(dir: &AssetDir) -> (RenderContext, DeviceStats) {
    context_with_config(dir, ContextConfig::default())
}

pub fn context_with_config(dir: &AssetDir, mut config: ContextConfig) -> (RenderContext, DeviceStats) {
    config.asset_roots = vec![dir.path().to_path_buf()];
    RenderContext::headless(config)
}
