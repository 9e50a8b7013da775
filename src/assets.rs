//! Asset I/O: path resolution, image decoding, shader source reading, and
//! glTF mesh extraction.
//!
//! Everything here is synchronous; a failed load surfaces as an error and is
//! never retried.

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3, Vec4};

use crate::device::{ShaderSources, TextureFormat};
use crate::error::{FirethornError, Result};
use crate::resources::{MeshData, TextureRole, Vertex};

/// Resolve a logical asset path to a canonical on-disk path.
///
/// Absolute paths must exist as given; relative paths are tried against each
/// configured root in order.
pub(crate) fn resolve_path(roots: &[PathBuf], path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        if path.exists() {
            return canonicalize(path);
        }
        return Err(FirethornError::AssetNotFound {
            path: path.to_path_buf(),
        });
    }
    for root in roots {
        let candidate = root.join(path);
        if candidate.exists() {
            return canonicalize(&candidate);
        }
    }
    Err(FirethornError::AssetNotFound {
        path: path.to_path_buf(),
    })
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|source| FirethornError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Raw decoded pixels plus dimensions and channel count.
pub(crate) struct DecodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

/// Decode an image file, optionally flipping it vertically.
///
/// The native channel count is preserved; only 1, 3, and 4 channels can be
/// uploaded.
pub(crate) fn load_image(path: &Path, flip_y: bool) -> Result<DecodedImage> {
    let img = image::open(path).map_err(|e| FirethornError::ImageDecode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let img = if flip_y { img.flipv() } else { img };
    let channels = img.color().channel_count();
    let (data, width, height) = match channels {
        1 => {
            let buf = img.into_luma8();
            let (w, h) = buf.dimensions();
            (buf.into_raw(), w, h)
        }
        3 => {
            let buf = img.into_rgb8();
            let (w, h) = buf.dimensions();
            (buf.into_raw(), w, h)
        }
        4 => {
            let buf = img.into_rgba8();
            let (w, h) = buf.dimensions();
            (buf.into_raw(), w, h)
        }
        other => {
            return Err(FirethornError::UnsupportedChannelCount {
                path: path.to_path_buf(),
                channels: other,
            });
        }
    };
    log::debug!(
        "decoded {} ({}x{}, {} channels{})",
        path.display(),
        width,
        height,
        channels,
        if flip_y { ", flipped" } else { "" }
    );
    Ok(DecodedImage {
        data,
        width,
        height,
        channels,
    })
}

/// Upload format for a decoded channel count. sRGB applies to color formats
/// only; single-channel data stays linear.
pub(crate) fn format_for_channels(channels: u8, srgb: bool) -> TextureFormat {
    match (channels, srgb) {
        (1, _) => TextureFormat::R8Unorm,
        (3, false) => TextureFormat::Rgb8Unorm,
        (3, true) => TextureFormat::Rgb8Srgb,
        (4, false) => TextureFormat::Rgba8Unorm,
        (_, true) => TextureFormat::Rgba8Srgb,
        (_, false) => TextureFormat::Rgba8Unorm,
    }
}

/// Read shader stage sources from resolved paths.
pub(crate) fn load_shader_sources(
    label: String,
    vertex: &Path,
    fragment: &Path,
    geometry: Option<&Path>,
) -> Result<ShaderSources> {
    Ok(ShaderSources {
        label,
        vertex: read_source(vertex)?,
        fragment: read_source(fragment)?,
        geometry: geometry.map(read_source).transpose()?,
    })
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| FirethornError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// One mesh extracted from a model file, plus the texture files its material
/// references (paths relative to the model's directory).
pub(crate) struct MeshSource {
    pub data: MeshData,
    pub textures: Vec<(TextureRole, PathBuf)>,
}

/// Parse a glTF file into flat mesh sources.
///
/// Each primitive becomes one mesh. Only file-backed texture sources are
/// collected; images embedded in buffer views are skipped.
pub(crate) fn load_model_meshes(path: &Path) -> Result<Vec<MeshSource>> {
    let (document, buffers, _images) =
        gltf::import(path).map_err(|e| FirethornError::ModelParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut sources = Vec::new();
    for mesh in document.meshes() {
        let mesh_name = mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("mesh{}", mesh.index()));

        for (primitive_index, primitive) in mesh.primitives().enumerate() {
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| FirethornError::ModelParse {
                    path: path.to_path_buf(),
                    reason: format!("primitive {primitive_index} of '{mesh_name}' has no positions"),
                })?
                .collect();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().collect())
                .unwrap_or_default();
            let tangents: Vec<[f32; 4]> = reader
                .read_tangents()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let vertices: Vec<Vertex> = positions
                .iter()
                .enumerate()
                .map(|(i, p)| Vertex {
                    position: Vec3::from(*p),
                    normal: normals.get(i).copied().map(Vec3::from).unwrap_or(Vec3::Y),
                    uv: uvs.get(i).copied().map(Vec2::from).unwrap_or(Vec2::ZERO),
                    tangent: tangents
                        .get(i)
                        .copied()
                        .map(Vec4::from)
                        .unwrap_or(Vec4::new(1.0, 0.0, 0.0, 1.0)),
                })
                .collect();

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..vertices.len() as u32).collect());

            let name = if primitive_index > 0 {
                format!("{mesh_name}.{primitive_index}")
            } else {
                mesh_name.clone()
            };

            let mut textures = Vec::new();
            let material = primitive.material();
            let pbr = material.pbr_metallic_roughness();
            if let Some(info) = pbr.base_color_texture() {
                if let Some(file) = texture_file(&info.texture()) {
                    textures.push((TextureRole::BaseColor, file));
                }
            }
            if let Some(info) = pbr.metallic_roughness_texture() {
                if let Some(file) = texture_file(&info.texture()) {
                    textures.push((TextureRole::MetallicRoughness, file));
                }
            }
            if let Some(normal) = material.normal_texture() {
                if let Some(file) = texture_file(&normal.texture()) {
                    textures.push((TextureRole::Normal, file));
                }
            }

            sources.push(MeshSource {
                data: MeshData {
                    name,
                    vertices,
                    indices,
                },
                textures,
            });
        }
    }

    log::debug!(
        "parsed model {}: {} mesh(es)",
        path.display(),
        sources.len()
    );
    Ok(sources)
}

fn texture_file(texture: &gltf::Texture<'_>) -> Option<PathBuf> {
    match texture.source().source() {
        gltf::image::Source::Uri { uri, .. } => Some(PathBuf::from(uri)),
        gltf::image::Source::View { .. } => {
            log::debug!("skipping buffer-embedded image source");
            None
        }
    }
}
