//! Wavefront OBJ (+ MTL) mesh source.
//!
//! Supports `v` (with optional trailing rgb), `vt`, `f` (polygons are fan
//! triangulated, negative indices are relative), `o`/`g`/`usemtl` splitting,
//! and `mtllib` materials with `Kd` and `map_Kd`. Missing material or texture
//! files are logged and skipped.

use super::asset::{Material, MeshAsset, MeshSource, Texture, TriangleMesh};
use crate::error::{MorphError, Result};
use glam::{Vec2, Vec3};
use log::{debug, warn};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

/// An OBJ file on disk. Relative `mtllib`/`map_Kd` paths resolve against the
/// file's directory.
#[derive(Debug, Clone)]
pub struct ObjSource {
    pub path: PathBuf,
}

impl ObjSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MeshSource for ObjSource {
    fn load_asset(&self) -> Result<MeshAsset> {
        let file = File::open(&self.path)
            .map_err(|e| MorphError::Mesh(format!("{}: {}", self.path.display(), e)))?;
        parse_obj(file, self.path.parent())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Default)]
struct MeshBuilder {
    name: String,
    material: Option<String>,
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    colors: Vec<Vec3>,
    any_uv: bool,
    any_color: bool,
}

impl MeshBuilder {
    fn start(name: String, material: Option<String>) -> Self {
        Self {
            name,
            material,
            ..Default::default()
        }
    }

    fn finish(self, materials: &HashMap<String, Material>) -> Option<TriangleMesh> {
        if self.positions.len() < 3 {
            return None;
        }

        let material = self
            .material
            .as_ref()
            .and_then(|m| materials.get(m).cloned())
            .unwrap_or_default();

        let mut mesh = TriangleMesh::new(self.name, self.positions).with_material(material);
        if self.any_uv {
            mesh = mesh.with_uvs(self.uvs);
        }
        if self.any_color {
            mesh = mesh.with_colors(self.colors);
        }
        Some(mesh)
    }
}

/// Resolve a 1-based (or negative, relative) OBJ index.
fn resolve_index(raw: &str, len: usize) -> Result<usize> {
    let i: i64 = raw
        .parse()
        .map_err(|_| MorphError::Mesh(format!("bad face index `{raw}`")))?;

    let idx = if i > 0 {
        (i - 1) as usize
    } else if i < 0 {
        let back = (-i) as usize;
        if back > len {
            return Err(MorphError::Mesh(format!("face index {i} out of range")));
        }
        len - back
    } else {
        return Err(MorphError::Mesh("face index 0 is invalid".into()));
    };

    if idx >= len {
        return Err(MorphError::Mesh(format!("face index {i} out of range")));
    }
    Ok(idx)
}

fn parse_floats<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<f32>> {
    parts
        .map(|p| {
            p.parse::<f32>()
                .map_err(|_| MorphError::Mesh(format!("bad number `{p}`")))
        })
        .collect()
}

/// Parse an OBJ stream into meshes. `base_dir` resolves material libraries;
/// `None` disables MTL loading.
pub fn parse_obj<R: Read>(reader: R, base_dir: Option<&Path>) -> Result<MeshAsset> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut vertex_colors: Vec<Option<Vec3>> = Vec::new();
    let mut texcoords: Vec<Vec2> = Vec::new();
    let mut materials: HashMap<String, Material> = HashMap::new();

    let mut meshes = Vec::new();
    let mut current = MeshBuilder::start("default".into(), None);

    for line_result in BufReader::new(reader).lines() {
        let line = line_result?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else { continue };

        match tag {
            "v" => {
                let values = parse_floats(parts)?;
                if values.len() < 3 {
                    return Err(MorphError::Mesh("vertex with fewer than 3 coordinates".into()));
                }
                positions.push(Vec3::new(values[0], values[1], values[2]));
                vertex_colors.push((values.len() >= 6).then(|| Vec3::new(values[3], values[4], values[5])));
            }
            "vt" => {
                let values = parse_floats(parts)?;
                let u = values.first().copied().unwrap_or(0.0);
                let v = values.get(1).copied().unwrap_or(0.0);
                texcoords.push(Vec2::new(u, v));
            }
            "f" => {
                let mut corners: Vec<(usize, Option<usize>)> = Vec::new();
                for token in parts {
                    let mut fields = token.split('/');
                    let v = resolve_index(fields.next().unwrap_or(""), positions.len())?;
                    let vt = match fields.next() {
                        Some(s) if !s.is_empty() => Some(resolve_index(s, texcoords.len())?),
                        _ => None,
                    };
                    corners.push((v, vt));
                }

                // Fan triangulation around the first corner.
                for k in 1..corners.len().saturating_sub(1) {
                    for &(v, vt) in &[corners[0], corners[k], corners[k + 1]] {
                        current.positions.push(positions[v]);
                        let uv = vt.map(|t| texcoords[t]);
                        current.any_uv |= uv.is_some();
                        current.uvs.push(uv.unwrap_or(Vec2::ZERO));
                        let color = vertex_colors[v];
                        current.any_color |= color.is_some();
                        current.colors.push(color.unwrap_or(Vec3::ONE));
                    }
                }
            }
            "o" | "g" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let material = current.material.clone();
                let done = std::mem::replace(&mut current, MeshBuilder::start(name, material));
                meshes.extend(done.finish(&materials));
            }
            "usemtl" => {
                let material = parts.next().map(str::to_string);
                let name = current.name.clone();
                let done = std::mem::replace(&mut current, MeshBuilder::start(name, material));
                meshes.extend(done.finish(&materials));
            }
            "mtllib" => {
                let Some(dir) = base_dir else { continue };
                for lib in parts {
                    let path = dir.join(lib);
                    match load_mtl(&path) {
                        Ok(found) => {
                            debug!("{}: {} materials", path.display(), found.len());
                            materials.extend(found);
                        }
                        Err(e) => warn!("Skipping material library {}: {}", path.display(), e),
                    }
                }
            }
            _ => {}
        }
    }

    meshes.extend(current.finish(&materials));

    if meshes.is_empty() {
        return Err(MorphError::Mesh("no triangles found".into()));
    }

    Ok(MeshAsset::new(meshes))
}

/// Parse an MTL library; textures resolve against the library's directory.
pub fn load_mtl(path: &Path) -> Result<HashMap<String, Material>> {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let reader = BufReader::new(File::open(path)?);

    let mut out = HashMap::new();
    let mut name: Option<String> = None;
    let mut material = Material::default();

    for line_result in reader.lines() {
        let line = line_result?;
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("newmtl") => {
                if let Some(prev) = name.take() {
                    out.insert(prev, std::mem::take(&mut material));
                }
                name = parts.next().map(str::to_string);
            }
            Some("Kd") => {
                let values = parse_floats(parts)?;
                if values.len() >= 3 {
                    material.base_color = Vec3::new(values[0], values[1], values[2]);
                }
            }
            Some("map_Kd") => {
                // Options may precede the file name; the name is the last token.
                if let Some(file) = parts.last() {
                    let tex_path = dir.join(file);
                    match Texture::load(&tex_path) {
                        Ok(tex) => material.texture = Some(Arc::new(tex)),
                        Err(e) => warn!("Texture unavailable, using Kd: {}", e),
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(prev) = name {
        out.insert(prev, material);
    }

    Ok(out)
}
