use crate::buffer::{PatchBuffer, PatchError};
use crate::builder::{build_scene, BuildError, SourceScene};
use crate::format::{FLAG_NORMALIZED, FLAG_TRIANGULATED, MAP_SIGNATURE};
use crate::scene::{Mesh, Node, Polygon, Scene, Texture, Vertex};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

// Patch tags for the header's section references.
const TAG_MESH_COUNT: &str = "mesh_count";
const TAG_MESH_OFFSET: &str = "mesh_offset";
const TAG_NODE_COUNT: &str = "node_count";
const TAG_NODE_OFFSET: &str = "node_offset";
const TAG_TEXTURE_COUNT: &str = "texture_count";
const TAG_TEXTURE_OFFSET: &str = "texture_offset";

// Patch tags for descriptor fields. Shared across the elements of a
// section; each section drains its queues before the next one starts.
const TAG_NAME_LEN: &str = "name_len";
const TAG_NAME_OFFSET: &str = "name_offset";
const TAG_VERTEX_COUNT: &str = "vertex_count";
const TAG_VERTEX_OFFSET: &str = "vertex_offset";
const TAG_POLYGON_COUNT: &str = "polygon_count";
const TAG_POLYGON_OFFSET: &str = "polygon_offset";
const TAG_FILENAME_LEN: &str = "filename_len";
const TAG_FILENAME_OFFSET: &str = "filename_offset";

/// Export configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Reject any polygon that is not a triangle instead of keeping quads.
    pub assert_triangulation: bool,
    /// Rescale vertex positions per axis by each mesh's own extent.
    pub normalize: bool,
}

impl ExportOptions {
    fn flag_bits(&self) -> u32 {
        let mut flags = 0;
        if self.assert_triangulation {
            flags |= FLAG_TRIANGULATED;
        }
        if self.normalize {
            flags |= FLAG_NORMALIZED;
        }
        flags
    }
}

/// Errors that can occur while producing a MAP buffer.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Internal serializer fault; unreachable through input data.
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Information about a committed output file.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Convert raw authoring-tool data straight into a MAP byte buffer.
///
/// The whole pipeline is pure and synchronous: one scene model and one
/// buffer per call, no shared state between invocations.
pub fn export_scene(source: &SourceScene, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let scene = build_scene(source, options)?;
    write_scene(&scene, options)
}

/// Serialize a built scene into the MAP layout.
///
/// Sections are emitted in fixed order (meshes, nodes, textures), each in
/// two passes: fixed-size descriptors with reserved slots first, then the
/// variable-length bodies, patching every slot the moment its body lands.
pub fn write_scene(scene: &Scene, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let mut buffer = PatchBuffer::new();

    buffer.append_u32(MAP_SIGNATURE);
    buffer.append_u32(options.flag_bits());
    buffer.reserve_u32(TAG_MESH_COUNT);
    buffer.reserve_u32(TAG_MESH_OFFSET);
    buffer.reserve_u32(TAG_NODE_COUNT);
    buffer.reserve_u32(TAG_NODE_OFFSET);
    buffer.reserve_u32(TAG_TEXTURE_COUNT);
    buffer.reserve_u32(TAG_TEXTURE_OFFSET);

    write_mesh_section(&mut buffer, &scene.meshes)?;
    write_node_section(&mut buffer, &scene.nodes)?;
    write_texture_section(&mut buffer, &scene.textures)?;

    let bytes = buffer.finish()?;
    debug!("serialized scene into {} bytes", bytes.len());
    Ok(bytes)
}

fn write_mesh_section(buffer: &mut PatchBuffer, meshes: &[Mesh]) -> Result<(), PatchError> {
    buffer.patch_u32(TAG_MESH_COUNT, meshes.len() as u32)?;
    buffer.patch_here(TAG_MESH_OFFSET)?;

    for _ in meshes {
        buffer.reserve_u32(TAG_NAME_LEN);
        buffer.reserve_u32(TAG_NAME_OFFSET);
        buffer.reserve_u32(TAG_VERTEX_COUNT);
        buffer.reserve_u32(TAG_VERTEX_OFFSET);
        buffer.reserve_u32(TAG_POLYGON_COUNT);
        buffer.reserve_u32(TAG_POLYGON_OFFSET);
    }

    for mesh in meshes {
        write_string_body(buffer, TAG_NAME_LEN, TAG_NAME_OFFSET, &mesh.name)?;

        buffer.patch_u32(TAG_VERTEX_COUNT, mesh.vertices.len() as u32)?;
        buffer.patch_here(TAG_VERTEX_OFFSET)?;
        for vertex in &mesh.vertices {
            write_vertex(buffer, vertex);
        }

        buffer.patch_u32(TAG_POLYGON_COUNT, mesh.polygons.len() as u32)?;
        buffer.patch_here(TAG_POLYGON_OFFSET)?;
        for polygon in &mesh.polygons {
            write_polygon(buffer, polygon);
        }
    }
    Ok(())
}

fn write_node_section(buffer: &mut PatchBuffer, nodes: &[Node]) -> Result<(), PatchError> {
    buffer.patch_u32(TAG_NODE_COUNT, nodes.len() as u32)?;
    buffer.patch_here(TAG_NODE_OFFSET)?;

    for node in nodes {
        buffer.reserve_u32(TAG_NAME_LEN);
        buffer.reserve_u32(TAG_NAME_OFFSET);
        for row in &node.matrix {
            for value in row {
                buffer.append_f32(*value);
            }
        }
        buffer.append_i32(node.parent_index);
        buffer.append_i32(node.mesh_index);
    }

    for node in nodes {
        write_string_body(buffer, TAG_NAME_LEN, TAG_NAME_OFFSET, &node.name)?;
    }
    Ok(())
}

fn write_texture_section(buffer: &mut PatchBuffer, textures: &[Texture]) -> Result<(), PatchError> {
    buffer.patch_u32(TAG_TEXTURE_COUNT, textures.len() as u32)?;
    buffer.patch_here(TAG_TEXTURE_OFFSET)?;

    for _ in textures {
        buffer.reserve_u32(TAG_NAME_LEN);
        buffer.reserve_u32(TAG_NAME_OFFSET);
        buffer.reserve_u32(TAG_FILENAME_LEN);
        buffer.reserve_u32(TAG_FILENAME_OFFSET);
    }

    for texture in textures {
        write_string_body(buffer, TAG_NAME_LEN, TAG_NAME_OFFSET, &texture.name)?;
        write_string_body(
            buffer,
            TAG_FILENAME_LEN,
            TAG_FILENAME_OFFSET,
            &texture.filename,
        )?;
    }
    Ok(())
}

/// Emit one string body and resolve its descriptor's (len, offset) pair.
/// The length field counts the UTF-8 bytes, excluding the NUL terminator.
fn write_string_body(
    buffer: &mut PatchBuffer,
    len_tag: &'static str,
    offset_tag: &'static str,
    value: &str,
) -> Result<(), PatchError> {
    let bytes = value.as_bytes();
    buffer.patch_u32(len_tag, bytes.len() as u32)?;
    buffer.patch_here(offset_tag)?;
    buffer.append(bytes);
    buffer.append_u8(0);
    Ok(())
}

fn write_vertex(buffer: &mut PatchBuffer, vertex: &Vertex) {
    for value in vertex.position {
        buffer.append_f32(value);
    }
    for value in vertex.normal {
        buffer.append_f32(value);
    }
    for value in vertex.uv {
        buffer.append_f32(value);
    }
}

/// Polygon records occupy a uniform stride: the corner count byte plus
/// four index words, the unused tail zeroed for triangles.
fn write_polygon(buffer: &mut PatchBuffer, polygon: &Polygon) {
    buffer.append_u8(polygon.corner_count());
    for &index in &polygon.indices {
        buffer.append_u32(index);
    }
    for _ in polygon.indices.len()..4 {
        buffer.append_u32(0);
    }
}

/// Export entry point holding the options for one or more runs.
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    /// Create a new exporter with default options.
    pub fn new() -> Self {
        Self {
            options: ExportOptions::default(),
        }
    }

    /// Create an exporter with custom options.
    pub fn with_options(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Build and serialize, yielding the file bytes.
    pub fn export(&self, source: &SourceScene) -> Result<Vec<u8>, ExportError> {
        export_scene(source, &self.options)
    }

    /// Export and commit to `path` atomically: the buffer is written to a
    /// temporary file in the destination directory and renamed into place,
    /// so a failed export never leaves a partial file behind.
    pub fn export_to_file(
        &self,
        source: &SourceScene,
        path: &Path,
    ) -> anyhow::Result<ExportedFile> {
        let bytes = self.export(source)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)
            .context("failed to create temporary output file")?;
        temp.write_all(&bytes)
            .context("failed to write output buffer")?;
        temp.persist(path)
            .with_context(|| format!("failed to commit {}", path.display()))?;

        info!("exported {} bytes to {}", bytes.len(), path.display());
        Ok(ExportedFile {
            path: path.to_path_buf(),
            size_bytes: bytes.len() as u64,
        })
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}
