use crate::convert::to_target_axes;
use crate::dedup::VertexIndex;
use crate::export::ExportOptions;
use crate::scene::{Bounds, Mesh, Node, Polygon, Scene, Texture, Vertex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const AXIS_NAMES: [char; 3] = ['x', 'y', 'z'];

/// Errors that can occur while building the scene model.
///
/// Every variant names the offending entity and the observed value so the
/// host can surface an actionable message through its own failure channel.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("mesh `{mesh}` has unsupported polygons (count={corners})")]
    UnsupportedTopology { mesh: String, corners: usize },

    #[error("mesh `{mesh}` is not triangulated (polygon with {corners} corners)")]
    NotTriangulated { mesh: String, corners: usize },

    #[error("mesh `{mesh}` has degenerate bounds on the {axis} axis (min == max)")]
    DegenerateBounds { mesh: String, axis: char },

    #[error("object `{object}` references parent `{parent}` which has not been registered")]
    UnknownParent { object: String, parent: String },
}

/// Raw per-corner attributes fetched from the authoring tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Corner {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// One source polygon as an ordered run of corner samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePolygon {
    pub corners: Vec<Corner>,
}

/// One mesh as supplied by the authoring tool, per-corner and unindexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMesh {
    pub name: String,
    pub polygons: Vec<SourcePolygon>,
}

/// One scene object. `parent` and `mesh` reference other source entities
/// by name; objects carrying non-mesh data (cameras, lights) leave `mesh`
/// unset or pointing at a name no mesh has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceObject {
    pub name: String,
    pub parent: Option<String>,
    pub mesh: Option<String>,
    /// Local transform in the authoring tool's column-major convention.
    pub matrix: [[f32; 4]; 4],
}

/// One image slot from the authoring tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceImage {
    pub name: String,
    pub filepath: String,
    /// True for render-output/viewer pseudo-images, which have no backing
    /// file and are skipped.
    pub render_output: bool,
}

/// Everything the host collaborator supplies for one export run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceScene {
    pub meshes: Vec<SourceMesh>,
    pub objects: Vec<SourceObject>,
    pub images: Vec<SourceImage>,
}

/// Build the immutable scene model from raw authoring-tool data.
///
/// Textures come first, then meshes, then nodes; each array keeps its
/// source order. Object order must list parents before their children,
/// which the authoring tool's native order already guarantees.
pub fn build_scene(source: &SourceScene, options: &ExportOptions) -> Result<Scene, BuildError> {
    let mut scene = Scene::default();

    for image in &source.images {
        if image.render_output {
            debug!("skipping render-output image `{}`", image.name);
            continue;
        }
        scene.textures.push(Texture {
            name: image.name.clone(),
            filename: basename(&image.filepath),
        });
    }

    let mut mesh_lookup: HashMap<&str, i32> = HashMap::new();
    for source_mesh in &source.meshes {
        let mesh = build_mesh(source_mesh, options)?;
        debug!(
            "mesh `{}`: {} vertices, {} polygons",
            mesh.name,
            mesh.vertices.len(),
            mesh.polygons.len()
        );
        mesh_lookup.insert(source_mesh.name.as_str(), scene.meshes.len() as i32);
        scene.meshes.push(mesh);
    }

    let mut node_lookup: HashMap<&str, i32> = HashMap::new();
    for object in &source.objects {
        let parent_index = match &object.parent {
            Some(parent) => {
                *node_lookup
                    .get(parent.as_str())
                    .ok_or_else(|| BuildError::UnknownParent {
                        object: object.name.clone(),
                        parent: parent.clone(),
                    })?
            }
            None => -1,
        };
        let mesh_index = object
            .mesh
            .as_deref()
            .and_then(|name| mesh_lookup.get(name).copied())
            .unwrap_or(-1);

        node_lookup.insert(object.name.as_str(), scene.nodes.len() as i32);
        scene.nodes.push(Node {
            name: object.name.clone(),
            parent_index,
            mesh_index,
            matrix: to_target_axes(object.matrix),
        });
    }

    info!(
        "built scene model: {} meshes, {} nodes, {} textures",
        scene.meshes.len(),
        scene.nodes.len(),
        scene.textures.len()
    );
    Ok(scene)
}

fn build_mesh(source: &SourceMesh, options: &ExportOptions) -> Result<Mesh, BuildError> {
    let mut index = VertexIndex::new();
    let mut polygons = Vec::with_capacity(source.polygons.len());
    let mut bounds = Bounds::default();

    for polygon in &source.polygons {
        let corners = polygon.corners.len();
        if corners != 3 && corners != 4 {
            return Err(BuildError::UnsupportedTopology {
                mesh: source.name.clone(),
                corners,
            });
        }
        if options.assert_triangulation && corners != 3 {
            return Err(BuildError::NotTriangulated {
                mesh: source.name.clone(),
                corners,
            });
        }

        let mut indices = Vec::with_capacity(corners);
        for corner in &polygon.corners {
            bounds.include(corner.position);
            indices.push(index.intern(Vertex {
                position: corner.position,
                normal: corner.normal,
                uv: corner.uv,
            }));
        }
        polygons.push(Polygon { indices });
    }

    let mut mesh = Mesh {
        name: source.name.clone(),
        vertices: index.into_vertices(),
        polygons,
        bounds,
    };
    if options.normalize {
        normalize_mesh(&mut mesh)?;
    }
    Ok(mesh)
}

/// Rescale vertex positions per axis by the mesh's own extent.
///
/// The divisor is `max - min` with no re-centering and no clamp; runtime
/// consumers rely on this exact formula. Bounds keep their source-space
/// values: the file carries no bounds field, and the model's fold stays
/// the one the scaling decision was made from.
fn normalize_mesh(mesh: &mut Mesh) -> Result<(), BuildError> {
    let mut scale = [0.0f32; 3];
    for axis in 0..3 {
        let extent = mesh.bounds.extent(axis);
        if extent == 0.0 {
            return Err(BuildError::DegenerateBounds {
                mesh: mesh.name.clone(),
                axis: AXIS_NAMES[axis],
            });
        }
        scale[axis] = extent;
    }
    for vertex in &mut mesh.vertices {
        for axis in 0..3 {
            vertex.position[axis] /= scale[axis];
        }
    }
    Ok(())
}

fn basename(filepath: &str) -> String {
    Path::new(filepath)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
