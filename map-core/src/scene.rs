use serde::{Deserialize, Serialize};

/// One deduplicated vertex of a mesh.
///
/// Two polygon corners collapse to the same stored vertex only when all
/// three fields are bitwise equal; see [`crate::dedup::VertexIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Ordered vertex indices of one polygon, 3 (triangle) or 4 (quad) entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub indices: Vec<u32>,
}

impl Polygon {
    pub fn corner_count(&self) -> u8 {
        self.indices.len() as u8
    }
}

/// Per-axis min/max fold over vertex positions.
///
/// Seeded at the coordinate origin, not at the first vertex: a mesh that
/// lives entirely in the positive octant still has `min == [0, 0, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: [0.0; 3],
            max: [0.0; 3],
        }
    }
}

impl Bounds {
    /// Fold one position into the running min/max.
    pub fn include(&mut self, position: [f32; 3]) {
        for axis in 0..3 {
            if position[axis] < self.min[axis] {
                self.min[axis] = position[axis];
            }
            if position[axis] > self.max[axis] {
                self.max[axis] = position[axis];
            }
        }
    }

    /// Extent of the bounds along one axis.
    pub fn extent(&self, axis: usize) -> f32 {
        self.max[axis] - self.min[axis]
    }
}

/// An indexed mesh: unique vertices in first-seen order plus polygons
/// referencing them by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub polygons: Vec<Polygon>,
    pub bounds: Bounds,
}

/// One scene-graph node with its transform already converted to the
/// runtime axis convention (row-major, Y-up).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Index of the parent node, `-1` for roots. When non-negative it
    /// references a node earlier in [`Scene::nodes`].
    pub parent_index: i32,
    /// Index into [`Scene::meshes`], `-1` when no mesh is attached.
    pub mesh_index: i32,
    pub matrix: [[f32; 4]; 4],
}

/// A texture reference; the image payload itself is never embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    /// Basename of the image file, no directory component.
    pub filename: String,
}

/// The immutable scene model produced by [`crate::builder::build_scene`]
/// and consumed exactly once by the layout writer.
///
/// Array order is first-encountered source order and is semantically
/// significant: nodes reference meshes (and each other) by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<Node>,
    pub textures: Vec<Texture>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_seeded_at_the_origin() {
        let mut bounds = Bounds::default();
        bounds.include([2.0, 3.0, 4.0]);
        bounds.include([5.0, 1.0, 6.0]);

        // The origin stays the floor even though no vertex sits there.
        assert_eq!(bounds.min, [0.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [5.0, 3.0, 6.0]);
    }

    #[test]
    fn bounds_track_negative_positions() {
        let mut bounds = Bounds::default();
        bounds.include([-1.5, -2.0, 0.5]);

        assert_eq!(bounds.min, [-1.5, -2.0, 0.0]);
        assert_eq!(bounds.max, [0.0, 0.0, 0.5]);
        assert_eq!(bounds.extent(0), 1.5);
        assert_eq!(bounds.extent(1), 2.0);
        assert_eq!(bounds.extent(2), 0.5);
    }
}
