use crate::scene::Vertex;
use std::collections::HashMap;

/// Structural identity of a vertex: the bit patterns of all eight floats.
///
/// Bitwise identity (not float tolerance) keeps interning deterministic and
/// hashable; `-0.0` and `0.0` are therefore distinct vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey([u32; 8]);

impl VertexKey {
    fn of(vertex: &Vertex) -> Self {
        Self([
            vertex.position[0].to_bits(),
            vertex.position[1].to_bits(),
            vertex.position[2].to_bits(),
            vertex.normal[0].to_bits(),
            vertex.normal[1].to_bits(),
            vertex.normal[2].to_bits(),
            vertex.uv[0].to_bits(),
            vertex.uv[1].to_bits(),
        ])
    }
}

/// Per-mesh vertex deduplication index.
///
/// Maps structurally distinct vertices to dense 0-based indices in
/// first-seen order, building the mesh's vertex array as a side effect.
/// Feeding corners in the same order always reproduces the same array and
/// the same index assignment, which the file layout depends on.
#[derive(Debug, Default)]
pub struct VertexIndex {
    lookup: HashMap<VertexKey, u32>,
    vertices: Vec<Vertex>,
}

impl VertexIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `vertex`, appending it on first occurrence.
    pub fn intern(&mut self, vertex: Vertex) -> u32 {
        let key = VertexKey::of(&vertex);
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.vertices.len() as u32;
        self.lookup.insert(key, index);
        self.vertices.push(vertex);
        index
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Consume the index, yielding the deduplicated vertex array in
    /// first-seen order.
    pub fn into_vertices(self) -> Vec<Vertex> {
        self.vertices
    }
}
