//! On-disk layout of the MAP format: constants, descriptor records, and a
//! read-back path for runtime consumers and round-trip checks.
//!
//! All integers and floats are little-endian. Offsets are absolute byte
//! offsets from the start of the file.

use crate::scene::{Bounds, Mesh, Node, Polygon, Scene, Texture, Vertex};
use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// `"MAP\0"` read as a little-endian u32.
pub const MAP_SIGNATURE: u32 = 0x0050_414D;

/// Every polygon was a triangle (strict triangulation was requested).
pub const FLAG_TRIANGULATED: u32 = 1 << 0;
/// Vertex positions were rescaled by per-mesh extents.
pub const FLAG_NORMALIZED: u32 = 1 << 1;

/// Signature, flags, and three (count, offset) pairs.
pub const HEADER_SIZE: usize = 32;
/// Name reference plus vertex and polygon array references.
pub const MESH_DESCRIPTOR_SIZE: usize = 24;
/// 3 + 3 + 2 floats.
pub const VERTEX_RECORD_SIZE: usize = 32;
/// Corner count byte plus four index words; triangles pad the fourth.
pub const POLYGON_RECORD_SIZE: usize = 17;
/// Name reference, 16 matrix floats, parent and mesh indices.
pub const NODE_DESCRIPTOR_SIZE: usize = 80;
/// Name and filename references.
pub const TEXTURE_DESCRIPTOR_SIZE: usize = 16;

/// Fixed-size file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub flags: u32,
    pub mesh_count: u32,
    pub mesh_offset: u32,
    pub node_count: u32,
    pub node_offset: u32,
    pub texture_count: u32,
    pub texture_offset: u32,
}

impl MapHeader {
    /// Parse and validate the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            bail!(
                "file too small for a MAP header: {} bytes, need {}",
                data.len(),
                HEADER_SIZE
            );
        }
        let mut cursor = Cursor::new(data);

        let signature = cursor.read_u32::<LittleEndian>()?;
        if signature != MAP_SIGNATURE {
            bail!("invalid MAP signature: {signature:#010x}");
        }

        Ok(Self {
            flags: cursor.read_u32::<LittleEndian>()?,
            mesh_count: cursor.read_u32::<LittleEndian>()?,
            mesh_offset: cursor.read_u32::<LittleEndian>()?,
            node_count: cursor.read_u32::<LittleEndian>()?,
            node_offset: cursor.read_u32::<LittleEndian>()?,
            texture_count: cursor.read_u32::<LittleEndian>()?,
            texture_offset: cursor.read_u32::<LittleEndian>()?,
        })
    }

    pub fn triangulated(&self) -> bool {
        self.flags & FLAG_TRIANGULATED != 0
    }

    pub fn normalized(&self) -> bool {
        self.flags & FLAG_NORMALIZED != 0
    }
}

/// Fixed-size descriptor for one mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshDescriptor {
    pub name_len: u32,
    pub name_offset: u32,
    pub vertex_count: u32,
    pub vertex_offset: u32,
    pub polygon_count: u32,
    pub polygon_offset: u32,
}

impl MeshDescriptor {
    pub fn parse_array(data: &[u8], offset: u32, count: u32) -> Result<Vec<Self>> {
        let mut cursor = cursor_at(data, offset, count as usize * MESH_DESCRIPTOR_SIZE)
            .context("mesh descriptor array out of bounds")?;
        (0..count)
            .map(|_| {
                Ok(Self {
                    name_len: cursor.read_u32::<LittleEndian>()?,
                    name_offset: cursor.read_u32::<LittleEndian>()?,
                    vertex_count: cursor.read_u32::<LittleEndian>()?,
                    vertex_offset: cursor.read_u32::<LittleEndian>()?,
                    polygon_count: cursor.read_u32::<LittleEndian>()?,
                    polygon_offset: cursor.read_u32::<LittleEndian>()?,
                })
            })
            .collect()
    }
}

/// Fixed-size descriptor for one node; the matrix is stored inline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDescriptor {
    pub name_len: u32,
    pub name_offset: u32,
    pub matrix: [[f32; 4]; 4],
    pub parent_index: i32,
    pub mesh_index: i32,
}

impl NodeDescriptor {
    pub fn parse_array(data: &[u8], offset: u32, count: u32) -> Result<Vec<Self>> {
        let mut cursor = cursor_at(data, offset, count as usize * NODE_DESCRIPTOR_SIZE)
            .context("node descriptor array out of bounds")?;
        (0..count)
            .map(|_| {
                let name_len = cursor.read_u32::<LittleEndian>()?;
                let name_offset = cursor.read_u32::<LittleEndian>()?;
                let mut matrix = [[0.0f32; 4]; 4];
                for row in &mut matrix {
                    for value in row.iter_mut() {
                        *value = cursor.read_f32::<LittleEndian>()?;
                    }
                }
                Ok(Self {
                    name_len,
                    name_offset,
                    matrix,
                    parent_index: cursor.read_i32::<LittleEndian>()?,
                    mesh_index: cursor.read_i32::<LittleEndian>()?,
                })
            })
            .collect()
    }
}

/// Fixed-size descriptor for one texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub name_len: u32,
    pub name_offset: u32,
    pub filename_len: u32,
    pub filename_offset: u32,
}

impl TextureDescriptor {
    pub fn parse_array(data: &[u8], offset: u32, count: u32) -> Result<Vec<Self>> {
        let mut cursor = cursor_at(data, offset, count as usize * TEXTURE_DESCRIPTOR_SIZE)
            .context("texture descriptor array out of bounds")?;
        (0..count)
            .map(|_| {
                Ok(Self {
                    name_len: cursor.read_u32::<LittleEndian>()?,
                    name_offset: cursor.read_u32::<LittleEndian>()?,
                    filename_len: cursor.read_u32::<LittleEndian>()?,
                    filename_offset: cursor.read_u32::<LittleEndian>()?,
                })
            })
            .collect()
    }
}

/// One polygon record as stored: corner count plus a uniform four-index
/// array, the tail zero-padded for triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolygonRecord {
    pub corner_count: u8,
    pub indices: [u32; 4],
}

/// Read a string body: UTF-8 bytes of the given length, followed by a NUL.
///
/// The explicit length is authoritative; the terminator is only verified.
pub fn read_string(data: &[u8], offset: u32, len: u32) -> Result<String> {
    let start = offset as usize;
    let end = start
        .checked_add(len as usize)
        .filter(|&end| end < data.len())
        .with_context(|| format!("string body at {offset} (+{len}) out of bounds"))?;
    if data[end] != 0 {
        bail!("string body at {offset} is missing its NUL terminator");
    }
    String::from_utf8(data[start..end].to_vec())
        .with_context(|| format!("string body at {offset} is not valid UTF-8"))
}

/// Read a vertex array body.
pub fn read_vertices(data: &[u8], offset: u32, count: u32) -> Result<Vec<Vertex>> {
    let mut cursor = cursor_at(data, offset, count as usize * VERTEX_RECORD_SIZE)
        .context("vertex array out of bounds")?;
    (0..count)
        .map(|_| {
            let mut values = [0.0f32; 8];
            for value in &mut values {
                *value = cursor.read_f32::<LittleEndian>()?;
            }
            Ok(Vertex {
                position: [values[0], values[1], values[2]],
                normal: [values[3], values[4], values[5]],
                uv: [values[6], values[7]],
            })
        })
        .collect()
}

/// Read a polygon array body, validating each record's corner count.
pub fn read_polygon_records(data: &[u8], offset: u32, count: u32) -> Result<Vec<PolygonRecord>> {
    let mut cursor = cursor_at(data, offset, count as usize * POLYGON_RECORD_SIZE)
        .context("polygon array out of bounds")?;
    (0..count)
        .map(|_| {
            let corner_count = cursor.read_u8()?;
            if corner_count != 3 && corner_count != 4 {
                bail!("polygon record has invalid corner count {corner_count}");
            }
            let mut indices = [0u32; 4];
            for index in &mut indices {
                *index = cursor.read_u32::<LittleEndian>()?;
            }
            Ok(PolygonRecord {
                corner_count,
                indices,
            })
        })
        .collect()
}

/// Parse a whole MAP file back into the in-memory scene model.
///
/// Mesh bounds are not stored in the file; they are recomputed with the
/// same zero-seeded fold the builder uses.
pub fn read_scene(data: &[u8]) -> Result<Scene> {
    let header = MapHeader::parse(data)?;
    let mut scene = Scene::default();

    let mesh_descriptors = MeshDescriptor::parse_array(data, header.mesh_offset, header.mesh_count)?;
    for descriptor in &mesh_descriptors {
        let name = read_string(data, descriptor.name_offset, descriptor.name_len)?;
        let vertices = read_vertices(data, descriptor.vertex_offset, descriptor.vertex_count)
            .with_context(|| format!("mesh `{name}`"))?;
        let records =
            read_polygon_records(data, descriptor.polygon_offset, descriptor.polygon_count)
                .with_context(|| format!("mesh `{name}`"))?;

        let mut bounds = Bounds::default();
        for vertex in &vertices {
            bounds.include(vertex.position);
        }
        let polygons = records
            .iter()
            .map(|record| {
                let indices = record.indices[..record.corner_count as usize].to_vec();
                for &index in &indices {
                    if index as usize >= vertices.len() {
                        bail!("mesh `{name}` polygon index {index} out of range");
                    }
                }
                Ok(Polygon { indices })
            })
            .collect::<Result<Vec<_>>>()?;

        scene.meshes.push(Mesh {
            name,
            vertices,
            polygons,
            bounds,
        });
    }

    let node_descriptors = NodeDescriptor::parse_array(data, header.node_offset, header.node_count)?;
    for descriptor in &node_descriptors {
        scene.nodes.push(Node {
            name: read_string(data, descriptor.name_offset, descriptor.name_len)?,
            parent_index: descriptor.parent_index,
            mesh_index: descriptor.mesh_index,
            matrix: descriptor.matrix,
        });
    }

    let texture_descriptors =
        TextureDescriptor::parse_array(data, header.texture_offset, header.texture_count)?;
    for descriptor in &texture_descriptors {
        scene.textures.push(Texture {
            name: read_string(data, descriptor.name_offset, descriptor.name_len)?,
            filename: read_string(data, descriptor.filename_offset, descriptor.filename_len)?,
        });
    }

    Ok(scene)
}

fn cursor_at(data: &[u8], offset: u32, len: usize) -> Option<Cursor<&[u8]>> {
    let start = offset as usize;
    let end = start.checked_add(len)?;
    if end > data.len() {
        return None;
    }
    let mut cursor = Cursor::new(data);
    cursor.set_position(offset as u64);
    Some(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_rejects_wrong_signature() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        let err = MapHeader::parse(&data).unwrap_err();
        assert!(err.to_string().contains("signature"));
    }

    #[test]
    fn header_rejects_truncated_input() {
        let data = MAP_SIGNATURE.to_le_bytes();
        assert!(MapHeader::parse(&data).is_err());
    }

    #[test]
    fn string_reader_checks_terminator_and_bounds() {
        let mut data = b"hello".to_vec();
        data.push(0);

        assert_eq!(read_string(&data, 0, 5).unwrap(), "hello");
        // Length pointing at a non-NUL byte.
        assert!(read_string(&data, 0, 3).is_err());
        // Body running past the end of the buffer.
        assert!(read_string(&data, 0, 6).is_err());
    }

    #[test]
    fn polygon_records_reject_bad_corner_counts() {
        let mut data = vec![5u8]; // corner count outside 3..=4
        data.extend_from_slice(&[0u8; 16]);
        assert!(read_polygon_records(&data, 0, 1).is_err());
    }

    #[test]
    fn record_sizes_match_their_layouts() {
        assert_eq!(HEADER_SIZE, 8 * 4);
        assert_eq!(MESH_DESCRIPTOR_SIZE, 6 * 4);
        assert_eq!(VERTEX_RECORD_SIZE, 8 * 4);
        assert_eq!(POLYGON_RECORD_SIZE, 1 + 4 * 4);
        assert_eq!(NODE_DESCRIPTOR_SIZE, 2 * 4 + 16 * 4 + 2 * 4);
        assert_eq!(TEXTURE_DESCRIPTOR_SIZE, 4 * 4);
    }
}
