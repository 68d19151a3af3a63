use crate::builder::{Corner, SourceImage, SourceMesh, SourceObject, SourcePolygon, SourceScene};
use tempfile::TempDir;

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// A small but complete export input: two meshes, a three-level node
/// hierarchy, and a texture reference.
pub fn create_test_source() -> SourceScene {
    let corner = |position: [f32; 3], uv: [f32; 2]| Corner {
        position,
        normal: [0.0, 0.0, 1.0],
        uv,
    };
    let triangle = |a, b, c| SourcePolygon {
        corners: vec![corner(a, [0.0, 0.0]), corner(b, [1.0, 0.0]), corner(c, [0.0, 1.0])],
    };

    SourceScene {
        meshes: vec![
            SourceMesh {
                name: "floor".into(),
                polygons: vec![
                    triangle([0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 0.0]),
                    triangle([4.0, 0.0, 0.0], [4.0, 4.0, 0.0], [0.0, 4.0, 0.0]),
                ],
            },
            SourceMesh {
                name: "pillar".into(),
                polygons: vec![triangle([1.0, 1.0, 0.0], [1.0, 1.0, 3.0], [2.0, 1.0, 0.0])],
            },
        ],
        objects: vec![
            SourceObject {
                name: "root".into(),
                parent: None,
                mesh: Some("floor".into()),
                matrix: IDENTITY,
            },
            SourceObject {
                name: "pillar_a".into(),
                parent: Some("root".into()),
                mesh: Some("pillar".into()),
                matrix: IDENTITY,
            },
            SourceObject {
                name: "marker".into(),
                parent: Some("pillar_a".into()),
                mesh: None,
                matrix: IDENTITY,
            },
        ],
        images: vec![
            SourceImage {
                name: "stone".into(),
                filepath: "textures/stone.png".into(),
                render_output: false,
            },
            SourceImage {
                name: "Render Result".into(),
                filepath: String::new(),
                render_output: true,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_scene, BuildError};
    use crate::export::{export_scene, ExportError, ExportOptions, Exporter};
    use crate::format::read_scene;

    #[test]
    fn full_pipeline_round_trips_through_the_file_format() {
        let source = create_test_source();
        let options = ExportOptions::default();

        let built = build_scene(&source, &options).unwrap();
        let bytes = export_scene(&source, &options).unwrap();
        let parsed = read_scene(&bytes).unwrap();

        assert_eq!(parsed, built);
        // Spot-check the relationships survived serialization.
        assert_eq!(parsed.nodes[1].parent_index, 0);
        assert_eq!(parsed.nodes[1].mesh_index, 1);
        assert_eq!(parsed.nodes[2].parent_index, 1);
        assert_eq!(parsed.nodes[2].mesh_index, -1);
        assert_eq!(parsed.textures.len(), 1);
        assert_eq!(parsed.textures[0].filename, "stone.png");
    }

    #[test]
    fn normalized_export_round_trips_scaled_positions() {
        let corner = |position: [f32; 3]| Corner {
            position,
            normal: [0.0, 0.0, 1.0],
            uv: [0.0, 0.0],
        };
        // Non-zero extent on every axis so normalization is applicable.
        let source = SourceScene {
            meshes: vec![SourceMesh {
                name: "wedge".into(),
                polygons: vec![SourcePolygon {
                    corners: vec![
                        corner([1.0, 2.0, 4.0]),
                        corner([3.0, 6.0, 12.0]),
                        corner([2.0, 1.0, 1.0]),
                    ],
                }],
            }],
            ..Default::default()
        };
        let options = ExportOptions {
            normalize: true,
            ..Default::default()
        };
        let bytes = export_scene(&source, &options).unwrap();
        let parsed = read_scene(&bytes).unwrap();

        for mesh in &parsed.meshes {
            for vertex in &mesh.vertices {
                for value in vertex.position {
                    assert!(value.is_finite());
                    assert!(value.abs() <= 1.0, "position {value} not rescaled");
                }
            }
        }
    }

    #[test]
    fn export_to_file_commits_the_exact_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scene.map");
        let exporter = Exporter::new();

        let written = exporter
            .export_to_file(&create_test_source(), &path)
            .unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        let in_memory = exporter.export(&create_test_source()).unwrap();

        assert_eq!(written.size_bytes, on_disk.len() as u64);
        assert_eq!(on_disk, in_memory);
    }

    #[test]
    fn failed_export_leaves_no_file_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.map");

        let mut source = create_test_source();
        source.meshes[0].polygons[0].corners.push(Corner {
            position: [9.0, 9.0, 9.0],
            normal: [0.0, 0.0, 1.0],
            uv: [0.5, 0.5],
        });
        source.meshes[0].polygons[0].corners.push(Corner {
            position: [9.0, 0.0, 9.0],
            normal: [0.0, 0.0, 1.0],
            uv: [0.5, 0.0],
        });

        let result = Exporter::new().export_to_file(&source, &path);
        assert!(result.is_err());
        assert!(!path.exists());
        // Nothing else was committed into the directory either.
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn degenerate_mesh_aborts_the_whole_export() {
        let mut source = create_test_source();
        // "floor" is flat in z, so extent-normalization must refuse it.
        let options = ExportOptions {
            normalize: true,
            ..Default::default()
        };
        source.meshes.truncate(1);
        source.objects.truncate(1);

        let err = export_scene(&source, &options).unwrap_err();
        match err {
            ExportError::Build(BuildError::DegenerateBounds { mesh, axis }) => {
                assert_eq!(mesh, "floor");
                assert_eq!(axis, 'z');
            }
            other => panic!("expected degenerate-bounds failure, got {other:?}"),
        }
    }
}
