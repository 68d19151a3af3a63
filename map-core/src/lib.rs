//! # map-core
//!
//! Core engine for exporting authored 3D scenes into the MAP runtime
//! format.
//!
//! The crate turns raw per-corner scene data from an authoring tool into a
//! compact, self-contained binary file:
//!
//! - **Vertex deduplication** collapses shared polygon corners into an
//!   indexed vertex representation with deterministic identity
//! - **Scene model building** applies axis conversion, bounds tracking,
//!   and optional extent normalization, producing an immutable scene graph
//! - **Patchable serialization** lays the graph out into one linear buffer
//!   with a reserve-then-backpatch protocol, so every offset and length
//!   field is internally consistent and relocation-free
//!
//! The pipeline is a pure function from scene input and options to a byte
//! buffer; there is no process-wide state, and each export run owns its
//! own model and buffer.
//!
//! ## Quick Start
//!
//! ```rust
//! use map_core::{export_scene, Corner, ExportOptions, SourceMesh, SourcePolygon, SourceScene};
//!
//! let triangle = SourcePolygon {
//!     corners: vec![
//!         Corner { position: [0.0, 0.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 0.0] },
//!         Corner { position: [1.0, 0.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [1.0, 0.0] },
//!         Corner { position: [0.0, 1.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 1.0] },
//!     ],
//! };
//! let source = SourceScene {
//!     meshes: vec![SourceMesh { name: "tri".into(), polygons: vec![triangle] }],
//!     ..Default::default()
//! };
//!
//! let bytes = export_scene(&source, &ExportOptions::default())?;
//! assert_eq!(&bytes[0..4], b"MAP\0");
//! # Ok::<(), map_core::ExportError>(())
//! ```

pub mod buffer;
pub mod builder;
pub mod convert;
pub mod dedup;
pub mod export;
pub mod format;
pub mod scene;

#[cfg(test)]
pub mod test_integration;

// Re-export commonly used types
pub use buffer::{PatchBuffer, PatchError};
pub use builder::{
    build_scene, BuildError, Corner, SourceImage, SourceMesh, SourceObject, SourcePolygon,
    SourceScene,
};
pub use convert::to_target_axes;
pub use dedup::VertexIndex;
pub use export::{export_scene, write_scene, ExportError, ExportOptions, ExportedFile, Exporter};
pub use format::{read_scene, MapHeader, FLAG_NORMALIZED, FLAG_TRIANGULATED, MAP_SIGNATURE};
pub use scene::{Bounds, Mesh, Node, Polygon, Scene, Texture, Vertex};

use anyhow::Result;
use tracing::info;

/// Version information for the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core library with structured logging
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("map_core=info")
        .with_target(false)
        .try_init();

    info!("initializing map-export core v{}", VERSION);
    Ok(())
}
