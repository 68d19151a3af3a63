//! Serialization of built scenes into MAP byte buffers and files.

mod export;

pub use export::{
    export_scene, write_scene, ExportError, ExportOptions, ExportedFile, Exporter,
};
