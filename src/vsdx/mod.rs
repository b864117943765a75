//! The Visio document engines.
//!
//! Each engine is a value transformation over an opened [`Package`]: bytes
//! in, bytes (or JSON) out, never touching the caller's input. The cipher,
//! translate, and export engines are thin [`SurfaceHandler`] implementations
//! over the shared [`walker`]; split and media extraction navigate the
//! relationship chain themselves because they reshape the container rather
//! than its text.
//!
//! [`Package`]: crate::opc::Package
//! [`SurfaceHandler`]: walker::SurfaceHandler

pub mod cipher;
pub mod export;
pub mod media;
pub mod model;
pub mod schema;
pub mod scramble;
pub mod split;
pub mod text;
pub mod translate;
pub mod walker;

pub use cipher::{CipherOptions, cipher_document};
pub use export::{JsonExportOptions, export_json};
pub use media::extract_media;
pub use model::{
    DocumentInfo, FieldInfo, MasterInfo, PageInfo, PropertyInfo, ShapeInfo, UserRowInfo,
};
pub use split::split_pages;
pub use translate::{
    ServiceError, ServiceErrorPayload, TranslateOptions, Translator, apply_translation_json,
    translate_document, translation_json,
};
