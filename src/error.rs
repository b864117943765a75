//! Crate-wide error type unifying the container, schema, and engine layers.
use crate::opc::OpcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Container-level failure (corrupt ZIP, missing part, bad partname).
    #[error("package error: {0}")]
    Package(#[from] OpcError),

    /// An expected relationship or part of the Visio schema is missing.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The external translation service failed; carries its raw payload.
    #[error("translation service error: {message}")]
    Translation {
        message: String,
        kind: Option<String>,
        code: Option<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
