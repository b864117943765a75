//! Open Packaging Conventions (OPC) container layer.
//!
//! VSDX files are OPC packages: ZIP archives of parts wired together by typed
//! relationships. This module provides the container model the engines build
//! on:
//!
//! - Partname handling and relative-reference resolution ([`PackURI`])
//! - Relationship collections parsed from and serialized to `.rels` parts
//! - The [`Package`] itself: ordered entries, lazy relationship access,
//!   part/relationship deletion, and order-preserving save

pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod rel;

// Re-export commonly used types
pub use error::OpcError;
pub use package::Package;
pub use packuri::PackURI;
pub use rel::{Relationship, Relationships};
