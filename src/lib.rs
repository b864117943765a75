//! Engines for manipulating Visio VSDX diagram files.
//!
//! VSDX files are OPC containers: ZIP archives of XML parts wired together
//! by typed relationships. This crate opens such containers and offers five
//! operations over them:
//!
//! - **Split** ([`split_pages`]): emit one self-contained `.vsdx` per
//!   foreground page, pulling in background-page chains and pruning media
//!   the kept pages no longer reference
//! - **Cipher** ([`cipher_document`]): anonymize textual content with
//!   readable pseudo-random substitutions that keep each string's shape
//! - **Translate** ([`translation_json`], [`apply_translation_json`],
//!   [`translate_document`]): extract translatable strings as JSON, have a
//!   [`Translator`] produce the target-language version, and write it back
//! - **JSON export** ([`export_json`]): read-only structured dump of pages,
//!   shapes, rows, masters, and document properties
//! - **Media extraction** ([`extract_media`]): pull embedded images into a
//!   ZIP keyed by page and shape
//!
//! Every operation takes the container bytes and returns fresh bytes or
//! JSON; the input is never modified, and parts an operation does not touch
//! are carried through byte-for-byte.
//!
//! # Example: split a drawing into per-page files
//!
//! ```no_run
//! use vsdxtools::split_pages;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = std::fs::read("drawing.vsdx")?;
//! std::fs::write("pages.zip", split_pages(&input)?)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: anonymize shape text and page names
//!
//! ```no_run
//! use vsdxtools::{CipherOptions, cipher_document};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = std::fs::read("drawing.vsdx")?;
//! let options = CipherOptions {
//!     shape_text: true,
//!     page_names: true,
//!     ..CipherOptions::default()
//! };
//! std::fs::write("anonymized.vsdx", cipher_document(&input, &options)?)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod opc;
pub mod vsdx;
pub mod xml;

pub use error::{Error, Result};
pub use vsdx::cipher::{CipherOptions, cipher_document};
pub use vsdx::export::{JsonExportOptions, export_json};
pub use vsdx::media::extract_media;
pub use vsdx::model::DocumentInfo;
pub use vsdx::split::split_pages;
pub use vsdx::translate::{
    ServiceError, ServiceErrorPayload, TranslateOptions, Translator, apply_translation_json,
    translate_document, translation_json,
};
