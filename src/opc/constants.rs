//! Constant values related to the Open Packaging Convention as used by VSDX files.
//!
//! This module contains content type URIs (like MIME-types) that specify a part's format,
//! XML namespaces, and relationship types. Visio rejects containers whose relationship
//! types or namespaces deviate from these strings, so they are reproduced verbatim.

/// Content type URIs (like MIME-types) that specify a part's format
pub mod content_type {
    // Image content types
    pub const GIF: &str = "image/gif";
    pub const JPEG: &str = "image/jpeg";
    pub const PNG: &str = "image/png";
    pub const X_EMF: &str = "image/x-emf";

    // OPC core content types
    pub const OPC_CORE_PROPERTIES: &str =
        "application/vnd.openxmlformats-package.core-properties+xml";
    pub const OPC_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

    // Office common content types
    pub const OFC_EXTENDED_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.extended-properties+xml";

    // Visio drawing content types
    pub const VSD_DOCUMENT_MAIN: &str = "application/vnd.ms-visio.drawing.main+xml";
    pub const VSD_MASTER: &str = "application/vnd.ms-visio.master+xml";
    pub const VSD_MASTERS: &str = "application/vnd.ms-visio.masters+xml";
    pub const VSD_PAGE: &str = "application/vnd.ms-visio.page+xml";
    pub const VSD_PAGES: &str = "application/vnd.ms-visio.pages+xml";

    pub const XML: &str = "application/xml";
}

/// XML namespace URIs
pub mod namespace {
    /// Dublin Core elements used inside the core-properties part
    pub const DUBLIN_CORE: &str = "http://purl.org/dc/elements/1.1/";
    /// Relationship-id attributes (the `r:` prefix on `Rel` elements)
    pub const OFC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    /// Extended document properties (`Manager`, `Company`)
    pub const OFC_EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
    /// Core document properties (`cp:coreProperties`)
    pub const OPC_CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";
    pub const OPC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";
    /// The Visio drawing schema all page/master/document parts live in
    pub const VISIO_MAIN: &str = "http://schemas.microsoft.com/office/visio/2012/main";
}

/// Valid values for the TargetMode attribute in Relationship elements
pub mod target_mode {
    pub const EXTERNAL: &str = "External";
    pub const INTERNAL: &str = "Internal";
}

/// Relationship type URIs
pub mod relationship_type {
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const OLE_OBJECT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/oleObject";

    // Visio relationship chain: package root -> document -> pages -> page,
    // and document -> masters -> master
    pub const VISIO_DOCUMENT: &str =
        "http://schemas.microsoft.com/visio/2010/relationships/document";
    pub const VISIO_MASTER: &str = "http://schemas.microsoft.com/visio/2010/relationships/master";
    pub const VISIO_MASTERS: &str = "http://schemas.microsoft.com/visio/2010/relationships/masters";
    pub const VISIO_PAGE: &str = "http://schemas.microsoft.com/visio/2010/relationships/page";
    pub const VISIO_PAGES: &str = "http://schemas.microsoft.com/visio/2010/relationships/pages";
}
