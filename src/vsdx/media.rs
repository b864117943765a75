//! Pulls embedded images out of a document into a flat ZIP.
//!
//! A shape embedding an object carries `Type="Foreign"` and a `ForeignData`
//! child whose `Rel` names an image relationship of the page part. Entry
//! names encode the provenance, `pageid_<page>_shapeid_<shape>_<file>`, so an
//! image part referenced from several shapes comes out once per reference.
use std::io::{Cursor, Write};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::opc::Package;
use crate::opc::constants::relationship_type;
use crate::vsdx::schema;
use crate::xml::XmlDocument;

/// Extract every page's embedded images into a ZIP keyed by page and shape.
pub fn extract_media(input: &[u8]) -> Result<Vec<u8>> {
    let package = Package::open(input)?;
    let document_uri = schema::document_part_uri(&package)?;
    let pages_uri = schema::pages_part_uri(&package, &document_uri)?;
    let pages_doc = XmlDocument::parse(package.part_bytes(&pages_uri)?)?;

    let mut output = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut output));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for page_ref in schema::page_refs(&package, &pages_uri)? {
            let Some(page_el) = schema::element_by_rel_id(pages_doc.root(), &page_ref.rel_id)
            else {
                debug!(
                    "pages part has no element for relationship {}",
                    page_ref.rel_id
                );
                continue;
            };
            let Some(page_id) = page_el.attr("ID") else {
                debug!("page for relationship {} has no ID", page_ref.rel_id);
                continue;
            };
            if !package.contains_part(&page_ref.uri) {
                return Err(Error::SchemaNotFound(format!(
                    "page part {} is missing from the container",
                    page_ref.uri
                )));
            }

            let page_doc = XmlDocument::parse(package.part_bytes(&page_ref.uri)?)?;
            let page_rels = package.rels(&page_ref.uri)?;

            for shape in page_doc.root().descendants("Shape") {
                if shape.attr("Type") != Some("Foreign") {
                    continue;
                }
                let Some(shape_id) = shape.attr("ID") else {
                    debug!(page = %page_id, "foreign shape has no ID");
                    continue;
                };
                let Some(rel_id) = shape.first_child("ForeignData").and_then(schema::rel_id)
                else {
                    debug!(
                        page = %page_id,
                        shape = %shape_id,
                        "foreign shape has no data relationship"
                    );
                    continue;
                };
                let image_uri = match page_rels.get(rel_id) {
                    Some(rel) if rel.reltype() == relationship_type::IMAGE => {
                        rel.target_partname()?
                    }
                    Some(rel) => {
                        warn!(
                            page = %page_id,
                            shape = %shape_id,
                            "relationship {} is {}, not an image, skipping",
                            rel_id,
                            rel.reltype()
                        );
                        continue;
                    }
                    None => {
                        warn!(
                            page = %page_id,
                            shape = %shape_id,
                            "page part has no relationship {}, skipping",
                            rel_id
                        );
                        continue;
                    }
                };
                let Ok(bytes) = package.part_bytes(&image_uri) else {
                    warn!(
                        page = %page_id,
                        shape = %shape_id,
                        "image part {} is missing, skipping",
                        image_uri
                    );
                    continue;
                };

                zip.start_file(
                    format!(
                        "pageid_{}_shapeid_{}_{}",
                        page_id,
                        shape_id,
                        image_uri.filename()
                    ),
                    options,
                )?;
                zip.write_all(bytes)?;
            }
        }

        zip.finish()?;
    }
    Ok(output)
}
