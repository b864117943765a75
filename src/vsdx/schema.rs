//! Typed lookups over the Visio package and XML schema.
//!
//! Every engine resolves the same relationship chain (package root to
//! document, document to pages, pages to each page, document to masters) and
//! the same element shapes (`Section` by `N`, `Row`, `Cell` by `N`). They are
//! centralized here so the engines cannot drift apart.
use crate::error::{Error, Result};
use crate::opc::constants::relationship_type;
use crate::opc::{PackURI, Package};
use crate::xml::XmlElement;

/// A relationship-addressed part: the relationship id that points at it plus
/// the resolved partname.
#[derive(Debug, Clone)]
pub struct PartRef {
    pub rel_id: String,
    pub uri: PackURI,
}

/// Resolve the document part from the package root.
pub fn document_part_uri(package: &Package) -> Result<PackURI> {
    let rels = package.package_rels()?;
    let rel = rels
        .by_type(relationship_type::VISIO_DOCUMENT)
        .next()
        .ok_or_else(|| {
            Error::SchemaNotFound("package root has no document relationship".to_string())
        })?;
    Ok(rel.target_partname()?)
}

/// Resolve the pages part from the document part.
pub fn pages_part_uri(package: &Package, document_uri: &PackURI) -> Result<PackURI> {
    let rels = package.rels(document_uri)?;
    let rel = rels
        .by_type(relationship_type::VISIO_PAGES)
        .next()
        .ok_or_else(|| {
            Error::SchemaNotFound(format!("{} has no pages relationship", document_uri))
        })?;
    Ok(rel.target_partname()?)
}

/// Resolve the masters part from the document part, if the document has one.
pub fn masters_part_uri(package: &Package, document_uri: &PackURI) -> Result<Option<PackURI>> {
    let rels = package.rels(document_uri)?;
    match rels.by_type(relationship_type::VISIO_MASTERS).next() {
        Some(rel) => Ok(Some(rel.target_partname()?)),
        None => Ok(None),
    }
}

/// The page parts referenced by the pages part, in relationship-file order.
pub fn page_refs(package: &Package, pages_uri: &PackURI) -> Result<Vec<PartRef>> {
    refs_of_type(package, pages_uri, relationship_type::VISIO_PAGE)
}

/// The master parts referenced by the masters part, in relationship-file order.
pub fn master_refs(package: &Package, masters_uri: &PackURI) -> Result<Vec<PartRef>> {
    refs_of_type(package, masters_uri, relationship_type::VISIO_MASTER)
}

fn refs_of_type(package: &Package, source: &PackURI, reltype: &str) -> Result<Vec<PartRef>> {
    let rels = package.rels(source)?;
    let mut refs = Vec::new();
    for rel in rels.by_type(reltype) {
        refs.push(PartRef {
            rel_id: rel.r_id().to_string(),
            uri: rel.target_partname()?,
        });
    }
    Ok(refs)
}

/// The `r:id` of an element's `Rel` child, used by `Page`, `Master`, and
/// `ForeignData` elements to point at their relationship.
pub fn rel_id(element: &XmlElement) -> Option<&str> {
    element.first_child("Rel").and_then(|rel| rel.attr("id"))
}

/// Find the `Page` (or `Master`) element whose `Rel` child carries the given
/// relationship id.
pub fn element_by_rel_id<'a>(parent: &'a XmlElement, r_id: &str) -> Option<&'a XmlElement> {
    parent
        .child_elements()
        .find(|el| rel_id(el) == Some(r_id))
}

pub fn element_by_rel_id_mut<'a>(
    parent: &'a mut XmlElement,
    r_id: &str,
) -> Option<&'a mut XmlElement> {
    parent
        .child_elements_mut()
        .find(|el| rel_id(el) == Some(r_id))
}

/// A shape's `Section` child with the given `N` attribute.
pub fn section<'a>(element: &'a XmlElement, n: &str) -> Option<&'a XmlElement> {
    element
        .child_elements()
        .find(|el| el.local_name() == "Section" && el.attr("N") == Some(n))
}

pub fn section_mut<'a>(element: &'a mut XmlElement, n: &str) -> Option<&'a mut XmlElement> {
    element
        .child_elements_mut()
        .find(|el| el.local_name() == "Section" && el.attr("N") == Some(n))
}

/// The `Row` children of a section.
pub fn rows(section: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    section
        .child_elements()
        .filter(|el| el.local_name() == "Row")
}

pub fn rows_mut(section: &mut XmlElement) -> impl Iterator<Item = &mut XmlElement> {
    section
        .child_elements_mut()
        .filter(|el| el.local_name() == "Row")
}

/// A row's `Cell` child with the given `N` attribute.
pub fn cell<'a>(row: &'a XmlElement, n: &str) -> Option<&'a XmlElement> {
    row.child_elements()
        .find(|el| el.local_name() == "Cell" && el.attr("N") == Some(n))
}

pub fn cell_mut<'a>(row: &'a mut XmlElement, n: &str) -> Option<&'a mut XmlElement> {
    row.child_elements_mut()
        .find(|el| el.local_name() == "Cell" && el.attr("N") == Some(n))
}

/// The stable identifying attribute of a row: `ID`, falling back to `N`,
/// falling back to `IX`.
///
/// Used as the map key in the diagram tree so a row read in one pass can be
/// re-matched in a later write pass even if row order changed.
pub fn row_key(row: &XmlElement) -> Option<&str> {
    row.attr("ID")
        .or_else(|| row.attr("N"))
        .or_else(|| row.attr("IX"))
}
