//! Splits a multi-page document into one self-contained container per
//! foreground page.
//!
//! A page may name another page as its background, and backgrounds can chain.
//! The sub-package for a page must carry the page itself plus the transitive
//! closure of its background chain, so backgrounds are duplicated into every
//! sub-package that reaches them rather than shared. Media parts referenced
//! only by removed pages are pruned; media referenced by masters survives
//! unconditionally because masters are never removed.
use std::collections::{HashSet, VecDeque};
use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::opc::constants::relationship_type;
use crate::opc::{PackURI, Package};
use crate::vsdx::schema;
use crate::xml::{XmlDocument, XmlElement};

/// One page of the source document, as read from the pages part.
#[derive(Debug, Clone)]
pub(crate) struct PageRecord {
    pub id: String,
    pub name: String,
    pub is_background: bool,
    pub back_page_id: Option<String>,
    /// Image and OLE-object parts referenced by this page's own shapes.
    pub used_media: HashSet<PackURI>,
}

/// Split a container into a ZIP holding `<page name>.vsdx` entries, one per
/// foreground page.
pub fn split_pages(input: &[u8]) -> Result<Vec<u8>> {
    let package = Package::open(input)?;
    let (records, masters_media) = collect_page_records(&package)?;

    let mut output = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut output));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for record in records.iter().filter(|r| !r.is_background) {
            let keep = related_pages(&record.id, &records);
            debug!(page = %record.id, kept = keep.len(), "emitting sub-package");
            let sub_package = remove_pages_except(input, &keep, &records, &masters_media)?;

            zip.start_file(format!("{}.vsdx", safe_file_name(&record.name)), options)?;
            zip.write_all(&sub_package)?;
        }

        zip.finish()?;
    }
    Ok(output)
}

/// Read every page's record plus the set of media parts used by masters.
fn collect_page_records(package: &Package) -> Result<(Vec<PageRecord>, HashSet<PackURI>)> {
    let document_uri = schema::document_part_uri(package)?;
    let pages_uri = schema::pages_part_uri(package, &document_uri)?;
    let pages_doc = XmlDocument::parse(package.part_bytes(&pages_uri)?)?;

    let mut records = Vec::new();
    for page_ref in schema::page_refs(package, &pages_uri)? {
        let Some(page_el) = schema::element_by_rel_id(pages_doc.root(), &page_ref.rel_id) else {
            debug!("pages part has no element for relationship {}", page_ref.rel_id);
            continue;
        };
        let Some(id) = page_el.attr("ID").map(str::to_string) else {
            debug!("page for relationship {} has no ID", page_ref.rel_id);
            continue;
        };
        if !package.contains_part(&page_ref.uri) {
            return Err(Error::SchemaNotFound(format!(
                "page part {} is missing from the container",
                page_ref.uri
            )));
        }

        records.push(PageRecord {
            id,
            name: page_el.attr("Name").unwrap_or_default().to_string(),
            is_background: page_el.attr("Background") == Some("1"),
            back_page_id: page_el
                .attr("BackPage")
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            used_media: media_of_part(
                package,
                &page_ref.uri,
                &[relationship_type::IMAGE, relationship_type::OLE_OBJECT],
            )?,
        });
    }

    let masters_media = collect_masters_media(package, &document_uri)?;
    Ok((records, masters_media))
}

/// Media parts referenced by any master. Only images; masters do not embed
/// OLE objects.
fn collect_masters_media(package: &Package, document_uri: &PackURI) -> Result<HashSet<PackURI>> {
    let mut media = HashSet::new();
    if let Some(masters_uri) = schema::masters_part_uri(package, document_uri)? {
        for master_ref in schema::master_refs(package, &masters_uri)? {
            media.extend(media_of_part(
                package,
                &master_ref.uri,
                &[relationship_type::IMAGE],
            )?);
        }
    }
    Ok(media)
}

fn media_of_part(
    package: &Package,
    part_uri: &PackURI,
    reltypes: &[&str],
) -> Result<HashSet<PackURI>> {
    let rels = package.rels(part_uri)?;
    let mut media = HashSet::new();
    for reltype in reltypes {
        for rel in rels.by_type(reltype) {
            media.insert(rel.target_partname()?);
        }
    }
    Ok(media)
}

/// Reflexive-transitive closure over background-page links, starting at
/// `start`. Cycle-safe: a page already collected is not followed again.
pub(crate) fn related_pages(start: &str, records: &[PageRecord]) -> HashSet<String> {
    let mut related = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start.to_string());

    while let Some(id) = queue.pop_front() {
        let Some(record) = records.iter().find(|r| r.id == id) else {
            continue;
        };
        if !related.insert(id) {
            continue;
        }
        if let Some(back) = &record.back_page_id {
            queue.push_back(back.clone());
        }
    }

    related
}

/// Clone the input container, keeping only the pages in `keep` and pruning
/// media used exclusively by the removed pages.
fn remove_pages_except(
    input: &[u8],
    keep: &HashSet<String>,
    records: &[PageRecord],
    masters_media: &HashSet<PackURI>,
) -> Result<Vec<u8>> {
    let mut package = Package::open(input)?;
    let document_uri = schema::document_part_uri(&package)?;
    let pages_uri = schema::pages_part_uri(&package, &document_uri)?;
    let page_refs = schema::page_refs(&package, &pages_uri)?;
    let mut pages_doc = XmlDocument::parse(package.part_bytes(&pages_uri)?)?;

    // Last-to-first keeps earlier relationship entries stable while later
    // ones are removed.
    let mut media_to_remove: HashSet<PackURI> = HashSet::new();
    for page_ref in page_refs.iter().rev() {
        let Some(page_el) = schema::element_by_rel_id(pages_doc.root(), &page_ref.rel_id) else {
            continue;
        };
        let Some(page_id) = page_el.attr("ID").map(str::to_string) else {
            continue;
        };
        if keep.contains(&page_id) {
            continue;
        }

        remove_page_element(pages_doc.root_mut(), &page_ref.rel_id);
        package.delete_part(&page_ref.uri);
        package.delete_relationship(&pages_uri, &page_ref.rel_id)?;
        if let Some(record) = records.iter().find(|r| r.id == page_id) {
            media_to_remove.extend(record.used_media.iter().cloned());
        }
    }

    let mut media_to_keep: HashSet<&PackURI> = masters_media.iter().collect();
    for record in records.iter().filter(|r| keep.contains(&r.id)) {
        media_to_keep.extend(record.used_media.iter());
    }
    for media_uri in &media_to_remove {
        if !media_to_keep.contains(media_uri) {
            package.delete_part(media_uri);
        }
    }

    package.set_part_bytes(&pages_uri, pages_doc.to_bytes()?);
    package.save().map_err(Error::from)
}

fn remove_page_element(pages_root: &mut XmlElement, rel_id: &str) {
    pages_root.retain_child_elements(|el| {
        !(el.local_name() == "Page" && schema::rel_id(el) == Some(rel_id))
    });
}

/// Replace characters that cannot appear in a filename with underscores.
pub(crate) fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '<' | '>' | '|' | ':' | '*' | '?' | '\\' | '/' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        })
        .collect()
}
