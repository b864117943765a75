//! Whole-document JSON dump.
//!
//! Unlike the translation Get pass, the dump applies no eligibility filter
//! and no memoization: every cell of every enabled section is carried. Pages
//! and shapes are recorded the moment the walk enters them; a row appears
//! with its first carried cell, so a row surfacing nothing stays out of the
//! dump. Shape text is dumped in its plain rendering, without field markers.
//!
//! Two sections come from outside the page walk: the master catalog (`ID`,
//! `Name`, `NameU`, `MasterType` attributes of the masters part) and the
//! document's core and extended properties.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::opc::Package;
use crate::opc::constants::relationship_type;
use crate::vsdx::model::{DocumentInfo, ensure_entry};
use crate::vsdx::schema;
use crate::vsdx::translate::{self, TranslateOptions};
use crate::vsdx::walker::{
    Eligibility, EnterKind, Scope, Site, SurfaceHandler, SurfaceKind, Surfaces, TextForm, WalkSpec,
    walk,
};
use crate::xml::{XmlDocument, XmlElement};

/// What the JSON export carries. Every flag defaults to off; page names are
/// always included.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonExportOptions {
    pub shape_text: bool,
    pub shape_fields: bool,
    pub property_rows: bool,
    pub user_rows: bool,
    /// Include the master catalog.
    pub masters: bool,
    /// Include the container's core and extended document properties.
    pub document_properties: bool,
    /// Restrict the dump to what the translation pass would collect: the
    /// letter filter applies, repeated strings appear once, property rows
    /// shrink to their value (or list format), and labels and prompts drop
    /// out.
    pub translatable_only: bool,
}

/// Serialize the container's content as a pretty-printed JSON diagram tree.
pub fn export_json(input: &[u8], options: &JsonExportOptions) -> Result<String> {
    let mut package = Package::open(input)?;
    let mut document = if options.translatable_only {
        translate::collect(&mut package, &translate_view(options))?
    } else {
        let mut document = DocumentInfo::default();
        let mut pass = ExportPass {
            document: &mut document,
        };
        walk(&mut package, &walk_spec(options), &mut pass)?;
        document
    };
    if options.masters {
        collect_masters(&package, &mut document)?;
    }
    if options.document_properties {
        collect_document_properties(&package, &mut document)?;
    }
    serde_json::to_string_pretty(&document).map_err(Error::from)
}

/// The translation view of the export flags: labels never ride along, page
/// names always do, and property rows narrow to their translatable cell.
fn translate_view(options: &JsonExportOptions) -> TranslateOptions {
    TranslateOptions {
        shape_text: options.shape_text,
        shape_fields: options.shape_fields,
        page_names: true,
        property_values: options.property_rows,
        property_labels: false,
        user_rows: options.user_rows,
    }
}

fn walk_spec(options: &JsonExportOptions) -> WalkSpec {
    WalkSpec {
        surfaces: Surfaces {
            shape_text: options.shape_text,
            shape_fields: options.shape_fields,
            property_values: false,
            property_labels: false,
            property_rows: options.property_rows,
            user_rows: options.user_rows,
            page_names: true,
            page_name_u: true,
        },
        eligibility: Eligibility::Any,
        fields_require_str_unit: true,
        text_form: TextForm::Plain,
        visit_page_sheets: true,
        visit_document_sheet: true,
        visit_master_shapes: false,
    }
}

struct ExportPass<'a> {
    document: &'a mut DocumentInfo,
}

impl SurfaceHandler for ExportPass<'_> {
    fn enter(&mut self, site: &Site<'_>, kind: EnterKind) {
        // Pages and shapes are structural and appear as soon as the walk
        // reaches them; rows materialize with their first carried cell.
        if !matches!(kind, EnterKind::Page | EnterKind::Shape) {
            return;
        }
        let document = &mut *self.document;
        match site.scope {
            Scope::Page { page_id } => {
                ensure_entry(&mut document.pages, page_id);
            }
            Scope::Shape { page_id, shape_id } => {
                let page = ensure_entry(&mut document.pages, page_id);
                ensure_entry(&mut page.shapes, shape_id);
            }
            Scope::Document | Scope::MasterShape { .. } => {}
        }
    }

    fn value(&mut self, site: &Site<'_>, kind: SurfaceKind, value: &str) -> Option<String> {
        if let Some(slot) = self.slot_mut(site, kind) {
            *slot = Some(value.to_string());
        }
        None
    }
}

impl ExportPass<'_> {
    fn slot_mut(&mut self, site: &Site<'_>, kind: SurfaceKind) -> Option<&mut Option<String>> {
        let document = &mut *self.document;
        match site.scope {
            Scope::Page { page_id } => {
                let page = ensure_entry(&mut document.pages, page_id);
                match kind {
                    SurfaceKind::PageName => Some(&mut page.name),
                    SurfaceKind::PageNameU => Some(&mut page.name_u),
                    SurfaceKind::PropertyValue => {
                        Some(&mut ensure_entry(&mut page.prop_rows, site.row_key?).value)
                    }
                    SurfaceKind::PropertyLabel => {
                        Some(&mut ensure_entry(&mut page.prop_rows, site.row_key?).label)
                    }
                    SurfaceKind::PropertyPrompt => {
                        Some(&mut ensure_entry(&mut page.prop_rows, site.row_key?).prompt)
                    }
                    SurfaceKind::PropertyType => {
                        Some(&mut ensure_entry(&mut page.prop_rows, site.row_key?).prop_type)
                    }
                    SurfaceKind::PropertyFormat => {
                        Some(&mut ensure_entry(&mut page.prop_rows, site.row_key?).format)
                    }
                    SurfaceKind::UserRowValue => {
                        Some(&mut ensure_entry(&mut page.user_rows, site.row_key?).value)
                    }
                    SurfaceKind::UserRowPrompt => {
                        Some(&mut ensure_entry(&mut page.user_rows, site.row_key?).prompt)
                    }
                    _ => None,
                }
            }
            Scope::Shape { page_id, shape_id } => {
                let page = ensure_entry(&mut document.pages, page_id);
                let shape = ensure_entry(&mut page.shapes, shape_id);
                match kind {
                    SurfaceKind::ShapeText => Some(&mut shape.text),
                    SurfaceKind::FieldValue => {
                        Some(&mut ensure_entry(&mut shape.field_rows, site.row_key?).value)
                    }
                    SurfaceKind::PropertyValue => {
                        Some(&mut ensure_entry(&mut shape.prop_rows, site.row_key?).value)
                    }
                    SurfaceKind::PropertyLabel => {
                        Some(&mut ensure_entry(&mut shape.prop_rows, site.row_key?).label)
                    }
                    SurfaceKind::PropertyPrompt => {
                        Some(&mut ensure_entry(&mut shape.prop_rows, site.row_key?).prompt)
                    }
                    SurfaceKind::PropertyType => {
                        Some(&mut ensure_entry(&mut shape.prop_rows, site.row_key?).prop_type)
                    }
                    SurfaceKind::PropertyFormat => {
                        Some(&mut ensure_entry(&mut shape.prop_rows, site.row_key?).format)
                    }
                    SurfaceKind::UserRowValue => {
                        Some(&mut ensure_entry(&mut shape.user_rows, site.row_key?).value)
                    }
                    SurfaceKind::UserRowPrompt => {
                        Some(&mut ensure_entry(&mut shape.user_rows, site.row_key?).prompt)
                    }
                    _ => None,
                }
            }
            Scope::Document => match kind {
                SurfaceKind::PropertyValue => {
                    Some(&mut ensure_entry(&mut document.prop_rows, site.row_key?).value)
                }
                SurfaceKind::PropertyLabel => {
                    Some(&mut ensure_entry(&mut document.prop_rows, site.row_key?).label)
                }
                SurfaceKind::PropertyPrompt => {
                    Some(&mut ensure_entry(&mut document.prop_rows, site.row_key?).prompt)
                }
                SurfaceKind::PropertyType => {
                    Some(&mut ensure_entry(&mut document.prop_rows, site.row_key?).prop_type)
                }
                SurfaceKind::PropertyFormat => {
                    Some(&mut ensure_entry(&mut document.prop_rows, site.row_key?).format)
                }
                SurfaceKind::UserRowValue => {
                    Some(&mut ensure_entry(&mut document.user_rows, site.row_key?).value)
                }
                SurfaceKind::UserRowPrompt => {
                    Some(&mut ensure_entry(&mut document.user_rows, site.row_key?).prompt)
                }
                _ => None,
            },
            Scope::MasterShape { .. } => None,
        }
    }
}

/// Record `MasterType`, `Name`, and `NameU` of every master, keyed by its
/// `ID`. A document without a masters part contributes nothing.
fn collect_masters(package: &Package, document: &mut DocumentInfo) -> Result<()> {
    let document_uri = schema::document_part_uri(package)?;
    let Some(masters_uri) = schema::masters_part_uri(package, &document_uri)? else {
        return Ok(());
    };
    let doc = XmlDocument::parse(package.part_bytes(&masters_uri)?)?;
    for master in doc.root().child_elements() {
        if master.local_name() != "Master" {
            continue;
        }
        let Some(id) = master.attr("ID") else { continue };
        let info = ensure_entry(&mut document.masters, id);
        info.master_type = master.attr("MasterType").map(str::to_string);
        info.name = master.attr("Name").map(str::to_string);
        info.name_u = master.attr("NameU").map(str::to_string);
    }
    Ok(())
}

/// Core and extended property parts feed the scalar fields of the tree.
/// Absent relationships leave the fields unset.
fn collect_document_properties(package: &Package, document: &mut DocumentInfo) -> Result<()> {
    if let Some(doc) = props_part(package, relationship_type::CORE_PROPERTIES)? {
        let root = doc.root();
        document.title = child_text(root, "title");
        document.subject = child_text(root, "subject");
        document.creator = child_text(root, "creator");
        document.keywords = child_text(root, "keywords");
        document.category = child_text(root, "category");
    }
    if let Some(doc) = props_part(package, relationship_type::EXTENDED_PROPERTIES)? {
        let root = doc.root();
        document.manager = child_text(root, "Manager");
        document.company = child_text(root, "Company");
    }
    Ok(())
}

fn props_part(package: &Package, reltype: &str) -> Result<Option<XmlDocument>> {
    let rels = package.package_rels()?;
    let Some(rel) = rels.by_type(reltype).next() else {
        return Ok(None);
    };
    let uri = rel.target_partname()?;
    Ok(Some(XmlDocument::parse(package.part_bytes(&uri)?)?))
}

fn child_text(root: &XmlElement, local_name: &str) -> Option<String> {
    root.first_child(local_name).map(|el| el.text())
}
