//! Two-phase translation protocol over the shared schema walk.
//!
//! **Get** walks the container read-only and collects every distinct
//! translatable string into a diagram tree, keyed by page, shape, and row.
//! Each semantic class of string (running text, page names, property labels,
//! list formats, user row prompts) has its own memo table, so a value
//! repeated across shapes appears in the JSON exactly once, at the site that
//! saw it first.
//!
//! **Set** takes the caller-translated JSON back, walks the container
//! read-write, and replaces each surface with the tree value for its row.
//! The memo table is keyed by the original XML value, so all occurrences of
//! one source string receive the replacement resolved at the first site that
//! carried it. A surface whose row is absent from the tree is left untouched.
//!
//! Feeding an unmodified Get document straight into Set rewrites nothing:
//! every replacement equals the value already in place.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::opc::Package;
use crate::vsdx::model::{DocumentInfo, ensure_entry, entry_of};
use crate::vsdx::walker::{
    Eligibility, EnterKind, Scope, Site, SurfaceHandler, SurfaceKind, Surfaces, TextForm,
    WalkSpec, walk,
};

/// Which surfaces take part in the translation round trip. Every flag
/// defaults to off.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslateOptions {
    pub shape_text: bool,
    pub shape_fields: bool,
    pub page_names: bool,
    pub property_values: bool,
    pub property_labels: bool,
    pub user_rows: bool,
}

/// External translation capability consumed by [`translate_document`].
///
/// Implementations must return a JSON document of the same shape as the
/// input with leaf string values replaced by their translations; `{Tag0}`
/// style markers inside shape text must be left intact.
pub trait Translator {
    fn translate(&mut self, document_json: &str, target_language: &str) -> Result<String>;
}

/// Error body of a failed translator call: `{"error":{"message":...,
/// "type":...,"code":...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceErrorPayload {
    #[serde(default)]
    pub error: ServiceError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ServiceErrorPayload {
    /// Convert a raw response body into [`Error::Translation`]. A body that
    /// is not the structured payload becomes the message verbatim.
    pub fn into_error(raw: &str) -> Error {
        match serde_json::from_str::<ServiceErrorPayload>(raw) {
            Ok(payload) => Error::Translation {
                message: payload.error.message.unwrap_or_else(|| raw.to_string()),
                kind: payload.error.kind,
                code: payload.error.code,
            },
            Err(_) => Error::Translation {
                message: raw.to_string(),
                kind: None,
                code: None,
            },
        }
    }
}

/// Collect every translatable string of the container into a pretty-printed
/// JSON diagram tree.
pub fn translation_json(input: &[u8], options: &TranslateOptions) -> Result<String> {
    let mut package = Package::open(input)?;
    let document = collect(&mut package, options)?;
    serde_json::to_string_pretty(&document).map_err(Error::from)
}

/// The Get pass over an already-open package. Also backs the export engine's
/// translatable-only mode.
pub(crate) fn collect(package: &mut Package, options: &TranslateOptions) -> Result<DocumentInfo> {
    let mut document = DocumentInfo::default();
    let mut pass = GetPass {
        document: &mut document,
        seen: MemoTables::default(),
    };
    walk(package, &walk_spec(options), &mut pass)?;
    Ok(document)
}

/// Write a (translated) diagram tree back into the container and return the
/// rebuilt bytes.
pub fn apply_translation_json(
    input: &[u8],
    options: &TranslateOptions,
    json: &str,
) -> Result<Vec<u8>> {
    let document: DocumentInfo = serde_json::from_str(json)?;
    let mut package = Package::open(input)?;
    let mut pass = SetPass {
        document: &document,
        memo: MemoTables::default(),
    };
    walk(&mut package, &walk_spec(options), &mut pass)?;
    package.save().map_err(Error::from)
}

/// Full round trip: collect, hand the JSON to the translator, apply the
/// result. A translator failure propagates; the container is never partially
/// rewritten from a failed translation.
pub fn translate_document(
    input: &[u8],
    options: &TranslateOptions,
    target_language: &str,
    translator: &mut dyn Translator,
) -> Result<Vec<u8>> {
    let json = translation_json(input, options)?;
    let translated = translator.translate(&json, target_language)?;
    apply_translation_json(input, options, &translated)
}

fn walk_spec(options: &TranslateOptions) -> WalkSpec {
    WalkSpec {
        surfaces: Surfaces {
            shape_text: options.shape_text,
            shape_fields: options.shape_fields,
            property_values: options.property_values,
            property_labels: options.property_labels,
            property_rows: false,
            user_rows: options.user_rows,
            page_names: options.page_names,
            page_name_u: false,
        },
        eligibility: Eligibility::LettersOnly,
        fields_require_str_unit: true,
        text_form: TextForm::Formatted,
        visit_page_sheets: true,
        visit_document_sheet: true,
        visit_master_shapes: false,
    }
}

/// Semantic class of a surfaced string; each class memoizes independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoClass {
    /// Shape text, field values, property values, and user row values all
    /// share one table: they are the same kind of running text.
    Text,
    PageNames,
    PropertyLabels,
    PropertyFormats,
    UserRowPrompts,
}

fn memo_class(kind: SurfaceKind) -> Option<MemoClass> {
    match kind {
        SurfaceKind::ShapeText
        | SurfaceKind::FieldValue
        | SurfaceKind::PropertyValue
        | SurfaceKind::UserRowValue => Some(MemoClass::Text),
        SurfaceKind::PageName | SurfaceKind::PageNameU => Some(MemoClass::PageNames),
        SurfaceKind::PropertyLabel => Some(MemoClass::PropertyLabels),
        SurfaceKind::PropertyFormat => Some(MemoClass::PropertyFormats),
        SurfaceKind::UserRowPrompt => Some(MemoClass::UserRowPrompts),
        SurfaceKind::PropertyPrompt | SurfaceKind::PropertyType => None,
    }
}

#[derive(Debug, Default)]
struct MemoTables<T> {
    text: T,
    page_names: T,
    property_labels: T,
    property_formats: T,
    user_row_prompts: T,
}

impl<T> MemoTables<T> {
    fn class_mut(&mut self, class: MemoClass) -> &mut T {
        match class {
            MemoClass::Text => &mut self.text,
            MemoClass::PageNames => &mut self.page_names,
            MemoClass::PropertyLabels => &mut self.property_labels,
            MemoClass::PropertyFormats => &mut self.property_formats,
            MemoClass::UserRowPrompts => &mut self.user_row_prompts,
        }
    }
}

struct GetPass<'a> {
    document: &'a mut DocumentInfo,
    seen: MemoTables<HashSet<String>>,
}

impl SurfaceHandler for GetPass<'_> {
    fn enter(&mut self, site: &Site<'_>, kind: EnterKind) {
        // Every page appears in the tree, even one without a single
        // translatable surface; shapes and rows are created on demand.
        if kind == EnterKind::Page
            && let Scope::Page { page_id } = site.scope
        {
            ensure_entry(&mut self.document.pages, page_id);
        }
    }

    fn value(&mut self, site: &Site<'_>, kind: SurfaceKind, value: &str) -> Option<String> {
        let Some(class) = memo_class(kind) else {
            return None;
        };
        if !self.seen.class_mut(class).insert(value.to_string()) {
            return None;
        }
        if let Some(slot) = self.slot_mut(site, kind) {
            *slot = Some(value.to_string());
        }
        None
    }
}

impl GetPass<'_> {
    /// The tree field this surface feeds, created on demand. A row without a
    /// stable key has no addressable slot.
    fn slot_mut(&mut self, site: &Site<'_>, kind: SurfaceKind) -> Option<&mut Option<String>> {
        let document = &mut *self.document;
        match site.scope {
            Scope::Page { page_id } => {
                let page = ensure_entry(&mut document.pages, page_id);
                match kind {
                    SurfaceKind::PageName => Some(&mut page.name),
                    SurfaceKind::PropertyValue => {
                        Some(&mut ensure_entry(&mut page.prop_rows, site.row_key?).value)
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
                    SurfaceKind::PropertyFormat => {
                        Some(&mut ensure_entry(&mut shape.prop_rows, site.row_key?).format)
                    }
                    SurfaceKind::PropertyLabel => {
                        Some(&mut ensure_entry(&mut shape.prop_rows, site.row_key?).label)
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
                SurfaceKind::PropertyFormat => {
                    Some(&mut ensure_entry(&mut document.prop_rows, site.row_key?).format)
                }
                SurfaceKind::PropertyLabel => {
                    Some(&mut ensure_entry(&mut document.prop_rows, site.row_key?).label)
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

struct SetPass<'a> {
    document: &'a DocumentInfo,
    memo: MemoTables<HashMap<String, String>>,
}

impl SurfaceHandler for SetPass<'_> {
    fn value(&mut self, site: &Site<'_>, kind: SurfaceKind, value: &str) -> Option<String> {
        let class = memo_class(kind)?;
        let cached = self.memo.class_mut(class).get(value).cloned();
        let replacement = match cached {
            Some(replacement) => replacement,
            None => {
                let tree = self.tree_value(site, kind)?.to_string();
                self.memo
                    .class_mut(class)
                    .insert(value.to_string(), tree.clone());
                tree
            }
        };

        // List formats pair items positionally; a translation that changed
        // the item count cannot be applied.
        if kind == SurfaceKind::PropertyFormat
            && replacement.split(';').count() != value.split(';').count()
        {
            warn!(
                row = ?site.row_key,
                "translated list format changed its item count, keeping the original"
            );
            return None;
        }
        Some(replacement)
    }
}

impl SetPass<'_> {
    fn tree_value(&self, site: &Site<'_>, kind: SurfaceKind) -> Option<&str> {
        match site.scope {
            Scope::Page { page_id } => {
                let page = entry_of(&self.document.pages, page_id)?;
                match kind {
                    SurfaceKind::PageName => page.name.as_deref(),
                    SurfaceKind::PropertyValue => {
                        entry_of(&page.prop_rows, site.row_key?)?.value.as_deref()
                    }
                    SurfaceKind::PropertyFormat => {
                        entry_of(&page.prop_rows, site.row_key?)?.format.as_deref()
                    }
                    SurfaceKind::UserRowValue => {
                        entry_of(&page.user_rows, site.row_key?)?.value.as_deref()
                    }
                    SurfaceKind::UserRowPrompt => {
                        entry_of(&page.user_rows, site.row_key?)?.prompt.as_deref()
                    }
                    _ => None,
                }
            }
            Scope::Shape { page_id, shape_id } => {
                let page = entry_of(&self.document.pages, page_id)?;
                let shape = entry_of(&page.shapes, shape_id)?;
                match kind {
                    SurfaceKind::ShapeText => shape.text.as_deref(),
                    SurfaceKind::FieldValue => {
                        entry_of(&shape.field_rows, site.row_key?)?.value.as_deref()
                    }
                    SurfaceKind::PropertyValue => {
                        entry_of(&shape.prop_rows, site.row_key?)?.value.as_deref()
                    }
                    SurfaceKind::PropertyFormat => {
                        entry_of(&shape.prop_rows, site.row_key?)?.format.as_deref()
                    }
                    SurfaceKind::PropertyLabel => {
                        entry_of(&shape.prop_rows, site.row_key?)?.label.as_deref()
                    }
                    SurfaceKind::UserRowValue => {
                        entry_of(&shape.user_rows, site.row_key?)?.value.as_deref()
                    }
                    SurfaceKind::UserRowPrompt => {
                        entry_of(&shape.user_rows, site.row_key?)?.prompt.as_deref()
                    }
                    _ => None,
                }
            }
            Scope::Document => match kind {
                SurfaceKind::PropertyValue => entry_of(&self.document.prop_rows, site.row_key?)?
                    .value
                    .as_deref(),
                SurfaceKind::PropertyFormat => entry_of(&self.document.prop_rows, site.row_key?)?
                    .format
                    .as_deref(),
                SurfaceKind::PropertyLabel => entry_of(&self.document.prop_rows, site.row_key?)?
                    .label
                    .as_deref(),
                SurfaceKind::UserRowValue => entry_of(&self.document.user_rows, site.row_key?)?
                    .value
                    .as_deref(),
                SurfaceKind::UserRowPrompt => entry_of(&self.document.user_rows, site.row_key?)?
                    .prompt
                    .as_deref(),
                _ => None,
            },
            Scope::MasterShape { .. } => None,
        }
    }
}
