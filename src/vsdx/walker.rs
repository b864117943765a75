//! Shared schema walk over the pages, shapes, masters, and document sheet of
//! a container.
//!
//! The cipher, translate, and export engines all traverse the same surfaces
//! in the same order; they differ only in which surfaces are enabled and in
//! what happens to each surfaced value. A [`WalkSpec`] selects the surfaces,
//! a [`SurfaceHandler`] maps values, and the walker owns everything else:
//! chasing the relationship chain, locating sections, rows, and cells, and
//! rewriting exactly those parts in which a handler changed something. Parts
//! where every handler call returned `None` (or the unchanged value) keep
//! their original bytes.
//!
//! Walk order is fixed: for each page in relationship order, the page's name
//! attributes, then its `PageSheet`, then every `Shape` under `PageContents`
//! in document order (groups before their children); then master shapes, if
//! enabled; then the `DocumentSheet`. Within a shape: text, fields, property
//! rows, user rows.
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::opc::{PackURI, Package};
use crate::vsdx::{schema, text};
use crate::xml::{XmlDocument, XmlElement, XmlNode};

static LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}").unwrap());

/// True when a value carries at least one Unicode letter. Purely numeric or
/// punctuation cells fail this and are skipped by letters-only walks.
pub fn is_translatable(value: &str) -> bool {
    LETTER_RE.is_match(value)
}

/// Where in the document a surfaced value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Document,
    Page { page_id: String },
    Shape { page_id: String, shape_id: String },
    MasterShape { shape_id: String },
}

/// One addressable location, passed to the handler with every call.
#[derive(Debug, Clone, Copy)]
pub struct Site<'a> {
    pub scope: &'a Scope,
    /// Stable row key (`ID`/`N`/`IX`) for row-level surfaces, absent for
    /// shape text and page names.
    pub row_key: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    ShapeText,
    FieldValue,
    PropertyValue,
    PropertyFormat,
    PropertyLabel,
    PropertyPrompt,
    PropertyType,
    UserRowValue,
    UserRowPrompt,
    PageName,
    PageNameU,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterKind {
    Page,
    Shape,
    FieldRow,
    PropertyRow,
    UserRow,
}

/// Maps surfaced values during a walk.
pub trait SurfaceHandler {
    /// Called once per page, shape, or row before its value surfaces fire,
    /// whether or not any cell passes the eligibility filter.
    fn enter(&mut self, _site: &Site<'_>, _kind: EnterKind) {}

    /// Inspect one surfaced value. Return a replacement to write back into
    /// the document, or `None` to leave it untouched.
    fn value(&mut self, site: &Site<'_>, kind: SurfaceKind, value: &str) -> Option<String>;
}

/// Which values a walk surfaces at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Surfaces {
    pub shape_text: bool,
    pub shape_fields: bool,
    /// `Value` cell for type 0 rows, `Format` cell for type 1/4 rows; other
    /// property types are never surfaced.
    pub property_values: bool,
    pub property_labels: bool,
    /// Full-row mode: label, prompt, type, format, and value cells of every
    /// property row, with no type dispatch. Overrides the two flags above.
    pub property_rows: bool,
    pub user_rows: bool,
    pub page_names: bool,
    /// Also surface the universal `NameU` page attribute.
    pub page_name_u: bool,
}

/// Per-kind filter applied before a value reaches the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Only values containing a Unicode letter.
    LettersOnly,
    /// Every present value.
    Any,
}

/// How shape text is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextForm {
    /// One handler call per plain run inside `Text`; markers pass through.
    Runs,
    /// One call with the `{name}{IX}` rendering; the replacement is rebuilt
    /// into runs and marker elements.
    Formatted,
    /// One call with the concatenated runs, read only.
    Plain,
}

#[derive(Debug, Clone)]
pub struct WalkSpec {
    pub surfaces: Surfaces,
    pub eligibility: Eligibility,
    /// Only surface field values whose cell carries `U="STR"`.
    pub fields_require_str_unit: bool,
    pub text_form: TextForm,
    pub visit_page_sheets: bool,
    pub visit_document_sheet: bool,
    pub visit_master_shapes: bool,
}

/// Drive one handler over the container.
pub fn walk(package: &mut Package, spec: &WalkSpec, handler: &mut dyn SurfaceHandler) -> Result<()> {
    let document_uri = schema::document_part_uri(package)?;
    let pages_uri = schema::pages_part_uri(package, &document_uri)?;

    let mut pass = Pass { spec, handler };
    pass.walk_pages(package, &pages_uri)?;

    if spec.visit_master_shapes {
        if let Some(masters_uri) = schema::masters_part_uri(package, &document_uri)? {
            pass.walk_masters(package, &masters_uri)?;
        }
    }

    if spec.visit_document_sheet {
        pass.walk_document_sheet(package, &document_uri)?;
    }

    Ok(())
}

struct Pass<'a> {
    spec: &'a WalkSpec,
    handler: &'a mut dyn SurfaceHandler,
}

impl Pass<'_> {
    fn walk_pages(&mut self, package: &mut Package, pages_uri: &PackURI) -> Result<()> {
        let refs = schema::page_refs(package, pages_uri)?;
        let mut pages_doc = XmlDocument::parse(package.part_bytes(pages_uri)?)?;
        let mut pages_changed = false;

        for page_ref in &refs {
            let Some(page_el) =
                schema::element_by_rel_id_mut(pages_doc.root_mut(), &page_ref.rel_id)
            else {
                debug!("pages part has no element for relationship {}", page_ref.rel_id);
                continue;
            };
            let Some(page_id) = schema::row_key(page_el).map(str::to_string) else {
                debug!("page for relationship {} has no identifier", page_ref.rel_id);
                continue;
            };
            let scope = Scope::Page {
                page_id: page_id.clone(),
            };
            self.handler.enter(
                &Site {
                    scope: &scope,
                    row_key: None,
                },
                EnterKind::Page,
            );

            if self.spec.surfaces.page_names {
                pages_changed |=
                    self.attr_surface(page_el, "Name", SurfaceKind::PageName, &scope);
                if self.spec.surfaces.page_name_u {
                    pages_changed |=
                        self.attr_surface(page_el, "NameU", SurfaceKind::PageNameU, &scope);
                }
            }

            if self.spec.visit_page_sheets {
                if let Some(sheet) = page_el.first_child_mut("PageSheet") {
                    // Page sheets never surface property labels.
                    pages_changed |= self.property_sections(sheet, &scope, false);
                    if self.spec.surfaces.user_rows {
                        pages_changed |= self.user_section(sheet, &scope);
                    }
                }
            }

            if self.wants_shapes() {
                self.walk_page_part(package, &page_ref.uri, &page_id)?;
            }
        }

        if pages_changed {
            package.set_part_bytes(pages_uri, pages_doc.to_bytes()?);
        }
        Ok(())
    }

    fn walk_masters(&mut self, package: &mut Package, masters_uri: &PackURI) -> Result<()> {
        for master_ref in schema::master_refs(package, masters_uri)? {
            self.walk_master_part(package, &master_ref.uri)?;
        }
        Ok(())
    }

    fn walk_master_part(&mut self, package: &mut Package, master_uri: &PackURI) -> Result<()> {
        if !package.contains_part(master_uri) {
            return Err(Error::SchemaNotFound(format!(
                "master part {} is missing from the container",
                master_uri
            )));
        }
        let mut doc = XmlDocument::parse(package.part_bytes(master_uri)?)?;
        if doc.root().local_name() != "MasterContents" {
            debug!("{} is not a master contents part", master_uri);
            return Ok(());
        }

        let changed = self.visit_shapes(doc.root_mut(), None)?;
        if changed {
            package.set_part_bytes(master_uri, doc.to_bytes()?);
        }
        Ok(())
    }

    fn walk_page_part(
        &mut self,
        package: &mut Package,
        part_uri: &PackURI,
        page_id: &str,
    ) -> Result<()> {
        if !package.contains_part(part_uri) {
            return Err(Error::SchemaNotFound(format!(
                "page part {} is missing from the container",
                part_uri
            )));
        }
        let mut doc = XmlDocument::parse(package.part_bytes(part_uri)?)?;
        if doc.root().local_name() != "PageContents" {
            debug!("{} is not a page contents part", part_uri);
            return Ok(());
        }

        let changed = self.visit_shapes(doc.root_mut(), Some(page_id))?;
        if changed {
            package.set_part_bytes(part_uri, doc.to_bytes()?);
        }
        Ok(())
    }

    /// Visit every `Shape` descendant, groups before their children.
    fn visit_shapes(&mut self, root: &mut XmlElement, page_id: Option<&str>) -> Result<bool> {
        let mut changed = false;
        root.try_for_each_descendant_mut("Shape", &mut |shape| {
            let Some(shape_id) = schema::row_key(shape).map(str::to_string) else {
                return Ok(());
            };
            let scope = match page_id {
                Some(page_id) => Scope::Shape {
                    page_id: page_id.to_string(),
                    shape_id,
                },
                None => Scope::MasterShape { shape_id },
            };
            self.handler.enter(
                &Site {
                    scope: &scope,
                    row_key: None,
                },
                EnterKind::Shape,
            );
            changed |= self.shape_surfaces(shape, &scope);
            Ok(())
        })?;
        Ok(changed)
    }

    fn walk_document_sheet(&mut self, package: &mut Package, document_uri: &PackURI) -> Result<()> {
        let mut doc = XmlDocument::parse(package.part_bytes(document_uri)?)?;
        let mut changed = false;
        if let Some(sheet) = doc.root_mut().first_child_mut("DocumentSheet") {
            let scope = Scope::Document;
            changed |= self.property_sections(sheet, &scope, true);
            if self.spec.surfaces.user_rows {
                changed |= self.user_section(sheet, &scope);
            }
        }
        if changed {
            package.set_part_bytes(document_uri, doc.to_bytes()?);
        }
        Ok(())
    }

    fn wants_shapes(&self) -> bool {
        let s = self.spec.surfaces;
        s.shape_text
            || s.shape_fields
            || s.property_values
            || s.property_labels
            || s.property_rows
            || s.user_rows
    }

    fn shape_surfaces(&mut self, shape: &mut XmlElement, scope: &Scope) -> bool {
        let mut changed = false;
        if self.spec.surfaces.shape_text {
            changed |= self.text_surface(shape, scope);
        }
        if self.spec.surfaces.shape_fields {
            changed |= self.field_section(shape, scope);
        }
        changed |= self.property_sections(shape, scope, true);
        if self.spec.surfaces.user_rows {
            changed |= self.user_section(shape, scope);
        }
        changed
    }

    fn text_surface(&mut self, shape: &mut XmlElement, scope: &Scope) -> bool {
        let Some(text_el) = shape.first_child_mut("Text") else {
            return false;
        };
        let site = Site {
            scope,
            row_key: None,
        };
        match self.spec.text_form {
            TextForm::Runs => {
                let mut changed = false;
                for node in text_el.nodes_mut() {
                    let XmlNode::Text(run) = node else { continue };
                    if !self.eligible(run) {
                        continue;
                    }
                    if let Some(new_run) = self.handler.value(&site, SurfaceKind::ShapeText, run)
                        && new_run != *run
                    {
                        *run = new_run;
                        changed = true;
                    }
                }
                changed
            }
            TextForm::Formatted => {
                let text = text::shape_text(text_el);
                if !self.eligible(&text.plain) {
                    return false;
                }
                match self.handler.value(&site, SurfaceKind::ShapeText, &text.formatted) {
                    Some(new_text) if new_text != text.formatted => {
                        text::rebuild(text_el, &new_text);
                        true
                    }
                    _ => false,
                }
            }
            TextForm::Plain => {
                let text = text::shape_text(text_el);
                if self.eligible(&text.plain) {
                    self.handler.value(&site, SurfaceKind::ShapeText, &text.plain);
                }
                false
            }
        }
    }

    fn field_section(&mut self, el: &mut XmlElement, scope: &Scope) -> bool {
        let Some(section) = schema::section_mut(el, "Field") else {
            return false;
        };
        let mut changed = false;
        for row in schema::rows_mut(section) {
            let key = schema::row_key(row).map(str::to_string);
            let key = key.as_deref();
            self.handler.enter(
                &Site {
                    scope,
                    row_key: key,
                },
                EnterKind::FieldRow,
            );
            if self.spec.fields_require_str_unit {
                let is_str =
                    schema::cell(row, "Value").and_then(|cell| cell.attr("U")) == Some("STR");
                if !is_str {
                    continue;
                }
            }
            changed |= self.cell_surface(row, "Value", SurfaceKind::FieldValue, scope, key);
        }
        changed
    }

    fn property_sections(&mut self, el: &mut XmlElement, scope: &Scope, allow_labels: bool) -> bool {
        let surfaces = self.spec.surfaces;
        let labels = surfaces.property_labels && allow_labels;
        if !(surfaces.property_values || labels || surfaces.property_rows) {
            return false;
        }
        let Some(section) = schema::section_mut(el, "Property") else {
            return false;
        };

        let mut changed = false;
        for row in schema::rows_mut(section) {
            let key = schema::row_key(row).map(str::to_string);
            let key = key.as_deref();
            self.handler.enter(
                &Site {
                    scope,
                    row_key: key,
                },
                EnterKind::PropertyRow,
            );

            if surfaces.property_rows {
                changed |= self.cell_surface(row, "Label", SurfaceKind::PropertyLabel, scope, key);
                changed |=
                    self.cell_surface(row, "Prompt", SurfaceKind::PropertyPrompt, scope, key);
                changed |= self.cell_surface(row, "Type", SurfaceKind::PropertyType, scope, key);
                changed |=
                    self.cell_surface(row, "Format", SurfaceKind::PropertyFormat, scope, key);
                changed |= self.cell_surface(row, "Value", SurfaceKind::PropertyValue, scope, key);
                continue;
            }

            if surfaces.property_values {
                changed |= match property_type(row) {
                    0 => self.cell_surface(row, "Value", SurfaceKind::PropertyValue, scope, key),
                    1 | 4 => {
                        self.cell_surface(row, "Format", SurfaceKind::PropertyFormat, scope, key)
                    }
                    _ => false,
                };
            }
            if labels {
                changed |= self.cell_surface(row, "Label", SurfaceKind::PropertyLabel, scope, key);
            }
        }
        changed
    }

    fn user_section(&mut self, el: &mut XmlElement, scope: &Scope) -> bool {
        let Some(section) = schema::section_mut(el, "User") else {
            return false;
        };
        let mut changed = false;
        for row in schema::rows_mut(section) {
            let key = schema::row_key(row).map(str::to_string);
            let key = key.as_deref();
            self.handler.enter(
                &Site {
                    scope,
                    row_key: key,
                },
                EnterKind::UserRow,
            );
            changed |= self.cell_surface(row, "Value", SurfaceKind::UserRowValue, scope, key);
            changed |= self.cell_surface(row, "Prompt", SurfaceKind::UserRowPrompt, scope, key);
        }
        changed
    }

    fn cell_surface(
        &mut self,
        row: &mut XmlElement,
        cell_name: &str,
        kind: SurfaceKind,
        scope: &Scope,
        row_key: Option<&str>,
    ) -> bool {
        let Some(cell) = schema::cell_mut(row, cell_name) else {
            return false;
        };
        let Some(value) = cell.attr("V").map(str::to_string) else {
            return false;
        };
        if !self.eligible(&value) {
            return false;
        }
        let site = Site { scope, row_key };
        match self.handler.value(&site, kind, &value) {
            Some(new_value) if new_value != value => {
                cell.set_attr("V", new_value);
                true
            }
            _ => false,
        }
    }

    fn attr_surface(
        &mut self,
        el: &mut XmlElement,
        attr: &str,
        kind: SurfaceKind,
        scope: &Scope,
    ) -> bool {
        let Some(value) = el.attr(attr).map(str::to_string) else {
            return false;
        };
        if !self.eligible(&value) {
            return false;
        }
        let site = Site {
            scope,
            row_key: None,
        };
        match self.handler.value(&site, kind, &value) {
            Some(new_value) if new_value != value => {
                el.set_attr(attr, new_value);
                true
            }
            _ => false,
        }
    }

    fn eligible(&self, value: &str) -> bool {
        match self.spec.eligibility {
            Eligibility::LettersOnly => is_translatable(value),
            Eligibility::Any => true,
        }
    }
}

fn property_type(row: &XmlElement) -> i32 {
    schema::cell(row, "Type")
        .and_then(|cell| cell.attr("V"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn fixture() -> Vec<u8> {
        let mut zip_data = Vec::new();
        {
            let cursor = Cursor::new(&mut zip_data);
            let mut writer = ZipWriter::new(cursor);
            let options = SimpleFileOptions::default();

            writer.start_file("[Content_Types].xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/visio/document.xml" ContentType="application/vnd.ms-visio.drawing.main+xml"/>
  <Override PartName="/visio/pages/pages.xml" ContentType="application/vnd.ms-visio.pages+xml"/>
  <Override PartName="/visio/pages/page1.xml" ContentType="application/vnd.ms-visio.page+xml"/>
  <Override PartName="/visio/pages/page2.xml" ContentType="application/vnd.ms-visio.page+xml"/>
</Types>"#).unwrap();

            writer.start_file("_rels/.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.microsoft.com/visio/2010/relationships/document" Target="visio/document.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("visio/document.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<VisioDocument xmlns="http://schemas.microsoft.com/office/visio/2012/main">
  <DocumentSheet>
    <Section N="Property">
      <Row N="Theme">
        <Cell N="Value" V="Slate" U="STR"/>
        <Cell N="Label" V="Theme name"/>
      </Row>
    </Section>
    <Section N="User">
      <Row N="Reviewer">
        <Cell N="Value" V="Unassigned"/>
        <Cell N="Prompt" V="Who signs off"/>
      </Row>
    </Section>
  </DocumentSheet>
</VisioDocument>"#).unwrap();

            writer.start_file("visio/_rels/document.xml.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.microsoft.com/visio/2010/relationships/pages" Target="pages/pages.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("visio/pages/pages.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Pages xmlns="http://schemas.microsoft.com/office/visio/2012/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <Page ID="0" Name="Overview" NameU="Page-1">
    <PageSheet>
      <Section N="Property">
        <Row N="Owner">
          <Cell N="Value" V="Platform team" U="STR"/>
          <Cell N="Label" V="Owner"/>
        </Row>
      </Section>
      <Section N="User">
        <Row N="msvNoAutoConnect">
          <Cell N="Value" V="1"/>
        </Row>
      </Section>
    </PageSheet>
    <Rel r:id="rId1"/>
  </Page>
  <Page ID="1" Name="Data">
    <Rel r:id="rId2"/>
  </Page>
</Pages>"#).unwrap();

            writer.start_file("visio/pages/_rels/pages.xml.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.microsoft.com/visio/2010/relationships/page" Target="page1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.microsoft.com/visio/2010/relationships/page" Target="page2.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("visio/pages/page1.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<PageContents xmlns="http://schemas.microsoft.com/office/visio/2012/main">
  <Shapes>
    <Shape ID="1" Type="Group">
      <Section N="Property">
        <Row N="Status">
          <Cell N="Value" V="Draft" U="STR"/>
          <Cell N="Label" V="Review status"/>
          <Cell N="Type" V="0"/>
        </Row>
        <Row N="Severity">
          <Cell N="Format" V="Low;Medium;High"/>
          <Cell N="Type" V="1"/>
        </Row>
        <Row N="Updated">
          <Cell N="Value" V="44562"/>
          <Cell N="Type" V="5"/>
        </Row>
      </Section>
      <Shapes>
        <Shape ID="2">
          <Text>Total: <fld IX="0">7</fld> items</Text>
          <Section N="Field">
            <Row IX="0">
              <Cell N="Value" V="7 items" U="STR"/>
            </Row>
            <Row IX="1">
              <Cell N="Value" V="0.5" U="NUM"/>
            </Row>
          </Section>
        </Shape>
      </Shapes>
    </Shape>
  </Shapes>
</PageContents>"#).unwrap();

            writer.start_file("visio/pages/page2.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<PageContents xmlns="http://schemas.microsoft.com/office/visio/2012/main"/>"#).unwrap();

            writer.finish().unwrap();
        }
        zip_data
    }

    #[derive(Default)]
    struct Recorder {
        values: Vec<(SurfaceKind, String)>,
        sites: Vec<(Scope, Option<String>)>,
        enters: Vec<(EnterKind, Option<String>)>,
    }

    impl SurfaceHandler for Recorder {
        fn enter(&mut self, site: &Site<'_>, kind: EnterKind) {
            self.enters.push((kind, site.row_key.map(str::to_string)));
        }

        fn value(&mut self, site: &Site<'_>, kind: SurfaceKind, value: &str) -> Option<String> {
            self.values.push((kind, value.to_string()));
            self.sites
                .push((site.scope.clone(), site.row_key.map(str::to_string)));
            None
        }
    }

    fn translate_like_spec() -> WalkSpec {
        WalkSpec {
            surfaces: Surfaces {
                shape_text: true,
                shape_fields: true,
                property_values: true,
                property_labels: true,
                property_rows: false,
                user_rows: true,
                page_names: true,
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

    #[test]
    fn test_letters_only_walk_order() {
        let mut package = Package::open(&fixture()).unwrap();
        let mut recorder = Recorder::default();
        walk(&mut package, &translate_like_spec(), &mut recorder).unwrap();

        let expected = [
            (SurfaceKind::PageName, "Overview"),
            (SurfaceKind::PropertyValue, "Platform team"),
            (SurfaceKind::PropertyValue, "Draft"),
            (SurfaceKind::PropertyLabel, "Review status"),
            (SurfaceKind::PropertyFormat, "Low;Medium;High"),
            (SurfaceKind::ShapeText, "Total: {fld0} items"),
            (SurfaceKind::FieldValue, "7 items"),
            (SurfaceKind::PageName, "Data"),
            (SurfaceKind::PropertyValue, "Slate"),
            (SurfaceKind::PropertyLabel, "Theme name"),
            (SurfaceKind::UserRowValue, "Unassigned"),
            (SurfaceKind::UserRowPrompt, "Who signs off"),
        ];
        let got: Vec<(SurfaceKind, &str)> = recorder
            .values
            .iter()
            .map(|(kind, value)| (*kind, value.as_str()))
            .collect();
        assert_eq!(got, expected);

        // Shape 1's property value carries its page, shape, and row address.
        assert_eq!(
            recorder.sites[2],
            (
                Scope::Shape {
                    page_id: "0".into(),
                    shape_id: "1".into(),
                },
                Some("Status".into()),
            )
        );
        // The nested shape's text sits on the child id, not the group's.
        assert_eq!(
            recorder.sites[5].0,
            Scope::Shape {
                page_id: "0".into(),
                shape_id: "2".into(),
            }
        );
        assert_eq!(recorder.sites[8].0, Scope::Document);
    }

    #[test]
    fn test_enter_fires_for_filtered_rows() {
        let mut package = Package::open(&fixture()).unwrap();
        let mut recorder = Recorder::default();
        walk(&mut package, &translate_like_spec(), &mut recorder).unwrap();

        // The numeric-unit field row never surfaces a value but is still
        // announced, as is the letter-free page user row.
        assert!(
            recorder
                .enters
                .contains(&(EnterKind::FieldRow, Some("1".into())))
        );
        assert!(
            recorder
                .enters
                .contains(&(EnterKind::UserRow, Some("msvNoAutoConnect".into())))
        );
        assert_eq!(
            recorder
                .enters
                .iter()
                .filter(|(kind, _)| *kind == EnterKind::Page)
                .count(),
            2
        );
        assert_eq!(
            recorder
                .enters
                .iter()
                .filter(|(kind, _)| *kind == EnterKind::Shape)
                .count(),
            2
        );
    }

    #[test]
    fn test_full_row_mode_surfaces_every_cell() {
        let mut package = Package::open(&fixture()).unwrap();
        let spec = WalkSpec {
            surfaces: Surfaces {
                property_rows: true,
                ..Surfaces::default()
            },
            eligibility: Eligibility::Any,
            fields_require_str_unit: false,
            text_form: TextForm::Plain,
            visit_page_sheets: false,
            visit_document_sheet: false,
            visit_master_shapes: false,
        };
        let mut recorder = Recorder::default();
        walk(&mut package, &spec, &mut recorder).unwrap();

        let expected = [
            (SurfaceKind::PropertyLabel, "Review status"),
            (SurfaceKind::PropertyType, "0"),
            (SurfaceKind::PropertyValue, "Draft"),
            (SurfaceKind::PropertyType, "1"),
            (SurfaceKind::PropertyFormat, "Low;Medium;High"),
            (SurfaceKind::PropertyType, "5"),
            (SurfaceKind::PropertyValue, "44562"),
        ];
        let got: Vec<(SurfaceKind, &str)> = recorder
            .values
            .iter()
            .map(|(kind, value)| (*kind, value.as_str()))
            .collect();
        assert_eq!(got, expected);
    }

    struct Upper;

    impl SurfaceHandler for Upper {
        fn value(&mut self, _site: &Site<'_>, _kind: SurfaceKind, value: &str) -> Option<String> {
            Some(value.to_uppercase())
        }
    }

    #[test]
    fn test_runs_rewrite_touches_only_changed_parts() {
        let mut package = Package::open(&fixture()).unwrap();
        let pages_uri = PackURI::new("/visio/pages/pages.xml").unwrap();
        let page1_uri = PackURI::new("/visio/pages/page1.xml").unwrap();
        let page2_uri = PackURI::new("/visio/pages/page2.xml").unwrap();
        let pages_before = package.part_bytes(&pages_uri).unwrap().to_vec();
        let page2_before = package.part_bytes(&page2_uri).unwrap().to_vec();

        let spec = WalkSpec {
            surfaces: Surfaces {
                shape_text: true,
                ..Surfaces::default()
            },
            eligibility: Eligibility::Any,
            fields_require_str_unit: false,
            text_form: TextForm::Runs,
            visit_page_sheets: false,
            visit_document_sheet: false,
            visit_master_shapes: false,
        };
        walk(&mut package, &spec, &mut Upper).unwrap();

        let page1 = String::from_utf8(package.part_bytes(&page1_uri).unwrap().to_vec()).unwrap();
        assert!(page1.contains("TOTAL: "));
        assert!(page1.contains(" ITEMS"));
        // The field marker's cached result is a child element, not a run.
        assert!(page1.contains(r#"<fld IX="0">7</fld>"#));
        assert_eq!(package.part_bytes(&pages_uri).unwrap(), &pages_before[..]);
        assert_eq!(package.part_bytes(&page2_uri).unwrap(), &page2_before[..]);
    }

    struct Identity;

    impl SurfaceHandler for Identity {
        fn value(&mut self, _site: &Site<'_>, _kind: SurfaceKind, value: &str) -> Option<String> {
            Some(value.to_string())
        }
    }

    #[test]
    fn test_identity_handler_preserves_part_bytes() {
        let mut package = Package::open(&fixture()).unwrap();
        let uris = [
            PackURI::new("/visio/pages/pages.xml").unwrap(),
            PackURI::new("/visio/pages/page1.xml").unwrap(),
            PackURI::new("/visio/document.xml").unwrap(),
        ];
        let before: Vec<Vec<u8>> = uris
            .iter()
            .map(|uri| package.part_bytes(uri).unwrap().to_vec())
            .collect();

        walk(&mut package, &translate_like_spec(), &mut Identity).unwrap();

        for (uri, snapshot) in uris.iter().zip(&before) {
            assert_eq!(package.part_bytes(uri).unwrap(), &snapshot[..]);
        }
    }

    #[test]
    fn test_is_translatable() {
        assert!(is_translatable("Server"));
        assert!(is_translatable("Üben"));
        assert!(!is_translatable("12.5"));
        assert!(!is_translatable("  "));
        assert!(!is_translatable(""));
    }
}
