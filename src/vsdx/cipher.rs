//! Anonymizes the human-readable content of a document in place.
//!
//! Every selected surface is replaced with a readable pseudo-random string of
//! the same shape (see [`ReadableScrambler`]): line structure, word count,
//! and casing survive, the words themselves do not. One scrambler instance
//! covers the whole run, so a value repeated across pages ciphers to the same
//! replacement everywhere.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::opc::constants::relationship_type;
use crate::opc::Package;
use crate::vsdx::scramble::ReadableScrambler;
use crate::vsdx::walker::{
    Eligibility, Site, SurfaceHandler, SurfaceKind, Surfaces, TextForm, WalkSpec, walk,
};
use crate::xml::XmlDocument;

/// Which surfaces to anonymize. Every flag defaults to off.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CipherOptions {
    pub shape_text: bool,
    pub shape_fields: bool,
    pub page_names: bool,
    pub property_values: bool,
    pub property_labels: bool,
    pub masters: bool,
    pub user_rows: bool,
    pub document_properties: bool,
}

/// Core-properties elements whose text is scrambled, matched by local name.
const CORE_PROPERTY_NAMES: &[&str] = &["creator", "title", "subject", "category", "keywords"];

/// Extended-properties elements whose text is scrambled.
const EXTENDED_PROPERTY_NAMES: &[&str] = &["Manager", "Company"];

/// Cipher a container and return the rewritten bytes.
///
/// A container without a document relationship is returned unchanged; there
/// is nothing addressable to cipher in it.
pub fn cipher_document(input: &[u8], options: &CipherOptions) -> Result<Vec<u8>> {
    let mut package = Package::open(input)?;
    if package
        .package_rels()?
        .by_type(relationship_type::VISIO_DOCUMENT)
        .next()
        .is_none()
    {
        debug!("container has no document relationship, nothing to cipher");
        return Ok(input.to_vec());
    }

    let mut scrambler = ReadableScrambler::new();
    walk(
        &mut package,
        &walk_spec(options),
        &mut CipherHandler {
            scrambler: &mut scrambler,
        },
    )?;

    if options.document_properties {
        cipher_props_part(
            &mut package,
            relationship_type::CORE_PROPERTIES,
            CORE_PROPERTY_NAMES,
            &mut scrambler,
        )?;
        cipher_props_part(
            &mut package,
            relationship_type::EXTENDED_PROPERTIES,
            EXTENDED_PROPERTY_NAMES,
            &mut scrambler,
        )?;
    }

    package.save().map_err(Error::from)
}

fn walk_spec(options: &CipherOptions) -> WalkSpec {
    WalkSpec {
        surfaces: Surfaces {
            shape_text: options.shape_text,
            shape_fields: options.shape_fields,
            property_values: options.property_values,
            property_labels: options.property_labels,
            property_rows: false,
            user_rows: options.user_rows,
            page_names: options.page_names,
            page_name_u: true,
        },
        eligibility: Eligibility::Any,
        fields_require_str_unit: false,
        text_form: TextForm::Runs,
        visit_page_sheets: false,
        visit_document_sheet: false,
        visit_master_shapes: options.masters,
    }
}

struct CipherHandler<'a> {
    scrambler: &'a mut ReadableScrambler,
}

impl SurfaceHandler for CipherHandler<'_> {
    fn value(&mut self, _site: &Site<'_>, kind: SurfaceKind, value: &str) -> Option<String> {
        match kind {
            // List formats are semicolon-separated choices; each choice is
            // scrambled on its own so the item count survives.
            SurfaceKind::PropertyFormat => Some(
                value
                    .split(';')
                    .map(|item| self.scrambler.scramble(item))
                    .collect::<Vec<_>>()
                    .join(";"),
            ),
            // Prompts stay readable; only user row values are ciphered.
            SurfaceKind::UserRowPrompt => None,
            _ => Some(self.scrambler.scramble(value)),
        }
    }
}

/// Scramble the text of named elements in a document-properties part.
///
/// A missing relationship or element is skipped; both parts are optional in
/// a container.
fn cipher_props_part(
    package: &mut Package,
    reltype: &str,
    names: &[&str],
    scrambler: &mut ReadableScrambler,
) -> Result<()> {
    let rels = package.package_rels()?;
    let Some(rel) = rels.by_type(reltype).next() else {
        return Ok(());
    };
    let part_uri = rel.target_partname().map_err(Error::Package)?;

    let mut doc = XmlDocument::parse(package.part_bytes(&part_uri)?)?;
    let mut changed = false;
    for name in names {
        if let Some(el) = doc.root_mut().first_child_mut(name) {
            let original = el.text();
            let scrambled = scrambler.scramble(&original);
            if scrambled != original {
                el.set_text(scrambled);
                changed = true;
            }
        }
    }

    if changed {
        package.set_part_bytes(&part_uri, doc.to_bytes()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: CipherOptions =
            serde_json::from_str(r#"{"shapeText":true,"documentProperties":true}"#).unwrap();
        assert!(options.shape_text);
        assert!(options.document_properties);
        assert!(!options.page_names);
        assert!(!options.masters);
    }

    #[test]
    fn test_options_round_trip() {
        let options = CipherOptions {
            page_names: true,
            user_rows: true,
            ..CipherOptions::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        let back: CipherOptions = serde_json::from_str(&json).unwrap();
        assert!(back.page_names);
        assert!(back.user_rows);
        assert!(!back.shape_text);
    }

    #[test]
    fn test_format_list_keeps_item_count() {
        let mut scrambler = ReadableScrambler::seeded(7);
        let mut handler = CipherHandler {
            scrambler: &mut scrambler,
        };
        let site = Site {
            scope: &crate::vsdx::walker::Scope::Document,
            row_key: Some("Severity"),
        };
        let out = handler
            .value(&site, SurfaceKind::PropertyFormat, "Low;Medium;High")
            .unwrap();
        assert_eq!(out.split(';').count(), 3);
        assert_ne!(out, "Low;Medium;High");
        for (item, original) in out.split(';').zip(["Low", "Medium", "High"]) {
            assert_eq!(item.chars().count(), original.chars().count());
        }
    }

    #[test]
    fn test_user_row_prompt_is_left_alone() {
        let mut scrambler = ReadableScrambler::new();
        let mut handler = CipherHandler {
            scrambler: &mut scrambler,
        };
        let site = Site {
            scope: &crate::vsdx::walker::Scope::Document,
            row_key: Some("Reviewer"),
        };
        assert!(
            handler
                .value(&site, SurfaceKind::UserRowPrompt, "Who signs off")
                .is_none()
        );
    }

    use std::io::{Cursor, Write};

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use crate::opc::PackURI;

    const DOCUMENT_XML: &[u8] = br#"<?xml version="1.0" encoding="utf-8"?>
<VisioDocument xmlns="http://schemas.microsoft.com/office/visio/2012/main"/>"#;

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
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#).unwrap();

            writer.start_file("_rels/.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.microsoft.com/visio/2010/relationships/document" Target="visio/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("visio/document.xml", options).unwrap();
            writer.write_all(DOCUMENT_XML).unwrap();

            writer.start_file("visio/_rels/document.xml.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.microsoft.com/visio/2010/relationships/pages" Target="pages/pages.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("visio/pages/pages.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Pages xmlns="http://schemas.microsoft.com/office/visio/2012/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <Page ID="0" Name="Overview" NameU="Page-1">
    <Rel r:id="rId1"/>
  </Page>
</Pages>"#).unwrap();

            writer.start_file("visio/pages/_rels/pages.xml.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.microsoft.com/visio/2010/relationships/page" Target="page1.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("visio/pages/page1.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<PageContents xmlns="http://schemas.microsoft.com/office/visio/2012/main">
  <Shapes>
    <Shape ID="1" Type="Shape">
      <Text>Server room</Text>
    </Shape>
    <Shape ID="2" Type="Shape">
      <Text>Server room</Text>
    </Shape>
    <Shape ID="3" Type="Shape">
      <Text>Total: <fld IX="0">7</fld> racks</Text>
      <Section N="Field">
        <Row IX="0">
          <Cell N="Value" V="7 racks" U="STR"/>
        </Row>
        <Row IX="1">
          <Cell N="Value" V="0.5" U="NUM"/>
        </Row>
      </Section>
      <Section N="Property">
        <Row N="Status">
          <Cell N="Value" V="Draft" U="STR"/>
          <Cell N="Type" V="0"/>
        </Row>
        <Row N="Severity">
          <Cell N="Format" V="Low;Medium;High"/>
          <Cell N="Type" V="1"/>
        </Row>
      </Section>
      <Section N="User">
        <Row N="msvShapeCat">
          <Cell N="Value" V="rack"/>
          <Cell N="Prompt" V="Category"/>
        </Row>
      </Section>
    </Shape>
  </Shapes>
</PageContents>"#).unwrap();

            writer.start_file("docProps/core.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0" encoding="utf-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>Network plan</dc:title>
  <dc:creator>Avery</dc:creator>
</cp:coreProperties>"#).unwrap();

            writer.finish().unwrap();
        }
        zip_data
    }

    fn all_options() -> CipherOptions {
        CipherOptions {
            shape_text: true,
            shape_fields: true,
            page_names: true,
            property_values: true,
            property_labels: true,
            masters: true,
            user_rows: true,
            document_properties: true,
        }
    }

    fn uri(s: &str) -> PackURI {
        PackURI::new(s).unwrap()
    }

    fn shape_texts(package: &Package) -> Vec<String> {
        let page = XmlDocument::parse(
            package.part_bytes(&uri("/visio/pages/page1.xml")).unwrap(),
        )
        .unwrap();
        page.root()
            .descendants("Shape")
            .iter()
            .filter_map(|shape| shape.first_child("Text"))
            .map(|text| text.text())
            .collect()
    }

    #[test]
    fn test_cipher_scrambles_text_keeping_shape() {
        let output = cipher_document(&fixture(), &all_options()).unwrap();
        let package = Package::open(&output).unwrap();

        let texts = shape_texts(&package);
        assert_ne!(texts[0], "Server room");
        assert_eq!(texts[0].chars().count(), "Server room".chars().count());
        assert_eq!(texts[0].matches(' ').count(), 1);

        // The repeated string ciphers to the same replacement everywhere.
        assert_eq!(texts[0], texts[1]);

        let pages = XmlDocument::parse(
            package.part_bytes(&uri("/visio/pages/pages.xml")).unwrap(),
        )
        .unwrap();
        let page_el = pages.root().first_child("Page").unwrap();
        assert_ne!(page_el.attr("Name"), Some("Overview"));
        assert_ne!(page_el.attr("NameU"), Some("Page-1"));
        assert_eq!(page_el.attr("Name").unwrap().chars().count(), 8);
    }

    #[test]
    fn test_cipher_leaves_markers_and_ignorable_values() {
        let output = cipher_document(&fixture(), &all_options()).unwrap();
        let package = Package::open(&output).unwrap();

        let page1 = String::from_utf8(
            package
                .part_bytes(&uri("/visio/pages/page1.xml"))
                .unwrap()
                .to_vec(),
        )
        .unwrap();
        // The field marker and its cached display text survive untouched, as
        // do values without letters and user row prompts.
        assert!(page1.contains(r#"<fld IX="0">7</fld>"#));
        assert!(page1.contains(r#"V="0.5""#));
        assert!(page1.contains(r#"V="Category""#));
        assert!(!page1.contains("Draft"));
        assert!(!page1.contains("rack"));

        let page_doc = XmlDocument::parse(page1.as_bytes()).unwrap();
        let severity_row = page_doc
            .root()
            .descendants("Row")
            .into_iter()
            .find(|row| row.attr("N") == Some("Severity"))
            .unwrap();
        let severity = crate::vsdx::schema::cell(severity_row, "Format")
            .and_then(|cell| cell.attr("V"))
            .unwrap();
        assert_eq!(severity.split(';').count(), 3);
        assert_ne!(severity, "Low;Medium;High");
    }

    #[test]
    fn test_cipher_document_properties() {
        let output = cipher_document(&fixture(), &all_options()).unwrap();
        let package = Package::open(&output).unwrap();

        let core = XmlDocument::parse(package.part_bytes(&uri("/docProps/core.xml")).unwrap())
            .unwrap();
        let title = core.root().first_child("title").unwrap().text();
        assert_ne!(title, "Network plan");
        assert_eq!(title.chars().count(), "Network plan".chars().count());
        assert_eq!(title.matches(' ').count(), 1);
    }

    #[test]
    fn test_cipher_leaves_untouched_parts_alone() {
        let output = cipher_document(&fixture(), &all_options()).unwrap();
        let package = Package::open(&output).unwrap();
        assert_eq!(
            package.part_bytes(&uri("/visio/document.xml")).unwrap(),
            DOCUMENT_XML
        );
    }

    #[test]
    fn test_cipher_without_document_relationship_is_identity() {
        let mut zip_data = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut zip_data));
            let options = SimpleFileOptions::default();
            writer.start_file("[Content_Types].xml", options).unwrap();
            writer.write_all(br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#).unwrap();
            writer.start_file("_rels/.rels", options).unwrap();
            writer.write_all(br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#).unwrap();
            writer.finish().unwrap();
        }

        let output = cipher_document(&zip_data, &all_options()).unwrap();
        assert_eq!(output, zip_data);
    }
}
