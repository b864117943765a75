//! Round-trip codec between a shape's `Text` element and a single string.
//!
//! A `Text` element holds plain runs interleaved with empty field-marker
//! elements (`<fld IX="0"/>`, `<pp IX="1"/>` and friends). The string form
//! renders each marker as `{name}{IX}` (for example `{fld0}`) so external
//! tooling can carry the markers through a translation untouched. Literal
//! braces inside plain runs are not escaped; a run that happens to spell a
//! marker is indistinguishable from one on rebuild, which matches how Visio
//! files are produced in practice (shape text does not contain braces).
use once_cell::sync::Lazy;
use regex::Regex;

use crate::xml::{XmlElement, XmlNode};

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z]+)(\d+)\}|([^{}]+)").unwrap());

/// The two string renderings of one `Text` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeText {
    /// Text runs only, markers dropped.
    pub plain: String,
    /// Text runs with each marker rendered as `{name}{IX}`.
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextToken {
    Run(String),
    Marker { name: String, ix: String },
}

/// Read a `Text` element into its plain and formatted renderings.
pub fn shape_text(text_element: &XmlElement) -> ShapeText {
    let mut plain = String::new();
    let mut formatted = String::new();
    for node in text_element.nodes() {
        match node {
            XmlNode::Text(run) => {
                plain.push_str(run);
                formatted.push_str(run);
            }
            XmlNode::Element(marker) => {
                formatted.push('{');
                formatted.push_str(marker.local_name());
                if let Some(ix) = marker.attr("IX") {
                    formatted.push_str(ix);
                }
                formatted.push('}');
            }
            XmlNode::Comment(_) => {}
        }
    }
    ShapeText { plain, formatted }
}

/// Split a formatted string back into runs and markers.
///
/// Unpaired braces match neither alternative and are dropped, the same way
/// the string was never producible by [`shape_text`] in the first place.
pub fn tokenize(formatted: &str) -> Vec<TextToken> {
    let mut tokens = Vec::new();
    for caps in TOKEN_RE.captures_iter(formatted) {
        if let (Some(name), Some(ix)) = (caps.get(1), caps.get(2)) {
            tokens.push(TextToken::Marker {
                name: name.as_str().to_string(),
                ix: ix.as_str().to_string(),
            });
        } else if let Some(run) = caps.get(3) {
            tokens.push(TextToken::Run(run.as_str().to_string()));
        }
    }
    tokens
}

/// Replace a `Text` element's children with the runs and markers of a
/// formatted string.
pub fn rebuild(text_element: &mut XmlElement, formatted: &str) {
    text_element.clear_children();
    for token in tokenize(formatted) {
        match token {
            TextToken::Run(run) => text_element.push_text(run),
            TextToken::Marker { name, ix } => {
                let mut marker = XmlElement::new(name);
                marker.set_attr("IX", &ix);
                text_element.push_element(marker);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn text_element(xml: &str) -> XmlElement {
        XmlDocument::parse(xml.as_bytes()).unwrap().root().clone()
    }

    #[test]
    fn test_shape_text_renders_markers() {
        let el = text_element(r#"<Text>Updated: <fld IX="0"/> by <fld IX="1"/>&#10;</Text>"#);
        let text = shape_text(&el);
        assert_eq!(text.plain, "Updated:  by \n");
        assert_eq!(text.formatted, "Updated: {fld0} by {fld1}\n");
    }

    #[test]
    fn test_shape_text_marker_without_ix() {
        let el = text_element(r#"<Text>x<tp/>y</Text>"#);
        assert_eq!(shape_text(&el).formatted, "x{tp}y");
    }

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("Total {fld12} units");
        assert_eq!(
            tokens,
            vec![
                TextToken::Run("Total ".to_string()),
                TextToken::Marker {
                    name: "fld".to_string(),
                    ix: "12".to_string()
                },
                TextToken::Run(" units".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_drops_unpaired_braces() {
        assert_eq!(
            tokenize("a{b"),
            vec![
                TextToken::Run("a".to_string()),
                TextToken::Run("b".to_string())
            ]
        );
        assert_eq!(tokenize("{}"), vec![]);
        assert_eq!(tokenize(""), vec![]);
    }

    #[test]
    fn test_rebuild_then_read_back() {
        let mut el = text_element("<Text>old</Text>");
        rebuild(&mut el, "New {fld0} text");

        let text = shape_text(&el);
        assert_eq!(text.formatted, "New {fld0} text");
        assert_eq!(text.plain, "New  text");

        let markers: Vec<_> = el.child_elements().collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].local_name(), "fld");
        assert_eq!(markers[0].attr("IX"), Some("0"));
    }

    #[test]
    fn test_round_trip_preserves_ix_digits() {
        let mut el = text_element("<Text/>");
        rebuild(&mut el, "{fld007}");
        assert_eq!(shape_text(&el).formatted, "{fld007}");
    }
}
