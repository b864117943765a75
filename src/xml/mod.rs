//! XML tree support for Visio part payloads.

pub mod dom;

pub use dom::{XmlDocument, XmlElement, XmlNode};
