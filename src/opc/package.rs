//! ZIP-backed OPC container.
//!
//! A [`Package`] owns every entry of the archive in original order. Parts are
//! plain byte buffers; engines parse the ones they care about, transform them
//! as values, and store new bytes back. [`Package::save`] is the only point at
//! which container bytes are finalized: untouched entries are copied through
//! byte-for-byte, in the order the input archive had them.
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::opc::rel::Relationships;
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::Event;
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug)]
struct PartEntry {
    bytes: Vec<u8>,
    modified: bool,
}

/// An open VSDX/OPC container.
#[derive(Debug)]
pub struct Package {
    /// Entries keyed by ZIP membername, in original archive order.
    entries: IndexMap<String, PartEntry>,

    /// Whether any part has been deleted; drives content-type cleanup on save.
    parts_deleted: bool,
}

impl Package {
    /// Open a container from its bytes.
    ///
    /// Fails with [`OpcError::CorruptContainer`] if the bytes are not a valid
    /// ZIP archive or the package-level relationship part `_rels/.rels` is
    /// missing.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| OpcError::CorruptContainer(e.to_string()))?;

        let mut entries = IndexMap::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| OpcError::CorruptContainer(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)?;
            entries.insert(
                file.name().to_string(),
                PartEntry {
                    bytes,
                    modified: false,
                },
            );
        }

        if !entries.contains_key("_rels/.rels") {
            return Err(OpcError::CorruptContainer(
                "package has no _rels/.rels part".to_string(),
            ));
        }

        Ok(Self {
            entries,
            parts_deleted: false,
        })
    }

    /// Check whether a part exists.
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.entries.contains_key(partname.membername())
    }

    /// Get a part's bytes.
    pub fn part_bytes(&self, partname: &PackURI) -> Result<&[u8]> {
        self.entries
            .get(partname.membername())
            .map(|entry| entry.bytes.as_slice())
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Replace a part's bytes, marking the entry for rewrite on save.
    pub fn set_part_bytes(&mut self, partname: &PackURI, bytes: Vec<u8>) {
        let entry = self
            .entries
            .entry(partname.membername().to_string())
            .or_insert_with(|| PartEntry {
                bytes: Vec::new(),
                modified: false,
            });
        entry.bytes = bytes;
        entry.modified = true;
    }

    /// Delete a part and its own `.rels` part, if any.
    ///
    /// Returns whether the part existed. The part's content-type override is
    /// dropped when the container is saved.
    pub fn delete_part(&mut self, partname: &PackURI) -> bool {
        let removed = self
            .entries
            .shift_remove(partname.membername())
            .is_some();
        if removed {
            self.parts_deleted = true;
            if let Ok(rels_uri) = partname.rels_uri() {
                self.entries.shift_remove(rels_uri.membername());
            }
            debug!("deleted part {}", partname);
        }
        removed
    }

    /// Get the package-level relationships (from `_rels/.rels`).
    pub fn package_rels(&self) -> Result<Relationships> {
        let root = PackURI::new(PACKAGE_URI)?;
        self.rels(&root)
    }

    /// Get the relationships of a part.
    ///
    /// A part without a `.rels` part has an empty collection. Targets resolve
    /// against the part's base URI; the package root resolves against "/".
    pub fn rels(&self, source: &PackURI) -> Result<Relationships> {
        let rels_uri = source.rels_uri()?;
        match self.entries.get(rels_uri.membername()) {
            Some(entry) => Relationships::from_xml(&entry.bytes, source.base_uri()),
            None => Ok(Relationships::new(source.base_uri().to_string())),
        }
    }

    /// Remove one relationship from a part's `.rels` and store it back.
    pub fn delete_relationship(&mut self, source: &PackURI, r_id: &str) -> Result<()> {
        let mut rels = self.rels(source)?;
        if rels.remove(r_id).is_none() {
            return Err(OpcError::RelationshipNotFound(format!(
                "'{}' on {}",
                r_id, source
            )));
        }
        let rels_uri = source.rels_uri()?;
        let xml = rels.to_xml()?;
        self.set_part_bytes(&rels_uri, xml);
        Ok(())
    }

    /// Iterate all part membernames in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| name.as_str())
    }

    /// Serialize the container, rewriting modified entries and copying
    /// untouched ones through unchanged.
    pub fn save(&self) -> Result<Vec<u8>> {
        let content_types = if self.parts_deleted {
            self.rebuilt_content_types()?
        } else {
            None
        };

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let ct_membername = &CONTENT_TYPES_URI[1..];
        for (name, entry) in &self.entries {
            writer.start_file(name.as_str(), options)?;
            match &content_types {
                Some(ct) if name == ct_membername => writer.write_all(ct)?,
                _ => writer.write_all(&entry.bytes)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Rebuild `[Content_Types].xml` without overrides for deleted parts.
    fn rebuilt_content_types(&self) -> Result<Option<Vec<u8>>> {
        let ct_membername = &CONTENT_TYPES_URI[1..];
        let Some(entry) = self.entries.get(ct_membername) else {
            return Ok(None);
        };

        let mut reader = Reader::from_reader(entry.bytes.as_slice());
        reader.config_mut().trim_text(true);
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => break,
                Ok(event @ (Event::Empty(_) | Event::Start(_))) => {
                    let keep = match &event {
                        Event::Empty(e) | Event::Start(e)
                            if e.local_name().as_ref() == b"Override" =>
                        {
                            self.override_target_exists(e)?
                        }
                        _ => true,
                    };
                    if keep {
                        writer.write_event(event)?;
                    }
                }
                Ok(event) => writer.write_event(event)?,
                Err(e) => return Err(OpcError::XmlError(e.to_string())),
            }
            buf.clear();
        }

        Ok(Some(writer.into_inner().into_inner()))
    }

    fn override_target_exists(&self, elem: &quick_xml::events::BytesStart<'_>) -> Result<bool> {
        for attr in elem.attributes() {
            let attr = attr?;
            if attr.key.as_ref() == b"PartName" {
                let partname = attr.unescape_value()?;
                let exists = self.entries.contains_key(partname.trim_start_matches('/'));
                if !exists {
                    debug!("dropping content-type override for deleted part {}", partname);
                }
                return Ok(exists);
            }
        }
        Ok(true)
    }
}
