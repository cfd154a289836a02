//! Relationship parts (`_rels/*.rels`) for presentation and slide parts.
//!
//! A slide refers to its layout, images and hyperlinks through relationship
//! IDs. When a slide is cloned, the copy keeps the same IDs so the shape tree
//! it carries still resolves.

use std::collections::HashMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;

/// OOXML namespace for relationships
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Common relationship type URIs
impl Relationships {
    /// Office document (presentation.xml) relationship type
    pub const TYPE_OFFICE_DOCUMENT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    /// Slide relationship type
    pub const TYPE_SLIDE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    /// Slide layout relationship type
    pub const TYPE_SLIDE_LAYOUT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    /// Notes slide relationship type
    pub const TYPE_NOTES_SLIDE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
    /// Image relationship type
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    /// Hyperlink relationship type
    pub const TYPE_HYPERLINK: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    /// Chart relationship type
    pub const TYPE_CHART: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";
}

/// Parsed relationships from a .rels file
///
/// Maintains insertion order for deterministic XML serialization.
#[derive(Debug, Clone)]
pub struct Relationships {
    order: Vec<String>,
    map: HashMap<String, RelationshipTarget>,
    next_id_counter: u32,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            map: HashMap::new(),
            next_id_counter: 1,
        }
    }
}

/// A relationship target with its type and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTarget {
    /// The target URL or part path (relative to the source part)
    pub target: String,
    /// The relationship type URI
    pub rel_type: String,
    /// Target mode: "External" for URLs, None for internal parts
    pub target_mode: Option<String>,
}

impl Relationships {
    /// Create an empty relationships map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse relationships from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::new();
        let mut max_id: u32 = 0;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e)
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;
                    let mut target_mode = None;

                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.as_ref() {
                            b"Id" => id = Some(value),
                            b"Target" => target = Some(value),
                            b"Type" => rel_type = Some(value),
                            b"TargetMode" => target_mode = Some(value),
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(target)) = (id, target) {
                        if let Some(num) = extract_id_number(&id) {
                            max_id = max_id.max(num);
                        }
                        rels.order.push(id.clone());
                        rels.map.insert(
                            id,
                            RelationshipTarget {
                                target,
                                rel_type: rel_type.unwrap_or_default(),
                                target_mode,
                            },
                        );
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        rels.next_id_counter = max_id + 1;
        Ok(rels)
    }

    /// Add a new internal relationship and return the generated ID
    pub fn add(&mut self, target: impl Into<String>, rel_type: impl Into<String>) -> String {
        let id = self.peek_next_id();
        self.next_id_counter += 1;

        self.order.push(id.clone());
        self.map.insert(
            id.clone(),
            RelationshipTarget {
                target: target.into(),
                rel_type: rel_type.into(),
                target_mode: None,
            },
        );

        id
    }

    /// Copy the relationships accepted by `keep`, preserving their IDs
    ///
    /// Shape trees reference relationships by ID, so a filtered copy must not
    /// renumber anything.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&RelationshipTarget) -> bool,
    {
        let mut copy = Self {
            next_id_counter: self.next_id_counter,
            ..Self::default()
        };
        for (id, rel) in self.iter() {
            if keep(rel) {
                copy.order.push(id.to_string());
                copy.map.insert(id.to_string(), rel.clone());
            }
        }
        copy
    }

    /// Serialize relationships to OOXML format
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS));

        for (id, rel) in self.iter() {
            xml.push_str("<Relationship");
            xml.push_str(&format!(r#" Id="{}""#, escape(id)));
            xml.push_str(&format!(r#" Type="{}""#, escape(rel.rel_type.as_str())));
            xml.push_str(&format!(r#" Target="{}""#, escape(rel.target.as_str())));
            if let Some(mode) = &rel.target_mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape(mode.as_str())));
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Get the target for a relationship ID
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(|r| r.target.as_str())
    }

    /// Get the full relationship target for an ID
    pub fn get_target(&self, id: &str) -> Option<&RelationshipTarget> {
        self.map.get(id)
    }

    /// Find the first relationship of the given type
    pub fn first_of_type(&self, rel_type: &str) -> Option<(&str, &RelationshipTarget)> {
        self.iter().find(|(_, rel)| rel.rel_type == rel_type)
    }

    /// Get the number of relationships
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if there are no relationships
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over relationships in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id).map(|rel| (id.as_str(), rel)))
    }

    /// Get the next ID that would be generated (without incrementing)
    pub fn peek_next_id(&self) -> String {
        format!("rId{}", self.next_id_counter)
    }
}

/// Extract the numeric portion from a relationship ID (e.g., "rId5" -> 5)
fn extract_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))
        .and_then(|num_str| num_str.parse().ok())
}

/// Resolve a relationship target against the part that owns the relationship
///
/// `ppt/slides/slide1.xml` + `../slideLayouts/slideLayout2.xml` resolves to
/// `ppt/slideLayouts/slideLayout2.xml`. Absolute targets drop their leading
/// slash.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = source_part.split('/').collect();
    // Drop the file name of the source part
    segments.pop();

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Path of the relationship part that belongs to `part`
///
/// `ppt/slides/slide3.xml` -> `ppt/slides/_rels/slide3.xml.rels`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}
