//! Presentation deck: ordered slides inside a PPTX package.
//!
//! The deck parses `presentation.xml`, its relationships and every slide part
//! listed in `p:sldIdLst`. Everything else in the package (masters, layouts,
//! media, theme) is carried through untouched on save.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tracing::debug;

use crate::constants::NS_RELATIONSHIPS;
use crate::error::{PptxError, Result};
use crate::package::{PptxPackage, CONTENT_TYPES_PATH};
use crate::relationships::{rels_path_for, resolve_target, Relationships};
use crate::slide::Slide;
use crate::xml::{Element, XmlDocument};

/// Content type of a slide part
pub const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// Default location of the presentation part
const DEFAULT_PRESENTATION_PATH: &str = "ppt/presentation.xml";

/// First slide ID PowerPoint assigns
const MIN_SLIDE_ID: u32 = 256;

#[derive(Debug, Clone)]
struct SlideEntry {
    id: u32,
    rel_id: String,
    /// Qualified name of the attribute carrying `rel_id`, usually `r:id`
    rel_attr: String,
    part_name: String,
    rels: Relationships,
    slide: Slide,
}

/// An opened presentation
#[derive(Debug, Clone)]
pub struct Deck {
    package: PptxPackage,
    presentation_path: String,
    presentation: XmlDocument,
    presentation_rels: Relationships,
    slides: Vec<SlideEntry>,
    next_slide_id: u32,
    /// Relationship attribute name used for slides added to this deck
    rel_attr: String,
}

impl Deck {
    /// Open a PPTX/POTX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_package(PptxPackage::open(path)?)
    }

    /// Open a deck from in-memory bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    /// Open a deck from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_package(PptxPackage::from_reader(reader)?)
    }

    /// Build a deck from an unpacked package
    pub fn from_package(package: PptxPackage) -> Result<Self> {
        let presentation_path = find_presentation_path(&package)?;
        let presentation_xml = package
            .get(&presentation_path)
            .ok_or_else(|| PptxError::missing_part(&presentation_path))?;
        let presentation = XmlDocument::parse(presentation_xml)?;

        let pres_rels_path = rels_path_for(&presentation_path);
        let presentation_rels = match package.get(&pres_rels_path) {
            Some(bytes) => Relationships::parse(bytes)?,
            None => return Err(PptxError::missing_part(pres_rels_path)),
        };

        let mut slides = Vec::new();
        if let Some(list) = presentation.first_child(presentation.root(), "sldIdLst") {
            for node in presentation.children_named(list, "sldId") {
                let Some(element) = presentation.element(node) else {
                    continue;
                };
                let id = element
                    .attribute("id")
                    .and_then(|v| v.parse::<u32>().ok())
                    .ok_or_else(|| PptxError::invalid_package("slide entry without numeric id"))?;
                let (rel_attr, rel_id) = element
                    .attributes
                    .iter()
                    .find(|(key, _)| key.ends_with(":id"))
                    .cloned()
                    .ok_or_else(|| PptxError::invalid_package("slide entry without relationship"))?;
                let target = presentation_rels.get(&rel_id).ok_or_else(|| {
                    PptxError::invalid_package(format!("slide relationship {} not found", rel_id))
                })?;

                let part_name = resolve_target(&presentation_path, target);
                let xml = package
                    .get(&part_name)
                    .ok_or_else(|| PptxError::missing_part(&part_name))?;
                let slide = Slide::parse(xml)?;
                let rels = match package.get(&rels_path_for(&part_name)) {
                    Some(bytes) => Relationships::parse(bytes)?,
                    None => Relationships::new(),
                };

                slides.push(SlideEntry {
                    id,
                    rel_id,
                    rel_attr,
                    part_name,
                    rels,
                    slide,
                });
            }
        }

        let next_slide_id = slides
            .iter()
            .map(|entry| entry.id + 1)
            .max()
            .unwrap_or(MIN_SLIDE_ID)
            .max(MIN_SLIDE_ID);

        let rel_attr = match slides.first() {
            Some(entry) => entry.rel_attr.clone(),
            None => relationship_attribute(&presentation),
        };

        debug!(slides = slides.len(), "opened deck");

        Ok(Self {
            package,
            presentation_path,
            presentation,
            presentation_rels,
            slides,
            next_slide_id,
            rel_attr,
        })
    }

    /// Number of slides
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// True when the deck has no slides
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Slide at a 1-based position
    pub fn slide(&self, position: usize) -> Option<&Slide> {
        self.entry(position).map(|entry| &entry.slide)
    }

    /// Mutable slide at a 1-based position
    pub fn slide_mut(&mut self, position: usize) -> Option<&mut Slide> {
        let index = position.checked_sub(1)?;
        self.slides.get_mut(index).map(|entry| &mut entry.slide)
    }

    /// Relationships of the slide at a 1-based position
    pub fn slide_relationships(&self, position: usize) -> Option<&Relationships> {
        self.entry(position).map(|entry| &entry.rels)
    }

    /// Package path of the slide at a 1-based position
    pub fn slide_part_name(&self, position: usize) -> Option<&str> {
        self.entry(position).map(|entry| entry.part_name.as_str())
    }

    /// Slides in deck order
    pub fn slides(&self) -> impl Iterator<Item = &Slide> {
        self.slides.iter().map(|entry| &entry.slide)
    }

    fn entry(&self, position: usize) -> Option<&SlideEntry> {
        self.slides.get(position.checked_sub(1)?)
    }

    /// Append a slide at the end of the deck and return the new slide count
    ///
    /// The slide gets a fresh part name, slide ID and presentation
    /// relationship. `rels` becomes the slide's own relationship part.
    pub fn add_slide(&mut self, slide: Slide, rels: Relationships) -> usize {
        let number = self.next_part_number();
        let part_name = slide_part_path(presentation_dir(&self.presentation_path), number);
        let rel_id = self.presentation_rels.add(
            format!("slides/slide{}.xml", number),
            Relationships::TYPE_SLIDE,
        );

        let id = self.next_slide_id;
        self.next_slide_id += 1;

        debug!(part = %part_name, id, "added slide");
        self.slides.push(SlideEntry {
            id,
            rel_id,
            rel_attr: self.rel_attr.clone(),
            part_name,
            rels,
            slide,
        });
        self.slides.len()
    }

    /// Move the slide at 0-based index `from` so that it ends up at index `to`
    ///
    /// Implemented as remove-then-insert on the ordered slide sequence.
    pub fn move_slide(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.slides.len();
        if from >= len {
            return Err(PptxError::index_out_of_range(from + 1, len));
        }
        if to >= len {
            return Err(PptxError::index_out_of_range(to + 1, len));
        }
        let entry = self.slides.remove(from);
        self.slides.insert(to, entry);
        Ok(())
    }

    fn next_part_number(&self) -> usize {
        let dir = presentation_dir(&self.presentation_path);
        (1..)
            .find(|&n| {
                let candidate = slide_part_path(dir, n);
                !self.package.contains(&candidate)
                    && !self.slides.iter().any(|entry| entry.part_name == candidate)
            })
            .unwrap_or(1)
    }

    /// Save the deck to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }

    /// Serialize the deck to PPTX bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the deck as a PPTX package
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut package = self.package.clone();

        let mut content_types = match package.get(CONTENT_TYPES_PATH) {
            Some(bytes) => XmlDocument::parse(bytes)?,
            None => return Err(PptxError::missing_part(CONTENT_TYPES_PATH)),
        };

        for entry in &self.slides {
            package.set_string(entry.part_name.clone(), entry.slide.to_xml());

            let rels_path = rels_path_for(&entry.part_name);
            if !entry.rels.is_empty() || package.contains(&rels_path) {
                package.set_string(rels_path, entry.rels.to_xml());
            }
            ensure_override(&mut content_types, &entry.part_name, SLIDE_CONTENT_TYPE);
        }

        let mut presentation = self.presentation.clone();
        self.write_slide_list(&mut presentation);
        package.set_string(self.presentation_path.clone(), presentation.to_xml());
        package.set_string(
            rels_path_for(&self.presentation_path),
            self.presentation_rels.to_xml(),
        );
        package.set_string(CONTENT_TYPES_PATH, content_types.to_xml());

        package.write_to(writer)
    }

    /// Rebuild `p:sldIdLst` from the current slide order
    fn write_slide_list(&self, doc: &mut XmlDocument) {
        let root = doc.root();
        let list = match doc.first_child(root, "sldIdLst") {
            Some(list) => list,
            None => {
                let prefix = doc.element(root).and_then(Element::prefix).map(str::to_string);
                let index = doc
                    .children(root)
                    .iter()
                    .rposition(|&child| {
                        matches!(
                            doc.local_name(child),
                            Some("sldMasterIdLst" | "notesMasterIdLst" | "handoutMasterIdLst")
                        )
                    })
                    .map(|i| i + 1)
                    .unwrap_or(0);
                let list = doc.create_element(Element::new(qualified(prefix.as_deref(), "sldIdLst")));
                doc.insert_child(root, index, list);
                list
            }
        };

        let prefix = doc.element(list).and_then(Element::prefix).map(str::to_string);
        doc.clear_children(list);
        for entry in &self.slides {
            let node = doc.create_element(
                Element::new(qualified(prefix.as_deref(), "sldId"))
                    .with_attribute("id", entry.id.to_string())
                    .with_attribute(entry.rel_attr.clone(), entry.rel_id.clone()),
            );
            doc.append_child(list, node);
        }
    }
}

fn find_presentation_path(package: &PptxPackage) -> Result<String> {
    let from_rels = match package.get("_rels/.rels") {
        Some(bytes) => Relationships::parse(bytes)?
            .first_of_type(Relationships::TYPE_OFFICE_DOCUMENT)
            .map(|(_, rel)| resolve_target("", &rel.target)),
        None => None,
    };
    Ok(from_rels.unwrap_or_else(|| DEFAULT_PRESENTATION_PATH.to_string()))
}

fn presentation_dir(presentation_path: &str) -> &str {
    presentation_path
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("")
}

fn slide_part_path(dir: &str, number: usize) -> String {
    if dir.is_empty() {
        format!("slides/slide{}.xml", number)
    } else {
        format!("{}/slides/slide{}.xml", dir, number)
    }
}

/// `<prefix>:id` for the prefix the presentation root binds to the
/// relationships namespace, `r:id` when it binds none
fn relationship_attribute(presentation: &XmlDocument) -> String {
    let prefix = presentation.element(presentation.root()).and_then(|root| {
        root.attributes
            .iter()
            .find(|(key, value)| key.starts_with("xmlns:") && value == NS_RELATIONSHIPS)
            .map(|(key, _)| key["xmlns:".len()..].to_string())
    });
    qualified(Some(prefix.as_deref().unwrap_or("r")), "id")
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

fn ensure_override(doc: &mut XmlDocument, part_name: &str, content_type: &str) {
    let part = format!("/{}", part_name);
    let root = doc.root();
    let exists = doc
        .children_named(root, "Override")
        .any(|node| doc.attribute(node, "PartName") == Some(part.as_str()));
    if !exists {
        let node = doc.create_element(
            Element::new("Override")
                .with_attribute("PartName", part)
                .with_attribute("ContentType", content_type),
        );
        doc.append_child(root, node);
    }
}
