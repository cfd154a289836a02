//! Slide content model.
//!
//! A [`Slide`] owns the parsed XML of one slide part. Shapes, tables, text
//! containers and runs are exposed as lightweight handles into that arena.
//! Handles stay valid as long as the slide's structure is not changed; text
//! edits through [`Slide::set_run_text`] never invalidate them.

use crate::constants::{NS_DRAWING, NS_PRESENTATION, NS_RELATIONSHIPS};
use crate::error::{PptxError, Result};
use crate::xml::{Element, NodeId, XmlDocument};

/// Kind of a shape node in the shape tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// `p:sp`: text box, placeholder or preset geometry
    AutoShape,
    /// `p:grpSp`: container of nested shapes
    Group,
    /// `p:graphicFrame`: tables, charts, diagrams
    GraphicFrame,
    /// `p:pic`
    Picture,
    /// `p:cxnSp`
    Connector,
    /// Anything else (content parts, alternate content, ...)
    Other,
}

impl ShapeKind {
    fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "sp" => Some(Self::AutoShape),
            "grpSp" => Some(Self::Group),
            "graphicFrame" => Some(Self::GraphicFrame),
            "pic" => Some(Self::Picture),
            "cxnSp" => Some(Self::Connector),
            // Group-level properties are not shapes
            "nvGrpSpPr" | "grpSpPr" | "extLst" => None,
            _ => Some(Self::Other),
        }
    }
}

/// A shape in the slide's shape tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub node: NodeId,
    pub kind: ShapeKind,
}

/// A text body (`p:txBody` or `a:txBody`): ordered paragraphs of runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextContainer(NodeId);

impl TextContainer {
    pub fn node(&self) -> NodeId {
        self.0
    }
}

/// A styled run (`a:r`): run properties plus raw text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run(NodeId);

impl Run {
    pub fn node(&self) -> NodeId {
        self.0
    }
}

/// A table cell (`a:tc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    node: NodeId,
    text: Option<TextContainer>,
}

impl Cell {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The cell's text body, if present
    pub fn text_container(&self) -> Option<TextContainer> {
        self.text
    }
}

/// A table (`a:tbl`) as rows of cells in physical order
///
/// Row 0 is the first `a:tr`. Merged cells still have their own `a:tc`
/// entries, so indexing is purely positional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    node: NodeId,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Number of physical rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (widest row)
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cells of one row
    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Cell at (row, column)
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// One slide: an owned XML arena with a shape tree
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    doc: XmlDocument,
    tree: NodeId,
}

impl Slide {
    /// Parse a slide part
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        let tree = doc
            .find_path(doc.root(), &["cSld", "spTree"])
            .ok_or_else(|| PptxError::invalid_package("slide has no shape tree"))?;
        Ok(Self { doc, tree })
    }

    /// A new slide with an empty shape tree and no background
    pub fn blank() -> Self {
        let mut doc = XmlDocument::with_root(
            Element::new("p:sld")
                .with_attribute("xmlns:a", NS_DRAWING)
                .with_attribute("xmlns:r", NS_RELATIONSHIPS)
                .with_attribute("xmlns:p", NS_PRESENTATION),
        );
        let root = doc.root();
        let c_sld = append(&mut doc, root, Element::new("p:cSld"));
        let tree = append(&mut doc, c_sld, Element::new("p:spTree"));

        let nv = append(&mut doc, tree, Element::new("p:nvGrpSpPr"));
        append(
            &mut doc,
            nv,
            Element::new("p:cNvPr")
                .with_attribute("id", "1")
                .with_attribute("name", ""),
        );
        append(&mut doc, nv, Element::new("p:cNvGrpSpPr"));
        append(&mut doc, nv, Element::new("p:nvPr"));
        append(&mut doc, tree, Element::new("p:grpSpPr"));

        let clr = append(&mut doc, root, Element::new("p:clrMapOvr"));
        append(&mut doc, clr, Element::new("a:masterClrMapping"));

        Self { doc, tree }
    }

    /// The underlying XML arena
    pub fn document(&self) -> &XmlDocument {
        &self.doc
    }

    /// Serialize the slide part
    pub fn to_xml(&self) -> String {
        self.doc.to_xml()
    }

    /// The `p:spTree` node
    pub fn shape_tree(&self) -> NodeId {
        self.tree
    }

    /// Top-level shapes in z-order
    pub fn shapes(&self) -> Vec<Shape> {
        self.shapes_in(self.tree)
    }

    fn shapes_in(&self, container: NodeId) -> Vec<Shape> {
        self.doc
            .child_elements(container)
            .filter_map(|node| {
                let kind = ShapeKind::from_local_name(self.doc.local_name(node)?)?;
                Some(Shape { node, kind })
            })
            .collect()
    }

    /// Every shape in the tree, descending into groups, in document order
    pub fn all_shapes(&self) -> Vec<Shape> {
        let mut found = Vec::new();
        let mut pending: Vec<Shape> = self.shapes().into_iter().rev().collect();
        while let Some(shape) = pending.pop() {
            found.push(shape);
            if shape.kind == ShapeKind::Group {
                pending.extend(self.shapes_in(shape.node).into_iter().rev());
            }
        }
        found
    }

    /// Text bodies of auto shapes (text boxes, placeholders), groups included
    ///
    /// Table cells are not free-standing and are reached through
    /// [`Slide::tables`].
    pub fn text_containers(&self) -> Vec<TextContainer> {
        self.all_shapes()
            .into_iter()
            .filter(|shape| shape.kind == ShapeKind::AutoShape)
            .filter_map(|shape| self.doc.first_child(shape.node, "txBody"))
            .map(TextContainer)
            .collect()
    }

    /// Tables held by graphic frames, groups included
    pub fn tables(&self) -> Vec<Table> {
        self.all_shapes()
            .into_iter()
            .filter(|shape| shape.kind == ShapeKind::GraphicFrame)
            .filter_map(|shape| {
                self.doc
                    .find_path(shape.node, &["graphic", "graphicData", "tbl"])
            })
            .map(|tbl| self.read_table(tbl))
            .collect()
    }

    fn read_table(&self, tbl: NodeId) -> Table {
        let rows = self
            .doc
            .children_named(tbl, "tr")
            .map(|tr| {
                self.doc
                    .children_named(tr, "tc")
                    .map(|tc| Cell {
                        node: tc,
                        text: self.doc.first_child(tc, "txBody").map(TextContainer),
                    })
                    .collect()
            })
            .collect();
        Table { node: tbl, rows }
    }

    /// Runs of a text container, paragraph by paragraph
    pub fn runs(&self, container: TextContainer) -> Vec<Run> {
        self.doc
            .children_named(container.0, "p")
            .flat_map(|p| self.doc.children_named(p, "r"))
            .map(Run)
            .collect()
    }

    /// Raw text of a run
    pub fn run_text(&self, run: Run) -> String {
        self.doc
            .first_child(run.0, "t")
            .map(|t| self.doc.text_content(t))
            .unwrap_or_default()
    }

    /// Replace the text of a run; run properties are left as they are
    pub fn set_run_text(&mut self, run: Run, text: &str) {
        let t = match self.doc.first_child(run.0, "t") {
            Some(t) => t,
            None => {
                let name = match self.doc.element(run.0).and_then(Element::prefix) {
                    Some(prefix) => format!("{}:t", prefix),
                    None => "t".to_string(),
                };
                let t = self.doc.create_element(Element::new(name));
                self.doc.append_child(run.0, t);
                t
            }
        };
        self.doc.set_text(t, text);
    }

    /// Serialized run (properties and text) for comparisons
    pub fn run_xml(&self, run: Run) -> String {
        self.doc.subtree_xml(run.0)
    }

    /// Visible text of a container: runs joined per paragraph, paragraphs by `\n`
    pub fn container_text(&self, container: TextContainer) -> String {
        self.doc
            .children_named(container.0, "p")
            .map(|p| {
                self.doc
                    .children_named(p, "r")
                    .map(|r| self.run_text(Run(r)))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replace this slide's shapes with deep copies of `source`'s shapes
    ///
    /// Everything outside the shape tree (background, color mapping) stays as
    /// it is on this slide. Namespace declarations on the source root that
    /// this slide lacks are added to its root, together with `mc:Ignorable`,
    /// so extension markup inside the copied shapes stays bound.
    pub fn copy_shapes_from(&mut self, source: &Slide) {
        let carried: Vec<(String, String)> = source
            .doc
            .element(source.doc.root())
            .map(|root| {
                root.attributes
                    .iter()
                    .filter(|(key, _)| is_root_declaration(key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let root = self.doc.root();
        if let Some(element) = self.doc.element_mut(root) {
            for (key, value) in carried {
                if element.attribute(&key).is_none() {
                    element.attributes.push((key, value));
                }
            }
        }

        self.doc.clear_children(self.tree);
        for &child in source.doc.children(source.tree) {
            let copy = self.doc.import(&source.doc, child);
            self.doc.append_child(self.tree, copy);
        }
    }
}

fn is_root_declaration(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:") || key == "mc:Ignorable"
}

fn append(doc: &mut XmlDocument, parent: NodeId, element: Element) -> NodeId {
    let id = doc.create_element(element);
    doc.append_child(parent, id);
    id
}
