//! # slidefill-pptx
//!
//! PresentationML plumbing for slidefill.
//!
//! This crate provides functionality to:
//! - Open PPTX/POTX packages and keep every part round-trippable
//! - Walk a slide's shape tree for text containers, runs and tables
//! - Duplicate a slide in place, producing independent copies
//!
//! ## Example
//!
//! ```no_run
//! use slidefill_pptx::{cloner, Deck};
//!
//! let mut deck = Deck::open("template.pptx")?;
//! cloner::duplicate(&mut deck, 2, 3)?;
//! deck.save("expanded.pptx")?;
//! # Ok::<(), slidefill_pptx::PptxError>(())
//! ```

pub mod cloner;
pub mod deck;
pub mod error;
pub mod package;
pub mod relationships;
pub mod slide;
pub mod xml;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use deck::Deck;
pub use error::{PptxError, Result};
pub use package::PptxPackage;
pub use relationships::Relationships;
pub use slide::{Cell, Run, Shape, ShapeKind, Slide, Table, TextContainer};
pub use xml::{NodeId, XmlDocument};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// OOXML namespaces used when building slide parts
pub mod constants {
    /// PresentationML namespace
    pub const NS_PRESENTATION: &str =
        "http://schemas.openxmlformats.org/presentationml/2006/main";

    /// DrawingML namespace
    pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

    /// Office document relationships namespace
    pub const NS_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
}
