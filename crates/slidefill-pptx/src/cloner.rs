//! Structural slide duplication.
//!
//! A copy is a fresh blank slide whose shape tree is a deep copy of the
//! source's shape tree. Only the relationships the copied shapes need to
//! resolve (layout, images, hyperlinks) are carried over; notes, charts,
//! embedded media and comments stay with the source slide.

use tracing::debug;

use crate::deck::Deck;
use crate::error::{PptxError, Result};
use crate::relationships::Relationships;
use crate::slide::Slide;

/// Relationship types a copied slide keeps
pub const CLONED_RELATIONSHIP_TYPES: &[&str] = &[
    Relationships::TYPE_SLIDE_LAYOUT,
    Relationships::TYPE_IMAGE,
    Relationships::TYPE_HYPERLINK,
];

/// Build an independent copy of `source` and the relationships it keeps
pub fn copy_slide(source: &Slide, source_rels: &Relationships) -> (Slide, Relationships) {
    let mut copy = Slide::blank();
    copy.copy_shapes_from(source);
    let rels = source_rels.filtered(|rel| CLONED_RELATIONSHIP_TYPES.contains(&rel.rel_type.as_str()));
    (copy, rels)
}

/// Insert `count` copies of the slide at 1-based `source_position` right
/// after it, in order, and return the new slide count.
///
/// The source slide is left unmodified. A position outside
/// `[1, deck.len()]` is reported as [`PptxError::IndexOutOfRange`] and leaves
/// the deck unchanged.
pub fn duplicate(deck: &mut Deck, source_position: usize, count: usize) -> Result<usize> {
    let len = deck.len();
    let (source, source_rels) = match (
        deck.slide(source_position),
        deck.slide_relationships(source_position),
    ) {
        (Some(slide), Some(rels)) => (slide.clone(), rels.clone()),
        _ => return Err(PptxError::index_out_of_range(source_position, len)),
    };

    let source_index = source_position - 1;
    for copy_index in 0..count {
        let (slide, rels) = copy_slide(&source, &source_rels);
        // New slides land at the end; pull each one up behind the previous copy
        let new_len = deck.add_slide(slide, rels);
        deck.move_slide(new_len - 1, source_index + 1 + copy_index)?;
    }

    debug!(
        source = source_position,
        count,
        slides = deck.len(),
        "duplicated slide"
    );
    Ok(deck.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{minimal_pptx, text_slide};

    fn deck(texts: &[&str]) -> Deck {
        let slides: Vec<String> = texts.iter().map(|t| text_slide(t)).collect();
        Deck::from_bytes(&minimal_pptx(&slides)).unwrap()
    }

    fn texts(deck: &Deck) -> Vec<String> {
        deck.slides()
            .map(|slide| slide.container_text(slide.text_containers()[0]))
            .collect()
    }

    #[test]
    fn test_duplicate_inserts_after_source() {
        let mut deck = deck(&["a", "b", "c", "d"]);
        let len = duplicate(&mut deck, 2, 2).unwrap();

        assert_eq!(len, 6);
        assert_eq!(texts(&deck), vec!["a", "b", "b", "b", "c", "d"]);
    }

    #[test]
    fn test_duplicate_last_slide() {
        let mut deck = deck(&["a", "b"]);
        duplicate(&mut deck, 2, 1).unwrap();
        assert_eq!(texts(&deck), vec!["a", "b", "b"]);
    }

    #[test]
    fn test_duplicate_zero_copies() {
        let mut deck = deck(&["a", "b"]);
        assert_eq!(duplicate(&mut deck, 1, 0).unwrap(), 2);
        assert_eq!(texts(&deck), vec!["a", "b"]);
    }

    #[test]
    fn test_out_of_range_leaves_deck_unchanged() {
        let mut deck = deck(&["a", "b"]);

        let err = duplicate(&mut deck, 3, 1).unwrap_err();
        assert!(matches!(err, PptxError::IndexOutOfRange { position: 3, len: 2 }));
        assert!(duplicate(&mut deck, 0, 1).is_err());
        assert_eq!(deck.len(), 2);
    }

    #[test]
    fn test_copies_are_independent() {
        let mut deck = deck(&["a", "[A]"]);
        duplicate(&mut deck, 2, 1).unwrap();

        let slide = deck.slide_mut(3).unwrap();
        let run = slide.runs(slide.text_containers()[0])[0];
        slide.set_run_text(run, "changed");

        assert_eq!(texts(&deck), vec!["a", "[A]", "changed"]);
    }

    #[test]
    fn test_copy_drops_notes_relationship() {
        let mut deck = deck(&["a"]);
        let source_rels = deck.slide_relationships(1).unwrap().clone();
        assert!(source_rels
            .first_of_type(Relationships::TYPE_NOTES_SLIDE)
            .is_some());

        duplicate(&mut deck, 1, 1).unwrap();
        let copy_rels = deck.slide_relationships(2).unwrap();
        assert!(copy_rels
            .first_of_type(Relationships::TYPE_NOTES_SLIDE)
            .is_none());
        assert_eq!(
            copy_rels.first_of_type(Relationships::TYPE_SLIDE_LAYOUT),
            source_rels.first_of_type(Relationships::TYPE_SLIDE_LAYOUT)
        );
        // The source keeps its notes
        assert!(deck
            .slide_relationships(1)
            .unwrap()
            .first_of_type(Relationships::TYPE_NOTES_SLIDE)
            .is_some());
    }

    #[test]
    fn test_copy_keeps_extension_namespaces() {
        let slide = text_slide("a")
            .replacen(
                "<p:sld ",
                r#"<p:sld xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" xmlns:a16="http://schemas.microsoft.com/office/drawing/2014/main" mc:Ignorable="a16" "#,
                1,
            )
            .replacen(
                r#"<p:cNvPr id="2" name="TextBox 2"/>"#,
                r#"<p:cNvPr id="2" name="TextBox 2"><a:extLst><a:ext uri="{FF2B5EF4-FFF2-40B4-BE49-F238E27FC236}"><a16:creationId id="{00000000-0000-0000-0000-000000000001}"/></a:ext></a:extLst></p:cNvPr>"#,
                1,
            );
        assert!(slide.contains("a16:creationId"));
        let mut deck = Deck::from_bytes(&minimal_pptx(&[slide])).unwrap();

        duplicate(&mut deck, 1, 1).unwrap();
        let xml = deck.slide(2).unwrap().to_xml();
        assert!(xml.contains("a16:creationId"));
        assert!(xml.contains(r#"xmlns:a16="http://schemas.microsoft.com/office/drawing/2014/main""#));
        assert!(xml.contains(r#"mc:Ignorable="a16""#));
        assert_eq!(xml.matches("xmlns:a=").count(), 1);

        let reopened = Deck::from_bytes(&deck.to_bytes().unwrap()).unwrap();
        assert_eq!(texts(&reopened), vec!["a", "a"]);
    }

    #[test]
    fn test_duplicated_deck_roundtrips() {
        let mut deck = deck(&["a", "b"]);
        duplicate(&mut deck, 1, 3).unwrap();

        let reopened = Deck::from_bytes(&deck.to_bytes().unwrap()).unwrap();
        assert_eq!(texts(&reopened), vec!["a", "a", "a", "a", "b"]);
    }
}
