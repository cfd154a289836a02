//! Shared test fixtures for slidefill crates
//!
//! Builds small but structurally valid PPTX packages in memory so tests do
//! not depend on binary files.

use std::io::Cursor;

use quick_xml::escape::partial_escape;

use crate::constants::{NS_DRAWING, NS_PRESENTATION, NS_RELATIONSHIPS};
use crate::package::{PptxPackage, CONTENT_TYPES_PATH};

/// Wrap shape XML into a complete slide part
pub fn slide_xml(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION, shapes
    )
}

/// A text box whose single paragraph holds one run per entry of `runs`
///
/// Odd-numbered runs are bold so tests can tell run styles apart.
pub fn text_box(id: u32, runs: &[&str]) -> String {
    let runs: String = runs
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let bold = if i % 2 == 1 { r#" b="1""# } else { "" };
            format!(
                r#"<a:r><a:rPr lang="en-US"{}/><a:t>{}</a:t></a:r>"#,
                bold,
                partial_escape(*text)
            )
        })
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p>{runs}</a:p></p:txBody></p:sp>"#
    )
}

/// A table frame; each inner slice is one physical row of single-run cells
pub fn table_frame(id: u32, rows: &[&[&str]]) -> String {
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let grid: String = (0..columns).map(|_| r#"<a:gridCol w="1828800"/>"#).collect();
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|text| {
                    format!(
                        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>"#,
                        partial_escape(*text)
                    )
                })
                .collect();
            format!(r#"<a:tr h="370840">{}</a:tr>"#, cells)
        })
        .collect();
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1"/><a:tblGrid>{grid}</a:tblGrid>{body}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#
    )
}

/// A slide with a single text box holding `text` in one run
pub fn text_slide(text: &str) -> String {
    slide_xml(&text_box(2, &[text]))
}

/// Build a minimal presentation containing the given slide parts
///
/// Every slide links to the single layout and to its own notes slide.
pub fn minimal_pptx<S: AsRef<str>>(slides: &[S]) -> Vec<u8> {
    let mut package = PptxPackage::new();

    let mut overrides = String::new();
    let mut pres_rels = String::from(
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
    );
    let mut slide_ids = String::new();

    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        package.set_string(format!("ppt/slides/slide{}.xml", n), slide.as_ref());
        package.set_string(
            format!("ppt/slides/_rels/slide{}.xml.rels", n),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="../notesSlides/notesSlide{n}.xml"/></Relationships>"#
            ),
        );
        package.set_string(
            format!("ppt/notesSlides/notesSlide{}.xml", n),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree/></p:cSld></p:notes>"#,
                NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
            ),
        );

        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/><Override PartName="/ppt/notesSlides/notesSlide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml"/>"#
        ));
        pres_rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
            n + 1,
            n
        ));
        slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1));
    }

    package.set_string(
        CONTENT_TYPES_PATH,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>{}</Types>"#,
            overrides
        ),
    );

    package.set_string(
        "_rels/.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#,
    );

    let slide_list = if slide_ids.is_empty() {
        String::new()
    } else {
        format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids)
    };
    package.set_string(
        "ppt/presentation.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{}<p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION, slide_list
        ),
    );

    package.set_string(
        "ppt/_rels/presentation.xml.rels",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            pres_rels
        ),
    );

    package.set_string(
        "ppt/slideMasters/slideMaster1.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree/></p:cSld></p:sldMaster>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
        ),
    );
    package.set_string(
        "ppt/slideLayouts/slideLayout1.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" type="blank"><p:cSld name="Blank"><p:spTree/></p:cSld></p:sldLayout>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
        ),
    );

    let mut buffer = Cursor::new(Vec::new());
    package
        .write_to(&mut buffer)
        .expect("writing an in-memory package cannot fail");
    buffer.into_inner()
}
