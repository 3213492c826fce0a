//! Minimal PPTX packages for tests.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/></Types>"#;

const SLIDE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Builds a small but structurally valid presentation.
pub(crate) struct PptxBuilder {
    slides: Vec<String>,
    reversed: bool,
}

impl PptxBuilder {
    pub fn new() -> Self {
        Self {
            slides: Vec::new(),
            reversed: false,
        }
    }

    /// Add a slide with a single run holding `run_xml`.
    pub fn slide(mut self, run_xml: &str) -> Self {
        self.slides.push(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody><a:bodyPr/><a:p><a:r>{}</a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            run_xml
        ));
        self
    }

    /// List the slides in reverse order in presentation.xml.
    pub fn reversed_order(mut self) -> Self {
        self.reversed = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        let mut ids = Vec::new();
        for n in 1..=self.slides.len() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="{SLIDE_REL_TYPE}" Target="slides/slide{n}.xml"/>"#
            ));
            ids.push(format!(r#"<p:sldId id="{}" r:id="rId{n}"/>"#, 255 + n));
        }
        rels.push_str("</Relationships>");
        if self.reversed {
            ids.reverse();
        }

        let presentation = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
            ids.concat()
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().last_modified_time(zip::DateTime::default());
        let mut add = |name: &str, body: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        };

        add("[Content_Types].xml", CONTENT_TYPES);
        add("ppt/presentation.xml", &presentation);
        add("ppt/_rels/presentation.xml.rels", &rels);
        for (idx, slide) in self.slides.iter().enumerate() {
            add(&format!("ppt/slides/slide{}.xml", idx + 1), slide);
        }
        add("docProps/app.xml", "<Properties/>");

        zip.finish().unwrap().into_inner()
    }
}
