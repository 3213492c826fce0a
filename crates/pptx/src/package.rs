//! Reading the parts of a PPTX package.

use invite_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

pub(crate) const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// ZIP local file header magic (PK\x03\x04).
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Whether `bytes` starts like a ZIP archive.
pub(crate) fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZIP_MAGIC)
}

/// Read a part from the ZIP archive as UTF-8.
pub(crate) fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::Zip(format!("Part not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Get the slide part paths in presentation order.
///
/// The order comes from `p:sldIdLst` in presentation.xml, resolved through
/// the presentation relationships. Decks without a slide list fall back to
/// the numeric order of the relationship ids.
pub(crate) fn slide_parts<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let rels_content = read_part(archive, PRESENTATION_RELS_PART)?;
    let slide_rels = slide_relationships(&rels_content)?;

    let presentation = read_part(archive, PRESENTATION_PART)?;
    let ordered_ids = slide_id_list(&presentation)?;

    if !ordered_ids.is_empty() {
        return ordered_ids
            .iter()
            .map(|id| {
                slide_rels
                    .iter()
                    .find(|(rel_id, _)| rel_id == id)
                    .map(|(_, path)| path.clone())
                    .ok_or_else(|| Error::TemplateLoad(format!("Slide relationship '{}' not found", id)))
            })
            .collect();
    }

    let mut slides: Vec<(String, Option<usize>)> = slide_rels
        .into_iter()
        .map(|(id, path)| {
            let order = extract_number(&id).or_else(|| extract_number(&path));
            (path, order)
        })
        .collect();

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

/// Collect `(Id, part path)` for every slide relationship.
fn slide_relationships(rels_content: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(rels_content);
    reader.trim_text(true);
    let mut slides = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut id = String::new();

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        b"Id" => id = value,
                        _ => {}
                    }
                }

                if rel_type.ends_with("/slide") {
                    slides.push((id, resolve_target(&target)));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(slides)
}

/// Collect the `r:id` of every `p:sldId`, in document order.
fn slide_id_list(presentation: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(presentation);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                for attr in e.attributes().flatten() {
                    if local_name(attr.key.as_ref()) == b"id" && attr.key.as_ref() != b"id" {
                        ids.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing presentation.xml: {}", e)));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Resolve a relationship target (relative to `ppt/`) to a part path.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

/// Extract the local name from a potentially namespaced XML name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a trailing number from a string like "rId2" or "slides/slide3.xml".
fn extract_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml");
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.chars().rev().collect::<String>().parse().ok()
}
