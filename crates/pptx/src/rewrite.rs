//! Placeholder substitution inside a slide part.
//!
//! The part is streamed through a quick-xml reader and writer. Only `a:t`
//! text nodes containing the marker are rewritten; every other event is
//! written back as read. Runs (`a:r`) are buffered until their end tag so
//! their `a:rPr` can be restyled when the marker was found inside them.

use crate::package::local_name;
use invite_core::{Error, Result, RunStyle, Substitution};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// A rewritten part and how many markers it replaced.
#[derive(Debug)]
pub(crate) struct PartRewrite {
    pub xml: Vec<u8>,
    pub replacements: usize,
}

/// Replace every occurrence of the marker in the text of `xml`.
pub(crate) fn substitute_part(xml: &str, substitution: &Substitution<'_>) -> Result<PartRewrite> {
    if substitution.placeholder.is_empty() {
        return Ok(PartRewrite {
            xml: xml.as_bytes().to_vec(),
            replacements: 0,
        });
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 64));
    let mut run: Option<RunBuffer> = None;
    let mut in_text = false;
    let mut replacements = 0;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Xml(format!("Error at position {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(e) if local_name(e.name().as_ref()) == b"r" && run.is_none() => {
                run = Some(RunBuffer::new(e.into_owned()));
            }
            Event::Start(e) => {
                if local_name(e.name().as_ref()) == b"t" {
                    in_text = true;
                }
                emit(&mut writer, &mut run, Event::Start(e))?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"r" && run.is_some() => {
                if let Some(mut buffered) = run.take() {
                    buffered.events.push(Event::End(e.into_owned()));
                    let events = match substitution.style {
                        Some(style) if buffered.matched => restyle_run(buffered.events, style)?,
                        _ => buffered.events,
                    };
                    for event in events {
                        write(&mut writer, event)?;
                    }
                }
            }
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"t" {
                    in_text = false;
                }
                emit(&mut writer, &mut run, Event::End(e))?;
            }
            Event::Text(e) if in_text => {
                let rewritten = {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::Xml(format!("Bad text content: {}", err)))?;
                    let count = text.matches(substitution.placeholder).count();
                    (count > 0).then(|| (count, text.replace(substitution.placeholder, substitution.value)))
                };
                match rewritten {
                    None => emit(&mut writer, &mut run, Event::Text(e))?,
                    Some((count, replaced)) => {
                        replacements += count;
                        if let Some(buffered) = run.as_mut() {
                            buffered.matched = true;
                        }
                        emit(&mut writer, &mut run, Event::Text(BytesText::new(&replaced)))?;
                    }
                }
            }
            Event::Eof => break,
            other => emit(&mut writer, &mut run, other)?,
        }
    }

    Ok(PartRewrite {
        xml: writer.into_inner(),
        replacements,
    })
}

/// Events of one `a:r` element, held until its end tag.
struct RunBuffer {
    events: Vec<Event<'static>>,
    matched: bool,
}

impl RunBuffer {
    fn new(start: BytesStart<'static>) -> Self {
        Self {
            events: vec![Event::Start(start)],
            matched: false,
        }
    }
}

/// Write an event, or buffer it while inside a run.
fn emit(writer: &mut Writer<Vec<u8>>, run: &mut Option<RunBuffer>, event: Event<'_>) -> Result<()> {
    match run {
        Some(buffered) => {
            buffered.events.push(event.into_owned());
            Ok(())
        }
        None => write(writer, event),
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Xml(format!("Failed to write XML: {}", e)))
}

/// Child elements of `a:rPr`, in schema order. Unknown children sort with
/// the fill group so they keep their relative position.
const RPR_CHILD_ORDER: &[&[u8]] = &[
    b"ln",
    b"noFill|solidFill|gradFill|blipFill|pattFill|grpFill",
    b"effectLst|effectDag",
    b"highlight",
    b"uLnTx|uLn",
    b"uFillTx|uFill",
    b"latin",
    b"ea",
    b"cs",
    b"sym",
    b"hlinkClick",
    b"hlinkMouseOver",
    b"rtl",
    b"extLst",
];

const LATIN_RANK: usize = 6;
const CS_RANK: usize = 8;

fn child_rank(name: &[u8]) -> usize {
    RPR_CHILD_ORDER
        .iter()
        .position(|group| group.split(|&b| b == b'|').any(|n| n == name))
        .unwrap_or(1)
}

/// One child element of `a:rPr` with all its nested events.
struct Child {
    rank: usize,
    events: Vec<Event<'static>>,
}

/// Apply `style` to the run properties of a buffered run.
///
/// `events` starts with the run's start tag and ends with its end tag.
fn restyle_run(mut events: Vec<Event<'static>>, style: &RunStyle) -> Result<Vec<Event<'static>>> {
    let prefix = match events.first() {
        Some(Event::Start(start)) => element_prefix(start),
        _ => String::new(),
    };

    let rpr_at = events.iter().position(|e| match e {
        Event::Start(s) | Event::Empty(s) => local_name(s.name().as_ref()) == b"rPr",
        _ => false,
    });

    let (start, children, tail) = match rpr_at {
        Some(idx) => match events[idx].clone() {
            Event::Empty(start) => {
                let tail = events.split_off(idx + 1);
                events.pop();
                (start, Vec::new(), tail)
            }
            Event::Start(start) => {
                let end = events[idx..]
                    .iter()
                    .position(|e| matches!(e, Event::End(end) if local_name(end.name().as_ref()) == b"rPr"))
                    .map(|offset| idx + offset)
                    .ok_or_else(|| Error::Xml("Unterminated a:rPr".to_string()))?;
                let tail = events.split_off(end + 1);
                let inner: Vec<Event<'static>> = events.drain(idx + 1..end).collect();
                events.truncate(idx);
                (start, split_children(inner), tail)
            }
            _ => unreachable!("position only matches start and empty tags"),
        },
        None => {
            let tail = events.split_off(1);
            (BytesStart::new(format!("{}rPr", prefix)), Vec::new(), tail)
        }
    };

    let start = with_size(&start, style.size_hundredths())?;
    let mut children = children;

    if let Some(typeface) = style.typeface.as_deref() {
        children.retain(|c| c.rank != LATIN_RANK && c.rank != CS_RANK);
        children.push(font_child(&prefix, "latin", LATIN_RANK, typeface));
        children.push(font_child(&prefix, "cs", CS_RANK, typeface));
        children.sort_by_key(|c| c.rank);
    }

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    if children.is_empty() {
        events.push(Event::Empty(start));
    } else {
        events.push(Event::Start(start));
        events.extend(children.into_iter().flat_map(|c| c.events));
        events.push(Event::End(BytesEnd::new(name)));
    }
    events.extend(tail);

    Ok(events)
}

/// Group the events inside `a:rPr` by child element. Whitespace between
/// children is dropped.
fn split_children(inner: Vec<Event<'static>>) -> Vec<Child> {
    let mut children = Vec::new();
    let mut current: Option<Child> = None;
    let mut depth = 0usize;

    for event in inner {
        let rank = match &event {
            Event::Start(s) | Event::Empty(s) => child_rank(local_name(s.name().as_ref())),
            _ => 0,
        };
        let is_start = matches!(event, Event::Start(_));

        if depth == 0 {
            match event {
                Event::Text(_) => continue,
                Event::Empty(_) => {
                    children.push(Child {
                        rank,
                        events: vec![event],
                    });
                    continue;
                }
                Event::Start(_) => {
                    current = Some(Child {
                        rank,
                        events: Vec::new(),
                    });
                }
                _ => {}
            }
        }

        if is_start {
            depth += 1;
        } else if matches!(event, Event::End(_)) {
            depth = depth.saturating_sub(1);
        }

        if let Some(child) = current.as_mut() {
            child.events.push(event);
        }
        if depth == 0 {
            if let Some(child) = current.take() {
                children.push(child);
            }
        }
    }

    children
}

fn font_child(prefix: &str, name: &str, rank: usize, typeface: &str) -> Child {
    let mut font = BytesStart::new(format!("{}{}", prefix, name));
    font.push_attribute(("typeface", typeface));
    Child {
        rank,
        events: vec![Event::Empty(font)],
    }
}

/// Copy a start tag, replacing its `sz` attribute when a size is given.
fn with_size(start: &BytesStart<'_>, size: Option<u32>) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(format!("Bad attribute: {}", e)))?;
        if size.is_some() && attr.key.as_ref() == b"sz" {
            continue;
        }
        out.push_attribute(attr);
    }
    if let Some(sz) = size {
        out.push_attribute(("sz", sz.to_string().as_str()));
    }
    Ok(out.into_owned())
}

/// Namespace prefix of an element, including the colon (`"a:"`).
fn element_prefix(start: &BytesStart<'_>) -> String {
    let name = start.name();
    let name = name.as_ref();
    match name.iter().position(|&b| b == b':') {
        Some(pos) => String::from_utf8_lossy(&name[..=pos]).into_owned(),
        None => String::new(),
    }
}
