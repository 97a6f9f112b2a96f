//! Splits a WordprocessingML part into markup, text and tags
//!
//! The part is never re-serialised: every item keeps the exact bytes it was
//! sliced from, so anything that is not a placeholder comes out unchanged.
//! Tags may be split over several `<w:t>` elements (Word does this whenever
//! formatting, spell checking or revision marks touch a word); a split tag is
//! reported at the position where it starts and its fragments are removed
//! from the following text elements.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, RenderError};

/// A lexed piece of a part
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    /// Markup emitted verbatim
    Markup(String),
    /// Opening `<w:p ...>` of a paragraph
    ParagraphStart(String),
    /// Closing `</w:p>`
    ParagraphEnd(String),
    /// Opening `<w:tr ...>` of a table row
    RowStart(String),
    /// Closing `</w:tr>`
    RowEnd(String),
    /// Opening `<w:tc ...>` of a table cell
    CellStart(String),
    /// Closing `</w:tc>`
    CellEnd(String),
    /// Opening `<w:t ...>`; `preserve` is set once a tag touched its text
    TextStart { raw: String, preserve: bool },
    /// Escaped text outside tags
    Literal(String),
    /// A placeholder tag
    Tag(Tag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    /// `{name}`
    Value,
    /// `{#name}`
    Section,
    /// `{^name}`
    Inverted,
    /// `{/name}` or `{/}`
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tag {
    pub kind: TagKind,
    pub name: String,
    /// Tag as written, for error messages
    pub source: String,
}

impl Item {
    /// Markup this item contributes when it is not a tag
    pub(crate) fn into_markup(self) -> String {
        match self {
            Item::Markup(s)
            | Item::ParagraphStart(s)
            | Item::ParagraphEnd(s)
            | Item::RowStart(s)
            | Item::RowEnd(s)
            | Item::CellStart(s)
            | Item::CellEnd(s)
            | Item::Literal(s) => s,
            Item::TextStart { raw, preserve } => {
                if preserve && !raw.contains("xml:space") {
                    format!("{} xml:space=\"preserve\">", raw.trim_end_matches('>'))
                } else {
                    raw
                }
            }
            Item::Tag(tag) => tag.source,
        }
    }
}

/// Structural slices of a part, before tag lexing
#[derive(Debug, Clone, Copy, PartialEq)]
enum Piece<'a> {
    Markup(&'a str),
    ParagraphStart(&'a str),
    ParagraphEnd(&'a str),
    RowStart(&'a str),
    RowEnd(&'a str),
    CellStart(&'a str),
    CellEnd(&'a str),
    TextStart(&'a str),
    Text(&'a str),
}

fn pieces(xml: &str) -> Result<Vec<Piece<'_>>, RenderError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut out = Vec::new();
    let mut cursor = 0usize;
    // Byte offsets of the open <w:t> tag and of its content
    let mut open_text: Option<(usize, usize)> = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| RenderError::Container(OoxmlError::Xml(e)))?;
        let after = reader.buffer_position() as usize;

        if let Some((tag_start, content_start)) = open_text {
            match event {
                Event::End(ref e) if e.name().as_ref() == b"w:t" => {
                    push_markup(&mut out, &xml[cursor..tag_start]);
                    out.push(Piece::TextStart(&xml[tag_start..content_start]));
                    out.push(Piece::Text(&xml[content_start..before]));
                    out.push(Piece::Markup(&xml[before..after]));
                    cursor = after;
                    open_text = None;
                }
                Event::Eof => {
                    return Err(RenderError::Container(OoxmlError::InvalidStructure(
                        "unterminated <w:t> element".to_string(),
                    )))
                }
                _ => {}
            }
            continue;
        }

        let raw = &xml[before..after];
        let structural = match event {
            Event::Start(ref e) if e.name().as_ref() == b"w:t" => {
                open_text = Some((before, after));
                None
            }
            Event::Start(ref e) => match e.name().as_ref() {
                b"w:p" => Some(Piece::ParagraphStart(raw)),
                b"w:tr" => Some(Piece::RowStart(raw)),
                b"w:tc" => Some(Piece::CellStart(raw)),
                _ => None,
            },
            Event::End(ref e) => match e.name().as_ref() {
                b"w:p" => Some(Piece::ParagraphEnd(raw)),
                b"w:tr" => Some(Piece::RowEnd(raw)),
                b"w:tc" => Some(Piece::CellEnd(raw)),
                _ => None,
            },
            Event::Eof => break,
            _ => None,
        };

        if let Some(piece) = structural {
            push_markup(&mut out, &xml[cursor..before]);
            out.push(piece);
            cursor = after;
        }
    }

    push_markup(&mut out, &xml[cursor..]);
    Ok(out)
}

fn push_markup<'a>(out: &mut Vec<Piece<'a>>, slice: &'a str) {
    if !slice.is_empty() {
        out.push(Piece::Markup(slice));
    }
}

struct OpenTag {
    slot: usize,
    content: String,
}

/// Lex a part into items, resolving tags split across text elements
pub(crate) fn lex(part: &str, xml: &str) -> Result<Vec<Item>, RenderError> {
    let mut items: Vec<Item> = Vec::new();
    let mut open: Option<OpenTag> = None;
    let mut last_text_start: Option<usize> = None;

    for piece in pieces(xml)? {
        match piece {
            Piece::Markup(s) => items.push(Item::Markup(s.to_string())),
            Piece::ParagraphStart(s) => items.push(Item::ParagraphStart(s.to_string())),
            Piece::ParagraphEnd(s) => {
                if let Some(tag) = &open {
                    return Err(RenderError::syntax(
                        part,
                        format!("tag '{{{}' is not closed within its paragraph", tag.content),
                    ));
                }
                items.push(Item::ParagraphEnd(s.to_string()));
            }
            Piece::RowStart(s) => items.push(Item::RowStart(s.to_string())),
            Piece::RowEnd(s) => items.push(Item::RowEnd(s.to_string())),
            Piece::CellStart(s) => items.push(Item::CellStart(s.to_string())),
            Piece::CellEnd(s) => items.push(Item::CellEnd(s.to_string())),
            Piece::TextStart(s) => {
                last_text_start = Some(items.len());
                items.push(Item::TextStart {
                    raw: s.to_string(),
                    preserve: false,
                });
            }
            Piece::Text(text) => {
                if open.is_some() {
                    mark_preserve(&mut items, last_text_start);
                }
                let mut literal_start = 0;
                for (i, c) in text.char_indices() {
                    match c {
                        '{' => {
                            if let Some(tag) = &open {
                                return Err(RenderError::syntax(
                                    part,
                                    format!("unexpected '{{' inside tag '{{{}'", tag.content),
                                ));
                            }
                            push_literal(&mut items, &text[literal_start..i]);
                            mark_preserve(&mut items, last_text_start);
                            open = Some(OpenTag {
                                slot: items.len(),
                                content: String::new(),
                            });
                            items.push(Item::Literal(String::new()));
                        }
                        '}' => {
                            if let Some(tag) = open.take() {
                                items[tag.slot] = Item::Tag(parse_tag(part, &tag.content)?);
                                literal_start = i + 1;
                            }
                        }
                        _ => {
                            if let Some(tag) = open.as_mut() {
                                tag.content.push(c);
                            }
                        }
                    }
                }
                if open.is_none() {
                    push_literal(&mut items, &text[literal_start..]);
                }
            }
        }
    }

    if let Some(tag) = open {
        return Err(RenderError::syntax(
            part,
            format!("unclosed tag '{{{}'", tag.content),
        ));
    }

    Ok(items)
}

fn push_literal(items: &mut Vec<Item>, text: &str) {
    if !text.is_empty() {
        items.push(Item::Literal(text.to_string()));
    }
}

fn mark_preserve(items: &mut [Item], index: Option<usize>) {
    if let Some(Item::TextStart { preserve, .. }) = index.and_then(|i| items.get_mut(i)) {
        *preserve = true;
    }
}

fn parse_tag(part: &str, raw: &str) -> Result<Tag, RenderError> {
    let source = format!("{{{}}}", raw);
    let content = quick_xml::escape::unescape(raw)
        .map_err(|e| RenderError::syntax(part, format!("bad escape in tag {}: {}", source, e)))?;
    let content = content.trim();

    let (kind, name) = match content.chars().next() {
        Some('#') => (TagKind::Section, &content[1..]),
        Some('^') => (TagKind::Inverted, &content[1..]),
        Some('/') => (TagKind::Close, &content[1..]),
        _ => (TagKind::Value, content),
    };
    let name = name.trim().to_string();

    if name.is_empty() && kind != TagKind::Close {
        return Err(RenderError::syntax(part, format!("empty tag {}", source)));
    }

    Ok(Tag { kind, name, source })
}
