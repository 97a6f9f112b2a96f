//! Document content parsing (word/document.xml)
//!
//! Reads the main document part into a simplified block model: paragraphs
//! with their style, alignment and formatted runs, and tables of such
//! paragraphs. Fields, drawings and revision marks are skipped; only the
//! visible text of `<w:t>` elements is kept.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};

/// A parsed Word document
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Document body blocks
    pub blocks: Vec<Block>,
}

/// Block-level elements
#[derive(Debug, Clone)]
pub enum Block {
    /// A paragraph
    Paragraph(Paragraph),
    /// A table
    Table(Table),
}

/// Horizontal paragraph alignment (`w:jc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    fn from_val(val: &str) -> Self {
        match val {
            "center" => Alignment::Center,
            "right" | "end" => Alignment::Right,
            "both" | "distribute" => Alignment::Justify,
            _ => Alignment::Left,
        }
    }
}

/// A paragraph with its content and style
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    /// Style ID (references styles.xml)
    pub style_id: Option<String>,
    /// Alignment from the paragraph properties
    pub alignment: Alignment,
    /// Runs and breaks in document order
    pub children: Vec<ParagraphChild>,
}

/// Child elements of a paragraph
#[derive(Debug, Clone, PartialEq)]
pub enum ParagraphChild {
    /// A text run
    Run(Run),
    /// `<w:br/>`
    LineBreak,
    /// `<w:br w:type="page"/>`
    PageBreak,
}

/// A text run with formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    /// The text content, tabs included as `\t`
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Font size in half-points (`w:sz`)
    pub size_half_points: Option<u32>,
}

/// A table
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Table rows
    pub rows: Vec<TableRow>,
}

/// A table row
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    /// Cells in this row
    pub cells: Vec<TableCell>,
}

/// A table cell
#[derive(Debug, Clone, Default)]
pub struct TableCell {
    /// Paragraphs in this cell
    pub paragraphs: Vec<Paragraph>,
}

impl Document {
    /// Parse a document from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        // Whitespace inside runs is content
        reader.config_mut().trim_text(false);

        let mut parser = Parser::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => parser.start(e, false),
                Ok(Event::Empty(ref e)) => parser.start(e, true),
                Ok(Event::End(ref e)) => parser.end(e.local_name().as_ref()),
                Ok(Event::Text(ref e)) => {
                    if parser.in_text {
                        let text = e.unescape().map_err(OoxmlError::Xml)?;
                        parser.push_text(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(Document {
            blocks: parser.blocks,
        })
    }

    /// Get all paragraphs (flattening tables)
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().flat_map(|block| match block {
            Block::Paragraph(p) => vec![p].into_iter(),
            Block::Table(t) => t
                .rows
                .iter()
                .flat_map(|r| r.cells.iter())
                .flat_map(|c| c.paragraphs.iter())
                .collect::<Vec<_>>()
                .into_iter(),
        })
    }

    /// Get plain text content
    pub fn plain_text(&self) -> String {
        self.paragraphs()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Paragraph {
    /// Get plain text of this paragraph
    pub fn plain_text(&self) -> String {
        self.children
            .iter()
            .map(|child| match child {
                ParagraphChild::Run(run) => run.text.as_str(),
                ParagraphChild::LineBreak => "\n",
                ParagraphChild::PageBreak => "",
            })
            .collect()
    }

    /// Heading level from the paragraph style
    ///
    /// `Title` counts as level 1, `Heading1`..`Heading6` (and the localized
    /// `Ttulo1`/`Titulo1` spellings some templates carry) as their number.
    pub fn heading_level(&self) -> Option<u8> {
        let style = self.style_id.as_deref()?;
        if style.eq_ignore_ascii_case("title") {
            return Some(1);
        }
        let digits = ["Heading", "heading", "Ttulo", "Titulo", "titulo"]
            .iter()
            .find_map(|prefix| style.strip_prefix(prefix))?;
        match digits.parse::<u8>() {
            Ok(level @ 1..=6) => Some(level),
            _ => None,
        }
    }

    /// Runs of this paragraph, skipping breaks
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.children.iter().filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        })
    }
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<TableRow>,
    row: Option<TableRow>,
    cell: Option<TableCell>,
}

/// Parsing state for [`Document::parse`]
#[derive(Default)]
struct Parser {
    blocks: Vec<Block>,
    in_body: bool,
    in_para_props: bool,
    in_text: bool,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    /// Open tables, innermost last
    tables: Vec<TableBuilder>,
}

impl Parser {
    fn start(&mut self, e: &BytesStart, empty: bool) {
        match e.local_name().as_ref() {
            b"body" if !empty => self.in_body = true,
            b"p" if self.in_body => {
                let paragraph = Paragraph::default();
                if empty {
                    self.finish_paragraph(paragraph);
                } else {
                    self.paragraph = Some(paragraph);
                }
            }
            b"pPr" if !empty => self.in_para_props = true,
            b"pStyle" => {
                if let (Some(para), Some(style)) = (&mut self.paragraph, get_attr(e, b"w:val")) {
                    para.style_id = Some(style);
                }
            }
            b"jc" if self.in_para_props => {
                if let (Some(para), Some(val)) = (&mut self.paragraph, get_attr(e, b"w:val")) {
                    para.alignment = Alignment::from_val(&val);
                }
            }
            b"r" if self.paragraph.is_some() && !empty => self.run = Some(Run::default()),
            b"b" => {
                if let Some(run) = &mut self.run {
                    run.bold = is_on(e);
                }
            }
            b"i" => {
                if let Some(run) = &mut self.run {
                    run.italic = is_on(e);
                }
            }
            b"u" => {
                if let Some(run) = &mut self.run {
                    run.underline = get_attr(e, b"w:val").map_or(true, |v| v != "none");
                }
            }
            b"sz" => {
                if let Some(run) = &mut self.run {
                    run.size_half_points = get_attr(e, b"w:val").and_then(|v| v.parse().ok());
                }
            }
            b"t" if self.run.is_some() && !empty => self.in_text = true,
            b"tab" if self.run.is_some() => self.push_text("\t"),
            b"br" | b"cr" if self.run.is_some() => {
                let child = if get_attr(e, b"w:type").as_deref() == Some("page") {
                    ParagraphChild::PageBreak
                } else {
                    ParagraphChild::LineBreak
                };
                self.flush_run_text();
                if let Some(para) = &mut self.paragraph {
                    para.children.push(child);
                }
            }
            b"tbl" if self.in_body && !empty => self.tables.push(TableBuilder::default()),
            b"tr" if !empty => {
                if let Some(table) = self.tables.last_mut() {
                    table.row = Some(TableRow::default());
                }
            }
            b"tc" if !empty => {
                if let Some(table) = self.tables.last_mut() {
                    table.cell = Some(TableCell::default());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"body" => self.in_body = false,
            b"pPr" => self.in_para_props = false,
            b"t" => self.in_text = false,
            b"r" => {
                self.flush_run_text();
                self.run = None;
            }
            b"p" => {
                if let Some(paragraph) = self.paragraph.take() {
                    self.finish_paragraph(paragraph);
                }
            }
            b"tc" => {
                if let Some(table) = self.tables.last_mut() {
                    if let (Some(row), Some(cell)) = (&mut table.row, table.cell.take()) {
                        row.cells.push(cell);
                    }
                }
            }
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    if let Some(row) = table.row.take() {
                        table.rows.push(row);
                    }
                }
            }
            b"tbl" => {
                if let Some(table) = self.tables.pop() {
                    let table = Table { rows: table.rows };
                    match self.tables.last_mut().and_then(|outer| outer.cell.as_mut()) {
                        // Nested tables are flattened into the enclosing cell
                        Some(cell) => cell.paragraphs.extend(
                            table
                                .rows
                                .into_iter()
                                .flat_map(|r| r.cells)
                                .flat_map(|c| c.paragraphs),
                        ),
                        None => self.blocks.push(Block::Table(table)),
                    }
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = &mut self.run {
            run.text.push_str(text);
        }
    }

    /// Move the text gathered so far into the paragraph, keeping formatting
    fn flush_run_text(&mut self) {
        let (Some(run), Some(para)) = (&mut self.run, &mut self.paragraph) else {
            return;
        };
        if run.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut run.text);
        para.children.push(ParagraphChild::Run(Run {
            text,
            ..run.clone()
        }));
    }

    fn finish_paragraph(&mut self, paragraph: Paragraph) {
        match self.tables.last_mut() {
            Some(table) => {
                if let Some(cell) = &mut table.cell {
                    cell.paragraphs.push(paragraph);
                }
            }
            None => self.blocks.push(Block::Paragraph(paragraph)),
        }
    }
}

/// Toggle properties are on unless `w:val` says otherwise
fn is_on(e: &BytesStart) -> bool {
    !matches!(get_attr(e, b"w:val").as_deref(), Some("0" | "false" | "off"))
}

fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}
