//! Section tree construction
//!
//! Pairs section tags, applies table row and paragraph loops and folds the
//! flat item list into a tree of markup, values and sections.

use super::lexer::{Item, Tag, TagKind};
use crate::error::RenderError;

/// A node of a rendered part
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    /// Verbatim markup
    Markup(String),
    /// Scalar placeholder
    Value { name: String },
    /// Repeated or conditional block
    Section {
        name: String,
        inverted: bool,
        body: Vec<Node>,
    },
}

/// Build the node tree of a lexed part
pub(crate) fn build(part: &str, items: Vec<Item>) -> Result<Vec<Node>, RenderError> {
    let pairs = pair_sections(part, &items)?;
    let items = apply_row_loops(items, &pairs);
    let pairs = pair_sections(part, &items)?;
    let items = apply_paragraph_loops(items, &pairs);
    fold(part, items)
}

/// Match every section opening with its closing tag, by item index
fn pair_sections(part: &str, items: &[Item]) -> Result<Vec<(usize, usize)>, RenderError> {
    let mut stack: Vec<(usize, &Tag)> = Vec::new();
    let mut pairs = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let Item::Tag(tag) = item else { continue };
        match tag.kind {
            TagKind::Section | TagKind::Inverted => stack.push((index, tag)),
            TagKind::Close => {
                let (open_index, open) = stack.pop().ok_or_else(|| {
                    RenderError::syntax(part, format!("closing tag {} has no opening tag", tag.source))
                })?;
                if !tag.name.is_empty() && tag.name != open.name {
                    return Err(RenderError::syntax(
                        part,
                        format!("{} is closed by {}", open.source, tag.source),
                    ));
                }
                pairs.push((open_index, index));
            }
            TagKind::Value => {}
        }
    }

    if let Some((_, open)) = stack.pop() {
        return Err(RenderError::syntax(
            part,
            format!("section {} is never closed", open.source),
        ));
    }

    Ok(pairs)
}

/// Innermost table row and cell around every item
///
/// Rows are given as `(start, end)` item indices, cells by their start index.
fn table_context(items: &[Item]) -> Vec<(Option<(usize, usize)>, Option<usize>)> {
    let mut row_end = vec![0; items.len()];
    let mut open_rows = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match item {
            Item::RowStart(_) => open_rows.push(index),
            Item::RowEnd(_) => {
                if let Some(start) = open_rows.pop() {
                    row_end[start] = index;
                }
            }
            _ => {}
        }
    }

    let mut rows: Vec<usize> = Vec::new();
    let mut cells: Vec<usize> = Vec::new();
    let mut context = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item {
            Item::RowStart(_) => rows.push(index),
            Item::CellStart(_) => cells.push(index),
            _ => {}
        }
        let row = rows
            .last()
            .filter(|&&start| row_end[start] > start)
            .map(|&start| (start, row_end[start]));
        context.push((row, cells.last().copied()));
        match item {
            Item::RowEnd(_) => {
                rows.pop();
            }
            Item::CellEnd(_) => {
                cells.pop();
            }
            _ => {}
        }
    }
    context
}

/// Widen sections that open and close in different cells of one row
///
/// The tags move outside the row, so the section repeats whole rows instead
/// of splicing cell contents together.
fn apply_row_loops(items: Vec<Item>, pairs: &[(usize, usize)]) -> Vec<Item> {
    let context = table_context(&items);
    let mut moved = vec![false; items.len()];
    // (row boundary, original tag index)
    let mut before_row: Vec<(usize, usize)> = Vec::new();
    let mut after_row: Vec<(usize, usize)> = Vec::new();

    for &(open, close) in pairs {
        let (Some(row), open_cell) = context[open] else {
            continue;
        };
        let (close_row, close_cell) = context[close];
        if close_row != Some(row) || open_cell == close_cell {
            continue;
        }
        moved[open] = true;
        moved[close] = true;
        before_row.push((row.0, open));
        after_row.push((row.1, close));
    }

    if before_row.is_empty() {
        return items;
    }
    before_row.sort_unstable();
    after_row.sort_unstable();

    let mut slots: Vec<Option<Item>> = items.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(slots.len());
    let mut before = before_row.iter().peekable();
    let mut after = after_row.iter().peekable();

    for (index, &is_moved) in moved.iter().enumerate() {
        while let Some(&(_, tag)) = before.next_if(|&&(boundary, _)| boundary == index) {
            out.extend(slots[tag].take());
        }
        if !is_moved {
            out.extend(slots[index].take());
        }
        while let Some(&(_, tag)) = after.next_if(|&&(boundary, _)| boundary == index) {
            out.extend(slots[tag].take());
        }
    }
    out
}

/// Bounds of the paragraph around `index` when the tag is its only text
fn sole_tag_paragraph(items: &[Item], index: usize) -> Option<(usize, usize)> {
    let is_filler = |item: &Item| match item {
        Item::Markup(_) | Item::TextStart { .. } => true,
        Item::Literal(text) => text.trim().is_empty(),
        _ => false,
    };

    let mut start = None;
    for j in (0..index).rev() {
        match &items[j] {
            Item::ParagraphStart(_) => {
                start = Some(j);
                break;
            }
            item if is_filler(item) => {}
            _ => return None,
        }
    }

    let mut end = None;
    for (j, item) in items.iter().enumerate().skip(index + 1) {
        match item {
            Item::ParagraphEnd(_) => {
                end = Some(j);
                break;
            }
            item if is_filler(item) => {}
            _ => return None,
        }
    }

    Some((start?, end?))
}

/// Drop the paragraphs that only carry a section's opening and closing tags
///
/// The section then repeats the paragraphs between them instead of the
/// inline content between the two tags.
fn apply_paragraph_loops(items: Vec<Item>, pairs: &[(usize, usize)]) -> Vec<Item> {
    let mut dropped = vec![false; items.len()];

    for &(open, close) in pairs {
        let (Some(open_para), Some(close_para)) = (
            sole_tag_paragraph(&items, open),
            sole_tag_paragraph(&items, close),
        ) else {
            continue;
        };
        if open_para == close_para {
            continue;
        }
        for (para, keep) in [(open_para, open), (close_para, close)] {
            for (index, flag) in dropped.iter_mut().enumerate().take(para.1 + 1).skip(para.0) {
                if index != keep {
                    *flag = true;
                }
            }
        }
    }

    items
        .into_iter()
        .zip(dropped)
        .filter_map(|(item, drop)| (!drop).then_some(item))
        .collect()
}

fn push_markup(nodes: &mut Vec<Node>, markup: String) {
    if markup.is_empty() {
        return;
    }
    if let Some(Node::Markup(last)) = nodes.last_mut() {
        last.push_str(&markup);
    } else {
        nodes.push(Node::Markup(markup));
    }
}

fn fold(part: &str, items: Vec<Item>) -> Result<Vec<Node>, RenderError> {
    let mut stack: Vec<(Tag, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();

    for item in items {
        let tag = match item {
            Item::Tag(tag) => tag,
            other => {
                push_markup(&mut current, other.into_markup());
                continue;
            }
        };

        match tag.kind {
            TagKind::Value => current.push(Node::Value { name: tag.name }),
            TagKind::Section | TagKind::Inverted => {
                stack.push((tag, std::mem::take(&mut current)));
            }
            TagKind::Close => {
                let (open, parent) = stack.pop().ok_or_else(|| {
                    RenderError::syntax(part, format!("closing tag {} has no opening tag", tag.source))
                })?;
                let body = std::mem::replace(&mut current, parent);
                current.push(Node::Section {
                    name: open.name,
                    inverted: open.kind == TagKind::Inverted,
                    body,
                });
            }
        }
    }

    if let Some((open, _)) = stack.pop() {
        return Err(RenderError::syntax(
            part,
            format!("section {} is never closed", open.source),
        ));
    }

    Ok(current)
}
