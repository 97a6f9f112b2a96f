//! DOCX to HTML simplification
//!
//! Produces a self-contained HTML page from a filled document so a headless
//! browser can print it. The result keeps paragraphs, headings, alignment,
//! basic run formatting, breaks and tables; everything else is dropped.

use std::fmt::Write as _;

use crate::archive::OoxmlArchive;
use crate::document::{Alignment, Block, Document, Paragraph, ParagraphChild, Run, Table};
use crate::error::Result;

/// Page setup of the generated HTML
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    /// CSS page size, e.g. `A4` or `letter`
    pub page_size: String,
    /// CSS page margin
    pub margin: String,
    /// CSS font-family list
    pub font_family: String,
    /// Base font size in points
    pub font_size_pt: f32,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            margin: "2cm".to_string(),
            font_family: "'Liberation Serif', 'Times New Roman', serif".to_string(),
            font_size_pt: 12.0,
        }
    }
}

/// Convert DOCX bytes into an HTML page
pub fn docx_to_html(docx: &[u8], options: &HtmlOptions) -> Result<String> {
    let archive = OoxmlArchive::from_bytes(docx)?;
    let document = Document::parse(archive.document_xml()?)?;
    Ok(document_to_html(&document, options))
}

/// Render a parsed document into an HTML page
pub fn document_to_html(document: &Document, options: &HtmlOptions) -> String {
    let mut body = String::new();
    for block in &document.blocks {
        match block {
            Block::Paragraph(para) => write_paragraph(&mut body, para),
            Block::Table(table) => write_table(&mut body, table),
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
    @page {{ size: {page}; margin: {margin}; }}
    body {{
        font-family: {font};
        font-size: {size}pt;
        line-height: 1.3;
        margin: 0;
    }}
    p {{ margin: 0 0 0.5em 0; min-height: 1em; }}
    table {{ border-collapse: collapse; width: 100%; margin-bottom: 0.5em; }}
    td {{ border: 1px solid #000; padding: 0.2em 0.4em; vertical-align: top; }}
    .page-break {{ break-after: page; }}
</style>
</head>
<body>
{body}</body>
</html>
"#,
        page = options.page_size,
        margin = options.margin,
        font = options.font_family,
        size = options.font_size_pt,
        body = body,
    )
}

fn write_paragraph(out: &mut String, para: &Paragraph) {
    let tag = match para.heading_level() {
        Some(level) => format!("h{level}"),
        None => "p".to_string(),
    };
    let style = match para.alignment {
        Alignment::Left => "",
        Alignment::Center => r#" style="text-align: center""#,
        Alignment::Right => r#" style="text-align: right""#,
        Alignment::Justify => r#" style="text-align: justify""#,
    };

    let _ = write!(out, "<{tag}{style}>");
    let mut page_break = false;
    for child in &para.children {
        match child {
            ParagraphChild::Run(run) => write_run(out, run),
            ParagraphChild::LineBreak => out.push_str("<br>"),
            ParagraphChild::PageBreak => page_break = true,
        }
    }
    let _ = writeln!(out, "</{tag}>");

    if page_break {
        out.push_str("<div class=\"page-break\"></div>\n");
    }
}

fn write_run(out: &mut String, run: &Run) {
    let mut open = String::new();
    let mut close = String::new();
    for (on, tag) in [(run.bold, "b"), (run.italic, "i"), (run.underline, "u")] {
        if on {
            open.push_str(&format!("<{tag}>"));
            close.insert_str(0, &format!("</{tag}>"));
        }
    }
    if let Some(half_points) = run.size_half_points {
        open.push_str(&format!(
            "<span style=\"font-size: {}pt\">",
            half_points as f32 / 2.0
        ));
        close.insert_str(0, "</span>");
    }

    out.push_str(&open);
    out.push_str(&html_escape(&run.text).replace('\t', "&emsp;"));
    out.push_str(&close);
}

fn write_table(out: &mut String, table: &Table) {
    out.push_str("<table>\n");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in &row.cells {
            out.push_str("<td>");
            for para in &cell.paragraphs {
                write_paragraph(out, para);
            }
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

/// Basic HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::docx_with_body;

    fn html(body: &str) -> String {
        docx_to_html(&docx_with_body(body), &HtmlOptions::default()).unwrap()
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape(r#"say "hello""#), "say &quot;hello&quot;");
    }

    #[test]
    fn test_page_shell() {
        let page = html("<w:p><w:r><w:t>Hola</w:t></w:r></w:p>");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("@page { size: A4; margin: 2cm; }"));
        assert!(page.contains("<p>Hola</p>"));
    }

    #[test]
    fn test_heading_alignment_and_formatting() {
        let page = html(
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/><w:jc w:val="center"/></w:pPr>
                <w:r><w:rPr><w:b/><w:sz w:val="32"/></w:rPr><w:t>Certificado</w:t></w:r></w:p>"#,
        );
        assert!(page.contains(
            r#"<h1 style="text-align: center"><b><span style="font-size: 16pt">Certificado</span></b></h1>"#
        ));
    }

    #[test]
    fn test_breaks_and_escaping() {
        let page = html(
            r#"<w:p><w:r><w:t>a &lt; b</w:t><w:br/><w:t>c</w:t><w:br w:type="page"/></w:r></w:p>"#,
        );
        assert!(page.contains("<p>a &lt; b<br>c</p>\n<div class=\"page-break\"></div>"));
    }

    #[test]
    fn test_tables() {
        let page = html(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        );
        assert!(page.contains("<table>\n<tr><td><p>x</p>\n</td></tr>\n</table>"));
    }
}
