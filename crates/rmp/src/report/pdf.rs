//! Minimal PDF writer for report tables.
//!
//! Tables are typeset in Courier so column alignment only needs character
//! counts. Pages are A4 landscape, every page repeats the title and the
//! column header.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::report::{Cell, ReportTable};

const PAGE_WIDTH: i64 = 842;
const PAGE_HEIGHT: i64 = 595;
const MARGIN: i64 = 36;
const TITLE_SIZE: i64 = 12;
const FONT_SIZE: i64 = 8;
const LINE_HEIGHT: i64 = 11;
/// Courier glyphs are 0.6 em wide.
const CHARS_PER_LINE: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (FONT_SIZE * 6)) as usize;
const MAX_COLUMN_WIDTH: usize = 40;
const COLUMN_GAP: &str = "  ";

/// Rows of table text that fit below the page header.
pub const ROWS_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN - 3 * LINE_HEIGHT) / LINE_HEIGHT) as usize - 3;

fn ascii(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

fn fit(text: &str, width: usize, numeric: bool) -> String {
    let text = ascii(text);
    let text: String = if text.chars().count() > width {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    } else {
        text
    };
    if numeric {
        format!("{text:>width$}")
    } else {
        format!("{text:<width$}")
    }
}

fn format_row(cells: &[String], widths: &[usize], numeric: &[bool]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .zip(numeric)
        .map(|((text, width), numeric)| fit(text, *width, *numeric))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    let line = line.trim_end().to_string();
    if line.chars().count() > CHARS_PER_LINE {
        line.chars().take(CHARS_PER_LINE).collect()
    } else {
        line
    }
}

/// Lines of the table body, header excluded.
fn body_lines(table: &ReportTable, widths: &[usize], numeric: &[bool]) -> Vec<String> {
    let text_row = |row: &Vec<Cell>| row.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    let mut lines: Vec<String> = table
        .rows
        .iter()
        .map(|row| format_row(&text_row(row), widths, numeric))
        .collect();
    if lines.is_empty() {
        lines.push("(no records)".to_string());
    }
    if let Some(footer) = &table.footer {
        let total: usize = widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);
        lines.push("=".repeat(total.min(CHARS_PER_LINE)));
        lines.push(format_row(&text_row(footer), widths, numeric));
    }
    lines
}

fn text_line(operations: &mut Vec<Operation>, font_size: i64, y: i64, text: &str) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec!["F1".into(), font_size.into()]));
    operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
    operations.push(Operation::new("Tj", vec![Object::string_literal(ascii(text))]));
    operations.push(Operation::new("ET", vec![]));
}

pub fn render(table: &ReportTable) -> crate::Result<Vec<u8>> {
    let widths: Vec<usize> = table
        .column_widths()
        .into_iter()
        .map(|w| w.min(MAX_COLUMN_WIDTH))
        .collect();
    let numeric: Vec<bool> = (0..table.columns.len())
        .map(|col| {
            !table.rows.is_empty()
                && table
                    .rows
                    .iter()
                    .all(|row| matches!(row.get(col), Some(Cell::Number(_) | Cell::Empty)))
        })
        .collect();
    let header = format_row(&table.columns, &widths, &numeric);
    let rule = "-".repeat(header.chars().count());
    let lines = body_lines(table, &widths, &numeric);
    let chunks: Vec<&[String]> = lines.chunks(ROWS_PER_PAGE).collect();
    let page_count = chunks.len();
    let generated = format!("Generated {}", table.generated_at.format("%Y-%m-%d %H:%M"));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(page_count);
    for (index, chunk) in chunks.iter().enumerate() {
        let mut operations = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN - TITLE_SIZE;
        text_line(&mut operations, TITLE_SIZE, y, &table.title);
        y -= LINE_HEIGHT + 4;
        text_line(
            &mut operations,
            FONT_SIZE,
            y,
            &format!("{generated}    Page {}/{page_count}", index + 1),
        );
        y -= 2 * LINE_HEIGHT;
        text_line(&mut operations, FONT_SIZE, y, &header);
        y -= LINE_HEIGHT;
        text_line(&mut operations, FONT_SIZE, y, &rule);
        for line in chunk.iter() {
            y -= LINE_HEIGHT;
            text_line(&mut operations, FONT_SIZE, y, line);
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::from(*id)).collect::<Vec<_>>(),
        "Count" => page_count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}
