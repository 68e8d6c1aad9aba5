use rust_xlsxwriter::{Format, FormatAlign, Workbook};

use crate::report::{Cell, ReportTable};

const MAX_COLUMN_WIDTH: usize = 60;
/// Excel limits sheet names to 31 characters.
const MAX_SHEET_NAME: usize = 31;
const HEADER_ROW: u32 = 3;

pub fn render(table: &ReportTable) -> crate::Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color("#D9E1F2");
    let number = Format::new().set_num_format("0.00");
    let date = Format::new().set_align(FormatAlign::Right);

    let sheet = workbook.add_worksheet();
    let name: String = table.kind.as_str().chars().take(MAX_SHEET_NAME).collect();
    sheet.set_name(name)?;
    sheet.write_string_with_format(0, 0, &table.title, &bold)?;
    sheet.write_string(
        1,
        0,
        format!("Generated {}", table.generated_at.format("%Y-%m-%d %H:%M")),
    )?;

    for (col, title) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(HEADER_ROW, col as u16, title, &header)?;
    }
    let footer = table.footer.iter().map(|row| (row, true));
    let rows = table.rows.iter().map(|row| (row, false)).chain(footer);
    for (index, (row, is_footer)) in rows.enumerate() {
        let row_index = HEADER_ROW + 1 + index as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) if is_footer => {
                    sheet.write_string_with_format(row_index, col, text, &bold)?;
                }
                Cell::Text(text) => {
                    sheet.write_string(row_index, col, text)?;
                }
                Cell::Number(value) => {
                    sheet.write_number_with_format(row_index, col, *value, &number)?;
                }
                Cell::Date(value) => {
                    sheet.write_string_with_format(row_index, col, value.to_string(), &date)?;
                }
                Cell::Empty => {}
            }
        }
    }

    for (col, width) in table.column_widths().into_iter().enumerate() {
        sheet.set_column_width(col as u16, (width.min(MAX_COLUMN_WIDTH) + 2) as f64)?;
    }
    sheet.set_freeze_panes(HEADER_ROW + 1, 0)?;
    Ok(workbook.save_to_buffer()?)
}
