use std::path::Path;

use anyhow::Context;
use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use tracing::info;

use super::errors::CoreError;
use super::ledger::{COLUMN_HEADERS, HEADER_ROW};

const SHEET_NAME: &str = "Candidates";
const COLUMN_WIDTHS: [f64; 6] = [28.0, 14.0, 40.0, 40.0, 22.0, 45.0];

/// Writes the default ledger template: title, metadata labels, column headers,
/// and the empty candidate rows below them.
pub fn write_default_template(path: &Path, overwrite: bool) -> anyhow::Result<()> {
    if path.exists() && !overwrite {
        return Err(CoreError::InvalidRequest(format!(
            "template {} already exists",
            path.display()
        ))
        .into());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let title = Format::new().set_bold().set_font_size(14);
    let label = Format::new().set_bold();
    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color("#D9E1F2");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    worksheet.write_string_with_format(0, 0, "LinkedIn Candidate Finder", &title)?;
    worksheet.write_string_with_format(2, 0, "Run Date", &label)?;
    worksheet.write_string_with_format(4, 0, "Job Title", &label)?;

    // rust_xlsxwriter rows are zero-based
    let header_row = HEADER_ROW - 1;
    for (col, text) in COLUMN_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(header_row, col as u16, *text, &header)?;
        worksheet.set_column_width(col as u16, COLUMN_WIDTHS[col])?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to write template {}", path.display()))?;

    info!(path = %path.display(), "wrote default ledger template");
    Ok(())
}
