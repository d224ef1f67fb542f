//! Fixed-layout candidate spreadsheet, one per job description.
//!
//! Layout of the first worksheet:
//! - `B3` run date, `B5` job title
//! - row 10 column headers
//! - rows 11..=26 one candidate per row, columns A-F in the order
//!   name, score, matched skills, non-matched skills, location, profile URL
//!
//! A slot is free when its name cell is empty. Appends fill the first free
//! slot; when all sixteen are taken the record is not written.

use std::path::{Path, PathBuf};

use anyhow::Context;
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use chrono::NaiveDate;
use edit_xlsx::Write;
use tracing::{debug, warn};

use super::errors::CoreError;
use super::models::{CandidateRecord, LedgerMetadata};

pub const HEADER_ROW: u32 = 10;
pub const FIRST_SLOT_ROW: u32 = 11;
pub const LAST_SLOT_ROW: u32 = 26;
pub const SLOT_CAPACITY: usize = (LAST_SLOT_ROW - FIRST_SLOT_ROW + 1) as usize;

pub const RUN_DATE_CELL: &str = "B3";
pub const JOB_TITLE_CELL: &str = "B5";

pub const COLUMN_HEADERS: [&str; 6] = [
    "Name",
    "Match Score",
    "Matched Skills",
    "Non-Matched Skills",
    "Location",
    "Profile URL",
];
const COLUMN_LETTERS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

const SKILL_SEPARATOR: &str = ", ";

/// An opened ledger workbook. Changes stay in memory until [`LedgerDocument::save`].
pub struct LedgerDocument {
    path: PathBuf,
    sheet_name: String,
    workbook: edit_xlsx::Workbook,
    occupied: [bool; SLOT_CAPACITY],
}

impl LedgerDocument {
    /// Opens `path` when it exists, otherwise starts from `template_path`.
    /// Either way the document saves to `path`.
    pub fn open_or_create(path: &Path, template_path: &Path) -> anyhow::Result<Self> {
        let source = if path.exists() {
            path
        } else if template_path.exists() {
            debug!(
                ledger = %path.display(),
                template = %template_path.display(),
                "ledger missing, starting from template"
            );
            template_path
        } else {
            return Err(CoreError::ledger_io(
                path,
                format!(
                    "ledger does not exist and template {} is missing",
                    template_path.display()
                ),
            )
            .into());
        };

        let (sheet_name, range) = read_first_sheet(source)?;
        let mut occupied = [false; SLOT_CAPACITY];
        for (slot, row) in (FIRST_SLOT_ROW..=LAST_SLOT_ROW).enumerate() {
            occupied[slot] = !cell_text(&range, row, 0).trim().is_empty();
        }

        let workbook = edit_xlsx::Workbook::from_path(source)
            .map_err(|e| CoreError::ledger_io(source, format!("could not open workbook: {e}")))?;

        Ok(Self {
            path: path.to_path_buf(),
            sheet_name,
            workbook,
            occupied,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn free_slots(&self) -> usize {
        self.occupied.iter().filter(|taken| !**taken).count()
    }

    pub fn write_metadata(&mut self, run_date: NaiveDate, job_title: &str) -> anyhow::Result<()> {
        self.write_cells(vec![
            (RUN_DATE_CELL.to_string(), run_date.format("%Y-%m-%d").to_string()),
            (JOB_TITLE_CELL.to_string(), job_title.to_string()),
        ])
    }

    /// Writes `record` into the first free slot. `Ok(false)` means every slot
    /// is taken and nothing was written.
    pub fn append_record(&mut self, record: &CandidateRecord) -> anyhow::Result<bool> {
        let Some(slot) = self.occupied.iter().position(|taken| !*taken) else {
            warn!(
                ledger = %self.path.display(),
                candidate = %record.name,
                capacity = SLOT_CAPACITY,
                "ledger full, candidate not written"
            );
            return Ok(false);
        };

        let row = FIRST_SLOT_ROW + slot as u32;
        let values = [
            record.name.trim().to_string(),
            record.match_score.to_string(),
            record.matched_skills.join(SKILL_SEPARATOR),
            record.non_matched_skills.join(SKILL_SEPARATOR),
            record.location.clone(),
            record.profile_url.trim().to_string(),
        ];

        let cells = COLUMN_LETTERS
            .iter()
            .zip(values)
            .map(|(col, value)| (format!("{col}{row}"), value))
            .collect();
        self.write_cells(cells)?;

        self.occupied[slot] = true;
        debug!(ledger = %self.path.display(), row, candidate = %record.name, "candidate row written");
        Ok(true)
    }

    /// Saves through a temporary file in the target directory and renames it
    /// over the ledger, so readers never see a half-written workbook.
    pub fn save(&mut self) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        let temp_path = tempfile::Builder::new()
            .prefix(".ledger-")
            .suffix(".xlsx")
            .tempfile_in(&dir)
            .map_err(|e| CoreError::ledger_io(&self.path, format!("could not create temp file: {e}")))?
            .into_temp_path();

        self.workbook
            .save_as(&*temp_path)
            .map_err(|e| CoreError::ledger_io(&self.path, format!("could not write workbook: {e}")))?;

        temp_path
            .persist(&self.path)
            .map_err(|e| CoreError::ledger_io(&self.path, format!("could not replace ledger: {e}")))?;
        Ok(())
    }

    fn write_cells(&mut self, cells: Vec<(String, String)>) -> anyhow::Result<()> {
        let worksheet = self
            .workbook
            .get_worksheet_mut_by_name(self.sheet_name.as_str())
            .map_err(|e| {
                CoreError::ledger_io(&self.path, format!("sheet {} not found: {e}", self.sheet_name))
            })?;

        for (cell_ref, value) in cells {
            worksheet
                .write_string(&cell_ref, sanitize_cell(&value))
                .map_err(|e| {
                    CoreError::ledger_io(&self.path, format!("could not write {cell_ref}: {e}"))
                })?;
        }
        Ok(())
    }
}

/// Reads every filled slot in row order. Empty slots are skipped, so gaps left
/// by manual edits do not hide the rows below them.
pub fn read_all(path: &Path) -> anyhow::Result<Vec<CandidateRecord>> {
    if !path.exists() {
        return Err(CoreError::ledger_io(path, "ledger does not exist").into());
    }

    let (_, range) = read_first_sheet(path)?;
    let mut records = Vec::new();
    for row in FIRST_SLOT_ROW..=LAST_SLOT_ROW {
        let name = cell_text(&range, row, 0);
        if name.trim().is_empty() {
            continue;
        }

        let score_text = cell_text(&range, row, 1);
        let match_score = score_text.trim().parse::<f64>().unwrap_or_else(|_| {
            warn!(ledger = %path.display(), row, value = %score_text, "unreadable match score");
            0.0
        });

        records.push(CandidateRecord {
            name: name.trim().to_string(),
            match_score,
            matched_skills: split_skills(&cell_text(&range, row, 2)),
            non_matched_skills: split_skills(&cell_text(&range, row, 3)),
            location: cell_text(&range, row, 4),
            profile_url: cell_text(&range, row, 5).trim().to_string(),
        });
    }

    Ok(records)
}

pub fn read_metadata(path: &Path) -> anyhow::Result<LedgerMetadata> {
    if !path.exists() {
        return Err(CoreError::ledger_io(path, "ledger does not exist").into());
    }

    let (_, range) = read_first_sheet(path)?;
    let non_empty = |value: String| {
        let trimmed = value.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    Ok(LedgerMetadata {
        run_date: non_empty(cell_text(&range, 3, 1)),
        job_title: non_empty(cell_text(&range, 5, 1)),
    })
}

fn read_first_sheet(path: &Path) -> anyhow::Result<(String, Range<Data>)> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| CoreError::ledger_io(path, format!("could not open workbook: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CoreError::ledger_io(path, "workbook has no worksheets"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CoreError::ledger_io(path, format!("sheet {sheet_name} unreadable: {e}")))?;

    Ok((sheet_name, range))
}

// `row` is 1-based like the spreadsheet UI, `col` is 0-based.
fn cell_text(range: &Range<Data>, row: u32, col: u32) -> String {
    range
        .get_value((row - 1, col))
        .and_then(|cell| cell.as_string())
        .unwrap_or_default()
}

fn split_skills(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|skill| skill.trim())
        .filter(|skill| !skill.is_empty())
        .map(|skill| skill.to_string())
        .collect()
}

/// Drops characters that are invalid in sheet XML (control chars other than
/// tab, newline and carriage return).
fn sanitize_cell(value: &str) -> String {
    value
        .chars()
        .filter(|c| {
            let u = *c as u32;
            matches!(c, '\t' | '\n' | '\r') || !(u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF)
        })
        .collect()
}
