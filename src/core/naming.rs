use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").unwrap());

const LEDGER_PREFIX: &str = "Find_";
const LEDGER_EXTENSION: &str = "xlsx";

/// `Some Job Title.pdf` -> `Some_Job_Title.pdf`
pub fn normalize_filename(name: &str) -> String {
    WHITESPACE_RE.replace_all(name.trim(), "_").to_string()
}

fn stem(jd_file_name: &str) -> String {
    Path::new(jd_file_name)
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| jd_file_name.to_string())
}

/// Stem with underscores shown as spaces, casing untouched.
pub fn display_name(jd_file_name: &str) -> String {
    stem(jd_file_name).replace('_', " ")
}

/// `senior_data_engineer.pdf` -> `Senior Data Engineer`
pub fn job_title(jd_file_name: &str) -> String {
    title_case(&display_name(jd_file_name))
}

pub fn ledger_file_name(jd_file_name: &str) -> String {
    format!("{LEDGER_PREFIX}{}.{LEDGER_EXTENSION}", stem(jd_file_name))
}

pub fn ledger_path(output_dir: &Path, jd_file_name: &str) -> PathBuf {
    output_dir.join(ledger_file_name(jd_file_name))
}

// Each run of letters starts upper case and continues lower case.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_title_strips_extension_and_underscores() {
        assert_eq!(job_title("Senior_Engineer.pdf"), "Senior Engineer");
        assert_eq!(job_title("senior_DATA_engineer.docx"), "Senior Data Engineer");
        assert_eq!(job_title("3d_artist.pdf"), "3D Artist");
    }

    #[test]
    fn ledger_path_is_deterministic() {
        let out = Path::new("output");
        let first = ledger_path(out, "Senior_Engineer.pdf");
        let second = ledger_path(out, "Senior_Engineer.pdf");
        assert_eq!(first, second);
        assert_eq!(first, out.join("Find_Senior_Engineer.xlsx"));
    }

    #[test]
    fn normalize_filename_replaces_whitespace() {
        assert_eq!(
            normalize_filename("Some Job Title.pdf"),
            "Some_Job_Title.pdf"
        );
        assert_eq!(normalize_filename(" Lead\tQA.pdf "), "Lead_QA.pdf");
    }

    #[test]
    fn display_name_keeps_original_casing() {
        assert_eq!(display_name("Backend_API_Lead.pdf"), "Backend API Lead");
    }
}
