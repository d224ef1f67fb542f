use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CandidateRecord {
    pub name: String,
    pub match_score: f64,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    #[serde(default)]
    pub non_matched_skills: Vec<String>,
    pub location: String,
    pub profile_url: String,
}

impl CandidateRecord {
    /// Checks the fields the ledger relies on before a row is written.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("candidate name is required".to_string());
        }

        if !self.match_score.is_finite() || !(0.0..=100.0).contains(&self.match_score) {
            return Err(format!(
                "match score must be between 0 and 100, got {}",
                self.match_score
            ));
        }

        url::Url::parse(self.profile_url.trim())
            .map_err(|err| format!("invalid profile URL {:?}: {err}", self.profile_url))?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerMetadata {
    pub run_date: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptionEntry {
    pub file_name: String,
    pub display_name: String,
    pub path: PathBuf,
}

/// Everything one candidate search needs, resolved before the run starts.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub jd_path: PathBuf,
    pub jd_file_name: String,
    pub job_title: String,
    pub locations: Vec<String>,
    pub ledger_path: PathBuf,
    pub template_path: PathBuf,
    pub run_date: NaiveDate,
}

impl RunConfiguration {
    pub fn new(
        jd_path: PathBuf,
        locations: &[String],
        output_dir: &std::path::Path,
        template_path: PathBuf,
    ) -> Self {
        let jd_file_name = jd_path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut ordered: Vec<String> = Vec::new();
        for location in locations {
            let trimmed = location.trim();
            if trimmed.is_empty() || ordered.iter().any(|v| v.eq_ignore_ascii_case(trimmed)) {
                continue;
            }
            ordered.push(trimmed.to_string());
        }

        Self {
            job_title: super::naming::job_title(&jd_file_name),
            ledger_path: super::naming::ledger_path(output_dir, &jd_file_name),
            jd_path,
            jd_file_name,
            locations: ordered,
            template_path,
            run_date: chrono::Local::now().date_naive(),
        }
    }
}

const MAX_POLL_INTERVAL_SECONDS: f64 = 3600.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub jd_dir: PathBuf,
    pub output_dir: PathBuf,
    pub template_path: PathBuf,
    pub browser_binary_path: String,
    pub browser_debugging_port: u16,
    pub browser_profile_dir: Option<PathBuf>,
    pub browser_startup_timeout_seconds: u64,
    pub agent_command: String,
    pub agent_args: Vec<String>,
    pub model_id: String,
    pub model_temperature: f64,
    pub max_steps: u32,
    pub poll_interval_seconds: f64,
    pub poll_iterations: u32,
    pub known_locations: Vec<String>,
    pub default_locations: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            jd_dir: PathBuf::from("JDs"),
            output_dir: PathBuf::from("output"),
            template_path: PathBuf::from("Template.xlsx"),
            browser_binary_path: default_browser_binary().to_string(),
            browser_debugging_port: 9222,
            browser_profile_dir: None,
            browser_startup_timeout_seconds: 20,
            agent_command: "browser-agent".to_string(),
            agent_args: Vec::new(),
            model_id: "anthropic.claude-3-5-sonnet-20240620-v1:0".to_string(),
            model_temperature: 0.0,
            max_steps: 25,
            poll_interval_seconds: 3.0,
            poll_iterations: 200,
            known_locations: [
                "Argentina",
                "Bolivia",
                "Chile",
                "Colombia",
                "Costa Rica",
                "Peru",
                "Mexico",
            ]
            .iter()
            .map(|v| v.to_string())
            .collect(),
            default_locations: vec!["Costa Rica".to_string()],
        }
    }
}

impl RuntimeSettings {
    pub fn sanitized(mut self) -> Self {
        self.max_steps = self.max_steps.max(1);
        self.poll_iterations = self.poll_iterations.max(1);
        self.poll_interval_seconds = if self.poll_interval_seconds.is_finite() {
            self.poll_interval_seconds.clamp(0.1, MAX_POLL_INTERVAL_SECONDS)
        } else {
            Self::default().poll_interval_seconds
        };
        self.browser_startup_timeout_seconds = self.browser_startup_timeout_seconds.max(1);
        self.model_temperature = if self.model_temperature.is_finite() {
            self.model_temperature.clamp(0.0, 2.0)
        } else {
            0.0
        };
        if self.browser_binary_path.trim().is_empty() {
            self.browser_binary_path = default_browser_binary().to_string();
        }
        if self.agent_command.trim().is_empty() {
            self.agent_command = "browser-agent".to_string();
        }
        self
    }
}

fn default_browser_binary() -> &'static str {
    if cfg!(target_os = "macos") {
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
    } else if cfg!(target_os = "windows") {
        r"C:\Program Files\Google\Chrome\Application\chrome.exe"
    } else {
        "google-chrome"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> CandidateRecord {
        CandidateRecord {
            name: "Jane Doe".to_string(),
            match_score: 87.5,
            matched_skills: vec!["Go".to_string(), "Rust".to_string()],
            non_matched_skills: vec!["Scala".to_string()],
            location: "Costa Rica".to_string(),
            profile_url: "https://linkedin.com/in/janedoe".to_string(),
        }
    }

    #[test]
    fn validate_accepts_well_formed_candidate() {
        assert!(jane().validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_name_bad_score_and_bad_url() {
        let mut blank = jane();
        blank.name = "   ".to_string();
        assert!(blank.validate().is_err());

        let mut score = jane();
        score.match_score = 140.0;
        assert!(score.validate().is_err());
        score.match_score = f64::NAN;
        assert!(score.validate().is_err());

        let mut url = jane();
        url.profile_url = "linkedin janedoe".to_string();
        assert!(url.validate().is_err());
    }

    #[test]
    fn run_configuration_dedupes_locations_in_order() {
        let config = RunConfiguration::new(
            PathBuf::from("JDs/Senior_Engineer.pdf"),
            &[
                "Costa Rica".to_string(),
                " Peru ".to_string(),
                "costa rica".to_string(),
                String::new(),
            ],
            std::path::Path::new("output"),
            PathBuf::from("Template.xlsx"),
        );

        assert_eq!(config.locations, vec!["Costa Rica", "Peru"]);
        assert_eq!(config.job_title, "Senior Engineer");
        assert_eq!(config.jd_file_name, "Senior_Engineer.pdf");
        assert_eq!(
            config.ledger_path,
            PathBuf::from("output").join("Find_Senior_Engineer.xlsx")
        );
    }

    #[test]
    fn settings_deserialize_with_missing_fields_uses_defaults() {
        let parsed: RuntimeSettings =
            serde_json::from_str(r#"{ "maxSteps": 0, "jdDir": "jobs" }"#).unwrap();
        let parsed = parsed.sanitized();
        assert_eq!(parsed.max_steps, 1);
        assert_eq!(parsed.jd_dir, PathBuf::from("jobs"));
        assert_eq!(parsed.poll_iterations, 200);
    }

    #[test]
    fn sanitized_bounds_poll_interval() {
        let huge: RuntimeSettings =
            serde_json::from_str(r#"{ "pollIntervalSeconds": 1e300 }"#).unwrap();
        let huge = huge.sanitized();
        assert_eq!(huge.poll_interval_seconds, 3600.0);
        let _ = std::time::Duration::from_secs_f64(huge.poll_interval_seconds);

        let tiny = RuntimeSettings {
            poll_interval_seconds: 0.0,
            ..RuntimeSettings::default()
        }
        .sanitized();
        assert_eq!(tiny.poll_interval_seconds, 0.1);

        let nan = RuntimeSettings {
            poll_interval_seconds: f64::NAN,
            model_temperature: f64::INFINITY,
            ..RuntimeSettings::default()
        }
        .sanitized();
        assert_eq!(nan.poll_interval_seconds, 3.0);
        assert_eq!(nan.model_temperature, 0.0);
    }
}
