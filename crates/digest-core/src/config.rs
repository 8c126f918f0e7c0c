//! Run configuration shared by every plugin of a run

use crate::error::RegistryError;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const DATE_WINDOW_FORMAT: &str = "%Y%m%d%H%M";

/// Settings for one invocation. Field names double as plugin argument names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// arXiv category filter, see https://arxiv.org/category_taxonomy
    pub categories: String,

    /// Date to search: `YYYYMMDD`, `YYYY-MM-DD` or `YYYYMMDDHHMM TO YYYYMMDDHHMM`.
    /// After [`RunConfig::finalize`] this holds `lastUpdatedDate:[.. TO ..]`.
    pub datetime: Option<String>,

    /// `YYYYMMDD` start of the window, derived by `finalize`
    pub date: Option<String>,

    /// Extra attempts when a run yields no records
    pub max_retries_num: u32,

    /// Seconds to sleep between attempts
    pub sleep_seconds: u64,

    pub output_directory: PathBuf,

    pub markdown_directory: PathBuf,

    pub download_directory: PathBuf,

    /// Where generated paper notes are written
    pub paper_note_folder: PathBuf,

    pub indexing_directory: Option<PathBuf>,

    /// Search query; built from `categories` and `datetime` when empty
    pub query: String,

    /// Explicit plugin list, used when no pipeline is named
    pub plugins: Vec<String>,

    /// Named preset to run
    pub pipeline: Option<String>,

    /// Preset override file name under the pipelines directory
    pub pipeline_config: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            categories: "(cat:cs.CV OR cat:cs.AI OR cat:cs.LG)".to_string(),
            datetime: None,
            date: None,
            max_retries_num: 16,
            sleep_seconds: 3,
            output_directory: PathBuf::from("outputs"),
            markdown_directory: PathBuf::from("markdown"),
            download_directory: PathBuf::from("download"),
            paper_note_folder: PathBuf::from("notes"),
            indexing_directory: None,
            query: String::new(),
            plugins: Vec::new(),
            pipeline: None,
            pipeline_config: None,
        }
    }
}

impl RunConfig {
    /// Load from a YAML file; missing keys take their defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::ConfigFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, RegistryError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Normalize the date window against today's date
    pub fn finalize(&mut self) -> Result<(), RegistryError> {
        self.finalize_at(Utc::now().date_naive())
    }

    /// Normalize the date window, derive `date` and `query`, and date-stamp the
    /// output and markdown directories
    pub fn finalize_at(&mut self, today: NaiveDate) -> Result<(), RegistryError> {
        let window = parse_date(self.datetime.as_deref(), today)?;
        let start = window
            .trim_start_matches("lastUpdatedDate:[")
            .chars()
            .take(8)
            .collect::<String>();

        if self.query.is_empty() {
            self.query = format!("{} AND {}", self.categories, window);
        }
        self.output_directory = self.output_directory.join(&start);
        self.markdown_directory = self.markdown_directory.join(&start);
        if let Some(name) = &self.pipeline_config {
            if !name.ends_with(".yaml") {
                self.pipeline_config = Some(format!("{name}.yaml"));
            }
        }
        self.date = Some(start);
        self.datetime = Some(window);
        Ok(())
    }

    /// Plain mapping of every field, offered to plugins as arguments
    pub fn to_args(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

/// Turn a user-supplied date into `lastUpdatedDate:[YYYYMMDDHHMM TO YYYYMMDDHHMM]`.
///
/// `None` means yesterday to today.
pub fn parse_date(date: Option<&str>, today: NaiveDate) -> Result<String, RegistryError> {
    let raw = match date {
        Some(d) if !d.trim().is_empty() => d.replace('-', "").replace(':', ""),
        _ => {
            let yesterday = today - ChronoDuration::days(1);
            format!(
                "{} TO {}",
                window_start(yesterday),
                window_start(today)
            )
        }
    };

    let raw = if raw.len() == 8 {
        let day = NaiveDate::parse_from_str(&raw, "%Y%m%d").map_err(|e| {
            RegistryError::InvalidConfig {
                plugin: "RunConfig".to_string(),
                reason: format!("invalid date '{raw}': {e}"),
            }
        })?;
        format!(
            "{} TO {}",
            window_start(day),
            window_start(day + ChronoDuration::days(1))
        )
    } else {
        raw
    };
    Ok(format!("lastUpdatedDate:[{raw}]"))
}

fn window_start(day: NaiveDate) -> String {
    day.and_hms_opt(0, 0, 0)
        .map(|t| t.format(DATE_WINDOW_FORMAT).to_string())
        .unwrap_or_default()
}
