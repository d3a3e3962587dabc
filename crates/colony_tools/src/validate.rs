//! Colony config validation.

use std::path::{Path, PathBuf};

use colony_core::config::ColonyConfig;
use colony_core::ColonyError;

use crate::{read_text, Result, ToolError};

/// Outcome for one config file.
#[derive(Debug)]
pub struct FileReport {
    /// File checked.
    pub path: PathBuf,
    /// Colony name, when the file parsed.
    pub colony: Option<String>,
    /// Every problem found; empty when the file is valid.
    pub problems: Vec<String>,
}

impl FileReport {
    /// Whether the file parsed and validated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Parse and validate one colony config file.
///
/// # Errors
///
/// Returns an error only if the file cannot be read. Parse and validation
/// problems are reported in the [`FileReport`].
pub fn validate_config_file(path: &Path) -> Result<FileReport> {
    let text = read_text(path)?;
    let label = path.display().to_string();
    let mut report = FileReport {
        path: path.to_path_buf(),
        colony: None,
        problems: Vec::new(),
    };

    match ColonyConfig::from_ron(&text, &label) {
        Ok(config) => {
            report.colony = Some(config.name.clone());
            match config.validate() {
                Ok(()) => {}
                Err(ColonyError::InvalidConfig { problems, .. }) => report.problems = problems,
                Err(e) => report.problems.push(e.to_string()),
            }
        }
        Err(e) => report.problems.push(e.to_string()),
    }
    Ok(report)
}

/// RON files under `path`: the file itself, or every `.ron` file directly
/// inside a directory, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn config_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path).map_err(|source| ColonyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

/// Validate every colony config under `path`.
///
/// # Errors
///
/// Returns an error if nothing was found or any file fails.
pub fn validate_configs(path: &Path) -> Result<Vec<FileReport>> {
    let files = config_files(path)?;
    if files.is_empty() {
        return Err(ToolError::NothingFound {
            kind: "colony config",
            path: path.display().to_string(),
        });
    }

    let mut reports = Vec::with_capacity(files.len());
    for file in &files {
        let report = validate_config_file(file)?;
        if report.is_valid() {
            tracing::info!(file = %file.display(), colony = ?report.colony, "config valid");
        } else {
            for problem in &report.problems {
                tracing::error!(file = %file.display(), "{problem}");
            }
        }
        reports.push(report);
    }

    let failed = reports.iter().filter(|r| !r.is_valid()).count();
    if failed > 0 {
        return Err(ToolError::ValidationFailed {
            failed,
            total: reports.len(),
        });
    }
    Ok(reports)
}
