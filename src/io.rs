//! Report persistence.
//!
//! Resolves the report filename template and writes the finished report.
//! Supported placeholders: `{date}` (`%Y%m%d`), `{time}` (`%H%M%S`) and
//! `{n}`, the next unused integer among files already matching the
//! template in the target directory. A template may name subdirectories
//! (`reports/r_{n}.md`); `{n}` is then resolved inside them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use regex::Regex;

use crate::error::{Error, Result};

const COUNTER: &str = "{n}";

/// Resolves `template` to a path inside `dir` for a report written at `now`.
///
/// # Errors
///
/// Returns [`Error::Io`] if `dir` exists but cannot be listed.
pub fn resolve_report_path(template: &str, dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    let name = template
        .replace("{date}", &now.format("%Y%m%d").to_string())
        .replace("{time}", &now.format("%H%M%S").to_string());

    let target = dir.join(&name);
    let (Some(parent), Some(file)) = (target.parent(), target.file_name().and_then(|f| f.to_str()))
    else {
        return Ok(target);
    };
    if !file.contains(COUNTER) {
        return Ok(target);
    }

    let next = highest_counter(file, parent)?.map_or(1, |n| n.saturating_add(1));
    Ok(parent.join(file.replace(COUNTER, &next.to_string())))
}

/// Largest `{n}` value among files in `dir` matching `name`.
fn highest_counter(name: &str, dir: &Path) -> Result<Option<u64>> {
    let pattern = name
        .split(COUNTER)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"(\d+)");
    let Ok(re) = Regex::new(&format!("^{pattern}$")) else {
        return Ok(None);
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let highest = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|file| {
            let caps = re.captures(&file)?;
            caps.iter()
                .skip(1)
                .flatten()
                .filter_map(|m| m.as_str().parse::<u64>().ok())
                .max()
        })
        .max();
    Ok(highest)
}

/// Writes `content` to `path` in one call, creating parent directories.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory cannot be created or the file
/// cannot be written.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
