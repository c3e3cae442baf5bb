use std::ffi::OsString;
use std::path::{Path, PathBuf};
use glob::{glob, Pattern};
use crate::error::HunterError;
use crate::tools::path_str;

/// Extracts from a folder of captures are written with this prefix and merged afterwards.
pub const FRAGMENT_PREFIX: &str = "dump-";

/// Name of the file tshark writes the extracted packets of `source` to.
///
/// A single capture keeps its name with the hunt time appended to the stem, so repeated hunts on
/// the same capture do not overwrite each other (`capture.pcapng` becomes
/// `capture-2024-01-01_12-00-00.pcapng`). When hunting a folder each capture becomes a fragment
/// `dump-capture.pcapng` that is merged once all captures are done.
pub fn extract_file_name(source: &Path, date_time: &str, batch: bool) -> OsString {
    if batch {
        let mut name = OsString::from(FRAGMENT_PREFIX);
        name.push(source.file_name().unwrap_or(source.as_os_str()));
        name
    } else {
        let mut name = source.file_stem()
            .map(OsString::from)
            .unwrap_or_default();
        name.push("-");
        name.push(date_time);
        if let Some(ext) = source.extension() {
            name.push(".");
            name.push(ext);
        }
        name
    }
}

/// Name of the consolidated capture for a filter once its fragments are merged.
pub fn merged_file_name(filter_name: &str, date_time: &str, extension: &str) -> String {
    format!("all-{filter_name}-{date_time}.{extension}")
}

/// Files in `folder` (not recursive) matching `<prefix>*.<extension>`, sorted so that the order
/// handed to the tools is the same on every run.
pub fn list_matching(folder: &Path, prefix: &str, extension: &str) -> Result<Vec<PathBuf>, HunterError> {
    let pattern = format!(
        "{}/{}*.{}",
        Pattern::escape(path_str(folder)?),
        Pattern::escape(prefix),
        Pattern::escape(extension),
    );
    let mut found = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    found.push(path);
                }
            }
            Err(err) => tracing::warn!("skipping unreadable path while searching {}: {err}", folder.display()),
        }
    }
    found.sort();
    Ok(found)
}

/// Captures directly inside a source folder.
pub fn list_captures(folder: &Path, extension: &str) -> Result<Vec<PathBuf>, HunterError> {
    list_matching(folder, "", extension)
}

/// Fragments waiting to be merged in a filter's output folder.
pub fn list_fragments(folder: &Path, extension: &str) -> Result<Vec<PathBuf>, HunterError> {
    list_matching(folder, FRAGMENT_PREFIX, extension)
}
