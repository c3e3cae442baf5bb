use std::path::{Path, PathBuf};
use crate::error::HunterError;
use crate::tools::path_str;
use crate::vec_of_strings;

/// `mergecap -w <output> <fragment>...`, merges the fragments into one capture ordered by packet
/// timestamp.
pub fn merge_command(
    mergecap: &str,
    output: &Path,
    fragments: &[PathBuf],
) -> Result<Vec<String>, HunterError> {
    let mut cmd = vec_of_strings![mergecap, "-w", path_str(output)?];
    for fragment in fragments {
        cmd.push(path_str(fragment)?.to_string());
    }
    Ok(cmd)
}
