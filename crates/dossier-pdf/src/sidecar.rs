//! LinkMap sidecar persistence.
//!
//! The map is written as JSON next to the output document so a later
//! process (or a re-run of the repair pass alone) can rebuild the index
//! links without re-assembling the dossier.

use std::path::{Path, PathBuf};

use dossier_core::LinkMap;

use crate::error::StageError;

/// Sidecar path for an output document: the output path with `.toc.json`
/// appended.
pub fn sidecar_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".toc.json");
    PathBuf::from(name)
}

/// Write the map as pretty-printed JSON.
pub fn write_sidecar(path: &Path, map: &LinkMap) -> Result<(), StageError> {
    let json = serde_json::to_string_pretty(map)
        .map_err(|e| StageError::Toc(format!("sidecar encode: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a map back from a sidecar file.
pub fn read_sidecar(path: &Path) -> Result<LinkMap, StageError> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| StageError::Toc(format!("sidecar decode: {e}")))
}
