use std::path::Path;

use dossier_pdf::links::repair_links;
use dossier_pdf::sidecar::{read_sidecar, sidecar_path_for};

use crate::shared::{open_document, save_document};

pub fn run(file: &Path, map: Option<&Path>, output: Option<&Path>) -> Result<(), i32> {
    let map_path = map
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sidecar_path_for(file));
    let map = read_sidecar(&map_path).map_err(|e| {
        eprintln!("Error: cannot read link map {}: {e}", map_path.display());
        1
    })?;

    let mut builder = open_document(file)?;
    let inserted = repair_links(&mut builder, &map).map_err(|e| {
        eprintln!("Error: link repair failed: {e}");
        1
    })?;
    save_document(&mut builder, file, output)?;
    println!("Restored {inserted} link(s) from {}", map_path.display());
    Ok(())
}
