use std::path::Path;

use dossier_pdf::DocumentBuilder;

/// Open an existing PDF with user-friendly error messages.
///
/// Returns `Err(1)` with a message printed to stderr if the file is missing
/// or cannot be parsed.
pub fn open_document(file: &Path) -> Result<DocumentBuilder, i32> {
    if !file.exists() {
        eprintln!("Error: file not found: {}", file.display());
        return Err(1);
    }
    let bytes = std::fs::read(file).map_err(|e| {
        eprintln!("Error: cannot read {}: {e}", file.display());
        1
    })?;
    DocumentBuilder::from_bytes(&bytes).map_err(|e| {
        eprintln!("Error: failed to open PDF: {e}");
        1
    })
}

/// Write a document back, defaulting to the input path.
pub fn save_document(
    builder: &mut DocumentBuilder,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), i32> {
    let target = output.unwrap_or(input);
    builder.save_file(target).map_err(|e| {
        eprintln!("Error: cannot write {}: {e}", target.display());
        1
    })?;
    Ok(())
}
