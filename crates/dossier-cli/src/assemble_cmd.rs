use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use dossier_pdf::Pipeline;
use dossier_pdf::dossier_core::Fragment;
use serde::Deserialize;

use crate::envcfg::config_from_env;

/// One fragment in the assembly manifest. Paths are relative to the
/// manifest file.
#[derive(Debug, Deserialize)]
struct ManifestFragment {
    file: PathBuf,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    header: Option<String>,
    #[serde(default)]
    title: Option<String>,
    /// Chronology key, ISO `YYYY-MM-DD`.
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    fragments: Vec<ManifestFragment>,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    manifest_path: &Path,
    output: &Path,
    keep_toc: bool,
    keep_work: bool,
    no_headers: bool,
    no_fojas: bool,
    json: bool,
) -> Result<(), i32> {
    let manifest = load_manifest(manifest_path)?;
    let base = manifest_path.parent().unwrap_or(Path::new("."));
    let fragments = load_fragments(&manifest, base)?;

    let mut cfg = config_from_env();
    cfg.keep_toc |= keep_toc;
    cfg.keep_work |= keep_work;
    if no_headers {
        cfg.stamp_headers = false;
    }
    if no_fojas {
        cfg.foliate = false;
    }

    let pipeline = Pipeline::new(cfg);
    let report = pipeline.run(fragments, output).map_err(|e| {
        eprintln!("Error: assembly failed: {e}");
        1
    })?;

    if json {
        let skipped: Vec<serde_json::Value> = report
            .skipped
            .iter()
            .map(|s| serde_json::json!({ "name": s.name, "reason": s.reason }))
            .collect();
        let out = serde_json::json!({
            "output": output.display().to_string(),
            "pages": report.pages,
            "idx_pages": report.idx_pages,
            "blank_pages_removed": report.blank_pages_removed,
            "folios_stamped": report.folios_stamped,
            "links": report.links,
            "ocr_pages": report.ocr.pages_with_layer,
            "ocr_words": report.ocr.words_inserted,
            "output_size": report.output_size,
            "skipped": skipped,
        });
        let rendered = serde_json::to_string_pretty(&out).map_err(|e| {
            eprintln!("Error: cannot render report: {e}");
            1
        })?;
        println!("{rendered}");
    } else {
        println!(
            "Assembled {} ({} pages, {} index page(s), {} bytes)",
            output.display(),
            report.pages,
            report.idx_pages,
            report.output_size
        );
        if report.folios_stamped > 0 {
            println!("Folios stamped: {}", report.folios_stamped);
        }
        if report.ocr.pages_with_layer > 0 {
            println!(
                "OCR: {} page(s), {} word(s)",
                report.ocr.pages_with_layer, report.ocr.words_inserted
            );
        }
        for skipped in &report.skipped {
            println!("Skipped {}: {}", skipped.name, skipped.reason);
        }
    }
    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest, i32> {
    if !path.exists() {
        eprintln!("Error: manifest not found: {}", path.display());
        return Err(1);
    }
    let json = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: cannot read manifest: {e}");
        1
    })?;
    serde_json::from_str(&json).map_err(|e| {
        eprintln!("Error: malformed manifest: {e}");
        1
    })
}

fn load_fragments(manifest: &Manifest, base: &Path) -> Result<Vec<Fragment>, i32> {
    let mut fragments = Vec::with_capacity(manifest.fragments.len());
    for entry in &manifest.fragments {
        let path = base.join(&entry.file);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                // One missing file must not sink the dossier.
                eprintln!("Warning: fragment {} unreadable: {e}", path.display());
                continue;
            }
        };
        let name = entry.name.clone().unwrap_or_else(|| {
            entry
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.file.display().to_string())
        });
        let mut fragment = Fragment::new(bytes, name);
        if let Some(header) = &entry.header {
            fragment = fragment.with_header(header.clone());
        }
        if let Some(title) = &entry.title {
            fragment = fragment.with_toc_title(title.clone());
        }
        if let Some(date) = &entry.date {
            match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(date) => fragment = fragment.with_chronology(date),
                Err(e) => eprintln!("Warning: bad date '{date}' for {}: {e}", fragment.name),
            }
        }
        fragments.push(fragment);
    }
    if fragments.is_empty() {
        eprintln!("Error: manifest lists no readable fragments");
        return Err(1);
    }
    Ok(fragments)
}
