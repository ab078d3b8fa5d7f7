use std::path::Path;

use dossier_pdf::dossier_core::OcrMode;
use dossier_pdf::ocr::add_text_layer;
use dossier_pdf::ocr::tesseract::TesseractOcr;
use dossier_pdf::{CancelToken, PopplerRasterizer, StageError};

use crate::envcfg::config_from_env;
use crate::shared::{open_document, save_document};

pub fn run(file: &Path, output: Option<&Path>, force: bool, strict: bool) -> Result<(), i32> {
    let mut builder = open_document(file)?;

    let mut cfg = config_from_env();
    if force {
        cfg.ocr_mode = OcrMode::Force;
    }
    if cfg.ocr_mode == OcrMode::Off {
        println!("OCR disabled (OCR_MODE=off); nothing to do.");
        return Ok(());
    }

    let workdir = tempfile::tempdir().map_err(|e| {
        eprintln!("Error: cannot create working directory: {e}");
        1
    })?;

    let stats = match add_text_layer(
        &mut builder,
        &cfg,
        &PopplerRasterizer,
        &TesseractOcr,
        workdir.path(),
        &CancelToken::new(),
    ) {
        Ok(stats) => stats,
        Err(StageError::OcrUnavailable(reason)) if !strict && !cfg.ocr_strict => {
            println!("OCR engine unavailable ({reason}); document left unchanged.");
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: OCR failed: {e}");
            return Err(1);
        }
    };

    save_document(&mut builder, file, output)?;
    println!(
        "Text layer: {} of {} page(s), {} word(s)",
        stats.pages_with_layer, stats.pages_scanned, stats.words_inserted
    );
    Ok(())
}
