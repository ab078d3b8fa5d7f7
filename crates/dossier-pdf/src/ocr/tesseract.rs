//! Tesseract-backed OCR engine.
//!
//! Shells out to the `tesseract` binary in TSV mode and parses word-level
//! rows (level 5). Language tags are passed through to `-l` unmodified, so
//! callers use tesseract's own codes ("spa", "eng", "spa+eng").

use std::path::Path;
use std::process::Command;

use dossier_core::BBox;

use super::{OcrEngine, OcrWord};
use crate::error::StageError;

/// OCR via the system `tesseract` binary.
#[derive(Debug, Default)]
pub struct TesseractOcr;

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn probe(&self) -> Result<(), StageError> {
        let output = Command::new("tesseract")
            .arg("--version")
            .output()
            .map_err(|e| StageError::OcrUnavailable(format!("tesseract not runnable: {e}")))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(StageError::OcrUnavailable(format!(
                "tesseract --version exited {}",
                output.status
            )))
        }
    }

    fn recognize(&self, image: &Path, lang: &str) -> Result<Vec<OcrWord>, StageError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .arg("tsv")
            .output()
            .map_err(|e| StageError::Ocr(format!("tesseract spawn: {e}")))?;
        if !output.status.success() {
            return Err(StageError::Ocr(format!(
                "tesseract exited {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv(&tsv))
    }
}

/// Parse tesseract TSV output into words. Rows are
/// `level page block par line word left top width height conf text`;
/// only level-5 rows with a non-empty text cell and non-negative confidence
/// are words.
fn parse_tsv(tsv: &str) -> Vec<OcrWord> {
    let mut words = Vec::new();
    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let conf: f64 = cols[10].parse().unwrap_or(-1.0);
        if conf < 0.0 {
            continue;
        }
        let (Ok(left), Ok(top), Ok(width), Ok(height)) = (
            cols[6].parse::<f64>(),
            cols[7].parse::<f64>(),
            cols[8].parse::<f64>(),
            cols[9].parse::<f64>(),
        ) else {
            continue;
        };
        words.push(OcrWord {
            text: text.to_string(),
            bbox: BBox::new(left, top, left + width, top + height),
        });
    }
    words
}
