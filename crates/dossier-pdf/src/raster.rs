//! Page rasterization for the OCR and blank-filter stages.
//!
//! Rasterization shells out to whichever poppler/mupdf binary is installed,
//! tried in order until one produces an image. The trait seam exists so the
//! pipeline is testable without any external tool.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::StageError;

/// Renders one page of a PDF file to a PNG image.
pub trait PageRasterizer {
    /// Rasterize the 0-based `page` of `pdf_path` at `dpi`, writing the
    /// image under `workdir` and returning its path.
    fn rasterize(
        &self,
        pdf_path: &Path,
        page: usize,
        dpi: u32,
        workdir: &Path,
    ) -> Result<PathBuf, StageError>;
}

/// Shell-based rasterizer: `pdftoppm` first, `mutool draw` as fallback.
#[derive(Debug, Default)]
pub struct PopplerRasterizer;

impl PageRasterizer for PopplerRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        page: usize,
        dpi: u32,
        workdir: &Path,
    ) -> Result<PathBuf, StageError> {
        match rasterize_pdftoppm(pdf_path, page, dpi, workdir) {
            Ok(path) => return Ok(path),
            Err(e) => {
                debug!(page, error = %e, "pdftoppm failed, trying mutool");
            }
        }
        match rasterize_mutool(pdf_path, page, dpi, workdir) {
            Ok(path) => Ok(path),
            Err(e) => {
                warn!(page, error = %e, "no rasterizer backend succeeded");
                Err(StageError::RasterUnavailable(
                    "pdftoppm and mutool both failed".to_string(),
                ))
            }
        }
    }
}

fn rasterize_pdftoppm(
    pdf_path: &Path,
    page: usize,
    dpi: u32,
    workdir: &Path,
) -> Result<PathBuf, StageError> {
    let one_based = page + 1;
    let prefix = workdir.join(format!("raster-{one_based}"));
    let status = Command::new("pdftoppm")
        .arg("-png")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-f")
        .arg(one_based.to_string())
        .arg("-l")
        .arg(one_based.to_string())
        .arg(pdf_path)
        .arg(&prefix)
        .status()
        .map_err(|e| StageError::Raster(format!("pdftoppm: {e}")))?;
    if !status.success() {
        return Err(StageError::Raster(format!("pdftoppm exited {status}")));
    }
    // pdftoppm pads the page suffix to the document's digit count.
    let stem = prefix
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    for entry in std::fs::read_dir(workdir)? {
        let path = entry?.path();
        let name = path.file_name().map(|s| s.to_string_lossy().into_owned());
        if let Some(name) = name
            && name.starts_with(&stem)
            && name.ends_with(".png")
        {
            return Ok(path);
        }
    }
    Err(StageError::Raster("pdftoppm produced no image".to_string()))
}

fn rasterize_mutool(
    pdf_path: &Path,
    page: usize,
    dpi: u32,
    workdir: &Path,
) -> Result<PathBuf, StageError> {
    let out = workdir.join(format!("raster-mu-{}.png", page + 1));
    let status = Command::new("mutool")
        .arg("draw")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-o")
        .arg(&out)
        .arg(pdf_path)
        .arg((page + 1).to_string())
        .status()
        .map_err(|e| StageError::Raster(format!("mutool: {e}")))?;
    if !status.success() {
        return Err(StageError::Raster(format!("mutool exited {status}")));
    }
    if !out.is_file() {
        return Err(StageError::Raster("mutool produced no image".to_string()));
    }
    Ok(out)
}

/// Fraction of near-white samples in the image, sampling every 8th luma
/// byte. Cheap enough to run on full-resolution rasters.
pub fn whiteness_ratio(image_path: &Path) -> Result<f64, StageError> {
    let img = image::open(image_path)
        .map_err(|e| StageError::Raster(format!("image decode: {e}")))?
        .into_luma8();
    let data = img.as_raw();
    if data.is_empty() {
        return Ok(1.0);
    }
    let mut white = 0usize;
    let mut total = 0usize;
    for &luma in data.iter().step_by(8) {
        total += 1;
        if luma >= 245 {
            white += 1;
        }
    }
    Ok(white as f64 / total as f64)
}

/// Pixel dimensions of an image file.
pub fn image_dimensions(image_path: &Path) -> Result<(u32, u32), StageError> {
    image::image_dimensions(image_path)
        .map_err(|e| StageError::Raster(format!("image probe: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn write_gray(path: &Path, w: u32, h: u32, fill: impl Fn(u32, u32) -> u8) {
        let img = GrayImage::from_fn(w, h, |x, y| Luma([fill(x, y)]));
        img.save(path).unwrap();
    }

    #[test]
    fn white_image_reports_full_whiteness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        write_gray(&path, 64, 64, |_, _| 255);
        assert!(whiteness_ratio(&path).unwrap() > 0.999);
    }

    #[test]
    fn dark_image_reports_low_whiteness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dark.png");
        write_gray(&path, 64, 64, |_, _| 20);
        assert!(whiteness_ratio(&path).unwrap() < 0.01);
    }

    #[test]
    fn half_dark_image_sits_in_the_middle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half.png");
        write_gray(&path, 64, 64, |_, y| if y < 32 { 255 } else { 0 });
        let ratio = whiteness_ratio(&path).unwrap();
        assert!(ratio > 0.3 && ratio < 0.7, "ratio = {ratio}");
    }

    #[test]
    fn dimensions_match_written_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dims.png");
        write_gray(&path, 120, 80, |_, _| 128);
        assert_eq!(image_dimensions(&path).unwrap(), (120, 80));
    }
}
