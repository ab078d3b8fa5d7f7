//! Pipeline configuration from environment-style flags.
//!
//! The portal automation that feeds this tool configures it through the
//! process environment; every knob also has a sensible default so a bare
//! invocation behaves well. `WINOCR_LANGS` is accepted as a legacy alias
//! for `OCR_LANGS`.

use dossier_pdf::dossier_core::{OcrMode, PipelineConfig};

/// Build the pipeline configuration from the process environment.
pub fn config_from_env() -> PipelineConfig {
    config_from(|key| std::env::var(key).ok())
}

/// Build the configuration from an arbitrary key lookup (testable).
pub fn config_from(get: impl Fn(&str) -> Option<String>) -> PipelineConfig {
    let mut cfg = PipelineConfig::default();

    if let Some(mode) = get("OCR_MODE") {
        cfg.ocr_mode = OcrMode::parse(&mode);
    }
    if let Some(dpi) = get("OCR_DPI").and_then(|v| v.trim().parse().ok()) {
        cfg.ocr_dpi = dpi;
    }
    if let Some(langs) = get("OCR_LANGS").or_else(|| get("WINOCR_LANGS")) {
        let langs: Vec<String> = langs
            .split([',', '+', ' '])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !langs.is_empty() {
            cfg.ocr_langs = langs;
        }
    }
    if let Some(rotations) = get("OCR_ROTATIONS") {
        let rotations: Vec<u16> = rotations
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        if !rotations.is_empty() {
            cfg.ocr_rotations = rotations;
        }
    }
    if let Some(chars) = get("PAGE_BODY_MIN_CHARS").and_then(|v| v.trim().parse().ok()) {
        cfg.page_body_min_chars = chars;
    }
    if let Some(flag) = get("STAMP_HEADERS") {
        cfg.stamp_headers = parse_bool(&flag, cfg.stamp_headers);
    }
    if let Some(flag) = get("FOJAS") {
        cfg.foliate = parse_bool(&flag, cfg.foliate);
    }
    if let Some(flag) = get("KEEP_TOC") {
        cfg.keep_toc = parse_bool(&flag, cfg.keep_toc);
    }
    if let Some(flag) = get("KEEP_WORK") {
        cfg.keep_work = parse_bool(&flag, cfg.keep_work);
    }
    cfg
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "si" | "sí" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
