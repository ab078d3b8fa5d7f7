use std::path::Path;

use dossier_pdf::dossier_core::FoliationPolicy;
use dossier_pdf::foliate::stamp_folios;

use crate::shared::{open_document, save_document};

pub fn run(
    file: &Path,
    output: Option<&Path>,
    skip: usize,
    start: u32,
    every_page: bool,
    prefix: Option<&str>,
) -> Result<(), i32> {
    let mut builder = open_document(file)?;
    let policy = FoliationPolicy {
        skip_leading_pages: skip,
        stride_two: !every_page,
        start_value: start,
        fixed_text: prefix.map(str::to_string),
    };
    let stamped = stamp_folios(&mut builder, &policy).map_err(|e| {
        eprintln!("Error: foliation failed: {e}");
        1
    })?;
    save_document(&mut builder, file, output)?;
    println!("Stamped {stamped} folio(s) on {} page(s)", builder.page_count());
    Ok(())
}
