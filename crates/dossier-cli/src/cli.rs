use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Assemble navigable, text-searchable PDF dossiers from document fragments.
#[derive(Debug, Parser)]
#[command(name = "dossier", about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Assemble a dossier from a fragment manifest
    Assemble {
        /// JSON manifest listing the fragments in portal order
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Path of the output PDF
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Keep the link-map sidecar next to the output
        #[arg(long)]
        keep_toc: bool,

        /// Keep the temporary working directory (debugging)
        #[arg(long)]
        keep_work: bool,

        /// Skip the per-fragment header frames
        #[arg(long)]
        no_headers: bool,

        /// Skip folio numbering
        #[arg(long)]
        no_fojas: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add an OCR text layer to an existing PDF
    Searchable {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path. Default: overwrite the input
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// OCR every page, not only pages lacking body text
        #[arg(long)]
        force: bool,

        /// Fail when the OCR engine is unavailable
        #[arg(long)]
        strict: bool,
    },

    /// Stamp folio numbers onto an existing PDF
    Foliate {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path. Default: overwrite the input
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Leading pages (cover + index) left unnumbered
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Value stamped on the first numbered page
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Number every page instead of one side per leaf
        #[arg(long)]
        every_page: bool,

        /// Fixed text drawn before the number (e.g. 'fs.')
        #[arg(long, value_name = "TEXT")]
        prefix: Option<String>,
    },

    /// Re-apply index links from a sidecar link map
    RepairLinks {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Link-map sidecar. Default: FILE.toc.json
        #[arg(long, value_name = "MAP")]
        map: Option<PathBuf>,

        /// Output path. Default: overwrite the input
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
