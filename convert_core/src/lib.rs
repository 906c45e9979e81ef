//! Core conversion pipeline for heic-convert
//!
//! This crate provides everything the CLI (or any other front end) needs to
//! run a HEIC/HEIF batch conversion:
//! - File collector (recursive scan, extension filter, dedup against a working set)
//! - Conversion policy (pixel-mode normalization + encode options per target format)
//! - Batch runner (sequential per-file conversion with progress and summary)
//! - HEIC decode via libheif, encode via image/webp, EXIF/ICC carry-over
//! - Session state (ordered, deduplicated working set)
//! - Logging setup shared by all front ends

pub mod collector;
pub mod common_utils;
pub mod encode;
pub mod errors;
pub mod heic;
pub mod logging;
pub mod policy;
pub mod runner;
pub mod safety;
pub mod session;

pub use collector::{collect, classify_report, CollectOutcome, CollectReport, SUPPORTED_EXTENSIONS};
pub use errors::{ConvertError, Result};
pub use heic::{decode_heic, is_heic_file};
pub use policy::{plan, EncodeOptions, SourceMetadata, TargetFormat, JPEG_QUALITY, WEBP_QUALITY};
pub use runner::{
    BatchRunner, ConversionOutcome, ConversionRequest, NullSink, ProgressSink, RunReport,
    RunSummary, OUTPUT_DIR_NAME,
};
pub use safety::check_dangerous_directory;
pub use session::{Session, WorkingSet};
