//! Batch runner: sequential per-file conversion with progress and summary.
//!
//! Items are processed strictly in working-set order, one at a time. Every
//! per-item error is converted into a `Failure` outcome at the item
//! boundary; the run always completes (unless cancelled) and always
//! produces a summary with `succeeded + failed == total`.

use crate::common_utils::{base_name, ensure_dir_exists, same_path_case_insensitive};
use crate::encode;
use crate::errors::{ConvertError, Result};
use crate::heic;
use crate::policy::{self, SourceMetadata, TargetFormat};
use crate::session::Session;
use image::DynamicImage;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Sibling-mode output directory created beside each input.
pub const OUTPUT_DIR_NAME: &str = "Converted Files";

/// Immutable parameters shared by every item of one batch run.
#[derive(Debug, Clone, Copy)]
pub struct ConversionRequest {
    pub target: TargetFormat,
    /// Overwrite originals (delete the source after a successful encode).
    pub replace_original: bool,
    /// Forward EXIF/ICC blocks from the source into the output.
    pub preserve_metadata: bool,
}

impl Default for ConversionRequest {
    fn default() -> Self {
        Self {
            target: TargetFormat::Png,
            replace_original: true,
            preserve_metadata: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ConversionOutcome {
    Success { input: PathBuf, output: PathBuf },
    Failure { input: PathBuf, cause: String },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Distinct sibling output directories used (empty in replace mode).
    pub output_folders: BTreeSet<PathBuf>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<ConversionOutcome>,
    pub summary: RunSummary,
}

/// Progress/result sink. Any front end (CLI progress bar, GUI, test probe)
/// adapts to this interface; `on_progress` fires once per processed item.
pub trait ProgressSink {
    fn on_progress(&mut self, _completed: usize, _total: usize) {}
    fn on_complete(&mut self, _summary: &RunSummary) {}
}

/// Sink that ignores all notifications.
pub struct NullSink;

impl ProgressSink for NullSink {}

pub struct BatchRunner {
    request: ConversionRequest,
    cancel: Option<Arc<AtomicBool>>,
}

impl BatchRunner {
    pub fn new(request: ConversionRequest) -> Self {
        Self {
            request,
            cancel: None,
        }
    }

    /// Cooperative cancellation, checked once per item boundary. A
    /// cancelled run still reports a summary over the items processed.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn run(&self, session: &mut Session, sink: &mut dyn ProgressSink) -> RunReport {
        let inputs: Vec<PathBuf> = session.working_set.paths().to_vec();
        let total = inputs.len();

        let mut outcomes = Vec::with_capacity(total);
        let mut output_folders = BTreeSet::new();
        let mut completed = 0usize;
        let mut cancelled = false;

        for input in &inputs {
            if self.is_cancelled() {
                warn!(completed, total, "Run cancelled at item boundary");
                cancelled = true;
                break;
            }

            let outcome = match self.convert_one(input, &mut output_folders) {
                Ok(output) => {
                    info!(input = %input.display(), output = %output.display(), "Converted");
                    ConversionOutcome::Success {
                        input: input.clone(),
                        output,
                    }
                }
                Err(e) => {
                    warn!(input = %input.display(), error = %e, "Conversion failed");
                    ConversionOutcome::Failure {
                        input: input.clone(),
                        cause: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);

            completed += 1;
            sink.on_progress(completed, total);
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let summary = RunSummary {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            output_folders,
            cancelled,
        };

        // Replace mode consumed the originals; keep the set on failure or
        // cancellation so the user can inspect and retry.
        if self.request.replace_original && succeeded > 0 && !cancelled {
            session.working_set.clear();
        }

        sink.on_complete(&summary);

        RunReport { outcomes, summary }
    }

    fn convert_one(&self, input: &Path, output_folders: &mut BTreeSet<PathBuf>) -> Result<PathBuf> {
        let output = self.output_path_for(input, output_folders)?;

        let (image, metadata) = decode_input(input)?;
        let (normalized, options) = policy::plan(
            image,
            self.request.target,
            self.request.preserve_metadata,
            &metadata,
        );

        encode::write_output(&output, &normalized, &options)?;

        if self.request.replace_original && !same_path_case_insensitive(input, &output) {
            // The conversion itself succeeded; a stuck original is only a warning.
            if let Err(e) = std::fs::remove_file(input) {
                warn!(input = %input.display(), error = %e, "Could not remove original file");
            }
        }

        Ok(output)
    }

    fn output_path_for(
        &self,
        input: &Path,
        output_folders: &mut BTreeSet<PathBuf>,
    ) -> Result<PathBuf> {
        let dir = input
            .parent()
            .ok_or_else(|| ConvertError::InvalidPath(format!("{} has no parent", input.display())))?;
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ConvertError::InvalidPath(format!("{} has no usable filename", input.display()))
            })?;
        let file_name = format!("{}.{}", stem, self.request.target.extension());

        if self.request.replace_original {
            Ok(dir.join(file_name))
        } else {
            let out_dir = dir.join(OUTPUT_DIR_NAME);
            ensure_dir_exists(&out_dir)?;
            output_folders.insert(out_dir.clone());
            Ok(out_dir.join(file_name))
        }
    }
}

/// Decode one input. HEIC/HEIF goes through libheif; anything else the
/// image crate can sniff is accepted too, without metadata carry-over,
/// so the runner does not hard-fail on a mislabeled file.
fn decode_input(input: &Path) -> Result<(DynamicImage, SourceMetadata)> {
    if heic::is_heic_file(input) {
        heic::decode_heic(input)
    } else {
        let image = image::open(input).map_err(|e| {
            ConvertError::Decode(format!("{}: {}", base_name(input), e))
        })?;
        Ok((image, SourceMetadata::default()))
    }
}
