//! Batch pairing, per-pair failure isolation, and progress events.
//!
//! The orchestrator filters and sorts both file lists, pairs every
//! template with the first input whose name contains the template's
//! stem, and runs the pipeline on each pair inside a failure boundary.
//! One pair's failure never aborts the run; it becomes that pair's
//! [`ProcessingResult`].
//!
//! Progress flows through a caller-supplied callback, so the core has
//! no output-stream dependency; the CLI turns events into JSON lines.

use std::path::{Path, PathBuf};

use crate::codec;
use crate::crop::resolve_crop;
use crate::features::{detect_and_describe, DetectorConfig};
use crate::homography::estimate_homography;
use crate::matching::match_descriptors;
use crate::render::render;
use crate::trace::trace_span;
use crate::util::{FeatCropError, FeatCropResult, ImageSide};

/// Extensions recognized as processable images (compared
/// ASCII-case-insensitively).
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Options for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory receiving native-resolution crops, if any.
    pub output_high: Option<PathBuf>,
    /// Directory receiving fixed-size crops, if any.
    pub output_fixed: Option<PathBuf>,
    /// Fixed output width; with `target_height` it also fixes the crop
    /// aspect.
    pub target_width: u32,
    /// Fixed output height.
    pub target_height: u32,
    /// Keypoint detector tunables.
    pub detector: DetectorConfig,
}

/// Progress event pushed to the caller while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Info(String),
    Success(String),
    Error(String),
}

/// Outcome classification for one template.
#[derive(Debug, Clone, PartialEq)]
pub enum PairStatus {
    /// The pipeline ran to completion and all requested outputs exist.
    Processed,
    /// No input file name contained the template stem; skipped, not an
    /// error.
    UnmatchedTemplate,
    /// The pipeline failed; the batch continued.
    Failed(FeatCropError),
}

/// Per-template report. Never holds pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    /// Template stem the report refers to.
    pub template: String,
    pub status: PairStatus,
    /// Human-readable outcome line.
    pub message: String,
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    /// Number of templates fully processed.
    pub processed: usize,
    /// One entry per template that had a pairing decision made.
    pub results: Vec<ProcessingResult>,
}

/// Runs the pipeline over every pairable template in `templates`.
///
/// Both lists are filtered to recognized image extensions and sorted,
/// so pairing does not depend on the platform's enumeration order. A
/// template stem is matched against input file names as a substring;
/// the first match wins, so a stem like `page1` intentionally pairs
/// with `page10_scan.jpg` when that sorts first.
pub fn run(
    templates: &[PathBuf],
    inputs: &[PathBuf],
    options: &BatchOptions,
    emit: &mut dyn FnMut(BatchEvent),
) -> BatchSummary {
    let mut templates = filter_images(templates);
    let mut inputs = filter_images(inputs);
    templates.sort();
    inputs.sort();

    emit(BatchEvent::Info(format!(
        "Found {} templates and {} input images",
        templates.len(),
        inputs.len()
    )));

    let mut processed = 0usize;
    let mut results = Vec::with_capacity(templates.len());
    for template in &templates {
        let stem = match template.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => continue,
        };

        let Some(input) = find_input(&inputs, &stem) else {
            results.push(ProcessingResult {
                template: stem.clone(),
                status: PairStatus::UnmatchedTemplate,
                message: format!("No input file matches template: {stem}"),
            });
            continue;
        };

        let output_high = options
            .output_high
            .as_ref()
            .map(|dir| dir.join(format!("{stem}.png")));
        let output_fixed = options
            .output_fixed
            .as_ref()
            .map(|dir| dir.join(format!("{stem}.png")));

        match process_pair(
            template,
            input,
            output_high.as_deref(),
            output_fixed.as_deref(),
            options,
        ) {
            Ok(()) => {
                processed += 1;
                let message = format!("Processed: {stem}");
                emit(BatchEvent::Success(message.clone()));
                results.push(ProcessingResult {
                    template: stem,
                    status: PairStatus::Processed,
                    message,
                });
            }
            Err(err) => {
                let message = format!("Error processing {stem}: {err}");
                emit(BatchEvent::Error(message.clone()));
                results.push(ProcessingResult {
                    template: stem,
                    status: PairStatus::Failed(err),
                    message,
                });
            }
        }
    }

    emit(BatchEvent::Success(format!(
        "Complete. Processed {processed} images."
    )));
    BatchSummary { processed, results }
}

/// Runs the full pipeline for one template/input pair.
///
/// Buffers are dropped as soon as a later stage no longer needs them,
/// bounding peak memory on large photographs.
fn process_pair(
    template_path: &Path,
    input_path: &Path,
    output_high: Option<&Path>,
    output_fixed: Option<&Path>,
    options: &BatchOptions,
) -> FeatCropResult<()> {
    let _span = trace_span!("process_pair").entered();

    let target = codec::load(input_path)?;
    let template = codec::load(template_path)?;
    let template_gray = codec::to_gray(&template);
    let (template_width, template_height) = template_gray.dimensions();
    drop(template);

    let target_gray = codec::to_gray(&target);
    let (template_keypoints, template_descriptors) =
        detect_and_describe(&template_gray, &options.detector, ImageSide::Template)?;
    drop(template_gray);
    let (target_keypoints, target_descriptors) =
        detect_and_describe(&target_gray, &options.detector, ImageSide::Target)?;
    drop(target_gray);

    let correspondences = match_descriptors(
        &template_keypoints,
        &template_descriptors,
        &target_keypoints,
        &target_descriptors,
    )?;
    let homography = estimate_homography(&correspondences)?;

    let aspect = options.target_width as f64 / options.target_height as f64;
    let crop = resolve_crop(
        &homography,
        template_width,
        template_height,
        target.width(),
        target.height(),
        aspect,
    )?;

    let fixed_dims = output_fixed
        .is_some()
        .then_some((options.target_width, options.target_height));
    let rendered = render(&target, crop, fixed_dims)?;
    drop(target);

    if let Some(path) = output_high {
        codec::save(path, &rendered.high_res)?;
    }
    if let (Some(path), Some(fixed)) = (output_fixed, rendered.fixed.as_ref()) {
        codec::save(path, fixed)?;
    }
    Ok(())
}

/// Keeps only paths with a recognized image extension.
fn filter_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| has_image_extension(path))
        .cloned()
        .collect()
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// First input whose file name contains `stem` as a substring.
fn find_input<'a>(inputs: &'a [PathBuf], stem: &str) -> Option<&'a PathBuf> {
    inputs.iter().find(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy().contains(stem))
            .unwrap_or(false)
    })
}
