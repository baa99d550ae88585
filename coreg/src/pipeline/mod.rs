//! The alignment pipeline.
//!
//! Records are grouped by capture. Within a group the reference band is
//! undistorted once and shared read-only; every record then runs
//!
//! - A: lens undistortion,
//! - B: metadata alignment (`H_meta`),
//! - C: optional photometric refinement against the reference (`H_ecc`),
//! - D: the final warp by `H_total`, handed to the [`ImageSink`].
//!
//! Failures are confined to the record they occur in.

mod stages;
mod summary;


pub use stages::{metadata_transform, undistortion_model, TransformChain};
pub use summary::BatchSummary;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::compositor::{emit, ImageSink};
use crate::config::AlignConfig;
use crate::grouping::{group_records, select_reference, GroupKey};
use crate::image::{load_image, BandImage, Plane};
use crate::interpolation::warp_image;
use crate::record::CaptureRecord;
use crate::refine::{EccRefiner, RefineOutcome, Refiner};
use crate::transform::Transform;
use crate::undistort::{undistort_image, Undistortion};

/// Reference band of a group: its undistorted image and the normalized
/// intensity other bands are refined against.
#[derive(Debug)]
pub struct ReferenceContext {
    pub index: usize,
    pub file_name: String,
    pub image: BandImage,
    pub intensity: Plane,
}

/// What happened to the photometric stage of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    /// No reference, refinement disabled, or the record is the reference.
    NotAttempted,
    Converged,
    Failed,
}

/// Result of processing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Written {
        chain: TransformChain,
        refinement: Refinement,
    },
    /// Image unreadable or output not written.
    Skipped,
}

pub struct Pipeline {
    config: AlignConfig,
    refiner: Box<dyn Refiner>,
    sink: Box<dyn ImageSink>,
}

impl Pipeline {
    /// Pipeline with the ECC refiner configured from `config`.
    pub fn new(config: AlignConfig, sink: Box<dyn ImageSink>) -> Self {
        let refiner = Box::new(EccRefiner::new(config.ecc));
        Self {
            config,
            refiner,
            sink,
        }
    }

    pub fn with_refiner(mut self, refiner: Box<dyn Refiner>) -> Self {
        self.refiner = refiner;
        self
    }

    /// Read metadata for every path, group, and align all groups in key
    /// order.
    pub fn run(&self, paths: &[PathBuf]) -> BatchSummary {
        let records: Vec<CaptureRecord> = if self.config.parallel {
            paths.par_iter().map(|p| CaptureRecord::load(p)).collect()
        } else {
            paths.iter().map(|p| CaptureRecord::load(p)).collect()
        };
        self.run_records(records)
    }

    pub fn run_records(&self, records: Vec<CaptureRecord>) -> BatchSummary {
        let groups: BTreeMap<GroupKey, Vec<CaptureRecord>> = group_records(records);
        let mut summary = BatchSummary::default();

        for (key, group) in &groups {
            let (group_summary, _) = self.process_group(key, group);
            summary.absorb(&group_summary);
        }

        log::info!("Done: {summary}");
        summary
    }

    /// Align one capture group. Outcomes are returned in group order.
    pub fn process_group(
        &self,
        key: &GroupKey,
        group: &[CaptureRecord],
    ) -> (BatchSummary, Vec<RecordOutcome>) {
        log::info!("Processing group: {key} ({} images)", group.len());

        let reference = self.reference_context(key, group);

        let run = |(index, record): (usize, &CaptureRecord)| {
            self.process_record(index, record, reference.as_deref())
        };
        let outcomes: Vec<RecordOutcome> = if self.config.parallel {
            group.par_iter().enumerate().map(run).collect()
        } else {
            group.iter().enumerate().map(run).collect()
        };

        let mut summary = BatchSummary {
            groups: 1,
            records: group.len(),
            ..Default::default()
        };
        for outcome in &outcomes {
            match outcome {
                RecordOutcome::Written { refinement, .. } => {
                    summary.written += 1;
                    match refinement {
                        Refinement::Converged => summary.refined += 1,
                        Refinement::Failed => summary.refinement_failures += 1,
                        Refinement::NotAttempted => {}
                    }
                }
                RecordOutcome::Skipped => summary.skipped += 1,
            }
        }

        (summary, outcomes)
    }

    /// Undistort the group's reference band once, before any other record
    /// is processed.
    fn reference_context(
        &self,
        key: &GroupKey,
        group: &[CaptureRecord],
    ) -> Option<Arc<ReferenceContext>> {
        let Some(index) = select_reference(group, self.config.reference_tolerance) else {
            log::info!("  No reference image found for group {key}");
            return None;
        };
        let record = &group[index];
        log::info!("  Reference found: {}", record.file_name);

        let raw = match load_image(&record.path) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("  Reference {} unreadable: {err}", record.file_name);
                return None;
            }
        };
        let image = self.undistort(record, &raw);
        let intensity = image.to_intensity().normalized();

        Some(Arc::new(ReferenceContext {
            index,
            file_name: record.file_name.clone(),
            image,
            intensity,
        }))
    }

    fn undistort(&self, record: &CaptureRecord, raw: &BandImage) -> BandImage {
        match undistortion_model(record) {
            Some(model) => undistort_image(
                raw,
                &model,
                self.config.interpolation,
                self.config.border_value,
            ),
            None => raw.clone(),
        }
    }

    /// Run stages A to D for one record of a group.
    pub fn process_record(
        &self,
        index: usize,
        record: &CaptureRecord,
        reference: Option<&ReferenceContext>,
    ) -> RecordOutcome {
        let is_reference = reference.is_some_and(|r| r.index == index);

        // Stage A
        let undistorted = match reference {
            Some(r) if is_reference => r.image.clone(),
            _ => match load_image(&record.path) {
                Ok(raw) => self.undistort(record, &raw),
                Err(err) => {
                    log::warn!("  Skipping {}: {err}", record.file_name);
                    return RecordOutcome::Skipped;
                }
            },
        };
        let undistortion = undistortion_model(record);

        // Stage B
        let meta = metadata_transform(record, self.config.translation_tolerance);

        // Stage C
        let (chain, refinement) = match reference {
            Some(r) if self.config.refine && !is_reference => {
                self.refine(record, &undistorted, undistortion, meta, r)
            }
            _ => (
                TransformChain::metadata_only(undistortion, meta),
                Refinement::NotAttempted,
            ),
        };
        log::debug!("  {}:\n{chain}", record.file_name);

        // Stage D
        let output = warp_image(
            &undistorted,
            &chain.total,
            self.config.interpolation,
            self.config.border_value,
        );
        if emit(self.sink.as_ref(), &record.file_name, &output) {
            RecordOutcome::Written { chain, refinement }
        } else {
            RecordOutcome::Skipped
        }
    }

    fn refine(
        &self,
        record: &CaptureRecord,
        undistorted: &BandImage,
        undistortion: Option<Undistortion>,
        meta: Transform,
        reference: &ReferenceContext,
    ) -> (TransformChain, Refinement) {
        log::info!(
            "  Aligning {} to {}",
            record.file_name,
            reference.file_name
        );

        let aligned = warp_image(
            undistorted,
            &meta,
            self.config.interpolation,
            self.config.border_value,
        );
        let moving = aligned.to_intensity().normalized();

        match self.refiner.refine(&reference.intensity, &moving) {
            RefineOutcome::Converged {
                transform,
                correlation,
                iterations,
            } => {
                log::info!(
                    "    Refinement converged (cc={correlation:.6}, {iterations} iterations)"
                );
                (
                    TransformChain::refined(undistortion, meta, transform),
                    Refinement::Converged,
                )
            }
            RefineOutcome::Failed { reason } => {
                log::warn!(
                    "    Refinement of {} failed: {reason}; using metadata alignment",
                    record.file_name
                );
                (
                    TransformChain::metadata_only(undistortion, meta),
                    Refinement::Failed,
                )
            }
        }
    }
}
