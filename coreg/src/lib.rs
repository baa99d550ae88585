//! Co-registration of multi-band aerial captures.
//!
//! Each band image carries vendor XMP metadata describing its lens
//! distortion and its optical-center offset relative to the reference band.
//! The [`pipeline`] undistorts every band, aligns it with that metadata,
//! optionally refines the alignment photometrically against the reference
//! band, and writes the result under the original file name.

pub mod compositor;
pub mod config;
pub mod error;
pub mod grouping;
pub mod image;
pub mod interpolation;
pub mod math;
pub mod metadata;
pub mod pipeline;
pub mod record;
pub mod refine;
pub mod transform;
pub mod undistort;

pub use compositor::{FileSink, ImageSink};
pub use config::AlignConfig;
pub use error::{Error, Result};
pub use grouping::{group_records, select_reference, GroupKey};
pub use pipeline::{BatchSummary, Pipeline};
pub use record::CaptureRecord;
pub use refine::{RefineOutcome, Refiner};
pub use transform::{Transform, TransformType};
