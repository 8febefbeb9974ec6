//! Annotation dataset: assembly, import schema, writing, and run summary.

mod assembler;
mod interface;
mod record;
pub mod schema;
mod summary;
mod writer;

pub use assembler::{AssemblyError, AssemblyOptions, Assembler, RegionIdStrategy};
pub use interface::{labeling_config, LABELS_FROM_NAME};
pub use record::{AnnotationShape, Dataset, DatasetRecord, SchemaError};
pub use schema::{Prediction, Region, RegionKind, RegionMeta, RegionValue, Task, TaskData};
pub use summary::{DocumentFailure, PageFailure, RunSummary};
pub use writer::{read_tasks, DatasetWriter};

pub use crate::utils::WriteError;
