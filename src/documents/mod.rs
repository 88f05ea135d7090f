//! Document facade and its supporting types.
//!
//! Every operation resolves its destination inside the output directory,
//! hands the work to a capability provider and returns either a uniform
//! result descriptor or a typed [`DocumentError`].

mod error;
mod facade;
mod options;
mod store;
mod types;

pub use error::{DocumentError, DocumentResult};
pub use facade::{watermark_position, DocumentFacade, FacadeConfig};
pub use options::{
    merge_options, option_bool, option_f64, option_page_format, option_str, render_defaults,
    OptionMap, PageFormat, QualityHint, DEFAULT_RENDER_MARGIN,
};
pub use store::{validate_name, OutputStore};
pub use types::{
    ArtifactInfo, OperationOutcome, OperationRequest, ResultDescriptor, WatermarkOptions,
};
