pub mod align;
pub mod compare;
pub mod evaluate;
pub mod lookup;
pub mod workflow;

pub use align::{AlignedSource, Alignment, AlignmentError, DEFAULT_WINDOW, FormKey};
pub use compare::{
    Compare, CompareStats, RunOptions, SourceConfig, SourceDataError, combine_auto, combine_files,
    reconcile_pos,
};
pub use evaluate::{ErrorType, Report, Tally, evaluate};
pub use lookup::{LookupStats, load_lexicons, lookup_stream};
pub use workflow::{Workflow, standardize_or_passthrough};
