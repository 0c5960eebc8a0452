pub mod analytics;
pub mod error;
pub mod event;
pub mod format;
pub mod index;
pub mod model;
pub mod paths;
pub mod render;
pub mod roots;
pub mod service;
pub mod tree;

pub use analytics::{DEFAULT_MIN_TOOL_MS, DebugReport, ErrorClass, classify_error};
pub use error::{Result, TraceError};
pub use event::{EventKind, InvocationMode, TraceEvent, load_events, parse_events};
pub use format::format_elapsed;
pub use index::RootIndex;
pub use model::{InvocationRecord, RootListing, RootSummary, RunRecord, ToolCall};
pub use paths::TracePaths;
pub use roots::RootFilter;
pub use service::{
    DEFAULT_ROOT_LIMIT, render_latest_text, render_root_debug, render_root_tree,
    render_roots_text, resolve_latest_root, resolve_roots, to_raw_json,
};
