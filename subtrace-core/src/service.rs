use std::path::Path;

use serde::Serialize;

use crate::analytics::DebugReport;
use crate::error::{Result, TraceError};
use crate::event::load_events;
use crate::index::RootIndex;
use crate::model::{RootListing, RootSummary};
use crate::render;
use crate::roots::{RootFilter, collect_roots, latest_root, list_roots};

pub const DEFAULT_ROOT_LIMIT: usize = 10;

pub fn resolve_roots(trace: &Path, filter: &RootFilter) -> Result<RootListing> {
    let events = load_events(trace)?;
    let roots = collect_roots(&events);
    Ok(list_roots(&roots, filter))
}

pub fn resolve_latest_root(trace: &Path, agent: Option<&str>) -> Result<RootSummary> {
    let events = load_events(trace)?;
    let roots = collect_roots(&events);
    latest_root(&roots, agent)
}

pub fn render_roots_text(listing: &RootListing) -> String {
    render::render_roots_table(listing)
}

pub fn render_latest_text(root: &RootSummary) -> String {
    render::render_root_summary(root)
}

pub fn to_raw_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|err| TraceError::Serialization(err.to_string()))
}

pub fn render_root_tree(trace: &Path, root_id: &str, include_runs: bool) -> Result<String> {
    let events = load_events(trace)?;
    let index = RootIndex::build(&events, root_id)?;
    Ok(render::render_tree(&index, include_runs))
}

pub fn render_root_debug(trace: &Path, root_id: &str, min_tool_ms: i64) -> Result<String> {
    let events = load_events(trace)?;
    let index = RootIndex::build(&events, root_id)?;
    let report = DebugReport::build(&index, min_tool_ms);
    Ok(render::render_debug_report(&index, &report))
}
