//! Failure and bottleneck reductions over one indexed root.
//!
//! Everything here only reads the [`RootIndex`]. Depth-0 runs (the root's
//! own attempts) are excluded from every report.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use crate::index::RootIndex;
use crate::model::{RunRecord, ToolCall};

pub const TOP_N: usize = 5;
pub const DEFAULT_MIN_TOOL_MS: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    MissingApiKey,
    LockHeld,
    FetchFailed,
    UnknownTool,
    Generic,
}

// Checked in order; the first match wins.
const ERROR_PATTERNS: &[(&str, ErrorClass)] = &[
    ("no api key found", ErrorClass::MissingApiKey),
    ("lock file is already being held", ErrorClass::LockHeld),
    ("fetch failed", ErrorClass::FetchFailed),
    ("unknown tool", ErrorClass::UnknownTool),
];

impl ErrorClass {
    pub fn label(self) -> &'static str {
        match self {
            Self::MissingApiKey => "No API key found",
            Self::LockHeld => "Lock file already held",
            Self::FetchFailed => "fetch failed",
            Self::UnknownTool => "unknown tool",
            Self::Generic => "error",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies a stderr excerpt; empty or missing text has no class.
pub fn classify_error(stderr_tail: Option<&str>) -> Option<ErrorClass> {
    let text = stderr_tail?.to_lowercase();
    if text.is_empty() {
        return None;
    }
    let class = ERROR_PATTERNS
        .iter()
        .find(|(pattern, _)| text.contains(pattern))
        .map_or(ErrorClass::Generic, |(_, class)| *class);
    Some(class)
}

fn specialist_runs(index: &RootIndex) -> impl Iterator<Item = &RunRecord> {
    index.runs().into_iter().filter(|run| run.is_specialist())
}

pub fn failures(index: &RootIndex) -> Vec<&RunRecord> {
    specialist_runs(index).filter(|run| run.is_failure()).collect()
}

/// Successful specialist runs, slowest first. Each run carries its owning
/// invocation id.
pub fn slowest_attempts(index: &RootIndex, limit: usize) -> Vec<&RunRecord> {
    let mut runs = specialist_runs(index)
        .filter(|run| run.is_success())
        .collect::<Vec<_>>();
    runs.sort_by_key(|run| Reverse(run.elapsed_ms.unwrap_or(0)));
    runs.truncate(limit);
    runs
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTotal {
    pub agent: String,
    pub total_ms: i64,
}

pub fn cumulative_by_agent(index: &RootIndex) -> Vec<AgentTotal> {
    let mut totals = BTreeMap::<String, i64>::new();
    for run in specialist_runs(index) {
        let agent = run.agent.clone().unwrap_or_else(|| "-".to_string());
        *totals.entry(agent).or_default() += run.elapsed_ms.unwrap_or(0);
    }

    let mut rows = totals
        .into_iter()
        .map(|(agent, total_ms)| AgentTotal { agent, total_ms })
        .collect::<Vec<_>>();
    // BTreeMap order already breaks ties by agent name.
    rows.sort_by_key(|row| Reverse(row.total_ms));
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOverhead<'a> {
    pub run: &'a RunRecord,
    pub elapsed_ms: i64,
    pub tool_ms: i64,
    pub overhead_ms: i64,
}

/// Wall time not spent inside tool calls, for successful specialist runs.
pub fn run_overhead(index: &RootIndex, limit: usize) -> Vec<RunOverhead<'_>> {
    let mut rows = specialist_runs(index)
        .filter(|run| run.is_success())
        .map(|run| {
            let elapsed_ms = run.elapsed_ms.unwrap_or(0);
            let tool_ms = index.tool_time(run.run_id.as_deref());
            RunOverhead {
                run,
                elapsed_ms,
                tool_ms,
                overhead_ms: elapsed_ms - tool_ms,
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by_key(|row| (Reverse(row.overhead_ms), Reverse(row.elapsed_ms), row.run.line));
    rows.truncate(limit);
    rows
}

pub fn slow_tools(index: &RootIndex, min_ms: i64, limit: usize) -> Vec<&ToolCall> {
    let mut tools = index
        .tool_calls()
        .iter()
        .filter(|tool| tool.elapsed_ms >= min_ms)
        .collect::<Vec<_>>();
    tools.sort_by_key(|tool| (Reverse(tool.elapsed_ms), tool.line));
    tools.truncate(limit);
    tools
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugReport<'a> {
    pub failures: Vec<&'a RunRecord>,
    pub slowest: Vec<&'a RunRecord>,
    pub cumulative: Vec<AgentTotal>,
    pub overhead: Vec<RunOverhead<'a>>,
    pub slow_tools: Vec<&'a ToolCall>,
    pub min_tool_ms: i64,
}

impl<'a> DebugReport<'a> {
    pub fn build(index: &'a RootIndex, min_tool_ms: i64) -> Self {
        Self {
            failures: failures(index),
            slowest: slowest_attempts(index, TOP_N),
            cumulative: cumulative_by_agent(index),
            overhead: run_overhead(index, TOP_N),
            slow_tools: slow_tools(index, min_tool_ms, TOP_N),
            min_tool_ms,
        }
    }
}
