use serde::Serialize;

use crate::event::InvocationMode;

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_SUCCESS: &str = "success";

/// A run failed when it reported a status other than success.
pub fn is_failure_status(status: Option<&str>) -> bool {
    status.is_some_and(|status| status != STATUS_SUCCESS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootSummary {
    pub root_id: String,
    pub start_line: usize,
    pub start_ts: Option<String>,
    pub mode: Option<InvocationMode>,
    pub agent: String,
    pub status: String,
    pub elapsed_ms: Option<i64>,
    pub end_line: Option<usize>,
    pub end_ts: Option<String>,
    pub child_invocations: usize,
    pub child_runs: usize,
    pub child_failures: usize,
}

/// Filtered roots, trimmed to the row limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootListing {
    /// Roots that matched the filter before the limit was applied.
    pub matched: usize,
    pub rows: Vec<RootSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub line: usize,
    pub timestamp: Option<String>,
    pub invocation_id: String,
    pub run_id: Option<String>,
    pub agent: Option<String>,
    pub status: Option<String>,
    pub elapsed_ms: Option<i64>,
    pub depth: u64,
    pub stderr_tail: Option<String>,
}

impl RunRecord {
    /// Depth 0 is the root's own attempt; everything deeper is delegated work.
    pub fn is_specialist(&self) -> bool {
        self.depth >= 1
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(STATUS_SUCCESS)
    }

    pub fn is_failure(&self) -> bool {
        is_failure_status(self.status.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub line: usize,
    pub invocation_id: String,
    pub run_id: Option<String>,
    pub agent: Option<String>,
    pub elapsed_ms: i64,
    pub tool_name: Option<String>,
    pub tool_summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationRecord {
    pub invocation_id: String,
    pub start_line: Option<usize>,
    pub start_ts: Option<String>,
    pub mode: Option<InvocationMode>,
    pub depth: Option<u64>,
    pub parent_invocation_id: Option<String>,
    pub parent_run_id: Option<String>,
    pub requested_agents: Vec<String>,
    pub agent: Option<String>,
    pub parallel_task_count: Option<i64>,
    pub status: Option<String>,
    pub elapsed_ms: Option<i64>,
    pub end_line: Option<usize>,
    pub end_ts: Option<String>,
    pub task_count: Option<i64>,
    pub success_count: Option<i64>,
    pub runs: Vec<RunRecord>,
}

impl InvocationRecord {
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            ..Self::default()
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.mode == Some(InvocationMode::Parallel)
    }

    pub fn has_ended(&self) -> bool {
        self.end_line.is_some()
    }

    /// Declared fan-out size, preferring the count reported at the end.
    pub fn effective_task_count(&self) -> Option<i64> {
        self.task_count.or(self.parallel_task_count)
    }
}
