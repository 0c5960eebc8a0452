//! Decoding of the line-delimited subagent trace log.
//!
//! Every line is an independent JSON object. Lines that are blank, fail to
//! parse, or are not objects are dropped; the survivors keep their 1-based
//! source line number, which is the total order used by every consumer.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, TraceError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventKind {
    InvocationStart,
    SingleStart,
    ParallelStart,
    InvocationEnd,
    RunEnd,
    ToolEnd,
    #[default]
    Other,
}

impl EventKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "subagent_invocation_start" => Self::InvocationStart,
            "subagent_single_start" => Self::SingleStart,
            "subagent_parallel_start" => Self::ParallelStart,
            "subagent_invocation_end" => Self::InvocationEnd,
            "subagent_run_end" => Self::RunEnd,
            "subagent_tool_end" => Self::ToolEnd,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationMode {
    Single,
    Parallel,
    Other(String),
}

impl InvocationMode {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "single" => Self::Single,
            "parallel" => Self::Parallel,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Parallel => write!(f, "parallel"),
            Self::Other(raw) => write!(f, "{raw}"),
        }
    }
}

impl Serialize for InvocationMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One decoded log line. Absent or ill-typed fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceEvent {
    pub line: usize,
    pub kind: EventKind,
    pub invocation_id: Option<String>,
    pub root_invocation_id: Option<String>,
    pub parent_invocation_id: Option<String>,
    pub parent_run_id: Option<String>,
    pub run_id: Option<String>,
    pub agent: Option<String>,
    pub requested_agents: Vec<String>,
    pub mode: Option<InvocationMode>,
    pub depth: u64,
    pub status: Option<String>,
    pub elapsed_ms: Option<i64>,
    pub timestamp: Option<String>,
    pub task_count: Option<i64>,
    pub success_count: Option<i64>,
    pub tool_name: Option<String>,
    pub tool_summary: Option<String>,
    pub stderr_tail: Option<String>,
}

impl TraceEvent {
    pub fn from_value(line: usize, value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| object.get(key).and_then(string_value);
        let number = |key: &str| object.get(key).and_then(lenient_int);

        Some(Self {
            line,
            kind: text("event")
                .map(|name| EventKind::parse(&name))
                .unwrap_or_default(),
            invocation_id: text("invocationId"),
            root_invocation_id: text("rootInvocationId"),
            parent_invocation_id: text("parentInvocationId"),
            parent_run_id: text("parentRunId"),
            run_id: text("runId"),
            agent: text("agent"),
            requested_agents: object
                .get("requestedAgents")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(string_value)
                .collect(),
            mode: text("mode").map(|mode| InvocationMode::parse(&mode)),
            depth: number("depth")
                .and_then(|depth| u64::try_from(depth).ok())
                .unwrap_or(0),
            status: text("status"),
            elapsed_ms: number("elapsedMs"),
            timestamp: text("timestamp"),
            task_count: number("taskCount"),
            success_count: number("successCount"),
            tool_name: text("toolName"),
            tool_summary: text("toolSummary"),
            stderr_tail: text("stderrTail"),
        })
    }

    /// The root this event belongs to: `rootInvocationId`, else the
    /// event's own invocation.
    pub fn effective_root(&self) -> Option<&str> {
        self.root_invocation_id
            .as_deref()
            .or(self.invocation_id.as_deref())
    }

    pub fn opens_root(&self) -> bool {
        self.kind == EventKind::InvocationStart
            && self.invocation_id.is_some()
            && self.invocation_id.as_deref() == self.effective_root()
    }
}

fn string_value(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

/// Accepts integers, floats (truncated) and integer strings.
#[allow(clippy::cast_possible_truncation)]
pub fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.is_finite())
                .map(|float| float.trunc() as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn parse_events(raw: &str) -> Vec<TraceEvent> {
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for (line_idx, line) in raw.lines().enumerate() {
        let line_no = line_idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let decoded = serde_json::from_str::<Value>(trimmed)
            .ok()
            .and_then(|value| TraceEvent::from_value(line_no, &value));

        match decoded {
            Some(event) => events.push(event),
            None => {
                skipped += 1;
                log::debug!("skipping malformed trace line {line_no}");
            }
        }
    }

    if skipped > 0 {
        log::debug!("skipped {skipped} malformed trace lines");
    }
    events
}

pub fn load_events(path: &Path) -> Result<Vec<TraceEvent>> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            TraceError::TraceFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            TraceError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let events = parse_events(&String::from_utf8_lossy(&bytes));
    log::debug!("loaded {} trace events from {}", events.len(), path.display());
    Ok(events)
}
