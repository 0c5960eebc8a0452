use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::error::{Result, TraceError};
use crate::event::{EventKind, TraceEvent};
use crate::model::{RootListing, RootSummary, STATUS_RUNNING, is_failure_status};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootFilter {
    /// Case-insensitive substring of the root agent name.
    pub agent: Option<String>,
    pub limit: Option<usize>,
}

impl RootFilter {
    fn matches(&self, root: &RootSummary) -> bool {
        self.agent.as_deref().is_none_or(|needle| {
            root.agent
                .to_lowercase()
                .contains(&needle.to_lowercase())
        })
    }
}

/// Single forward pass producing one summary per root invocation.
pub fn collect_roots(events: &[TraceEvent]) -> BTreeMap<String, RootSummary> {
    let mut roots = BTreeMap::<String, RootSummary>::new();

    for event in events {
        let Some(root_id) = event.effective_root() else {
            continue;
        };

        if event.opens_root() && !roots.contains_key(root_id) {
            roots.insert(root_id.to_string(), open_root(root_id, event));
        }

        let Some(root) = roots.get_mut(root_id) else {
            continue;
        };

        let is_self = event.invocation_id.as_deref() == Some(root_id);
        match event.kind {
            EventKind::RunEnd | EventKind::InvocationEnd if is_self => {
                if let Some(status) = &event.status {
                    root.status.clone_from(status);
                }
                if event.elapsed_ms.is_some() {
                    root.elapsed_ms = event.elapsed_ms;
                }
                root.end_line = Some(event.line);
                root.end_ts.clone_from(&event.timestamp);
            }
            EventKind::InvocationStart if !is_self => root.child_invocations += 1,
            EventKind::RunEnd if event.depth > 0 => {
                root.child_runs += 1;
                if is_failure_status(event.status.as_deref()) {
                    root.child_failures += 1;
                }
            }
            _ => {}
        }
    }

    log::debug!("collected {} root invocations", roots.len());
    roots
}

fn open_root(root_id: &str, event: &TraceEvent) -> RootSummary {
    let agent = event
        .requested_agents
        .first()
        .or(event.agent.as_ref())
        .cloned()
        .unwrap_or_else(|| "-".to_string());

    RootSummary {
        root_id: root_id.to_string(),
        start_line: event.line,
        start_ts: event.timestamp.clone(),
        mode: event.mode.clone(),
        agent,
        status: STATUS_RUNNING.to_string(),
        elapsed_ms: None,
        end_line: None,
        end_ts: None,
        child_invocations: 0,
        child_runs: 0,
        child_failures: 0,
    }
}

/// Matching roots, most recently started first.
pub fn list_roots(roots: &BTreeMap<String, RootSummary>, filter: &RootFilter) -> RootListing {
    let mut rows = roots
        .values()
        .filter(|root| filter.matches(root))
        .collect::<Vec<_>>();
    rows.sort_by_key(|root| Reverse(root.start_line));

    let matched = rows.len();
    if let Some(limit) = filter.limit {
        rows.truncate(limit);
    }
    RootListing {
        matched,
        rows: rows.into_iter().cloned().collect(),
    }
}

pub fn latest_root(
    roots: &BTreeMap<String, RootSummary>,
    agent: Option<&str>,
) -> Result<RootSummary> {
    let filter = RootFilter {
        agent: agent.map(ToString::to_string),
        limit: Some(1),
    };
    list_roots(roots, &filter)
        .rows
        .into_iter()
        .next()
        .ok_or(TraceError::NoMatchingRoots)
}
