//! Correlated per-root state: every invocation, run and tool call reachable
//! from one root invocation.
//!
//! The index is built by one forward pass over the decoded events. During
//! the pass each invocation lives in a mutable [`InvocationRecord`] that the
//! event kinds merge into field by field; once the pass (and the root
//! backfill) is done the records are only exposed by shared reference.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, TraceError};
use crate::event::{EventKind, InvocationMode, TraceEvent};
use crate::model::{InvocationRecord, RunRecord, ToolCall};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootIndex {
    root_id: String,
    invocations: BTreeMap<String, InvocationRecord>,
    tool_time_by_run: HashMap<String, i64>,
    tool_calls: Vec<ToolCall>,
}

impl RootIndex {
    /// Indexes every event rooted at `root_id` plus the events `root_id`
    /// logged itself, so a child invocation can be queried on its own.
    ///
    /// Fails with [`TraceError::RootNotFound`] when no event carries
    /// `root_id` as its `invocationId`.
    pub fn build(events: &[TraceEvent], root_id: &str) -> Result<Self> {
        let mut builder = IndexBuilder::default();
        for event in events.iter().filter(|event| belongs_to(event, root_id)) {
            builder.apply(event);
        }

        let index = builder.finish(root_id)?;
        log::debug!(
            "indexed root {root_id}: {} invocations, {} tool calls",
            index.invocations.len(),
            index.tool_calls.len()
        );
        Ok(index)
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> &InvocationRecord {
        &self.invocations[&self.root_id]
    }

    pub fn invocation(&self, invocation_id: &str) -> Option<&InvocationRecord> {
        self.invocations.get(invocation_id)
    }

    pub fn invocations(&self) -> impl Iterator<Item = &InvocationRecord> {
        self.invocations.values()
    }

    /// All runs of all invocations, in source line order.
    pub fn runs(&self) -> Vec<&RunRecord> {
        let mut runs = self
            .invocations
            .values()
            .flat_map(|invocation| invocation.runs.iter())
            .collect::<Vec<_>>();
        runs.sort_by_key(|run| run.line);
        runs
    }

    /// Summed tool time recorded for a run id; zero when none was recorded.
    pub fn tool_time(&self, run_id: Option<&str>) -> i64 {
        run_id
            .and_then(|run_id| self.tool_time_by_run.get(run_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }
}

fn belongs_to(event: &TraceEvent, root_id: &str) -> bool {
    event.root_invocation_id.as_deref() == Some(root_id)
        || event.invocation_id.as_deref() == Some(root_id)
}

#[derive(Debug, Default)]
struct IndexBuilder {
    invocations: BTreeMap<String, InvocationRecord>,
    tool_time_by_run: HashMap<String, i64>,
    tool_calls: Vec<ToolCall>,
}

impl IndexBuilder {
    fn apply(&mut self, event: &TraceEvent) {
        let Some(invocation_id) = event.invocation_id.as_deref() else {
            return;
        };
        let info = self
            .invocations
            .entry(invocation_id.to_string())
            .or_insert_with(|| InvocationRecord::new(invocation_id));

        match event.kind {
            EventKind::InvocationStart => merge_start(info, event),
            EventKind::SingleStart => {
                if event.agent.is_some() {
                    info.agent.clone_from(&event.agent);
                }
            }
            EventKind::ParallelStart => info.parallel_task_count = event.task_count,
            EventKind::InvocationEnd => merge_end(info, event),
            EventKind::RunEnd => merge_run(info, event),
            EventKind::ToolEnd => {
                if let Some(run_id) = &event.run_id {
                    *self.tool_time_by_run.entry(run_id.clone()).or_default() +=
                        event.elapsed_ms.unwrap_or(0);
                }
                if event.depth >= 1 {
                    self.tool_calls.push(ToolCall {
                        line: event.line,
                        invocation_id: invocation_id.to_string(),
                        run_id: event.run_id.clone(),
                        agent: event.agent.clone(),
                        elapsed_ms: event.elapsed_ms.unwrap_or(0),
                        tool_name: event.tool_name.clone(),
                        tool_summary: event.tool_summary.clone(),
                    });
                }
            }
            EventKind::Other => {}
        }
    }

    fn finish(mut self, root_id: &str) -> Result<RootIndex> {
        let Some(root) = self.invocations.get_mut(root_id) else {
            return Err(TraceError::RootNotFound {
                root_id: root_id.to_string(),
            });
        };
        backfill_root(root);

        Ok(RootIndex {
            root_id: root_id.to_string(),
            invocations: self.invocations,
            tool_time_by_run: self.tool_time_by_run,
            tool_calls: self.tool_calls,
        })
    }
}

fn merge_start(info: &mut InvocationRecord, event: &TraceEvent) {
    info.start_line = Some(event.line);
    info.start_ts.clone_from(&event.timestamp);
    info.mode.clone_from(&event.mode);
    info.depth = Some(event.depth);
    info.parent_invocation_id
        .clone_from(&event.parent_invocation_id);
    info.parent_run_id.clone_from(&event.parent_run_id);
    info.requested_agents.clone_from(&event.requested_agents);

    if info.mode == Some(InvocationMode::Single) && info.agent.is_none() {
        info.agent = info.requested_agents.first().cloned();
    }
}

fn merge_end(info: &mut InvocationRecord, event: &TraceEvent) {
    if event.status.is_some() {
        info.status.clone_from(&event.status);
    }
    if event.elapsed_ms.is_some() {
        info.elapsed_ms = event.elapsed_ms;
    }
    info.end_line = Some(event.line);
    info.end_ts.clone_from(&event.timestamp);
    if event.task_count.is_some() {
        info.task_count = event.task_count;
    }
    if event.success_count.is_some() {
        info.success_count = event.success_count;
    }
    if info.agent.is_none() {
        info.agent.clone_from(&event.agent);
    }
}

// Retries are kept: repeated run ids each append their own record.
fn merge_run(info: &mut InvocationRecord, event: &TraceEvent) {
    info.runs.push(RunRecord {
        line: event.line,
        timestamp: event.timestamp.clone(),
        invocation_id: info.invocation_id.clone(),
        run_id: event.run_id.clone(),
        agent: event.agent.clone(),
        status: event.status.clone(),
        elapsed_ms: event.elapsed_ms,
        depth: event.depth,
        stderr_tail: event.stderr_tail.clone(),
    });

    // Only fill gaps; an explicit invocation end always wins.
    if info.status.is_none() {
        info.status.clone_from(&event.status);
    }
    if info.elapsed_ms.is_none() {
        info.elapsed_ms = event.elapsed_ms;
    }
    if info.agent.is_none() {
        info.agent.clone_from(&event.agent);
    }
}

/// A root that never logged its own end (or ended without a status) takes
/// status and elapsed time from its most recent run.
fn backfill_root(root: &mut InvocationRecord) {
    if root.has_ended() && root.status.is_some() {
        return;
    }
    let Some(latest) = root.runs.iter().max_by_key(|run| run.line) else {
        return;
    };

    log::debug!(
        "backfilling root {} from run at line {}",
        root.invocation_id,
        latest.line
    );
    root.status.clone_from(&latest.status);
    root.elapsed_ms = latest.elapsed_ms;
}

#[cfg(test)]
mod tests {
    use crate::event::{InvocationMode, parse_events};
    use crate::index::RootIndex;

    const TRACE: &str = concat!(
        "{\"event\":\"subagent_invocation_start\",\"invocationId\":\"r1\",\"rootInvocationId\":\"r1\",\"mode\":\"single\",\"requestedAgents\":[\"planner\"]}\n",
        "{\"event\":\"subagent_invocation_start\",\"invocationId\":\"c1\",\"rootInvocationId\":\"r1\",\"parentInvocationId\":\"r1\",\"parentRunId\":\"r1-run\",\"mode\":\"parallel\",\"depth\":1}\n",
        "{\"event\":\"subagent_parallel_start\",\"invocationId\":\"c1\",\"rootInvocationId\":\"r1\",\"taskCount\":3}\n",
        "{\"event\":\"subagent_tool_end\",\"invocationId\":\"c1\",\"rootInvocationId\":\"r1\",\"runId\":\"c1-run\",\"depth\":1,\"elapsedMs\":200,\"toolName\":\"read\"}\n",
        "{\"event\":\"subagent_tool_end\",\"invocationId\":\"c1\",\"rootInvocationId\":\"r1\",\"runId\":\"c1-run\",\"depth\":1,\"elapsedMs\":300,\"toolName\":\"bash\"}\n",
        "{\"event\":\"subagent_tool_end\",\"invocationId\":\"r1\",\"rootInvocationId\":\"r1\",\"runId\":\"r1-run\",\"depth\":0,\"elapsedMs\":50,\"toolName\":\"bash\"}\n",
        "{\"event\":\"subagent_run_end\",\"invocationId\":\"c1\",\"rootInvocationId\":\"r1\",\"runId\":\"c1-run\",\"agent\":\"scout\",\"depth\":1,\"status\":\"error\",\"elapsedMs\":700}\n",
        "{\"event\":\"subagent_run_end\",\"invocationId\":\"c1\",\"rootInvocationId\":\"r1\",\"runId\":\"c1-run\",\"agent\":\"scout\",\"depth\":1,\"status\":\"success\",\"elapsedMs\":1000}\n",
        "{\"event\":\"subagent_invocation_end\",\"invocationId\":\"c1\",\"rootInvocationId\":\"r1\",\"status\":\"success\",\"elapsedMs\":1800,\"taskCount\":3,\"successCount\":2}\n",
        "{\"event\":\"subagent_run_end\",\"invocationId\":\"r1\",\"rootInvocationId\":\"r1\",\"runId\":\"r1-run\",\"agent\":\"planner\",\"depth\":0,\"status\":\"error\",\"elapsedMs\":1500}\n",
        "{\"event\":\"subagent_run_end\",\"invocationId\":\"r1\",\"rootInvocationId\":\"r1\",\"runId\":\"r1-run\",\"agent\":\"planner\",\"depth\":0,\"status\":\"success\",\"elapsedMs\":2500}\n",
        "{\"event\":\"subagent_invocation_start\",\"invocationId\":\"r9\",\"mode\":\"single\"}\n",
    );

    #[test]
    fn merges_events_per_invocation() {
        let index = RootIndex::build(&parse_events(TRACE), "r1").expect("index");

        let child = index.invocation("c1").expect("child");
        assert_eq!(child.start_line, Some(2));
        assert_eq!(child.mode, Some(InvocationMode::Parallel));
        assert_eq!(child.depth, Some(1));
        assert_eq!(child.parent_invocation_id.as_deref(), Some("r1"));
        assert_eq!(child.parent_run_id.as_deref(), Some("r1-run"));
        assert_eq!(child.parallel_task_count, Some(3));
        assert_eq!(child.task_count, Some(3));
        assert_eq!(child.success_count, Some(2));
        assert_eq!(child.status.as_deref(), Some("success"));
        assert_eq!(child.elapsed_ms, Some(1800));
        assert_eq!(child.agent.as_deref(), Some("scout"));

        assert!(index.invocation("r9").is_none());
    }

    #[test]
    fn single_mode_takes_requested_agent() {
        let index = RootIndex::build(&parse_events(TRACE), "r1").expect("index");
        assert_eq!(index.root().agent.as_deref(), Some("planner"));
    }

    #[test]
    fn retries_are_kept_in_order() {
        let index = RootIndex::build(&parse_events(TRACE), "r1").expect("index");
        let child = index.invocation("c1").expect("child");

        assert_eq!(child.runs.len(), 2);
        assert_eq!(child.runs[0].line, 7);
        assert_eq!(child.runs[1].line, 8);
        assert_eq!(child.runs[0].run_id, child.runs[1].run_id);
        assert_eq!(child.runs[0].invocation_id, "c1");
    }

    #[test]
    fn accumulates_tool_time_per_run() {
        let index = RootIndex::build(&parse_events(TRACE), "r1").expect("index");

        assert_eq!(index.tool_time(Some("c1-run")), 500);
        assert_eq!(index.tool_time(Some("r1-run")), 50);
        assert_eq!(index.tool_time(Some("missing")), 0);
        assert_eq!(index.tool_time(None), 0);

        // Depth 0 tool calls count toward run time but are not listed.
        assert_eq!(index.tool_calls().len(), 2);
        assert_eq!(index.tool_calls()[0].tool_name.as_deref(), Some("read"));
    }

    #[test]
    fn root_without_end_backfills_from_latest_run() {
        let index = RootIndex::build(&parse_events(TRACE), "r1").expect("index");
        let root = index.root();

        assert_eq!(root.status.as_deref(), Some("success"));
        assert_eq!(root.elapsed_ms, Some(2500));
    }

    #[test]
    fn explicit_end_is_not_backfilled() {
        let raw = concat!(
            "{\"event\":\"subagent_invocation_start\",\"invocationId\":\"r1\"}\n",
            "{\"event\":\"subagent_invocation_end\",\"invocationId\":\"r1\",\"status\":\"aborted\",\"elapsedMs\":40}\n",
            "{\"event\":\"subagent_run_end\",\"invocationId\":\"r1\",\"status\":\"success\",\"elapsedMs\":90}\n",
        );
        let index = RootIndex::build(&parse_events(raw), "r1").expect("index");
        assert_eq!(index.root().status.as_deref(), Some("aborted"));
        assert_eq!(index.root().elapsed_ms, Some(40));
    }

    #[test]
    fn run_end_does_not_overwrite_mode() {
        let raw = concat!(
            "{\"event\":\"subagent_invocation_start\",\"invocationId\":\"r1\",\"mode\":\"parallel\"}\n",
            "{\"event\":\"subagent_run_end\",\"invocationId\":\"r1\",\"mode\":\"single\",\"status\":\"success\"}\n",
        );
        let index = RootIndex::build(&parse_events(raw), "r1").expect("index");
        assert_eq!(index.root().mode, Some(InvocationMode::Parallel));
    }

    #[test]
    fn unknown_root_is_not_found() {
        let events = parse_events(TRACE);

        let err = RootIndex::build(&events, "missing").expect_err("must fail");
        assert!(format!("{err}").contains("root invocation not found: missing"));

        // Referenced as a parent or root, but never logged as an invocation.
        let raw = concat!(
            "{\"event\":\"subagent_invocation_start\",\"invocationId\":\"c7\",\"rootInvocationId\":\"ghost\",\"parentInvocationId\":\"p0\",\"depth\":1}\n",
            "{\"event\":\"subagent_run_end\",\"invocationId\":\"c7\",\"rootInvocationId\":\"ghost\",\"depth\":1,\"status\":\"success\"}\n",
        );
        let events = parse_events(raw);
        for root_id in ["ghost", "p0"] {
            let err = RootIndex::build(&events, root_id).expect_err("must fail");
            assert!(format!("{err}").contains(&format!("root invocation not found: {root_id}")));
        }
    }

    #[test]
    fn child_invocation_is_indexed_when_queried_directly() {
        let index = RootIndex::build(&parse_events(TRACE), "c1").expect("index");

        assert_eq!(index.root_id(), "c1");
        assert_eq!(index.root().parent_invocation_id.as_deref(), Some("r1"));
        assert_eq!(index.root().status.as_deref(), Some("success"));
        assert_eq!(index.root().elapsed_ms, Some(1800));
        assert_eq!(index.root().runs.len(), 2);
        assert_eq!(index.invocations().count(), 1);
        assert!(index.invocation("r1").is_none());
        assert_eq!(index.tool_time(Some("c1-run")), 500);
    }

    #[test]
    fn runs_are_listed_by_line() {
        let index = RootIndex::build(&parse_events(TRACE), "r1").expect("index");
        let lines = index.runs().iter().map(|run| run.line).collect::<Vec<_>>();
        assert_eq!(lines, vec![7, 8, 10, 11]);
    }
}
