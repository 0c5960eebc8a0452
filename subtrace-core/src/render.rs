use crate::analytics::{DebugReport, classify_error};
use crate::format::format_elapsed;
use crate::index::RootIndex;
use crate::model::{InvocationRecord, RootListing, RootSummary, RunRecord, STATUS_RUNNING};
use crate::tree::{ChildMap, build_children};

const NO_ROOTS: &str = "no matching root invocations found";
const ROOTS_HEADER: &str =
    "START (UTC)               AGENT           STATUS            ELAPSED   FAIL/RUNS  ROOT";
const BRANCH: &str = "├─ ";
const LAST_BRANCH: &str = "└─ ";
const PIPE: &str = "│  ";
const SPACE: &str = "   ";

pub fn render_roots_table(listing: &RootListing) -> String {
    let mut output = String::new();
    if listing.matched == 0 {
        output.push_str(NO_ROOTS);
        output.push('\n');
        return output;
    }

    output.push_str(ROOTS_HEADER);
    output.push('\n');
    for row in &listing.rows {
        output.push_str(&format!(
            "{:<24} {:<15.15} {:<16.16} {:<8} {}/{:>7} {}\n",
            row.start_ts.as_deref().unwrap_or("-"),
            row.agent,
            row.status,
            format_elapsed(row.elapsed_ms),
            row.child_failures,
            row.child_runs,
            row.root_id,
        ));
    }
    output
}

pub fn render_root_summary(root: &RootSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("root:    {}\n", root.root_id));
    output.push_str(&format!("agent:   {}\n", root.agent));
    output.push_str(&format!("status:  {}\n", root.status));
    output.push_str(&format!("elapsed: {}\n", format_elapsed(root.elapsed_ms)));
    output.push_str(&format!(
        "start:   {}\n",
        root.start_ts.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "failures:{}/{} child runs\n",
        root.child_failures,
        root.child_runs
    ));
    output
}

pub fn invocation_label(info: &InvocationRecord) -> String {
    let mode = info
        .mode
        .as_ref()
        .map_or_else(|| "?".to_string(), ToString::to_string);
    let agent = if info.is_parallel() {
        "parallel".to_string()
    } else if let Some(agent) = &info.agent {
        agent.clone()
    } else if !info.requested_agents.is_empty() {
        info.requested_agents.join(",")
    } else {
        "-".to_string()
    };
    let status = info.status.as_deref().unwrap_or(STATUS_RUNNING);
    let elapsed = format_elapsed(info.elapsed_ms);

    match (info.success_count, info.effective_task_count()) {
        (Some(success), Some(tasks)) if info.is_parallel() => {
            format!("{agent} [{mode}, {status}, {elapsed}, success {success}/{tasks}]")
        }
        _ => format!("{agent} [{mode}, {status}, {elapsed}]"),
    }
}

fn run_label(run: &RunRecord) -> String {
    let mut label = format!(
        "run {} [{}, {}]",
        run.agent.as_deref().unwrap_or("-"),
        run.status.as_deref().unwrap_or(STATUS_RUNNING),
        format_elapsed(run.elapsed_ms)
    );
    if !run.is_success() {
        if let Some(class) = classify_error(run.stderr_tail.as_deref()) {
            label.push_str(&format!(" ({class})"));
        }
    }
    label
}

enum TreeItem<'a> {
    Run(&'a RunRecord),
    Child(&'a InvocationRecord),
}

pub fn render_tree(index: &RootIndex, include_runs: bool) -> String {
    let children = build_children(index);
    let root = index.root();

    let mut output = String::new();
    output.push_str(&format!("{} {}\n", root.invocation_id, invocation_label(root)));
    walk(&mut output, index, &children, root, "", include_runs);
    output
}

fn walk(
    output: &mut String,
    index: &RootIndex,
    children: &ChildMap<'_>,
    parent: &InvocationRecord,
    prefix: &str,
    include_runs: bool,
) {
    let is_root = parent.invocation_id == index.root_id();
    let mut items = Vec::new();

    if include_runs {
        let mut runs = parent
            .runs
            .iter()
            .filter(|run| !(is_root && run.depth == 0))
            .collect::<Vec<_>>();
        runs.sort_by_key(|run| run.line);
        items.extend(runs.into_iter().map(TreeItem::Run));
    }
    items.extend(
        children
            .children_of(&parent.invocation_id)
            .iter()
            .copied()
            .map(TreeItem::Child),
    );

    let count = items.len();
    for (idx, item) in items.into_iter().enumerate() {
        let is_last = idx + 1 == count;
        let branch = if is_last { LAST_BRANCH } else { BRANCH };

        match item {
            TreeItem::Run(run) => {
                output.push_str(&format!("{prefix}{branch}{}\n", run_label(run)));
            }
            TreeItem::Child(child) => {
                output.push_str(&format!(
                    "{prefix}{branch}{} {}\n",
                    child.invocation_id,
                    invocation_label(child)
                ));
                let child_prefix = format!("{prefix}{}", if is_last { SPACE } else { PIPE });
                walk(output, index, children, child, &child_prefix, include_runs);
            }
        }
    }
}

pub fn render_debug_report(index: &RootIndex, report: &DebugReport<'_>) -> String {
    let mut output = render_tree(index, true);

    output.push_str("\nFailures\n");
    if report.failures.is_empty() {
        output.push_str("- none\n");
    }
    for run in &report.failures {
        let suffix = classify_error(run.stderr_tail.as_deref())
            .map(|class| format!(" ({class})"))
            .unwrap_or_default();
        output.push_str(&format!(
            "- {}: {} [{}, {}]{suffix}\n",
            run.line,
            run.agent.as_deref().unwrap_or("-"),
            run.status.as_deref().unwrap_or(STATUS_RUNNING),
            format_elapsed(run.elapsed_ms)
        ));
    }

    output.push_str("\nSlowest specialist attempts\n");
    if report.slowest.is_empty() {
        output.push_str("- none\n");
    }
    for run in &report.slowest {
        output.push_str(&format!(
            "- {}: {} (invocation {})\n",
            run.agent.as_deref().unwrap_or("-"),
            format_elapsed(run.elapsed_ms),
            run.invocation_id
        ));
    }

    output.push_str("\nCumulative by specialist\n");
    if report.cumulative.is_empty() {
        output.push_str("- none\n");
    }
    for row in &report.cumulative {
        output.push_str(&format!(
            "- {}: {}\n",
            row.agent,
            format_elapsed(Some(row.total_ms))
        ));
    }

    output.push_str("\nRun overhead (elapsed - tool time)\n");
    if report.overhead.is_empty() {
        output.push_str("- none\n");
    }
    for row in &report.overhead {
        output.push_str(&format!(
            "- {}: non-tool {} (elapsed {}, tools {})\n",
            row.run.agent.as_deref().unwrap_or("-"),
            format_elapsed(Some(row.overhead_ms)),
            format_elapsed(Some(row.elapsed_ms)),
            format_elapsed(Some(row.tool_ms))
        ));
    }

    output.push_str(&format!("\nSlow tools (>= {}ms)\n", report.min_tool_ms));
    if report.slow_tools.is_empty() {
        output.push_str("- none\n");
    }
    for tool in &report.slow_tools {
        let mut line = format!(
            "- {}: {} {} [{}]",
            tool.line,
            tool.agent.as_deref().unwrap_or("-"),
            tool.tool_name.as_deref().unwrap_or("-"),
            format_elapsed(Some(tool.elapsed_ms))
        );
        if let Some(summary) = &tool.tool_summary {
            line.push_str(&format!(" {summary}"));
        }
        output.push_str(&line);
        output.push('\n');
    }

    output
}
