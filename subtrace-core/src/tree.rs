use std::collections::HashMap;

use crate::index::RootIndex;
use crate::model::InvocationRecord;

/// Parent id to child invocations, each sibling group in start order.
#[derive(Debug, Default)]
pub struct ChildMap<'a> {
    children: HashMap<&'a str, Vec<&'a InvocationRecord>>,
}

impl<'a> ChildMap<'a> {
    pub fn children_of(&self, invocation_id: &str) -> &[&'a InvocationRecord] {
        self.children
            .get(invocation_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Groups every non-root invocation under its parent, defaulting a missing
/// parent to the root.
pub fn build_children(index: &RootIndex) -> ChildMap<'_> {
    let root_id = index.root_id();
    let mut children = HashMap::<&str, Vec<&InvocationRecord>>::new();

    for info in index.invocations() {
        if info.invocation_id == root_id {
            continue;
        }
        let parent = info.parent_invocation_id.as_deref().unwrap_or(root_id);
        children.entry(parent).or_default().push(info);
    }

    for siblings in children.values_mut() {
        siblings.sort_by(|left, right| {
            start_order(left)
                .cmp(&start_order(right))
                .then_with(|| left.invocation_id.cmp(&right.invocation_id))
        });
    }

    ChildMap { children }
}

fn start_order(info: &InvocationRecord) -> usize {
    info.start_line.unwrap_or(usize::MAX)
}
