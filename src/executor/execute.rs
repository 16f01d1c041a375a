use crate::{
    error::TaskError,
    executor::setup::GraphPlan,
    node::TaskNode,
    pool::PoolHandle,
    sync::thread,
    types::Value,
};

/// Runs every node of `plan` in dependency order on the calling thread.
///
/// Ready nodes are executed one at a time; a node's own work (for instance
/// map-reduce jobs) fans out onto `pool`. Whenever nothing is ready the
/// thread helps the pool instead of idling. The first failing node ends the
/// walk: its error is returned and jobs it already queued are left to finish
/// on their own.
pub(super) fn walk(
    plan: &GraphPlan,
    root: &TaskNode,
    pool: &PoolHandle,
) -> Result<Value, TaskError> {
    let mut ready = plan.independent();
    let mut remaining = plan.nodes.len();
    let mut root_value = None;

    while remaining > 0 {
        let Some(id) = ready.pop_front() else {
            if !pool.try_execute_one() {
                thread::yield_now();
            }
            continue;
        };
        let node = &plan.nodes[&id];
        let value = node.execute(pool).inspect_err(|err| {
            tracing::warn!(node = %id, %err, "node failed, abandoning graph");
        })?;
        tracing::trace!(node = %id, "node done");
        plan.complete(id, &mut ready);
        if id == root.id() {
            root_value = Some(value);
        }
        remaining -= 1;
    }

    // The root is always part of its own plan, so the walk has produced its
    // value by now.
    root_value.map_or_else(|| root.result(), Ok)
}
