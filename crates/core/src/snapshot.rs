//! Point-in-time plan snapshots. Both quote creation (quote ← estimate) and
//! engagement derivation (engagement ← quote) run a plan through here; the
//! copy gets fresh identities and shares nothing mutable with its source, so
//! later edits to the source never leak into the snapshot.

use crate::domain::plan::{LineItemId, PhaseId, PlanLineItem, PlanPhase, ResourcePlan};

/// Deep copy onto fresh ids, preserving ordering index, rates, currency,
/// date range, billable flag/percent, and every (week, hours) pair. An empty
/// source yields an empty, valid copy.
pub fn snapshot_plan(source: &ResourcePlan) -> ResourcePlan {
    ResourcePlan {
        phases: source.phases.iter().map(snapshot_phase).collect(),
        line_items: source.line_items.iter().map(snapshot_line_item).collect(),
    }
}

fn snapshot_phase(phase: &PlanPhase) -> PlanPhase {
    PlanPhase { id: PhaseId::generate(), ..phase.clone() }
}

fn snapshot_line_item(item: &PlanLineItem) -> PlanLineItem {
    PlanLineItem { id: LineItemId::generate(), ..item.clone() }
}
