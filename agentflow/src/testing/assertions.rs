//! Assertions on records and runs.

use crate::core::{RecordOrigin, RunStatus, StageKind, StageRecord};
use crate::pipeline::PipelineRun;

/// Asserts the run completed with four records in pipeline order.
pub fn assert_completed(run: &PipelineRun) {
    assert_eq!(
        run.status(),
        RunStatus::Completed,
        "Expected a completed run, got {:?} (error: {:?})",
        run.status(),
        run.error()
    );
    assert_stage_order(run);
    assert_eq!(run.records().len(), StageKind::ALL.len());
    assert!(run.final_output().is_some(), "Completed run has no final output");
}

/// Asserts the run failed with fewer than four records and a cause.
pub fn assert_failed(run: &PipelineRun) {
    assert_eq!(run.status(), RunStatus::Failed, "Expected a failed run");
    assert!(
        run.records().len() < StageKind::ALL.len(),
        "Failed run holds {} records",
        run.records().len()
    );
    let cause = run.error().map(|e| e.message.as_str()).unwrap_or_default();
    assert!(!cause.is_empty(), "Failed run has no error cause");
}

/// Asserts the accepted records follow pipeline order.
pub fn assert_stage_order(run: &PipelineRun) {
    let kinds: Vec<StageKind> = run.records().iter().map(StageRecord::kind).collect();
    assert_eq!(
        kinds,
        StageKind::ALL[..kinds.len()].to_vec(),
        "Records are out of pipeline order"
    );
}

/// Asserts a record is the fallback of `kind`.
pub fn assert_fallback(record: &StageRecord, kind: StageKind) {
    assert_eq!(record.kind(), kind);
    assert_eq!(
        record.origin(),
        RecordOrigin::Fallback,
        "Expected a fallback {kind} record"
    );
    assert!(!record.reviewed());
    assert!(record.fallback_cause().is_some());
}

/// Asserts a record was produced and reviewed.
pub fn assert_produced(record: &StageRecord, kind: StageKind) {
    assert_eq!(record.kind(), kind);
    assert_eq!(
        record.origin(),
        RecordOrigin::Produced,
        "Expected a produced {kind} record, fallback cause: {:?}",
        record.fallback_cause()
    );
    assert!(record.reviewed());
}
