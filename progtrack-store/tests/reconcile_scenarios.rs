use std::sync::Arc;

use chrono::NaiveDate;
use progtrack_core::{
    ActualEquipmentUpdate, EventBus, EventPublisher, ParentSync, Patch, ReconcileConfig,
    ReconcileError, Reconciler, RecordingSubscriber, SkipReason, Status, Store, Subtask,
    SubtaskInput, SubtaskRepository, Task, TaskInput, TaskRepository, UnitOfWork, UpdateRequest,
    ValidationError,
};
use progtrack_store::{FailPoint, MemoryStore};

struct Harness {
    reconciler: Reconciler<MemoryStore>,
    store: MemoryStore,
    events: Arc<RecordingSubscriber>,
}

fn harness_with(config: ReconcileConfig) -> Harness {
    let store = MemoryStore::new();
    let bus = Arc::new(EventBus::new());
    let events = RecordingSubscriber::new();
    bus.subscribe(events.clone());
    Harness {
        reconciler: Reconciler::new(store.clone(), bus).with_config(config),
        store,
        events,
    }
}

fn harness() -> Harness {
    harness_with(ReconcileConfig::default())
}

fn day(m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2026, m, d)
}

async fn task(h: &Harness, planned: i64) -> Task {
    h.reconciler
        .create_task(TaskInput {
            name: "switchgear install".into(),
            project_id: "proj-1".into(),
            equipment_count: Some(planned),
            ..TaskInput::default()
        })
        .await
        .unwrap()
}

async fn subtask(h: &Harness, task_id: &str, planned: i64) -> Subtask {
    h.reconciler
        .create_subtask(SubtaskInput {
            task_id: task_id.to_string(),
            name: format!("zone {planned}"),
            equipment_count: Some(planned),
            ..SubtaskInput::default()
        })
        .await
        .unwrap()
        .entity
}

/// Completing the only subtask completes its task.
#[tokio::test]
async fn test_create_and_complete_subtask() {
    let h = harness();
    let t = task(&h, 10).await;
    let s = subtask(&h, &t.id, 10).await;
    assert_eq!(s.progress.status, Status::Todo);

    let res = h.reconciler.set_subtask_actual_equipment(&s.id, 10).await.unwrap();
    assert_eq!(res.entity.progress.status, Status::Done);
    assert_eq!(res.entity.progress.completion_rate, 100);

    let parent = res.parent.updated().expect("parent should be reconciled");
    assert_eq!(parent.progress.completion_rate, 100);
    assert_eq!(parent.progress.status, Status::Done);
    assert_eq!(parent.progress.actual_equipment_count, 10);

    let names = h.events.names();
    assert!(names.contains(&"subtask_completed"));
    assert!(names.contains(&"parent_reconciled"));
    assert!(names.contains(&"task_completed"));
}

/// Two equal subtasks, one finished: parent sits at 50%.
#[tokio::test]
async fn test_partial_progress_is_weighted() {
    let h = harness();
    let t = task(&h, 10).await;
    let a = subtask(&h, &t.id, 5).await;
    let _b = subtask(&h, &t.id, 5).await;

    let res = h.reconciler.set_subtask_actual_equipment(&a.id, 5).await.unwrap();
    let parent = res.parent.updated().unwrap();
    assert_eq!(parent.progress.completion_rate, 50);
    assert_eq!(parent.progress.status, Status::InProgress);
    assert_eq!(parent.progress.actual_equipment_count, 5);
}

/// Weights follow planned equipment, not subtask count.
#[tokio::test]
async fn test_unequal_weights() {
    let h = harness();
    let t = task(&h, 5).await;
    let a = subtask(&h, &t.id, 2).await;
    let b = subtask(&h, &t.id, 3).await;

    h.reconciler.update_subtask_completion(&a.id, 50).await.unwrap();
    let res = h.reconciler.update_subtask_status(&b.id, Status::Done).await.unwrap();
    assert_eq!(res.parent.updated().unwrap().progress.completion_rate, 80);
}

/// Deleting the last subtask leaves the task as it was.
#[tokio::test]
async fn test_delete_last_subtask_keeps_task_fields() {
    let h = harness();
    let t = task(&h, 10).await;
    let s = subtask(&h, &t.id, 10).await;
    h.reconciler.set_subtask_actual_equipment(&s.id, 5).await.unwrap();
    let before = h.reconciler.get_task(&t.id).await.unwrap();
    assert_eq!(before.progress.completion_rate, 50);

    let sync = h.reconciler.delete_subtask(&s.id).await.unwrap();
    assert_eq!(sync, ParentSync::Skipped(SkipReason::NoSubtasks));
    assert_eq!(h.reconciler.get_task(&t.id).await.unwrap(), before);
    assert!(h.reconciler.list_subtasks(&t.id).await.unwrap().is_empty());
}

/// Deleting one of several subtasks re-aggregates from the rest.
#[tokio::test]
async fn test_delete_subtask_reaggregates_siblings() {
    let h = harness();
    let t = task(&h, 10).await;
    let a = subtask(&h, &t.id, 5).await;
    let b = subtask(&h, &t.id, 5).await;
    h.reconciler.set_subtask_actual_equipment(&a.id, 5).await.unwrap();

    let sync = h.reconciler.delete_subtask(&b.id).await.unwrap();
    let parent = sync.updated().unwrap();
    assert_eq!(parent.progress.status, Status::Done);
    assert_eq!(parent.progress.completion_rate, 100);
}

/// Renaming a subtask does not touch the parent.
#[tokio::test]
async fn test_insignificant_change_skips_parent() {
    let h = harness();
    let t = task(&h, 10).await;
    let s = subtask(&h, &t.id, 10).await;
    let parent_before = h.reconciler.get_task(&t.id).await.unwrap();

    let res = h
        .reconciler
        .update_subtask(
            &s.id,
            UpdateRequest {
                name: Some("zone A".into()),
                ..UpdateRequest::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(res.entity.name, "zone A");
    assert_eq!(res.parent, ParentSync::Skipped(SkipReason::InsignificantChange));
    assert_eq!(h.reconciler.get_task(&t.id).await.unwrap(), parent_before);
}

/// A significant change whose aggregate equals the stored parent writes nothing.
#[tokio::test]
async fn test_unchanged_aggregate_skips_parent_write() {
    let h = harness();
    let t = task(&h, 12).await;
    let a = subtask(&h, &t.id, 5).await;
    let _b = subtask(&h, &t.id, 5).await;

    let res = h
        .reconciler
        .update_subtask(
            &a.id,
            UpdateRequest {
                equipment_count: Some(6),
                ..UpdateRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(res.entity.progress.equipment_count, 6);
    assert_eq!(res.parent, ParentSync::Skipped(SkipReason::Unchanged));
}

/// Validation fails before anything is written or published.
#[tokio::test]
async fn test_validation_aborts_before_write() {
    let h = harness();
    let t = task(&h, 10).await;
    let s = subtask(&h, &t.id, 10).await;
    let snapshot = h.store.snapshot().await;
    h.events.clear();

    let err = h.reconciler.update_subtask_completion(&s.id, 150).await.unwrap_err();
    assert_eq!(err, ReconcileError::Validation(ValidationError::CompletionRate(150)));

    let err = h.reconciler.set_subtask_actual_equipment(&s.id, -1).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Validation(ValidationError::NegativeEquipment { .. })
    ));

    assert_eq!(h.store.snapshot().await, snapshot);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_missing_ids_are_not_found() {
    let h = harness();
    let err = h.reconciler.set_subtask_actual_equipment("ghost", 1).await.unwrap_err();
    assert!(err.is_not_found());

    let err = h
        .reconciler
        .create_subtask(SubtaskInput {
            task_id: "ghost".into(),
            name: "orphan".into(),
            ..SubtaskInput::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    assert!(h.reconciler.delete_task("ghost").await.unwrap_err().is_not_found());
    assert!(h.reconciler.reconcile_task("ghost").await.unwrap_err().is_not_found());
}

/// A failed parent write rolls back the leaf write too.
#[tokio::test]
async fn test_parent_failure_rolls_back_leaf() {
    let h = harness();
    let t = task(&h, 10).await;
    let s = subtask(&h, &t.id, 10).await;
    h.events.clear();

    h.store.fail_once(FailPoint::TaskUpdate);
    let err = h.reconciler.set_subtask_actual_equipment(&s.id, 10).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Storage(_)));

    let stored = h.reconciler.get_subtask(&s.id).await.unwrap();
    assert_eq!(stored.progress.actual_equipment_count, 0);
    assert_eq!(stored.progress.status, Status::Todo);
    let parent = h.reconciler.get_task(&t.id).await.unwrap();
    assert_eq!(parent.progress.completion_rate, 0);
    assert!(h.events.events().is_empty());

    // retry succeeds once the store recovers
    let res = h.reconciler.set_subtask_actual_equipment(&s.id, 10).await.unwrap();
    assert_eq!(res.parent.updated().unwrap().progress.status, Status::Done);
}

/// Batch: one aggregation per distinct parent, all in one commit.
#[tokio::test]
async fn test_batch_update_groups_by_parent() {
    let h = harness();
    let ta = task(&h, 10).await;
    let tb = task(&h, 4).await;
    let a1 = subtask(&h, &ta.id, 5).await;
    let a2 = subtask(&h, &ta.id, 5).await;
    let b1 = subtask(&h, &tb.id, 4).await;
    h.events.clear();

    let out = h
        .reconciler
        .batch_update_actual_equipment(&[
            ActualEquipmentUpdate { id: a1.id.clone(), actual_equipment_count: 5 },
            ActualEquipmentUpdate { id: b1.id.clone(), actual_equipment_count: 2 },
            ActualEquipmentUpdate { id: a2.id.clone(), actual_equipment_count: 5 },
        ])
        .await
        .unwrap();

    assert_eq!(out.subtasks.len(), 3);
    assert_eq!(out.parents.len(), 2);
    assert_eq!(out.parents[0].0, ta.id);
    assert_eq!(out.parents[1].0, tb.id);

    let pa = out.parents[0].1.updated().unwrap();
    assert_eq!(pa.progress.status, Status::Done);
    assert_eq!(pa.progress.completion_rate, 100);
    let pb = out.parents[1].1.updated().unwrap();
    assert_eq!(pb.progress.completion_rate, 50);
    assert_eq!(pb.progress.status, Status::InProgress);

    let reconciled = h
        .events
        .names()
        .into_iter()
        .filter(|n| *n == "parent_reconciled")
        .count();
    assert_eq!(reconciled, 2);
}

/// An unknown id in a batch aborts it before any write.
#[tokio::test]
async fn test_batch_with_unknown_id_writes_nothing() {
    let h = harness();
    let t = task(&h, 10).await;
    let s = subtask(&h, &t.id, 10).await;
    let snapshot = h.store.snapshot().await;

    let err = h
        .reconciler
        .batch_update_actual_equipment(&[
            ActualEquipmentUpdate { id: s.id.clone(), actual_equipment_count: 3 },
            ActualEquipmentUpdate { id: "ghost".into(), actual_equipment_count: 1 },
        ])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(h.store.snapshot().await, snapshot);
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let h = harness();
    let out = h.reconciler.batch_update_actual_equipment(&[]).await.unwrap();
    assert!(out.subtasks.is_empty());
    assert!(out.parents.is_empty());
}

/// Split hands out only unassigned equipment.
#[tokio::test]
async fn test_split_allocates_from_remaining() {
    let h = harness();
    let t = task(&h, 10).await;

    let first = h.reconciler.split_task(&t.id, "level 1", 4).await.unwrap();
    assert_eq!(first.entity.progress.equipment_count, 4);
    assert_eq!(first.entity.task_id, t.id);

    let err = h.reconciler.split_task(&t.id, "level 2", 7).await.unwrap_err();
    assert_eq!(
        err,
        ReconcileError::Validation(ValidationError::SplitExceedsRemaining {
            requested: 7,
            remaining: 6
        })
    );

    let err = h.reconciler.split_task(&t.id, "level 2", 0).await.unwrap_err();
    assert_eq!(err, ReconcileError::Validation(ValidationError::EmptySplit));

    h.reconciler.split_task(&t.id, "level 2", 6).await.unwrap();
    let progress = h.reconciler.task_progress(&t.id).await.unwrap();
    assert_eq!(progress.distribution.remaining, 0);
    assert_eq!(progress.distribution.allocated, 10);
}

/// Aggregation owns derived fields once a task has subtasks.
#[tokio::test]
async fn test_derived_fields_rejected_on_parent() {
    let h = harness();
    let t = task(&h, 10).await;
    subtask(&h, &t.id, 10).await;

    let err = h.reconciler.update_task_status(&t.id, Status::Done).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvariantViolation(_)));

    // planned total is still the task's own
    let res = h
        .reconciler
        .update_task(
            &t.id,
            UpdateRequest {
                equipment_count: Some(20),
                ..UpdateRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(res.entity.progress.equipment_count, 20);
    assert_eq!(res.entity.progress.status, Status::Todo);
}

#[tokio::test]
async fn test_derived_fields_ignored_when_configured() {
    let h = harness_with(ReconcileConfig::lenient());
    let t = task(&h, 10).await;
    subtask(&h, &t.id, 10).await;

    let res = h
        .reconciler
        .update_task(
            &t.id,
            UpdateRequest {
                name: Some("renamed".into()),
                status: Some(Status::Done),
                ..UpdateRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(res.entity.name, "renamed");
    assert_eq!(res.entity.progress.status, Status::Todo);
    assert_eq!(res.entity.progress.completion_rate, 0);
}

/// A task without subtasks derives its own progress.
#[tokio::test]
async fn test_leaf_task_derives_own_progress() {
    let h = harness();
    let t = task(&h, 10).await;

    let res = h.reconciler.set_task_actual_equipment(&t.id, 3).await.unwrap();
    assert_eq!(res.entity.progress.completion_rate, 30);
    assert_eq!(res.entity.progress.status, Status::InProgress);
    assert_eq!(res.parent, ParentSync::Skipped(SkipReason::NoSubtasks));

    let res = h.reconciler.update_task_status(&t.id, Status::Done).await.unwrap();
    assert_eq!(res.entity.progress.completion_rate, 100);
    assert!(h.events.names().contains(&"task_completed"));

    let res = h.reconciler.update_task_completion(&t.id, 0).await.unwrap();
    assert_eq!(res.entity.progress.status, Status::Todo);
}

#[tokio::test]
async fn test_over_delivery_follows_strictness() {
    let strict = harness();
    let t = task(&strict, 4).await;
    let s = subtask(&strict, &t.id, 4).await;
    let err = strict.reconciler.set_subtask_actual_equipment(&s.id, 5).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvariantViolation(_)));

    let lenient = harness_with(ReconcileConfig::lenient());
    let t = task(&lenient, 4).await;
    let s = subtask(&lenient, &t.id, 4).await;
    let res = lenient.reconciler.set_subtask_actual_equipment(&s.id, 5).await.unwrap();
    assert_eq!(res.entity.progress.completion_rate, 100);
    assert_eq!(res.entity.progress.status, Status::Done);
}

/// Subtasks may plan past their task, but strict mode still caps the task's actual count.
#[tokio::test]
async fn test_over_allocated_parent_follows_strictness() {
    let strict = harness();
    let t = task(&strict, 5).await;
    let s = subtask(&strict, &t.id, 8).await;

    let err = strict.reconciler.set_subtask_actual_equipment(&s.id, 8).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvariantViolation(_)));
    assert_eq!(
        strict.reconciler.get_subtask(&s.id).await.unwrap().progress.actual_equipment_count,
        0
    );

    let res = strict.reconciler.set_subtask_actual_equipment(&s.id, 5).await.unwrap();
    assert_eq!(res.parent.updated().unwrap().progress.actual_equipment_count, 5);

    let lenient = harness_with(ReconcileConfig::lenient());
    let t = task(&lenient, 5).await;
    let s = subtask(&lenient, &t.id, 8).await;
    let res = lenient.reconciler.set_subtask_actual_equipment(&s.id, 8).await.unwrap();
    let parent = res.parent.updated().unwrap();
    assert_eq!(parent.progress.actual_equipment_count, 8);
    assert_eq!(parent.progress.status, Status::Done);

    // back to a leaf; edits that leave equipment alone still go through
    lenient.reconciler.delete_subtask(&s.id).await.unwrap();
    let res = lenient
        .reconciler
        .update_task(
            &t.id,
            UpdateRequest {
                name: Some("renamed".into()),
                ..UpdateRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(res.entity.name, "renamed");
}

/// A stored over-delivery does not block edits that leave equipment alone.
#[tokio::test]
async fn test_name_edit_on_over_delivered_task() {
    let h = harness();
    let t = task(&h, 5).await;

    let mut tx = h.store.begin().await.unwrap();
    tx.update_task(
        &t.id,
        &Patch {
            actual_equipment_count: Some(8),
            ..Patch::default()
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let res = h
        .reconciler
        .update_task(
            &t.id,
            UpdateRequest {
                name: Some("renamed".into()),
                ..UpdateRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(res.entity.name, "renamed");
    assert_eq!(res.entity.progress.actual_equipment_count, 8);

    let err = h.reconciler.set_task_actual_equipment(&t.id, 7).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvariantViolation(_)));
}

/// Lowering a task's plan below what its subtasks installed.
#[tokio::test]
async fn test_parent_plan_below_aggregated_actual() {
    let strict = harness();
    let t = task(&strict, 10).await;
    let s = subtask(&strict, &t.id, 10).await;
    strict.reconciler.set_subtask_actual_equipment(&s.id, 10).await.unwrap();

    let shrink = || UpdateRequest {
        equipment_count: Some(2),
        ..UpdateRequest::default()
    };
    let err = strict.reconciler.update_task(&t.id, shrink()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvariantViolation(_)));
    let stored = strict.reconciler.get_task(&t.id).await.unwrap();
    assert_eq!(stored.progress.equipment_count, 10);
    assert_eq!(stored.progress.actual_equipment_count, 10);

    let lenient = harness_with(ReconcileConfig::lenient());
    let t = task(&lenient, 10).await;
    let s = subtask(&lenient, &t.id, 10).await;
    lenient.reconciler.set_subtask_actual_equipment(&s.id, 10).await.unwrap();
    let res = lenient.reconciler.update_task(&t.id, shrink()).await.unwrap();
    assert_eq!(res.entity.progress.equipment_count, 2);
    assert_eq!(res.entity.progress.actual_equipment_count, 10);
}

/// Reopening a finished subtask pulls its task back to IN_PROGRESS.
#[tokio::test]
async fn test_reopened_subtask_reopens_parent() {
    let h = harness();
    let t = task(&h, 10).await;
    let a = subtask(&h, &t.id, 5).await;
    let b = subtask(&h, &t.id, 5).await;
    h.reconciler.set_subtask_actual_equipment(&a.id, 5).await.unwrap();
    let res = h.reconciler.set_subtask_actual_equipment(&b.id, 5).await.unwrap();
    assert_eq!(res.parent.updated().unwrap().progress.status, Status::Done);

    let res = h.reconciler.update_subtask_status(&a.id, Status::InProgress).await.unwrap();
    assert_eq!(res.entity.progress.status, Status::InProgress);
    assert_eq!(res.entity.progress.completion_rate, 99);

    let parent = res.parent.updated().unwrap();
    assert_eq!(parent.progress.status, Status::InProgress);
    assert_eq!(parent.progress.completion_rate, 99);
    assert_eq!(parent.progress.actual_equipment_count, 10);
}

/// Equipment edits cannot un-complete a finished subtask.
#[tokio::test]
async fn test_done_subtask_stays_done_on_equipment_edit() {
    let h = harness();
    let t = task(&h, 10).await;
    let s = subtask(&h, &t.id, 10).await;
    h.reconciler.update_subtask_status(&s.id, Status::Done).await.unwrap();

    let res = h.reconciler.set_subtask_actual_equipment(&s.id, 2).await.unwrap();
    assert_eq!(res.entity.progress.status, Status::Done);
    assert_eq!(res.entity.progress.completion_rate, 100);
    assert_eq!(res.entity.progress.actual_equipment_count, 2);
}

#[tokio::test]
async fn test_delete_task_cascades() {
    let h = harness();
    let t = task(&h, 10).await;
    subtask(&h, &t.id, 5).await;
    subtask(&h, &t.id, 5).await;
    h.events.clear();

    h.reconciler.delete_task(&t.id).await.unwrap();
    assert!(h.reconciler.get_task(&t.id).await.unwrap_err().is_not_found());
    assert!(h.store.snapshot().await.subtasks.is_empty());
    assert_eq!(
        h.events.names(),
        vec!["subtask_deleted", "subtask_deleted", "task_deleted"]
    );
}

/// Out-of-band writes leave the parent stale until it is reconciled.
#[tokio::test]
async fn test_reconcile_task_repairs_stale_parent() {
    let h = harness();
    let t = task(&h, 10).await;
    let s = subtask(&h, &t.id, 10).await;

    let mut tx = h.store.begin().await.unwrap();
    tx.update_subtask(
        &s.id,
        &Patch {
            actual_equipment_count: Some(10),
            status: Some(Status::Done),
            completion_rate: Some(100),
            ..Patch::default()
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert!(!h.reconciler.task_progress(&t.id).await.unwrap().in_sync);

    let sync = h.reconciler.reconcile_task(&t.id).await.unwrap();
    assert_eq!(sync.updated().unwrap().progress.status, Status::Done);

    let report = h.reconciler.task_progress(&t.id).await.unwrap();
    assert!(report.in_sync);
    assert_eq!(report.aggregate.unwrap().completion_rate, 100);

    assert_eq!(
        h.reconciler.reconcile_task(&t.id).await.unwrap(),
        ParentSync::Skipped(SkipReason::Unchanged)
    );
}

/// Subtask schedules widen the parent window.
#[tokio::test]
async fn test_subtask_schedule_widens_parent() {
    let h = harness();
    let t = h
        .reconciler
        .create_task(TaskInput {
            name: "commissioning".into(),
            project_id: "proj-1".into(),
            equipment_count: Some(4),
            planned_start: day(3, 5),
            planned_end: day(3, 10),
            ..TaskInput::default()
        })
        .await
        .unwrap();

    let res = h
        .reconciler
        .create_subtask(SubtaskInput {
            task_id: t.id.clone(),
            name: "loop checks".into(),
            equipment_count: Some(4),
            planned_start: day(3, 1),
            planned_end: day(3, 8),
            ..SubtaskInput::default()
        })
        .await
        .unwrap();

    let parent = res.parent.updated().unwrap();
    assert_eq!(parent.planned_start, day(3, 1));
    assert_eq!(parent.planned_end, day(3, 10));
}

/// Concurrent sibling updates are serialized; no aggregation is lost.
#[tokio::test]
async fn test_concurrent_sibling_updates_converge() {
    let h = harness();
    let t = task(&h, 20).await;
    let a = subtask(&h, &t.id, 5).await;
    let b = subtask(&h, &t.id, 5).await;
    let c = subtask(&h, &t.id, 5).await;
    let d = subtask(&h, &t.id, 5).await;

    let r = &h.reconciler;
    let (ra, rb, rc, rd) = tokio::join!(
        r.set_subtask_actual_equipment(&a.id, 5),
        r.set_subtask_actual_equipment(&b.id, 3),
        r.set_subtask_actual_equipment(&c.id, 5),
        r.set_subtask_actual_equipment(&d.id, 1),
    );
    for res in [ra, rb, rc, rd] {
        res.unwrap();
    }

    let report = r.task_progress(&t.id).await.unwrap();
    assert!(report.in_sync);
    assert_eq!(report.task.progress.completion_rate, 70);
    assert_eq!(report.task.progress.actual_equipment_count, 14);
}

#[tokio::test]
async fn test_list_tasks_by_project() {
    let h = harness();
    task(&h, 1).await;
    h.reconciler
        .create_task(TaskInput {
            name: "other".into(),
            project_id: "proj-2".into(),
            ..TaskInput::default()
        })
        .await
        .unwrap();

    assert_eq!(h.reconciler.list_tasks(None).await.unwrap().len(), 2);
    let p2 = h.reconciler.list_tasks(Some("proj-2")).await.unwrap();
    assert_eq!(p2.len(), 1);
    assert_eq!(p2[0].name, "other");
}
