//! Integration tests for the libSQL-backed `ScreeningStore`.

use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;
use sift_config::StoreConfig;
use sift_core::entities::{Decision, DualOutcome};
use sift_core::enums::{DecisionKind, ReviewerRole, Stage, Verdict};
use sift_core::store::ScreeningStore;
use sift_db::SiftService;

fn decision(record_id: &str, role: ReviewerRole) -> Decision {
    Decision {
        record_id: record_id.into(),
        stage: Stage::TitleAbstract,
        role,
        verdict: Verdict::Include,
        confidence: 0.9,
        rationale: "matches PICO".into(),
        exclusion_reason: None,
        kind: DecisionKind::Oracle,
        created_at: Utc::now(),
    }
}

fn agreed(record_id: &str) -> DualOutcome {
    DualOutcome {
        record_id: record_id.into(),
        stage: Stage::TitleAbstract,
        reviewer_a: Verdict::Include,
        reviewer_b: Verdict::Include,
        agreement: true,
        final_verdict: Verdict::Include,
        adjudicated: false,
        exclusion_reason: None,
        prefiltered: false,
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn trait_roundtrip_with_trail() {
    let dir = tempfile::tempdir().unwrap();
    let svc = SiftService::new_local(":memory:", Some(dir.path().join("trail")))
        .await
        .unwrap();

    svc.append_decision(&decision("rec-1", ReviewerRole::ReviewerA))
        .await
        .unwrap();
    svc.append_decision(&decision("rec-1", ReviewerRole::ReviewerB))
        .await
        .unwrap();
    svc.upsert_outcome(&agreed("rec-1")).await.unwrap();

    let listed = svc.list_decisions("rec-1", Stage::TitleAbstract).await.unwrap();
    assert_eq!(listed.len(), 2);
    let outcome = svc.get_outcome("rec-1", Stage::TitleAbstract).await.unwrap();
    assert_eq!(outcome.map(|o| o.final_verdict), Some(Verdict::Include));
    assert_eq!(svc.list_outcomes(Stage::TitleAbstract).await.unwrap().len(), 1);

    let trail = svc.trail().read_stage(Stage::TitleAbstract).unwrap();
    assert_eq!(trail, listed, "JSONL trail mirrors the ledger");
}

#[tokio::test]
async fn concurrent_writers_on_disjoint_keys() {
    let svc = Arc::new(SiftService::new_local(":memory:", None).await.unwrap());

    let mut set = tokio::task::JoinSet::new();
    for i in 0..24 {
        let svc = Arc::clone(&svc);
        set.spawn(async move {
            let id = format!("rec-{i:02}");
            svc.append_decision(&decision(&id, ReviewerRole::ReviewerA)).await?;
            svc.append_decision(&decision(&id, ReviewerRole::ReviewerB)).await?;
            svc.upsert_outcome(&agreed(&id)).await
        });
    }
    while let Some(joined) = set.join_next().await {
        joined.unwrap().unwrap();
    }

    let outcomes = svc.list_outcomes(Stage::TitleAbstract).await.unwrap();
    assert_eq!(outcomes.len(), 24);
    for outcome in &outcomes {
        let decisions = svc
            .list_decisions(&outcome.record_id, Stage::TitleAbstract)
            .await
            .unwrap();
        assert_eq!(decisions.len(), 2);
    }
}

#[tokio::test]
async fn from_config_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        path: dir.path().join("nested/review.db").display().to_string(),
        trail_dir: String::new(),
    };
    let svc = SiftService::from_config(&config).await.unwrap();
    svc.upsert_outcome(&agreed("rec-1")).await.unwrap();
    assert!(dir.path().join("nested/review.db").exists());
    assert!(!svc.trail().is_enabled());
}

#[tokio::test]
async fn reopening_keeps_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("review.db").display().to_string();
    {
        let svc = SiftService::new_local(&path, None).await.unwrap();
        svc.upsert_outcome(&agreed("rec-7")).await.unwrap();
    }
    let svc = SiftService::new_local(&path, None).await.unwrap();
    assert!(
        svc.get_outcome("rec-7", Stage::TitleAbstract)
            .await
            .unwrap()
            .is_some()
    );
}
