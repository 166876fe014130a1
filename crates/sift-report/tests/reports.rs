//! Reports built from outcomes persisted in a libSQL store.

use chrono::Utc;
use pretty_assertions::assert_eq;
use sift_core::entities::{Decision, DedupStats, DualOutcome};
use sift_core::enums::Verdict::{Exclude, Include};
use sift_core::enums::{DecisionKind, ExclusionReason, ReviewerRole, Stage, Verdict};
use sift_core::store::ScreeningStore;
use sift_db::SiftService;
use sift_report::{FlowInputs, ReportError, collect_flow, disagreements, reliability, validate};

fn outcome(id: &str, stage: Stage, a: Verdict, b: Verdict, final_verdict: Verdict) -> DualOutcome {
    DualOutcome {
        record_id: id.to_string(),
        stage,
        reviewer_a: a,
        reviewer_b: b,
        agreement: a == b,
        final_verdict,
        adjudicated: a != b,
        exclusion_reason: (stage == Stage::FullText && final_verdict == Verdict::Exclude)
            .then_some(ExclusionReason::WrongPopulation),
        prefiltered: false,
        updated_at: Utc::now(),
    }
}

fn decision(
    id: &str,
    stage: Stage,
    role: ReviewerRole,
    verdict: Verdict,
    rationale: &str,
) -> Decision {
    Decision {
        record_id: id.to_string(),
        stage,
        role,
        verdict,
        confidence: 0.8,
        rationale: rationale.to_string(),
        exclusion_reason: (verdict == Verdict::Exclude).then_some(ExclusionReason::WrongPopulation),
        kind: DecisionKind::Oracle,
        created_at: Utc::now(),
    }
}

async fn store() -> SiftService {
    SiftService::new_local(":memory:", None).await.unwrap()
}

#[tokio::test]
async fn flow_example_is_arithmetically_valid() {
    let store = store().await;
    // 90 screened: 60 excluded, 30 forwarded to full text
    for i in 0..90 {
        let v = if i < 60 { Verdict::Exclude } else { Verdict::Include };
        store
            .upsert_outcome(&outcome(&format!("r{i:03}"), Stage::TitleAbstract, v, v, v))
            .await
            .unwrap();
    }
    // 30 assessed: 12 included, 18 excluded with reasons
    for i in 60..90 {
        let v = if i < 72 { Verdict::Include } else { Verdict::Exclude };
        store
            .upsert_outcome(&outcome(&format!("r{i:03}"), Stage::FullText, v, v, v))
            .await
            .unwrap();
    }

    let inputs = FlowInputs {
        dedup: DedupStats { identified: 100, exact_duplicates: 4, near_duplicates: 6 },
        not_retrieved: 0,
        quantitative: 5,
    };
    let mut counts = collect_flow(&store, &inputs).await.unwrap();

    assert_eq!(counts.screened, 90);
    assert_eq!(counts.excluded_at_screen, 60);
    assert_eq!(counts.sought, 30);
    assert_eq!(counts.assessed, 30);
    assert_eq!(counts.included(), 12);
    assert_eq!(counts.included_quantitative, 5);
    assert_eq!(counts.excluded_at_assessment(), 18);
    assert_eq!(counts.excluded_with_reasons.get(&ExclusionReason::WrongPopulation), Some(&18));
    assert!(counts.arithmetic_valid);

    let validation = validate(&mut counts);
    assert!(validation.is_clean(), "{validation:?}");
    assert!(counts.arithmetic_valid);
}

#[tokio::test]
async fn prefiltered_outcomes_are_left_out_of_reliability() {
    let store = store().await;
    store
        .upsert_outcome(&outcome("r1", Stage::TitleAbstract, Include, Include, Include))
        .await
        .unwrap();
    store
        .upsert_outcome(&outcome("r2", Stage::TitleAbstract, Exclude, Exclude, Exclude))
        .await
        .unwrap();
    let mut gated = outcome("r3", Stage::TitleAbstract, Exclude, Exclude, Exclude);
    gated.prefiltered = true;
    store.upsert_outcome(&gated).await.unwrap();

    let outcomes = store.list_outcomes(Stage::TitleAbstract).await.unwrap();
    let report = reliability(Stage::TitleAbstract, &outcomes);

    assert_eq!(report.items, 2);
    assert_eq!(report.prefiltered, 1);
    assert_eq!(report.agreements, 2);
    assert!((report.percent_agreement - 100.0).abs() < 1e-9);
    assert_eq!(report.kappa, Some(1.0));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stage"], "title_abstract");
}

#[tokio::test]
async fn disagreement_report_lists_both_sides_and_the_ruling() {
    let store = store().await;
    let stage = Stage::TitleAbstract;
    for d in [
        decision("r1", stage, ReviewerRole::ReviewerA, Verdict::Exclude, "adults only"),
        decision("r1", stage, ReviewerRole::ReviewerB, Verdict::Include, "mixed ages"),
        decision("r1", stage, ReviewerRole::Adjudicator, Include, "children are a subgroup"),
        decision("r2", stage, ReviewerRole::ReviewerA, Verdict::Include, "fits"),
        decision("r2", stage, ReviewerRole::ReviewerB, Verdict::Include, "fits"),
    ] {
        store.append_decision(&d).await.unwrap();
    }
    store
        .upsert_outcome(&outcome("r1", stage, Verdict::Exclude, Verdict::Include, Verdict::Include))
        .await
        .unwrap();
    store
        .upsert_outcome(&outcome("r2", stage, Verdict::Include, Verdict::Include, Verdict::Include))
        .await
        .unwrap();

    let report = disagreements(&store, stage).await.unwrap();
    assert_eq!(report.items.len(), 1);
    let item = &report.items[0];
    assert_eq!(item.record_id, "r1");
    assert_eq!(item.reviewer_a.verdict, Verdict::Exclude);
    assert_eq!(item.reviewer_a.rationale, "adults only");
    assert_eq!(item.reviewer_b.verdict, Verdict::Include);
    assert_eq!(item.adjudicator.as_ref().map(|a| a.verdict), Some(Verdict::Include));
    assert_eq!(item.final_verdict, Verdict::Include);

    let markdown = report.render_markdown();
    assert!(markdown.contains("## r1"));
    assert!(markdown.contains("adults only"));
    assert!(markdown.contains("children are a subgroup"));
    assert!(markdown.contains("**Final verdict:** include"));
    assert!(!markdown.contains("## r2"));
}

#[tokio::test]
async fn disagreement_without_ledger_entries_is_reported() {
    let store = store().await;
    store
        .upsert_outcome(&outcome("r9", Stage::FullText, Exclude, Include, Include))
        .await
        .unwrap();

    let err = disagreements(&store, Stage::FullText).await.unwrap_err();
    assert!(matches!(
        err,
        ReportError::MissingDecision { role: ReviewerRole::ReviewerA, .. }
    ));
}

#[tokio::test]
async fn empty_stage_has_no_kappa() {
    let store = store().await;
    let outcomes = store.list_outcomes(Stage::FullText).await.unwrap();
    let report = reliability(Stage::FullText, &outcomes);
    assert_eq!(report.items, 0);
    assert_eq!(report.kappa, None);
    assert_eq!(report.level, None);
}
