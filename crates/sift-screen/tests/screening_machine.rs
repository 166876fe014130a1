//! Dual-review state machine against a real libSQL store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sift_config::ScreeningConfig;
use sift_core::entities::CandidateRecord;
use sift_core::enums::ReviewerRole::{Adjudicator, ReviewerA, ReviewerB};
use sift_core::enums::{DecisionKind, ExclusionReason, Stage, Verdict};
use sift_core::store::ScreeningStore;
use sift_screen::{Assessment, Evaluation, OracleError, ScreeningError};

use common::{Script, ScriptedOracle, machine, machine_with, store};

#[tokio::test]
async fn agreement_needs_exactly_two_calls() {
    let oracle = Arc::new(ScriptedOracle::new(Script::include()));
    let store = store().await;
    let machine = machine(&oracle, &store);

    let evaluation = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::TitleAbstract)
        .await
        .unwrap();

    let Evaluation::Finalized(outcome) = evaluation else {
        panic!("expected a new outcome");
    };
    assert!(outcome.agreement);
    assert!(!outcome.adjudicated);
    assert_eq!(outcome.final_verdict, Verdict::Include);
    assert_eq!(oracle.calls(), 2);

    let decisions = store.list_decisions("r1", Stage::TitleAbstract).await.unwrap();
    assert_eq!(decisions.len(), 2);
    assert!(decisions.iter().all(|d| d.kind == DecisionKind::Oracle));
}

#[tokio::test]
async fn disagreement_is_adjudicated_with_both_priors() {
    let oracle = Arc::new(
        ScriptedOracle::new(Script::include())
            .script("r1", ReviewerB, Script::exclude(Some(ExclusionReason::WrongSetting)))
            .script("r1", Adjudicator, Script::exclude(Some(ExclusionReason::WrongOutcome))),
    );
    let store = store().await;
    let machine = machine(&oracle, &store);

    let evaluation = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::FullText)
        .await
        .unwrap();
    let outcome = evaluation.outcome();

    assert!(!outcome.agreement);
    assert!(outcome.adjudicated);
    assert_eq!(outcome.final_verdict, Verdict::Exclude);
    assert_eq!(outcome.exclusion_reason, Some(ExclusionReason::WrongOutcome));

    let log = oracle.log();
    assert_eq!(log.len(), 3);
    let adjudication = log.iter().find(|c| c.role == Adjudicator).unwrap();
    let mut priors = adjudication.prior_roles.clone();
    priors.sort();
    assert_eq!(priors, vec![ReviewerA, ReviewerB]);
    assert_eq!(adjudication.tier, "deep");
    assert!(log.iter().filter(|c| !c.role.is_adjudicator()).all(|c| c.tier == "fast"));

    let roles: Vec<_> = store
        .list_decisions("r1", Stage::FullText)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.role)
        .collect();
    assert_eq!(roles.len(), 3);
    assert_eq!(roles[2], Adjudicator);
}

#[tokio::test]
async fn adjudicator_include_overrides_a_single_exclusion() {
    let override_to_include =
        Assessment::new(Verdict::Include, 0.8, "population matches the protocol");
    let oracle = Arc::new(
        ScriptedOracle::new(Script::include())
            .script("r1", ReviewerA, Script::exclude(Some(ExclusionReason::WrongPopulation)))
            .script("r1", Adjudicator, Script::Reply(override_to_include)),
    );
    let store = store().await;
    let machine = machine(&oracle, &store);

    let outcome = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::TitleAbstract)
        .await
        .unwrap()
        .outcome()
        .clone();

    assert_eq!(outcome.reviewer_a, Verdict::Exclude);
    assert_eq!(outcome.reviewer_b, Verdict::Include);
    assert!(!outcome.agreement);
    assert!(outcome.adjudicated);
    assert_eq!(outcome.final_verdict, Verdict::Include);
    assert_eq!(outcome.exclusion_reason, None);

    let decisions = store.list_decisions("r1", Stage::TitleAbstract).await.unwrap();
    let adjudication = decisions.iter().find(|d| d.role == Adjudicator).unwrap();
    assert_eq!(adjudication.rationale, "population matches the protocol");
    assert_eq!(adjudication.exclusion_reason, None);
    let reviewer_a = decisions.iter().find(|d| d.role == ReviewerA).unwrap();
    assert_eq!(reviewer_a.exclusion_reason, Some(ExclusionReason::WrongPopulation));
}

#[tokio::test]
async fn reviewers_run_concurrently_and_adjudicator_waits_for_both() {
    let delay = Duration::from_millis(400);
    let include = Assessment::new(Verdict::Include, 0.9, "in scope");
    let exclude = Assessment::new(Verdict::Exclude, 0.9, "out of scope");
    let oracle = Arc::new(
        ScriptedOracle::new(Script::include())
            .script("r1", ReviewerA, Script::Slow(delay, include))
            .script("r1", ReviewerB, Script::Slow(delay, exclude)),
    );
    let store = store().await;
    let machine = machine(&oracle, &store);

    let started = tokio::time::Instant::now();
    let outcome = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::TitleAbstract)
        .await
        .unwrap()
        .outcome()
        .clone();
    let elapsed = started.elapsed();

    assert!(outcome.adjudicated);
    assert!(elapsed >= delay, "finished in {elapsed:?}");
    assert!(
        elapsed < delay * 2 - Duration::from_millis(50),
        "reviewers ran one after another: {elapsed:?}",
    );

    let log = oracle.log();
    let reviewer_starts: Vec<_> =
        log.iter().filter(|c| !c.role.is_adjudicator()).map(|c| c.started - started).collect();
    assert_eq!(reviewer_starts.len(), 2);
    assert!(reviewer_starts.iter().all(|s| *s < delay), "{reviewer_starts:?}");

    let adjudicator = log.iter().find(|c| c.role.is_adjudicator()).unwrap();
    assert!(adjudicator.started - started >= delay);
}

#[tokio::test]
async fn full_text_exclusion_always_carries_a_reason() {
    let oracle = Arc::new(ScriptedOracle::new(Script::exclude(None)));
    let store = store().await;
    let machine = machine(&oracle, &store);

    let outcome = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::FullText)
        .await
        .unwrap()
        .outcome()
        .clone();

    assert_eq!(outcome.final_verdict, Verdict::Exclude);
    assert_eq!(outcome.exclusion_reason, Some(ExclusionReason::FULL_TEXT_DEFAULT));
    let persisted = store.get_outcome("r1", Stage::FullText).await.unwrap().unwrap();
    assert_eq!(persisted.exclusion_reason, Some(ExclusionReason::FULL_TEXT_DEFAULT));
}

#[tokio::test]
async fn existing_outcome_is_skipped_without_calls() {
    let oracle = Arc::new(ScriptedOracle::new(Script::include()));
    let store = store().await;
    let machine = machine(&oracle, &store);
    let record = CandidateRecord::new("r1", "A trial");

    machine.evaluate(&record, Stage::TitleAbstract).await.unwrap();
    let calls = oracle.calls();

    let again = machine.evaluate(&record, Stage::TitleAbstract).await.unwrap();
    assert!(matches!(again, Evaluation::Skipped(_)));
    assert_eq!(oracle.calls(), calls);
    assert_eq!(store.list_decisions("r1", Stage::TitleAbstract).await.unwrap().len(), 2);
}

#[tokio::test]
async fn stages_are_independent() {
    let oracle = Arc::new(ScriptedOracle::new(Script::include()));
    let store = store().await;
    let machine = machine(&oracle, &store);
    let record = CandidateRecord::new("r1", "A trial");

    machine.evaluate(&record, Stage::TitleAbstract).await.unwrap();
    let full_text = machine.evaluate(&record, Stage::FullText).await.unwrap();
    assert!(matches!(full_text, Evaluation::Finalized(_)));
    assert_eq!(oracle.calls(), 4);
}

#[tokio::test]
async fn unparseable_reply_becomes_uncertain_decision() {
    let oracle = Arc::new(
        ScriptedOracle::new(Script::include())
            .script("r1", ReviewerA, Script::Raw("I cannot decide, sorry.".into())),
    );
    let store = store().await;
    let machine = machine(&oracle, &store);

    let outcome = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::TitleAbstract)
        .await
        .unwrap()
        .outcome()
        .clone();

    // uncertain vs include is a disagreement, so the adjudicator runs
    assert_eq!(outcome.reviewer_a, Verdict::Uncertain);
    assert!(outcome.adjudicated);

    let decisions = store.list_decisions("r1", Stage::TitleAbstract).await.unwrap();
    let parse_failure = decisions.iter().find(|d| d.role == ReviewerA).unwrap();
    assert_eq!(parse_failure.kind, DecisionKind::ParseFailure);
    assert_eq!(parse_failure.verdict, Verdict::Uncertain);
    assert!(parse_failure.confidence.abs() < f64::EPSILON);
}

#[tokio::test]
async fn fenced_reply_parses_normally() {
    let raw = "```json\n{\"verdict\": \"include\", \"confidence\": 0.7, \"rationale\": \"ok\"}\n```";
    let oracle = Arc::new(ScriptedOracle::new(Script::Raw(raw.into())));
    let store = store().await;
    let machine = machine(&oracle, &store);

    let outcome = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::TitleAbstract)
        .await
        .unwrap()
        .outcome()
        .clone();
    assert_eq!(outcome.final_verdict, Verdict::Include);
    assert!(!outcome.adjudicated);
}

#[tokio::test]
async fn call_failure_leaves_no_outcome() {
    let oracle = Arc::new(
        ScriptedOracle::new(Script::include()).script("r1", ReviewerB, Script::Fail),
    );
    let store = store().await;
    let machine = machine(&oracle, &store);

    let err = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::TitleAbstract)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScreeningError::Oracle { role: ReviewerB, source: OracleError::Unreachable(_), .. }
    ));
    assert!(!err.is_fatal());
    assert!(store.get_outcome("r1", Stage::TitleAbstract).await.unwrap().is_none());
    // reviewer A's verdict was still recorded
    let decisions = store.list_decisions("r1", Stage::TitleAbstract).await.unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].role, ReviewerA);
}

#[tokio::test]
async fn hung_oracle_times_out() {
    let oracle = Arc::new(
        ScriptedOracle::new(Script::include()).script("r1", ReviewerA, Script::Hang),
    );
    let store = store().await;
    let config = ScreeningConfig { oracle_timeout_secs: 1, ..ScreeningConfig::default() };
    let machine = machine_with(&oracle, &store, &config);

    let err = machine
        .evaluate(&CandidateRecord::new("r1", "A trial"), Stage::TitleAbstract)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScreeningError::Oracle { source: OracleError::Timeout(_), role: ReviewerA, .. }
    ));
}

#[tokio::test]
async fn unknown_tier_is_rejected_at_construction() {
    let oracle = Arc::new(ScriptedOracle::new(Script::include()));
    let store = store().await;
    let config =
        ScreeningConfig { adjudicator_tier: "premium".into(), ..ScreeningConfig::default() };
    let limiter = Arc::new(sift_screen::RateLimiter::new(&common::generous_limits()).unwrap());

    let result = sift_screen::ScreeningMachine::new(oracle, store, limiter, &config);
    assert!(matches!(result, Err(ScreeningError::UnknownTier(t)) if t == "premium"));
}
