//! End-to-end pipeline behavior with the ticker driving queued stages.

use std::sync::Arc;
use std::time::Duration;

use dealscout_core::cache::ResultCache;
use dealscout_core::clients::ResearchClients;
use dealscout_core::error::SearchError;
use dealscout_core::llm::StaticModelClient;
use dealscout_core::pipeline::{Coordinator, RunStatus, UnitId};
use dealscout_core::search::{SearchResult, StaticSearchClient};
use dealscout_core::workflow::WorkflowStep;
use tokio::time::sleep;

fn research_steps(count: usize) -> Vec<WorkflowStep> {
    (0..count)
        .map(|index| WorkflowStep {
            name: format!("Facet {index}"),
            search_query: format!("{{company}} facet {index}"),
            analysis_prompt: format!("Report on facet {index} of the company."),
            include_domains: vec!["{company}".to_string()],
        })
        .collect()
}

fn ticking_coordinator(
    search: Arc<StaticSearchClient>,
    model: Arc<StaticModelClient>,
    steps: usize,
) -> (Coordinator, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(ResultCache::open(dir.path()).unwrap());
    let clients = ResearchClients::new(search, model);
    let coordinator = Coordinator::builder(clients, cache, research_steps(steps))
        .tick_interval(Duration::from_millis(20))
        .build();
    coordinator.set_subject("acme.io");
    (coordinator, dir)
}

async fn quiet(coordinator: &Coordinator) -> bool {
    coordinator.is_settled().await
        && coordinator
            .snapshot()
            .await
            .iter()
            .all(|unit| unit.status != RunStatus::Running && unit.status != RunStatus::Queued)
}

async fn wait_settled(coordinator: &Coordinator) {
    for _ in 0..500 {
        if quiet(coordinator).await {
            // Let a final completion write land before snapshotting.
            sleep(Duration::from_millis(10)).await;
            if quiet(coordinator).await {
                return;
            }
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("pipeline never settled");
}

async fn status_of(coordinator: &Coordinator, unit: UnitId) -> RunStatus {
    coordinator.unit_state(unit).await.unwrap().status
}

#[tokio::test]
async fn analyze_all_runs_steps_then_summary_then_email_exactly_once() {
    let search = Arc::new(StaticSearchClient::new());
    let model = Arc::new(StaticModelClient::new("mock"));
    let (coordinator, _dir) = ticking_coordinator(search.clone(), model.clone(), 3);

    coordinator.analyze_all().await.unwrap();
    wait_settled(&coordinator).await;

    for index in 0..3 {
        assert_eq!(
            status_of(&coordinator, UnitId::Step(index)).await,
            RunStatus::Done
        );
    }
    assert_eq!(status_of(&coordinator, UnitId::Summary).await, RunStatus::Done);
    assert_eq!(
        status_of(&coordinator, UnitId::DraftEmail).await,
        RunStatus::Done
    );

    // Three step analyses, one summary, one email: the summary did not fire
    // once per step completion.
    assert_eq!(search.calls(), 3);
    assert_eq!(model.calls(), 5);

    let snapshot = coordinator.snapshot().await;
    assert_eq!(snapshot.len(), 5);
    assert!(snapshot.iter().all(|unit| !unit.result.is_empty()));
}

#[tokio::test]
async fn document_only_step_succeeds_while_sibling_transport_failure_is_isolated() {
    let pdf_hits: Vec<SearchResult> = (0..3)
        .map(|index| SearchResult {
            location: format!("https://acme.io/report-{index}.pdf"),
            title: "deck".into(),
            content: "binary".into(),
        })
        .collect();
    let search = Arc::new(StaticSearchClient::new().with_results(pdf_hits));
    let model = Arc::new(StaticModelClient::new("mock").with_response("no page content found"));
    let (coordinator, _dir) = ticking_coordinator(search.clone(), model.clone(), 2);

    coordinator.dispatch(UnitId::Step(0)).await.unwrap();
    wait_settled(&coordinator).await;
    assert_eq!(status_of(&coordinator, UnitId::Step(0)).await, RunStatus::Done);
    let first = coordinator.unit_state(UnitId::Step(0)).await.unwrap();
    assert_eq!(first.result, "no page content found");
    // Filtering left nothing, yet the model was still consulted.
    assert_eq!(model.calls(), 1);

    // Second unit fails in transport; the first unit's outcome must survive.
    let search_down = Arc::new(
        StaticSearchClient::new().with_error(SearchError::Network("connection refused".into())),
    );
    let (isolated, _dir2) = ticking_coordinator(search_down, model.clone(), 2);
    isolated.dispatch(UnitId::Step(1)).await.unwrap();
    wait_settled(&isolated).await;

    let failed = isolated.unit_state(UnitId::Step(1)).await.unwrap();
    assert_eq!(failed.status, RunStatus::Failed);
    assert!(!failed.error.clone().unwrap().is_empty());

    let first_again = coordinator.unit_state(UnitId::Step(0)).await.unwrap();
    assert_eq!(first_again.status, RunStatus::Done);
    assert_eq!(first_again.result, "no page content found");
}

#[tokio::test]
async fn redispatch_hits_the_cache_instead_of_the_backends() {
    let search = Arc::new(StaticSearchClient::new());
    let model = Arc::new(StaticModelClient::new("mock").with_response("deep analysis"));
    let (coordinator, _dir) = ticking_coordinator(search.clone(), model.clone(), 1);

    coordinator.dispatch(UnitId::Step(0)).await.unwrap();
    wait_settled(&coordinator).await;
    let first = coordinator.unit_state(UnitId::Step(0)).await.unwrap();
    assert_eq!(first.result, "deep analysis");

    coordinator.dispatch(UnitId::Step(0)).await.unwrap();
    wait_settled(&coordinator).await;
    let second = coordinator.unit_state(UnitId::Step(0)).await.unwrap();
    assert_eq!(second.result, "deep analysis");
    assert_eq!(search.calls(), 1);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn failure_then_redispatch_recovers_prior_success_from_cache() {
    let search = Arc::new(
        StaticSearchClient::new()
            .with_results(vec![SearchResult {
                location: "https://acme.io/about".into(),
                title: "About".into(),
                content: "Acme builds anvils.".into(),
            }])
            .with_error(SearchError::Network("gateway timeout".into())),
    );
    let model = Arc::new(StaticModelClient::new("mock").with_response("acme findings"));
    let (coordinator, _dir) = ticking_coordinator(search.clone(), model.clone(), 1);

    coordinator.dispatch(UnitId::Step(0)).await.unwrap();
    wait_settled(&coordinator).await;
    assert_eq!(
        coordinator.unit_state(UnitId::Step(0)).await.unwrap().result,
        "acme findings"
    );

    // A different subject is a cold cache key; its search fails in transport
    // and the slot flips to Failed.
    coordinator.set_subject("umbra.co");
    coordinator.dispatch(UnitId::Step(0)).await.unwrap();
    wait_settled(&coordinator).await;
    assert_eq!(
        status_of(&coordinator, UnitId::Step(0)).await,
        RunStatus::Failed
    );

    // Re-dispatch with the inputs that previously succeeded: the cache
    // restores the prior content without another backend call.
    coordinator.set_subject("acme.io");
    coordinator.dispatch(UnitId::Step(0)).await.unwrap();
    wait_settled(&coordinator).await;

    let state = coordinator.unit_state(UnitId::Step(0)).await.unwrap();
    assert_eq!(state.status, RunStatus::Done);
    assert_eq!(state.result, "acme findings");
    assert_eq!(search.calls(), 2);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn queued_stages_wait_for_failures_too() {
    let search = Arc::new(
        StaticSearchClient::new()
            .with_error(SearchError::Backend {
                status: 502,
                message: "bad gateway".into(),
            })
            .with_error(SearchError::Backend {
                status: 502,
                message: "bad gateway".into(),
            }),
    );
    let model = Arc::new(StaticModelClient::new("mock"));
    let (coordinator, _dir) = ticking_coordinator(search, model.clone(), 2);

    coordinator.analyze_all().await.unwrap();
    wait_settled(&coordinator).await;

    assert_eq!(
        status_of(&coordinator, UnitId::Step(0)).await,
        RunStatus::Failed
    );
    assert_eq!(
        status_of(&coordinator, UnitId::Step(1)).await,
        RunStatus::Failed
    );
    // Both steps failed, yet the summary and email still ran to Done.
    assert_eq!(status_of(&coordinator, UnitId::Summary).await, RunStatus::Done);
    assert_eq!(
        status_of(&coordinator, UnitId::DraftEmail).await,
        RunStatus::Done
    );
    // Summary + email only; no step ever reached the model.
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn analyze_all_requires_a_subject() {
    let search = Arc::new(StaticSearchClient::new());
    let model = Arc::new(StaticModelClient::new("mock"));
    let (coordinator, _dir) = ticking_coordinator(search.clone(), model.clone(), 2);
    coordinator.set_subject("");

    assert!(coordinator.analyze_all().await.is_err());
    assert!(coordinator.is_settled().await);
    assert_eq!(status_of(&coordinator, UnitId::Step(0)).await, RunStatus::Idle);
    assert_eq!(
        status_of(&coordinator, UnitId::Summary).await,
        RunStatus::Idle
    );
    assert_eq!(search.calls(), 0);
    assert_eq!(model.calls(), 0);
}
