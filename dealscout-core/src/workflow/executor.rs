//! One step, end to end: search, filter, analyze.

use tracing::{debug, info};

use crate::cache::ResultCache;
use crate::error::StepError;
use crate::llm::{CompletionRequest, ModelClient};
use crate::search::SearchClient;
use crate::workflow::{WorkflowStep, is_document_link, prompts};

/// Execute `step` against `subject`, memoized through the cache: identical
/// (step, subject) pairs reuse the prior result without touching either
/// backend. Transport failures surface to the caller; there are no retries.
pub async fn execute_step(
    search: &dyn SearchClient,
    model: &dyn ModelClient,
    cache: &ResultCache,
    step: &WorkflowStep,
    subject: &str,
) -> Result<String, StepError> {
    let step_identity =
        serde_json::to_string(step).unwrap_or_else(|_| step.name.clone());
    cache
        .get_or_compute("execute_step", &[step_identity.as_str(), subject], || {
            execute_step_uncached(search, model, step, subject)
        })
        .await
}

async fn execute_step_uncached(
    search: &dyn SearchClient,
    model: &dyn ModelClient,
    step: &WorkflowStep,
    subject: &str,
) -> Result<String, StepError> {
    let query = step.rendered_query(subject);
    let domains = step.rendered_domains(subject);
    let results = search.search(&query, &domains).await?;

    let total = results.len();
    let filtered: Vec<_> = results
        .into_iter()
        .filter(|result| !is_document_link(&result.location))
        .collect();
    info!(
        step = %step.name,
        subject,
        results = total,
        kept = filtered.len(),
        "search results filtered"
    );
    if filtered.is_empty() {
        // The model is still consulted; "nothing found" is an answer.
        debug!(step = %step.name, "no usable search results");
    }

    let prompt = prompts::step_prompt(step, &filtered);
    let completion = model.complete(CompletionRequest::new(prompt)).await?;
    Ok(completion.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::llm::StaticModelClient;
    use crate::search::{SearchResult, StaticSearchClient};

    fn step() -> WorkflowStep {
        WorkflowStep {
            name: "Company Overview".into(),
            search_query: "{company} about".into(),
            analysis_prompt: "Summarize the company.".into(),
            include_domains: vec!["{company}".into()],
        }
    }

    fn document_hits() -> Vec<SearchResult> {
        ["a.pdf", "b.PDF", "c.docx"]
            .iter()
            .map(|name| SearchResult {
                location: format!("https://acme.io/{name}"),
                title: "doc".into(),
                content: "binary".into(),
            })
            .collect()
    }

    #[tokio::test]
    async fn document_only_results_still_reach_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let search = StaticSearchClient::new().with_results(document_hits());
        let model = StaticModelClient::new("mock").with_response("nothing on record");

        let text = execute_step(&search, &model, &cache, &step(), "acme.io")
            .await
            .unwrap();
        assert_eq!(text, "nothing on record");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn search_failure_surfaces_as_step_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let search =
            StaticSearchClient::new().with_error(SearchError::Network("unreachable".into()));
        let model = StaticModelClient::new("mock");

        let err = execute_step(&search, &model, &cache, &step(), "acme.io")
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Search(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn repeat_execution_hits_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let search = StaticSearchClient::new();
        let model = StaticModelClient::new("mock").with_response("analysis");

        let first = execute_step(&search, &model, &cache, &step(), "acme.io")
            .await
            .unwrap();
        let second = execute_step(&search, &model, &cache, &step(), "acme.io")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(search.calls(), 1);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn different_subjects_do_not_share_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let search = StaticSearchClient::new();
        let model = StaticModelClient::new("mock")
            .with_response("for acme")
            .with_response("for umbra");

        let a = execute_step(&search, &model, &cache, &step(), "acme.io")
            .await
            .unwrap();
        let b = execute_step(&search, &model, &cache, &step(), "umbra.co")
            .await
            .unwrap();
        assert_eq!(a, "for acme");
        assert_eq!(b, "for umbra");
        assert_eq!(search.calls(), 2);
    }
}
