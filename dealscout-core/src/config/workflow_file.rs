//! Optional TOML workflow override. The file holds `[[step]]` tables with the
//! same fields as [`WorkflowStep`]; when absent, the built-in workflow is
//! used unchanged.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::workflow::WorkflowStep;

#[derive(Deserialize)]
struct WorkflowFile {
    #[serde(rename = "step")]
    steps: Vec<WorkflowStep>,
}

/// Load and validate a workflow definition from `path`.
pub fn load_workflow_file(path: &Path) -> Result<Vec<WorkflowStep>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_workflow(&raw)
}

fn parse_workflow(raw: &str) -> Result<Vec<WorkflowStep>, ConfigError> {
    let file: WorkflowFile =
        toml::from_str(raw).map_err(|err| ConfigError::InvalidWorkflow(err.to_string()))?;
    validate(&file.steps)?;
    Ok(file.steps)
}

fn validate(steps: &[WorkflowStep]) -> Result<(), ConfigError> {
    if steps.is_empty() {
        return Err(ConfigError::InvalidWorkflow(
            "workflow defines no steps".to_string(),
        ));
    }
    for step in steps {
        if step.name.trim().is_empty() {
            return Err(ConfigError::InvalidWorkflow(
                "a step is missing its name".to_string(),
            ));
        }
        if step.search_query.trim().is_empty() || step.analysis_prompt.trim().is_empty() {
            return Err(ConfigError::InvalidWorkflow(format!(
                "step {:?} needs both a search query and an analysis prompt",
                step.name
            )));
        }
    }
    let mut names: Vec<&str> = steps.iter().map(|step| step.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    if names.len() != steps.len() {
        return Err(ConfigError::InvalidWorkflow(
            "step names must be unique".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        [[step]]
        name = "Company Overview"
        search_query = "{company} about"
        analysis_prompt = "Summarize the company."
        include_domains = ["{company}"]

        [[step]]
        name = "Funding History"
        search_query = "{company} funding rounds"
        analysis_prompt = "Summarize the funding history."
    "#;

    #[test]
    fn parses_steps_in_order() {
        let steps = parse_workflow(VALID).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "Company Overview");
        assert_eq!(steps[1].include_domains, Vec::<String>::new());
    }

    #[test]
    fn rejects_empty_workflow() {
        assert!(matches!(
            parse_workflow(""),
            Err(ConfigError::InvalidWorkflow(_))
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        let raw = r#"
            [[step]]
            name = "Overview"
            search_query = "q"
            analysis_prompt = "p"

            [[step]]
            name = "Overview"
            search_query = "q2"
            analysis_prompt = "p2"
        "#;
        let err = parse_workflow(raw).unwrap_err();
        assert!(err.to_string().contains("unique"));
    }

    #[test]
    fn rejects_blank_prompt() {
        let raw = r#"
            [[step]]
            name = "Overview"
            search_query = "q"
            analysis_prompt = "  "
        "#;
        assert!(parse_workflow(raw).is_err());
    }
}
