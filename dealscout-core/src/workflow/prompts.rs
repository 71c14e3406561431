//! Prompt assembly for the three kinds of model calls: per-step analysis,
//! the cross-step summary, and the outreach email draft.

use crate::search::SearchResult;
use crate::workflow::WorkflowStep;

/// Compose the analysis prompt for one step from its instruction and the
/// filtered search results. An empty result set still produces a prompt; the
/// model is told nothing was found rather than the call being skipped.
pub fn step_prompt(step: &WorkflowStep, results: &[SearchResult]) -> String {
    let serialized = serde_json::to_string_pretty(results)
        .unwrap_or_else(|_| "[]".to_string());
    format!(
        "{}\nBase this on the following search results:\n{}",
        step.analysis_prompt, serialized
    )
}

/// Placeholder line standing in for a failed step in the summary input.
pub fn failed_section(step_name: &str, error: &str) -> String {
    format!("[{step_name} failed: {error}]")
}

/// Summary-stage prompt: synthesize the per-step findings into one brief.
pub fn summary_prompt(sections: &[(String, String)]) -> String {
    let mut body = String::new();
    for (name, text) in sections {
        body.push_str("## ");
        body.push_str(name);
        body.push('\n');
        body.push_str(text);
        body.push_str("\n\n");
    }
    format!(
        "Synthesize the research notes below into a concise company brief \
         covering: what the business does, the market and industry context it \
         operates in, how it differentiates versus competitors, what customers \
         say about it, recent news or key developments, and its funding \
         history. Sections marked as failed carry no findings; note the gap \
         briefly instead of speculating.\n\n**********\n{body}**********"
    )
}

/// Draft-email prompt: a VC outreach email grounded in the summary brief.
pub fn draft_email_prompt(summary: &str) -> String {
    format!(
        "I'm a VC. I want to draft an email to an entrepreneur that conveys \
         that I'm knowledgeable about:\n\
         - his business\n\
         - the market and industry context his business operates in\n\
         - how his business differentiates vs. its competitors\n\
         - what customers are saying about his business\n\
         - any recent news or key developments around his business I might \
         congratulate him on\n\
         I'll write greeting and sign-off separately; only provide email body \
         to copy/paste, nothing else.\n\
         Use the following information about the company:\n\
         \n**********\n{summary}\n**********\n\n\
         For drafting the email body, it's important that you write it as \
         follows:\n\
         - Length: concise; max. 3 short paragraphs.\n\
         - Tone: conversational, direct, to the point.\n\
         - Language: factual, analytical, no flattery."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_prompt_includes_instruction_and_results() {
        let step = WorkflowStep {
            name: "Overview".into(),
            search_query: "q".into(),
            analysis_prompt: "Summarize the company.".into(),
            include_domains: Vec::new(),
        };
        let results = vec![SearchResult {
            location: "https://acme.io/about".into(),
            title: "About".into(),
            content: "Acme builds anvils.".into(),
        }];
        let prompt = step_prompt(&step, &results);
        assert!(prompt.starts_with("Summarize the company."));
        assert!(prompt.contains("Acme builds anvils."));
    }

    #[test]
    fn step_prompt_with_no_results_is_still_a_prompt() {
        let step = WorkflowStep {
            name: "Overview".into(),
            search_query: "q".into(),
            analysis_prompt: "Summarize.".into(),
            include_domains: Vec::new(),
        };
        let prompt = step_prompt(&step, &[]);
        assert!(prompt.contains("search results"));
        assert!(prompt.contains("[]"));
    }

    #[test]
    fn summary_prompt_carries_every_section() {
        let sections = vec![
            ("Company Overview".to_string(), "Builds anvils.".to_string()),
            (
                "Funding History".to_string(),
                failed_section("Funding History", "search backend unreachable"),
            ),
        ];
        let prompt = summary_prompt(&sections);
        assert!(prompt.contains("## Company Overview"));
        assert!(prompt.contains("Builds anvils."));
        assert!(prompt.contains("[Funding History failed: search backend unreachable]"));
    }
}
