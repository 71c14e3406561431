//! Workflow definition: the fixed, ordered list of research steps and the
//! template rendering they share.
//!
//! Steps are immutable after startup. Templates use the `{company}`
//! placeholder, substituted with the subject in both search queries and
//! domain allow-lists (a step can pin results to the company's own site).

mod executor;
pub mod prompts;

pub use executor::execute_step;

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the subject identifier.
pub const SUBJECT_PLACEHOLDER: &str = "{company}";

/// Link suffixes that are dropped from search results before analysis: the
/// model only sees HTML-page content.
pub const SKIPPED_DOCUMENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".rtf", ".csv", ".zip",
    ".rar",
];

/// One named research step: a search query plus the analysis instruction
/// applied to its results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowStep {
    pub name: String,
    pub search_query: String,
    pub analysis_prompt: String,
    #[serde(default)]
    pub include_domains: Vec<String>,
}

impl WorkflowStep {
    pub fn rendered_query(&self, subject: &str) -> String {
        render(&self.search_query, subject)
    }

    pub fn rendered_domains(&self, subject: &str) -> Vec<String> {
        self.include_domains
            .iter()
            .map(|domain| render(domain, subject))
            .collect()
    }
}

fn render(template: &str, subject: &str) -> String {
    template.replace(SUBJECT_PLACEHOLDER, subject)
}

/// True when the result location points at a non-HTML document.
pub fn is_document_link(location: &str) -> bool {
    let lowered = location.to_ascii_lowercase();
    SKIPPED_DOCUMENT_EXTENSIONS
        .iter()
        .any(|ext| lowered.ends_with(ext))
}

/// The built-in research workflow, in execution order.
pub fn default_workflow() -> Vec<WorkflowStep> {
    vec![
        WorkflowStep {
            name: "Company Overview".into(),
            search_query: "{company} about OR mission OR products OR services".into(),
            analysis_prompt: "Summarize the key information about the company from its official \
                              website, including its mission, products/services, and any unique \
                              selling points."
                .into(),
            include_domains: vec!["{company}".into()],
        },
        WorkflowStep {
            name: "Founder Information".into(),
            search_query: "{company} founder OR CEO biography leadership team".into(),
            analysis_prompt: "Identify the founder(s) or CEO of the company and summarize their \
                              professional background, key achievements, and vision for the \
                              company."
                .into(),
            include_domains: vec![
                "{company}".into(),
                "linkedin.com".into(),
                "crunchbase.com".into(),
            ],
        },
        WorkflowStep {
            name: "Industry Analysis".into(),
            search_query: "{company} industry market report size growth trends".into(),
            analysis_prompt: "Analyze the industry in which the company operates. Summarize key \
                              statistics, growth projections, market size, and emerging trends."
                .into(),
            include_domains: vec![
                "statista.com".into(),
                "marketresearch.com".into(),
                "ibisworld.com".into(),
                "grandviewresearch.com".into(),
            ],
        },
        WorkflowStep {
            name: "Competitor Analysis".into(),
            search_query: "{company} top competitors comparison market share".into(),
            analysis_prompt: "Identify the top 3-5 competitors of the company. For each \
                              competitor, summarize their key offerings and unique selling \
                              points. Then, compare and contrast with the target company, \
                              highlighting key differentiators and relative market positions."
                .into(),
            include_domains: Vec::new(),
        },
        WorkflowStep {
            name: "Customer Sentiment".into(),
            search_query: "{company} customer reviews testimonials case studies".into(),
            analysis_prompt: "Analyze customer reviews and testimonials for the company. \
                              Summarize the overall sentiment and extract common themes from \
                              both positive and negative reviews. Include any notable case \
                              studies or success stories if available."
                .into(),
            include_domains: vec![
                "trustpilot.com".into(),
                "g2.com".into(),
                "capterra.com".into(),
                "{company}".into(),
            ],
        },
        WorkflowStep {
            name: "Recent Developments".into(),
            search_query: "{company} recent news announcements partnerships product launches \
                           achievements"
                .into(),
            analysis_prompt: "Summarize the most significant recent news articles about the \
                              company, focusing on major announcements, partnerships, product \
                              launches, or achievements from the past 3 months."
                .into(),
            include_domains: vec![
                "{company}".into(),
                "techcrunch.com".into(),
                "crunchbase.com".into(),
                "businesswire.com".into(),
                "prnewswire.com".into(),
            ],
        },
        WorkflowStep {
            name: "Funding History".into(),
            search_query: "{company} funding rounds investment series total raised investors"
                .into(),
            analysis_prompt: "Summarize the company's funding history, including total amount \
                              raised, key investors, and details of the most recent funding \
                              round if available. Include any information on the company's \
                              current valuation or financial status if publicly available."
                .into(),
            include_domains: vec![
                "crunchbase.com".into(),
                "pitchbook.com".into(),
                "dealroom.co".into(),
            ],
        },
    ]
}
