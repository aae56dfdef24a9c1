// src/core/prompts.rs — Prompt templates for each stage of the loop

use minijinja::{context, Environment};

use crate::infra::errors::ResearchError;

const QUERY_WRITER: &str = "\
Your goal is to generate sophisticated and diverse web search queries for an automated research tool.

Instructions:
- Prefer a single query; add another only if the question asks about several aspects and one query is not enough.
- Each query should focus on one specific aspect of the original question.
- Do not produce more than {{ number_queries }} queries.
- Queries should be diverse; if the topic is broad, generate more than one query.
- Do not generate multiple similar queries, one is enough.
- Queries should ensure that the most current information is gathered. The current date is {{ current_date }}.

Format:
- Respond with a JSON object with exactly these keys:
   - \"rationale\": a brief explanation of why these queries are relevant
   - \"query\": a list of search queries

Context: {{ research_topic }}";

const WEB_SEARCHER: &str = "\
Conduct targeted Google Searches to gather the most recent, credible information on \"{{ research_topic }}\" and synthesize it into a verifiable text artifact.

Instructions:
- Query should ensure that the most current information is gathered. The current date is {{ current_date }}.
- Consult up to {{ result_count }} distinct sources.
- Conduct multiple, diverse searches to gather comprehensive information.
- Consolidate key findings while meticulously tracking the source(s) for each specific piece of information.
- The output should be a well-written summary or report based on your search findings.
- Only include information found in the search results, do not make up any information.

Research Topic:
{{ research_topic }}";

const REFLECTION: &str = "\
You are an expert research assistant analyzing summaries about \"{{ research_topic }}\".

Instructions:
- Identify knowledge gaps or areas that need deeper exploration and generate follow-up queries.
- If the provided summaries are sufficient to answer the user's question, do not generate a follow-up query.
- If there is a knowledge gap, generate follow-up queries that would help expand understanding.
- Focus on technical details, implementation specifics, or emerging trends that were not fully covered.
- The current date is {{ current_date }}.

Requirements:
- Ensure each follow-up query is self-contained and includes the necessary context for web search.

Output Format:
- Respond with a JSON object with exactly these keys:
   - \"is_sufficient\": true or false
   - \"knowledge_gap\": what information is missing or needs clarification
   - \"follow_up_queries\": specific questions that address the gap

Summaries:
{{ summaries }}";

const ANSWER: &str = "\
Generate a high-quality answer to the user's question based on the provided summaries.

Instructions:
- The current date is {{ current_date }}.
- You are the final step of a multi-step research process; do not mention that you are the final step.
- You have access to all the information gathered from the previous steps.
- Generate a high-quality answer to the user's question based on the provided summaries and the user's question.
- Include the sources you used from the summaries in the answer correctly, use markdown format (e.g. [apnews](https://vertexaisearch.cloud.google.com/id/1-0)). THIS IS A MUST.

User Context:
- {{ research_topic }}

Summaries:
{{ summaries }}";

/// Compiled templates. Construct once per run and share.
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, ResearchError> {
        let mut env = Environment::new();
        env.add_template("query_writer", QUERY_WRITER)?;
        env.add_template("web_searcher", WEB_SEARCHER)?;
        env.add_template("reflection", REFLECTION)?;
        env.add_template("answer", ANSWER)?;
        Ok(Self { env })
    }

    pub fn query_writer(
        &self,
        research_topic: &str,
        number_queries: u32,
    ) -> Result<String, ResearchError> {
        Ok(self.env.get_template("query_writer")?.render(context! {
            current_date => current_date(),
            research_topic,
            number_queries,
        })?)
    }

    pub fn web_searcher(&self, query: &str, result_count: u32) -> Result<String, ResearchError> {
        Ok(self.env.get_template("web_searcher")?.render(context! {
            current_date => current_date(),
            research_topic => query,
            result_count,
        })?)
    }

    pub fn reflection(
        &self,
        research_topic: &str,
        summaries: &[String],
    ) -> Result<String, ResearchError> {
        Ok(self.env.get_template("reflection")?.render(context! {
            current_date => current_date(),
            research_topic,
            summaries => summaries.join("\n\n---\n\n"),
        })?)
    }

    pub fn answer(
        &self,
        research_topic: &str,
        summaries: &[String],
    ) -> Result<String, ResearchError> {
        Ok(self.env.get_template("answer")?.render(context! {
            current_date => current_date(),
            research_topic,
            summaries => summaries.join("\n---\n\n"),
        })?)
    }
}

/// e.g. "October 19, 2026"
pub fn current_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}
