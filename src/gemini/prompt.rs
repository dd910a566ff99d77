//! Prompt construction for the per-question analysis.
//!
//! The prompt carries the question id, its catalog context, the respondent
//! total, and the full response distribution, plus fixed instructions on
//! what the interpretation should cover.

use crate::config::{QuestionCatalog, QuestionLabel};
use crate::models::FrequencyDistribution;

/// Below this respondent count the prompt asks the model to flag the small
/// sample size. The boundary itself (exactly 10) does not trigger the flag.
const SMALL_SAMPLE_THRESHOLD: u64 = 10;

/// Resolve a question's context string from the catalog.
///
/// A plain label is used as-is. A record with a description lists its
/// options beneath it; a bare option set is presented as sub-questions.
/// Unknown questions get an empty context.
pub fn question_context(question: &str, catalog: &QuestionCatalog) -> String {
    match catalog.get(question) {
        None => String::new(),
        Some(QuestionLabel::Plain(label)) => label.clone(),
        Some(QuestionLabel::Detailed {
            description,
            options,
        }) => {
            let mut context = String::new();
            match description {
                Some(description) => {
                    context.push_str(description);
                    if !options.is_empty() {
                        context.push_str("\nOptions:");
                    }
                }
                None => context.push_str("Sub-questions:"),
            }
            for (option, label) in options {
                context.push_str(&format!("\n- {}: {}", option, label));
            }
            context
        }
    }
}

/// Render the distribution as a `{"value": count, ...}` mapping in
/// descending-count order.
pub fn format_distribution(dist: &FrequencyDistribution) -> String {
    let entries: Vec<String> = dist
        .sorted_entries()
        .iter()
        .map(|(value, count)| format!("{:?}: {}", value, count))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

/// Build the full analysis prompt for one question.
pub fn build_prompt(question: &str, context: &str, dist: &FrequencyDistribution) -> String {
    let total = dist.total_responses();

    let mut prompt = format!(
        "Analyze the data of the following survey question.\n\
         You are a survey analyst reviewing an institutional questionnaire \
         answered by students.\n\n\
         **Question:** {question}\n\
         **Question context:** {context}\n\
         **Total responses received:** {total}\n\n\
         **Response distribution:** {distribution}\n\n\
         Provide an objective and concise interpretation, highlighting:\n\
         - The most frequent response and its percentage.\n\
         - Possible implications of these results.\n\
         - Any relevant trend or point of attention.\n\n\
         The analysis must be direct and clear, without embellishment.\n",
        question = question,
        context = context,
        total = total,
        distribution = format_distribution(dist),
    );

    if total < SMALL_SAMPLE_THRESHOLD {
        prompt.push_str(
            "Fewer than 10 responses were received: still attempt an \
             interpretation from another point of view, but flag that the \
             sample size is small.\n",
        );
    }

    prompt
}
