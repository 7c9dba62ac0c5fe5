//! Prompt templates for the language capability.
//!
//! Structured prompts demand a single JSON object so responses parse into
//! the typed report models without post-processing.

use specloom_core::session::UserProfile;

/// Response instructions for developers and tech leads.
pub const TECHNICAL_PROFILE: &str = "\
You are a senior engineer helping a developer write a feature \
specification. Be precise and technical: reference modules, APIs, data \
models and edge cases directly. Ask pointed questions about integration \
points, failure modes and testing strategy. Keep answers short and \
concrete; skip pleasantries.";

/// Response instructions for product and business stakeholders.
pub const NON_TECHNICAL_PROFILE: &str = "\
You are a friendly product consultant helping a business stakeholder \
write a feature specification. Use plain language and avoid jargon; when \
a technical concept is unavoidable, explain it with an everyday analogy. \
Focus on user outcomes, business value and acceptance criteria. Ask one \
question at a time.";

/// Picks the response instruction template for `profile`.
pub fn system_prompt(profile: UserProfile) -> &'static str {
    match profile {
        UserProfile::Technical => TECHNICAL_PROFILE,
        UserProfile::NonTechnical => NON_TECHNICAL_PROFILE,
    }
}

/// Feature-analysis prompt. Expects `{main_goal, complexity, questions}`.
pub const ANALYZE_PROMPT: &str = "\
Analyze the user's feature request. Extract the main goal as one \
sentence, rate the implementation complexity from 1 (trivial) to 5 \
(major effort), and list up to 3 clarifying questions that would most \
improve the specification. Respond with a single JSON object: \
{\"main_goal\": string, \"complexity\": number, \"questions\": [string]}";

/// Section-extraction prompt. Expects `{section_key: content}`.
pub const SECTION_UPDATE_PROMPT: &str = "\
You maintain a feature specification with these sections: description, \
user_story, expected_outcome, technical_scope, task_checklist, \
acceptance_criteria, definition_of_done, additional_notes, references, \
risks. Given the current section contents and the latest conversation, \
extract new or improved content for any section the conversation \
informs. Only include sections you can improve; preserve detail already \
present rather than shortening it. Respond with a single JSON object \
mapping section keys to full replacement content.";

/// Tech-debt analysis prompt. Expects a `TechDebtReport`-shaped object.
pub const TECH_DEBT_PROMPT: &str = "\
Review the code excerpts below for technical debt relevant to the \
planned feature. For each issue give category (code_smell, performance, \
security, testability, coupling, best_practices, documentation), \
severity (critical, medium, low), location, title, description, a \
suggestion and an effort estimate in hours. Respond with a single JSON \
object: {\"issues\": [...], \"recommendation\": string}";

/// Security checklist prompt. Expects a `SecurityReport`-shaped object.
pub const SECURITY_PROMPT: &str = "\
Produce a security checklist for the planned feature. Cover data \
protection (PII handling, encryption, retention), the relevant OWASP \
risks (injection, broken auth, sensitive data exposure, access control) \
and API security (authentication, rate limiting, input validation). For \
each check give category, severity (critical, high, medium, low), \
check_id, title, description, status (pass, warning, fail) and a \
recommendation. Respond with a single JSON object: {\"checks\": [...], \
\"overall_status\": \"pass\"|\"warning\"|\"fail\"}";

/// Diagram generation prompt. Expects `{diagram_type, source, ...}`.
pub const DIAGRAM_PROMPT: &str = "\
Generate a Mermaid diagram illustrating the planned feature. Choose the \
best fitting type: flowchart for processes, sequenceDiagram for \
interactions, classDiagram for data models, erDiagram for storage. \
Respond with a single JSON object: {\"diagram_type\": string, \
\"source\": string, \"title\": string, \"description\": string}";

/// Multi-spec detection prompt. Expects a breakdown-shaped object.
pub const MULTI_SPEC_PROMPT: &str = "\
Decide whether the planned feature should be split into separate \
specifications per repository. If it spans multiple repositories, \
propose one sub-spec per repository with repository, title, change_type \
(CORE, INTEGRATION, UI_ONLY, CONFIG), effort_days and dependencies \
(repositories it depends on). Respond with a single JSON object: \
{\"should_split\": bool, \"affected_repositories\": [string], \
\"specs\": [...], \"rationale\": string}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_selection() {
        assert_eq!(system_prompt(UserProfile::Technical), TECHNICAL_PROFILE);
        assert_eq!(
            system_prompt(UserProfile::NonTechnical),
            NON_TECHNICAL_PROFILE
        );
    }
}
