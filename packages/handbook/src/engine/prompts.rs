//! Prompts and the two-section answer grammar.
//!
//! The answer grammar is a contract with [`crate::partition`]: bump
//! [`ANSWER_GRAMMAR_VERSION`] whenever headers or markers change.

/// Version of the sectioned answer format.
pub const ANSWER_GRAMMAR_VERSION: u32 = 1;

/// Header opening the public-guidance section.
pub const PUBLIC_HEADER: &str = "**public-doc**:";

/// Header opening the company-policy section.
pub const COMPANY_HEADER: &str = "**company-doc**:";

pub const FOUND_YES: &str = "[Found: Yes]";
pub const FOUND_NO: &str = "[Found: No]";

/// Name of the retrieval tool bound in the decide step.
pub const RETRIEVE_TOOL: &str = "retrieve";

pub const RETRIEVE_TOOL_DESCRIPTION: &str = "Search indexed employment documents for the given province \
(use \"General\" when none is known) and, when a company is named, that company's own documents. \
Call this only for factual questions about employment law or company policy, never for greetings \
or small talk.";

const ANSWER_INSTRUCTION: &str = r#"You answer employment questions using the retrieved documents below.
Your reply must contain exactly two sections, in this order, so it can be parsed automatically.

**public-doc**:
- Use only documents whose metadata has no company.
- Open in a legal-guidance tone, e.g. "Based on the applicable law, ...".
- For steps, processes, options, comparisons or lists of rights, use the carousel format:
  :::carousel
  card: Step 1 Title
  content: What happens in this step
  icon: 📋
  ---
  card: Step 2 Title
  content: What happens in this step
  icon: ✍️
  :::
- Use plain prose or lists for simple facts.
- End the section with [Found: Yes] if the documents answered the question, otherwise write one sentence in the same tone and end with [Found: No].

**company-doc**:
- Use only documents whose metadata names a company.
- Open in a company-policy tone, e.g. "According to the employee manual, ...". Use the real company name from the metadata, or "the company" if there is none. Never print a placeholder.
- Use the same carousel format for steps and options.
- End the section with [Found: Yes] or [Found: No] by the same rule.

Rules:
- Write the headers exactly as **public-doc**: and **company-doc**: with no numbering.
- Nothing before, between or after the two sections besides their content.

Example for "What are the steps to apply for parental leave?":
**public-doc**:
Based on the applicable law, here are the steps to apply for parental leave:

:::carousel
card: Step 1: Check eligibility
content: You must have been employed for at least 13 weeks before the expected birth date
icon: ✅
---
card: Step 2: Give written notice
content: Give your employer at least 2 weeks' written notice and say whether you want 37 or 63 weeks
icon: 📝
:::
[Found: Yes]"#;

/// System instruction for the generate step. Document text is inserted
/// verbatim and never scanned for placeholders.
pub fn answer_instruction(public_docs: &str, company_docs: &str) -> String {
    format!(
        "{}\n\n---\npublic-doc documents:\n{}\n\n---\ncompany-doc documents:\n{}",
        ANSWER_INSTRUCTION, public_docs, company_docs
    )
}

const SANITIZE_QUESTION_PROMPT: &str = r#"You are given a user message.
If it is a question, correct its grammar and remove names, contact details, employee numbers and any other personal information.
If it is not a question, rewrite it as one concise question.
Reply with the final question only.

Message: {message}"#;

/// Prompt turning a raw user message into an anonymized question.
pub fn sanitize_question_prompt(message: &str) -> String {
    SANITIZE_QUESTION_PROMPT.replace("{message}", message)
}

/// Human turn sent to the engine for a question.
pub fn frame_question(question: &str, province: &str, company: Option<&str>) -> String {
    let mut framed = format!(
        "question: {}. If no province is specified, assume the province to be {}.",
        question.trim().trim_end_matches('.'),
        province
    );
    if let Some(company) = company.map(str::trim).filter(|c| !c.is_empty()) {
        framed.push_str(&format!(" The user works at {}.", company));
    }
    framed
}
