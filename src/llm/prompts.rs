//! Prompt templates for the summary, tag, and answer steps.

/// Sentences requested from the summarization prompt.
pub const SUMMARY_SENTENCES: usize = 3;

/// Character prefix of the document submitted for summarization.
pub const SUMMARY_INPUT_CHARS: usize = 10_000;

/// Character prefix of the document submitted for type classification.
pub const TAG_INPUT_CHARS: usize = 2_000;

/// System instruction grounding chat answers in retrieved context.
const ANSWER_SYSTEM_PROMPT: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.";

/// Build the fixed-length summary prompt over a truncated document prefix.
pub fn summary_prompt(full_text: &str) -> String {
    format!(
        "Summarize the following document in exactly {SUMMARY_SENTENCES} sentences:\n\n{}",
        truncate_chars(full_text, SUMMARY_INPUT_CHARS)
    )
}

/// Build the single-label document-type prompt over a shorter prefix.
pub fn tag_prompt(full_text: &str) -> String {
    format!(
        "Identify the type of this document (e.g., Invoice, Contract, Resume, Article) \
         and return just the label. Document:\n\n{}",
        truncate_chars(full_text, TAG_INPUT_CHARS)
    )
}

/// Assemble the retrieval-grounded answer prompt from context chunks and the question.
pub fn answer_prompt(context_chunks: &[String], question: &str) -> String {
    let context = context_chunks.join("\n\n");
    format!("{ANSWER_SYSTEM_PROMPT}\n\n{context}\n\nQuestion: {question}\nAnswer:")
}

/// Truncate text to a character budget without splitting a character.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}
