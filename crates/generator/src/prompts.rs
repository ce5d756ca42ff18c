//! Prompt templates for the two generation paths.

/// Marker that opens the context block of a grounded prompt.
pub const CONTEXT_OPEN: &str = "Context:\n---\n";

/// Marker that closes the context block of a grounded prompt.
pub const CONTEXT_CLOSE: &str = "\n---\n\n";

/// Joins retrieved passages, in retrieval order, separated by blank lines.
#[must_use]
pub fn context_block<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt that restricts the model to the supplied context.
#[must_use]
pub fn grounded_prompt<S: AsRef<str>>(question: &str, chunks: &[S]) -> String {
    let context = context_block(chunks);
    format!(
        "You are an expert assistant. Synthesize a comprehensive answer to the question based \
         solely on the provided context. List all relevant items if the question asks for a list. \
         If the context does not contain the answer, state that the answer is not available in the provided documents.\n\n\
         {CONTEXT_OPEN}{context}{CONTEXT_CLOSE}\
         Question: {question}\n\
         Answer:"
    )
}

/// Prompt that asks for an answer from general knowledge.
#[must_use]
pub fn general_prompt(question: &str) -> String {
    format!(
        "Answer the following question based on your general knowledge.\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

/// Extracts the context block from a prompt built by [`grounded_prompt`].
#[must_use]
pub fn extract_context(prompt: &str) -> Option<&str> {
    let start = prompt.find(CONTEXT_OPEN)? + CONTEXT_OPEN.len();
    let len = prompt[start..].rfind(CONTEXT_CLOSE)?;
    Some(&prompt[start..start + len])
}
