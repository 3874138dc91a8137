//! Completion prompt for context-grounded answers.

/// Placed between retrieved chunks in the rendered context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Phrase the model is told to use when the context does not help.
pub const UNSURE_PHRASE: &str = "i am not sure about that";

pub fn render_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn build_prompt<S: AsRef<str>>(query: &str, context_chunks: &[S]) -> String {
    let context = render_context(context_chunks);
    format!(
        "You are a helpful assistant that can answer questions about the context provided.\n\
         Question: {query}\n\
         Context: {context}\n\
         Don't say like \"Here is the summary\" or similar phrases. you can break down the answer into multiple points.\n\
         tell as much detailed as possible, if the context is not related to the question or empty, say \" {UNSURE_PHRASE}\"\n\
         and continue with your right answer.\n\
         important: write in markdown format always(use # for headings, * for bold, _ for italics, and ** for bold italics)"
    )
}
