//! Prompt composition for the document assistant.

use crate::domain::AssistantContext;

const TRAILER: &str = "Please respond in markdown format. Generate content that maintains consistency with the provided context and existing content.";

/// Context block: one line per short field, a headed block per long field.
/// Absent fields contribute nothing.
pub fn context_block(context: &AssistantContext) -> String {
    let mut out = String::new();
    if let Some(document_type) = context.document_type() {
        out.push_str(&format!("Document Type: {}\n", document_type));
    }
    if let Some(tone) = context.tone() {
        out.push_str(&format!("Tone: {}\n", tone));
    }
    if let Some(audience) = context.audience() {
        out.push_str(&format!("Target Audience: {}\n\n", audience));
    }
    if let Some(toc) = context.table_of_contents() {
        out.push_str(&format!("## Table of Contents\n{}\n\n", toc));
    }
    if let Some(key_points) = context.key_points() {
        out.push_str(&format!("## Key Points\n{}\n\n", key_points));
    }
    out
}

/// Full prompt sent to the generator. Deterministic in its inputs.
pub fn compose(context: &AssistantContext, document: &str, request: &str) -> String {
    format!(
        "{}\n\nCurrent document content:\n{}\n\nUser request: {}\n\n{}",
        context_block(context),
        document,
        request,
        TRAILER
    )
}
