//! Instructions for LLM-based document extraction.
//!
//! Centralising every prompt here keeps the extraction client free of
//! prompt text and lets unit tests inspect the instructions without a live
//! model behind them.

/// System preamble shared by every extraction call. The JSON-only clause
/// matters: the client requests `response_format: json_object` and parses
/// the reply with serde, so prose or fences around the JSON are a failure.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a precise information \
extraction engine. Respond with a single JSON object and nothing else: no \
prose, no markdown fences, no commentary.";

/// Instruction for document summarisation.
///
/// Expected reply shape: `{"title": "...", "summary": "..."}`.
pub const SUMMARY_INSTRUCTION: &str = "Summarize the content of the document. \
Reply with a JSON object with exactly two string fields: \"title\" and \
\"summary\".";

/// Instruction for relationship mining.
///
/// Expected reply shape:
/// `{"relationships": [{"subject": "...", "predicate": "...", "object": "..."}]}`.
pub const RELATIONSHIPS_INSTRUCTION: &str = "Extract relationships between \
concepts from the document. Subject and object should be core concepts only \
and should be nouns. Focus on concepts and ignore examples and code. Reply \
with a JSON object with one field \"relationships\": an array of objects, \
each with string fields \"subject\", \"predicate\" and \"object\".";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_name_their_fields() {
        assert!(SUMMARY_INSTRUCTION.contains("\"title\""));
        assert!(SUMMARY_INSTRUCTION.contains("\"summary\""));
        assert!(RELATIONSHIPS_INSTRUCTION.contains("\"subject\""));
        assert!(RELATIONSHIPS_INSTRUCTION.contains("\"predicate\""));
        assert!(RELATIONSHIPS_INSTRUCTION.contains("\"object\""));
    }
}
