//! Prompt templates for RAG generation

use crate::types::Chunk;

/// Answer returned when nothing relevant was retrieved
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I don't have enough information in the provided documents to answer that question.";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from retrieved chunks, most similar first
    pub fn build_context(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "[{}] {}, Page {}\n{}",
                    i + 1,
                    chunk.metadata.source,
                    chunk.metadata.page,
                    chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full RAG prompt with strict grounding
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Answer the following question based only on the provided context.
If the context does not contain enough information to answer the question,
say that you don't have enough information. Do not use outside knowledge.

<context>
{context}
</context>

Question: {question}"#,
            context = context,
            question = question.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use uuid::Uuid;

    fn chunk(content: &str, page: u32) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: "manual.pdf".to_string(),
                page,
                chunk_index: 0,
                doc_hash: "abc".to_string(),
                total_chunks: 1,
            },
        }
    }

    #[test]
    fn test_context_keeps_retrieval_order() {
        let context =
            PromptBuilder::build_context(&[chunk("Most relevant", 4), chunk("Less relevant", 1)]);

        let first = context.find("Most relevant").unwrap();
        let second = context.find("Less relevant").unwrap();
        assert!(first < second);
        assert!(context.starts_with("[1] manual.pdf, Page 4"));
    }

    #[test]
    fn test_prompt_embeds_question_and_context() {
        let prompt = PromptBuilder::build_rag_prompt("  What is RAG? ", "RAG means retrieval.");
        assert!(prompt.contains("<context>\nRAG means retrieval.\n</context>"));
        assert!(prompt.ends_with("Question: What is RAG?"));
        assert!(prompt.contains("don't have enough information"));
    }
}
