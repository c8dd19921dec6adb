//! Chunker: converts recorded answers into retrievable memory chunks.
//!
//! Each chunk's id is stable across rebuilds for the same source record:
//! the source answer id when present, otherwise a SHA-256 hash of the chunk
//! text. Stable ids are what make re-chunking and index rebuilds idempotent.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use eidolon_types::error::ValidationError;
use eidolon_types::memory::{ChunkKind, MemoryChunk};
use eidolon_types::persona::AnswerRecord;

/// Sentence-terminal punctuation, ASCII and CJK.
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？', '…'];

/// Converts question/answer records into retrievable memory chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chunk_size: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl Chunker {
    /// Create a chunker with the given maximum chunk size (in characters).
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    /// Build a memory chunk from one recorded answer.
    ///
    /// The chunk text combines question and answer; the id is the source
    /// answer id when present, else a content hash of the text.
    pub fn chunk_from_answer(&self, answer: &AnswerRecord) -> MemoryChunk {
        let text = format!(
            "Question: {}\nAnswer: {}",
            answer.question_text, answer.answer_text
        );

        let id = match answer.id {
            Some(id) => id.to_string(),
            None => content_hash(&text),
        };

        let mut metadata = HashMap::new();
        metadata.insert("question_id".to_string(), answer.question_id.clone().into());
        metadata.insert("question".to_string(), answer.question_text.clone().into());
        metadata.insert("answer".to_string(), answer.answer_text.clone().into());
        metadata.insert("layer".to_string(), answer.layer.into());
        metadata.insert(
            "contributor_relation".to_string(),
            answer.contributor_relation.to_string().into(),
        );
        metadata.insert(
            "created_at".to_string(),
            answer.created_at.to_rfc3339().into(),
        );
        metadata.insert(
            "updated_at".to_string(),
            answer.updated_at.to_rfc3339().into(),
        );
        metadata.insert("source".to_string(), "answer".into());

        MemoryChunk {
            id,
            text,
            metadata,
            kind: ChunkKind::QaPair,
        }
    }

    /// Build chunks from a list of recorded answers.
    pub fn chunks_from_answers(&self, answers: &[AnswerRecord]) -> Vec<MemoryChunk> {
        answers.iter().map(|a| self.chunk_from_answer(a)).collect()
    }

    /// Build a chunk directly from a question/answer text pair.
    ///
    /// Used when folding a session transcript into the memory corpus: each
    /// user/assistant exchange becomes one chunk. The id is always a content
    /// hash since there is no source record.
    pub fn chunk_from_qa_pair(
        &self,
        question: &str,
        answer: &str,
        extra_metadata: HashMap<String, serde_json::Value>,
    ) -> MemoryChunk {
        let text = format!("Question: {question}\nAnswer: {answer}");
        let id = content_hash(&text);

        let mut metadata = extra_metadata;
        metadata.insert("question".to_string(), question.into());
        metadata.insert("answer".to_string(), answer.into());
        metadata
            .entry("source".to_string())
            .or_insert_with(|| "qa_pair".into());

        MemoryChunk {
            id,
            text,
            metadata,
            kind: ChunkKind::QaPair,
        }
    }

    /// Split text into pieces no larger than the configured chunk size,
    /// cutting only on sentence boundaries.
    ///
    /// A single sentence longer than the limit is emitted as its own piece
    /// rather than being cut mid-sentence.
    pub fn split_large_text(&self, text: &str) -> Vec<String> {
        if text.chars().count() <= self.max_chunk_size {
            return vec![text.to_string()];
        }

        let sentences = split_sentences(text);
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.chars().count();
            if current_len + sentence_len <= self.max_chunk_size {
                current.push_str(&sentence);
                current_len += sentence_len;
                continue;
            }

            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }

            if sentence_len > self.max_chunk_size {
                // Over-long sentence: its own unit, never cut.
                pieces.push(sentence);
            } else {
                current.push_str(&sentence);
                current_len = sentence_len;
            }
        }

        if !current.is_empty() {
            pieces.push(current);
        }

        pieces
    }

    /// Ingestion gate: check that a chunk is structurally sound.
    ///
    /// Requires a non-empty id and non-empty text; the metadata map and the
    /// `qa_pair` kind are enforced by the type system but re-checked here so
    /// the gate stays meaningful if more kinds are added.
    pub fn validate(chunk: &MemoryChunk) -> Result<(), ValidationError> {
        if chunk.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if chunk.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        match chunk.kind {
            ChunkKind::QaPair => Ok(()),
        }
    }
}

/// SHA-256 hex digest of the chunk text, used as a stable fallback id.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split text into sentences, keeping terminal punctuation attached.
///
/// Consecutive terminators (e.g. "?!") stay with the same sentence. Text
/// after the last terminator is returned as a final, unterminated sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut in_terminator = false;

    for ch in text.chars() {
        let is_terminator = SENTENCE_TERMINATORS.contains(&ch);
        if in_terminator && !is_terminator {
            sentences.push(std::mem::take(&mut current));
        }
        current.push(ch);
        in_terminator = is_terminator;
    }

    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}
