use crate::error::IngestError;
use crate::models::{IngestionOptions, TextChunk};
use crate::tokenizer::{TokenId, Tokenizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        IngestionOptions::default().into()
    }
}

impl From<IngestionOptions> for ChunkingConfig {
    fn from(value: IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.chunk_overlap,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Half-open token windows `[start, end)` covering `len` tokens.
///
/// The next window starts `overlap` tokens before the previous end, unless that
/// would not move past the previous start, in which case it starts at the end.
/// The window that reaches `len` is the last one.
pub fn token_windows(len: usize, config: ChunkingConfig) -> Vec<(usize, usize)> {
    let mut windows = Vec::new();
    if config.chunk_size == 0 {
        return windows;
    }

    let mut start = 0usize;
    while start < len {
        let end = start.saturating_add(config.chunk_size).min(len);
        windows.push((start, end));
        if end == len {
            break;
        }

        let rewound = end.saturating_sub(config.overlap);
        start = if rewound > start { rewound } else { end };
    }

    windows
}

pub fn chunk_text(
    tokenizer: &dyn Tokenizer,
    text: &str,
    config: ChunkingConfig,
    page_number: u32,
) -> Result<Vec<TextChunk>, IngestError> {
    config.validate()?;
    let tokens = tokenizer.encode(text);
    Ok(chunk_tokens(tokenizer, &tokens, config, page_number))
}

fn chunk_tokens(
    tokenizer: &dyn Tokenizer,
    tokens: &[TokenId],
    config: ChunkingConfig,
    page_number: u32,
) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut chunk_id = 0u32;

    for (start, end) in token_windows(tokens.len(), config) {
        let decoded = tokenizer.decode(&tokens[start..end]);
        let text = decoded.trim();
        if text.is_empty() {
            continue;
        }

        chunks.push(TextChunk {
            text: text.to_string(),
            chunk_id,
            page_number,
        });
        chunk_id = chunk_id.saturating_add(1);
    }

    chunks
}

/// Chunks every page, numbering pages from 1 by their position in `pages`.
pub fn chunk_pages<S: AsRef<str>>(
    tokenizer: &dyn Tokenizer,
    pages: &[S],
    config: ChunkingConfig,
) -> Result<Vec<TextChunk>, IngestError> {
    config.validate()?;

    let mut chunks = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        let page_number = u32::try_from(index + 1).map_err(|_| {
            IngestError::InvalidArgument(format!("page index {index} out of range"))
        })?;
        chunks.extend(chunk_text(tokenizer, page.as_ref(), config, page_number)?);
    }

    Ok(chunks)
}
