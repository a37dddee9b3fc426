use crate::error::IngestError;
use tiktoken_rs::CoreBPE;

pub type TokenId = u32;

/// Converts text to token ids and back with one fixed encoding.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<TokenId>;

    /// Decodes a token window. Byte sequences cut in half at the window edge
    /// are replaced rather than reported as errors.
    fn decode(&self, tokens: &[TokenId]) -> String;
}

pub struct TiktokenTokenizer {
    encoding: String,
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    pub fn for_encoding(name: &str) -> Result<Self, IngestError> {
        let bpe = match name {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => {
                return Err(IngestError::Tokenizer(format!(
                    "unknown encoding scheme {other}"
                )))
            }
        }
        .map_err(|error| IngestError::Tokenizer(error.to_string()))?;

        Ok(Self {
            encoding: name.to_string(),
            bpe,
        })
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<TokenId> {
        self.bpe.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[TokenId]) -> String {
        let bytes: Vec<u8> = self
            .bpe
            ._decode_native_and_split(tokens.to_vec())
            .flatten()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{TiktokenTokenizer, Tokenizer};
    use crate::error::IngestError;

    #[test]
    fn round_trip_preserves_text() {
        let tokenizer = TiktokenTokenizer::for_encoding("cl100k_base").expect("known encoding");
        let text = "Minimum side setback requirements are five feet.";
        let tokens = tokenizer.encode(text);
        assert!(!tokens.is_empty());
        assert_eq!(tokenizer.decode(&tokens), text);
    }

    #[test]
    fn encoding_is_deterministic() {
        let tokenizer = TiktokenTokenizer::for_encoding("cl100k_base").expect("known encoding");
        assert_eq!(
            tokenizer.encode("Accessory dwelling units"),
            tokenizer.encode("Accessory dwelling units")
        );
    }

    #[test]
    fn truncated_multibyte_window_decodes_without_error() {
        let tokenizer = TiktokenTokenizer::for_encoding("cl100k_base").expect("known encoding");
        let tokens = tokenizer.encode("Zoning café 🏗️ district");
        for end in 0..=tokens.len() {
            let _ = tokenizer.decode(&tokens[..end]);
        }
    }

    #[test]
    fn multibyte_text_round_trips() {
        let tokenizer = TiktokenTokenizer::for_encoding("cl100k_base").expect("known encoding");
        let text = "Zoning café 🏗️ district";
        let tokens = tokenizer.encode(text);
        assert_eq!(tokenizer.decode(&tokens), text);
        assert_eq!(tokenizer.encoding(), "cl100k_base");
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let result = TiktokenTokenizer::for_encoding("latin1_base");
        assert!(matches!(
            result,
            Err(IngestError::Tokenizer(message)) if message.contains("latin1_base")
        ));
    }
}
