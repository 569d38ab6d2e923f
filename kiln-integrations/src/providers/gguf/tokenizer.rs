//! Text encoding and incremental decoding.

use std::path::Path;
use tokenizers::Tokenizer;

use super::error::{GgufError, Result};

/// Converts between text and token ids.
pub(crate) trait Vocabulary: Send + Sync {
    /// Encode `text`, optionally adding the model's special tokens (BOS).
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>>;

    /// Decode `tokens`, skipping special tokens.
    fn decode(&self, tokens: &[u32]) -> Result<String>;

    /// Id of a token given by its text form, if the vocabulary has it.
    fn token_id(&self, token: &str) -> Option<u32>;
}

impl Vocabulary for Tokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>> {
        let encoding = (**self).encode(text, add_special_tokens).map_err(GgufError::tokenizer)?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        (**self).decode(tokens, true).map_err(GgufError::tokenizer)
    }

    fn token_id(&self, token: &str) -> Option<u32> {
        self.token_to_id(token)
    }
}

/// Load a `tokenizer.json` file.
pub(crate) fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| GgufError::tokenizer(format!("{}: {e}", path.display())))
}

/// End-of-sequence tokens used by common chat templates.
const EOS_TOKENS: &[&str] = &["</s>", "<|endoftext|>", "<|im_end|>", "<|end|>", "<|eot_id|>"];

/// Collect end-of-sequence ids from the GGUF header and the vocabulary.
pub(crate) fn eos_tokens(vocab: &dyn Vocabulary, from_metadata: Option<u32>) -> Vec<u32> {
    let mut ids: Vec<u32> = from_metadata
        .into_iter()
        .chain(EOS_TOKENS.iter().filter_map(|t| vocab.token_id(t)))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Turns a growing list of generated tokens into text fragments.
///
/// A token can end in the middle of a multi-byte character, and some
/// tokenizers only add a leading space once the next token is known, so
/// a fragment is released only when the decoded text grows into complete
/// characters.
pub(crate) struct TokenOutputStream<'a, V: Vocabulary + ?Sized> {
    vocab: &'a V,
    tokens: Vec<u32>,
    prev_index: usize,
    current_index: usize,
}

impl<'a, V: Vocabulary + ?Sized> TokenOutputStream<'a, V> {
    pub(crate) fn new(vocab: &'a V) -> Self {
        Self {
            vocab,
            tokens: Vec::new(),
            prev_index: 0,
            current_index: 0,
        }
    }

    /// Add a token and return newly completed text, if any.
    pub(crate) fn next_token(&mut self, token: u32) -> Result<Option<String>> {
        let prev_text = self
            .vocab
            .decode(&self.tokens[self.prev_index..self.current_index])?;
        self.tokens.push(token);
        let text = self.vocab.decode(&self.tokens[self.prev_index..])?;

        if text.len() > prev_text.len() && text.chars().last().is_some_and(|c| c != '\u{FFFD}') {
            let fresh = fresh_suffix(&text, &prev_text);
            self.prev_index = self.current_index;
            self.current_index = self.tokens.len();
            Ok(Some(fresh))
        } else {
            Ok(None)
        }
    }

    /// Text held back so far, released at the end of generation.
    pub(crate) fn decode_rest(&self) -> Result<Option<String>> {
        let prev_text = self
            .vocab
            .decode(&self.tokens[self.prev_index..self.current_index])?;
        let text = self.vocab.decode(&self.tokens[self.prev_index..])?;

        if text.len() > prev_text.len() {
            Ok(Some(fresh_suffix(&text, &prev_text)))
        } else {
            Ok(None)
        }
    }
}

fn fresh_suffix(text: &str, prev_text: &str) -> String {
    text.strip_prefix(prev_text)
        .or_else(|| text.get(prev_text.len()..))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Byte-level vocabulary for tests: every token is a fixed byte string.
    pub(crate) struct ByteVocab {
        pieces: HashMap<u32, Vec<u8>>,
        specials: HashMap<String, u32>,
    }

    impl ByteVocab {
        pub(crate) fn new(pieces: &[(u32, &[u8])]) -> Self {
            Self {
                pieces: pieces.iter().map(|(id, b)| (*id, b.to_vec())).collect(),
                specials: HashMap::new(),
            }
        }

        pub(crate) fn with_special(mut self, token: &str, id: u32) -> Self {
            self.specials.insert(token.to_string(), id);
            self
        }
    }

    impl Vocabulary for ByteVocab {
        fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>> {
            let mut ids: Vec<u32> = Vec::new();
            if add_special_tokens {
                ids.extend(self.specials.get("<s>"));
            }
            for byte in text.bytes() {
                let id = self
                    .pieces
                    .iter()
                    .find(|(_, piece)| piece.as_slice() == [byte])
                    .map(|(id, _)| *id)
                    .ok_or_else(|| GgufError::tokenizer(format!("no token for byte {byte}")))?;
                ids.push(id);
            }
            Ok(ids)
        }

        fn decode(&self, tokens: &[u32]) -> Result<String> {
            let bytes: Vec<u8> = tokens
                .iter()
                .filter_map(|t| self.pieces.get(t))
                .flatten()
                .copied()
                .collect();
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }

        fn token_id(&self, token: &str) -> Option<u32> {
            self.specials.get(token).copied()
        }
    }

    #[test]
    fn test_fragments_follow_tokens() {
        let vocab = ByteVocab::new(&[(1, b"Hel"), (2, b"lo"), (3, b" world")]);
        let mut stream = TokenOutputStream::new(&vocab);

        assert_eq!(stream.next_token(1).unwrap().as_deref(), Some("Hel"));
        assert_eq!(stream.next_token(2).unwrap().as_deref(), Some("lo"));
        assert_eq!(stream.next_token(3).unwrap().as_deref(), Some(" world"));
        assert_eq!(stream.decode_rest().unwrap(), None);
    }

    #[test]
    fn test_split_character_held_back() {
        // "é" is 0xC3 0xA9
        let vocab = ByteVocab::new(&[(1, b"caf"), (2, &[0xC3]), (3, &[0xA9])]);
        let mut stream = TokenOutputStream::new(&vocab);

        assert_eq!(stream.next_token(1).unwrap().as_deref(), Some("caf"));
        assert_eq!(stream.next_token(2).unwrap(), None);
        assert_eq!(stream.next_token(3).unwrap().as_deref(), Some("é"));
    }

    #[test]
    fn test_rest_flushes_incomplete_tail() {
        let vocab = ByteVocab::new(&[(1, b"ok"), (2, &[0xE2, 0x82])]);
        let mut stream = TokenOutputStream::new(&vocab);

        assert_eq!(stream.next_token(1).unwrap().as_deref(), Some("ok"));
        assert_eq!(stream.next_token(2).unwrap(), None);
        assert_eq!(stream.decode_rest().unwrap().as_deref(), Some("\u{FFFD}"));
    }

    #[test]
    fn test_eos_tokens_merge_sources() {
        let vocab = ByteVocab::new(&[]).with_special("</s>", 2).with_special("<|im_end|>", 9);
        assert_eq!(eos_tokens(&vocab, Some(2)), vec![2, 9]);
        assert_eq!(eos_tokens(&ByteVocab::new(&[]), None), Vec::<u32>::new());
    }
}
