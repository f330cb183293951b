use imchat_session::TokenCounter;
use serde::{Deserialize, Serialize};

/// BPE vocabulary a model was trained with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenizerFamily {
    /// gpt-35-turbo, gpt-4 and later.
    #[default]
    #[serde(rename = "cl100k_base")]
    Cl100kBase,
    /// text-davinci-002/003, code models.
    #[serde(rename = "p50k_base")]
    P50kBase,
    /// GPT-3 base models.
    #[serde(rename = "r50k_base")]
    R50kBase,
}

impl TokenizerFamily {
    /// Average ASCII characters per token for English text.
    fn ascii_chars_per_token(self) -> usize {
        match self {
            TokenizerFamily::Cl100kBase => 4,
            TokenizerFamily::P50kBase | TokenizerFamily::R50kBase => 3,
        }
    }
}

/// Token estimate without the vocabulary tables.
///
/// ASCII characters are divided by the family's ratio (rounded up); every
/// other character counts as a token of its own, which is close for CJK text
/// and over-counts slightly for accented Latin.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicTokenizer {
    family: TokenizerFamily,
}

impl HeuristicTokenizer {
    pub fn new(family: TokenizerFamily) -> Self {
        Self { family }
    }

    pub fn family(&self) -> TokenizerFamily {
        self.family
    }
}

impl TokenCounter for HeuristicTokenizer {
    fn count(&self, text: &str) -> usize {
        let (ascii, other) = text.chars().fold((0usize, 0usize), |(a, o), c| {
            if c.is_ascii() {
                (a + 1, o)
            } else {
                (a, o + 1)
            }
        });
        ascii.div_ceil(self.family.ascii_chars_per_token()) + other
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero() {
        let tokenizer = HeuristicTokenizer::new(TokenizerFamily::Cl100kBase);
        assert_eq!(tokenizer.count(""), 0);
    }

    #[test]
    fn test_ascii_rounds_up() {
        let cl100k = HeuristicTokenizer::new(TokenizerFamily::Cl100kBase);
        assert_eq!(cl100k.count("abcd"), 1);
        assert_eq!(cl100k.count("abcde"), 2);

        let p50k = HeuristicTokenizer::new(TokenizerFamily::P50kBase);
        assert_eq!(p50k.count("abcde"), 2);
        assert_eq!(p50k.count("abcdefg"), 3);
    }

    #[test]
    fn test_non_ascii_counts_per_char() {
        let tokenizer = HeuristicTokenizer::new(TokenizerFamily::Cl100kBase);
        assert_eq!(tokenizer.count("你好"), 2);
        assert_eq!(tokenizer.count("hi 你好"), 3);
    }

    #[test]
    fn test_family_names() {
        assert_eq!(
            serde_json::to_string(&TokenizerFamily::Cl100kBase).unwrap(),
            "\"cl100k_base\""
        );
        let family: TokenizerFamily = serde_json::from_str("\"r50k_base\"").unwrap();
        assert_eq!(family, TokenizerFamily::R50kBase);
    }
}
