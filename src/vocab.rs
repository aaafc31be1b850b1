use std::collections::BTreeSet;

use indexmap::IndexSet;

use super::error::{ConfigError, TokenError};
use super::token::Token;

/// Bijection between the distinct tokens of a corpus and `0..len()`.
///
/// Tokens are numbered in lexicographic order, so the same corpus always
/// produces the same indices.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    tokens: IndexSet<Token>,
}

impl Vocabulary {
    pub fn new<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> Self {
        let distinct: BTreeSet<&Token> = tokens.into_iter().collect();
        Self {
            tokens: distinct.into_iter().cloned().collect(),
        }
    }

    /// Like [`Vocabulary::new`], but a vocabulary that cannot drive generation
    /// (fewer than two tokens) is an error.
    pub fn build<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> Result<Self, ConfigError> {
        let vocab = Self::new(tokens);
        if vocab.len() < 2 {
            return Err(ConfigError::DegenerateVocabulary(vocab.len()));
        }
        Ok(vocab)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn index_of(&self, token: &Token) -> Option<usize> {
        self.tokens.get_index_of(token)
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get_index(index)
    }

    pub fn encode(&self, token: &Token) -> Result<usize, TokenError> {
        self.index_of(token)
            .ok_or_else(|| TokenError::UnknownToken(token.to_string()))
    }

    pub fn decode(&self, index: usize) -> Result<&Token, TokenError> {
        self.token(index).ok_or(TokenError::UnknownIndex(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }
}
