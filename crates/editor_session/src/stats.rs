use serde::{Deserialize, Serialize};

/// Counts shown in the editor status area for the active document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStats {
    pub char_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
}

impl ContentStats {
    pub fn of(content: &str) -> Self {
        Self {
            char_count: content.chars().count(),
            word_count: content.split_whitespace().count(),
            sentence_count: content
                .split(['.', '!', '?'])
                .filter(|part| !part.trim().is_empty())
                .count(),
            paragraph_count: content
                .split('\n')
                .filter(|line| !line.trim().is_empty())
                .count(),
        }
    }
}
