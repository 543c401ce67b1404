use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::Path;

use smallvec::SmallVec;

use crate::{MAX_GLYPH_COUNT, MAX_SLOT_LENGTH};

/// An identifier for a given letter or whatever, based on its index in the WordList's `glyphs`
/// field.
pub type GlyphId = usize;

/// An identifier for a given word, based on its index in the WordList's `words` field.
pub type WordId = usize;

/// A struct representing a word that can be chosen for a given slot.
#[derive(Debug, Clone)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]>,
}

impl Word {
    /// The number of glyphs (not bytes) in the word.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WordListError {
    #[error("failed to read word list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The candidate dictionary. Words are normalized to upper case and deduplicated, keeping the
/// position of their first appearance, so a `WordId` uniquely identifies a string.
pub struct WordList {
    pub glyphs: SmallVec<[char; MAX_GLYPH_COUNT]>,
    pub words: Vec<Word>,
    glyph_ids_by_char: HashMap<char, GlyphId>,
    word_ids_by_string: HashMap<String, WordId>,
}

impl Debug for WordList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordList")
            .field("glyphs", &self.glyphs)
            .field("words", &(["(", &self.words.len().to_string(), " entries)"].join("")))
            .finish()
    }
}

impl WordList {
    /// Build a word list from raw strings. Blank entries are skipped.
    pub fn new<I, S>(entries: I) -> WordList
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut word_list = WordList {
            glyphs: SmallVec::new(),
            words: vec![],
            glyph_ids_by_char: HashMap::new(),
            word_ids_by_string: HashMap::new(),
        };

        for entry in entries {
            word_list.add_word(entry.as_ref());
        }

        word_list
    }

    /// Parse the contents of a word list file: one word per line, optionally followed by a
    /// `;score` or `,score` column, which is ignored.
    pub fn parse(contents: &str) -> WordList {
        WordList::new(contents.lines().map(|line| {
            line.split(|c: char| c == ';' || c == ',').next().unwrap_or("")
        }))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<WordList, WordListError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| WordListError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let word_list = WordList::parse(&contents);
        log::debug!(
            "Loaded {} words ({} distinct glyphs) from {}",
            word_list.len(),
            word_list.glyphs.len(),
            path.display(),
        );

        Ok(word_list)
    }

    /// Add a word if it isn't already present, returning its id either way. Returns `None` for
    /// blank entries and for words whose upper-case form has a different number of characters
    /// (like "straße" becoming "STRASSE"), since that would change which slots they fit.
    pub fn add_word(&mut self, raw: &str) -> Option<WordId> {
        let trimmed = raw.trim();
        let string = trimmed.to_uppercase();
        if string.is_empty() {
            return None;
        }

        if string.chars().count() != trimmed.chars().count() {
            log::warn!("Skipping {:?}: its length changes when upper-cased", trimmed);
            return None;
        }

        if let Some(&word_id) = self.word_ids_by_string.get(&string) {
            return Some(word_id);
        }

        let glyphs = string.chars().map(|c| self.glyph_id_for_char(c)).collect();
        let word_id = self.words.len();
        self.word_ids_by_string.insert(string.clone(), word_id);
        self.words.push(Word { string, glyphs });

        Some(word_id)
    }

    fn glyph_id_for_char(&mut self, c: char) -> GlyphId {
        if let Some(&glyph_id) = self.glyph_ids_by_char.get(&c) {
            return glyph_id;
        }

        let glyph_id = self.glyphs.len();
        self.glyphs.push(c);
        self.glyph_ids_by_char.insert(c, glyph_id);
        glyph_id
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    /// Look up a word by its string, using the same normalization as `add_word`.
    pub fn get_word_id(&self, string: &str) -> Option<WordId> {
        self.word_ids_by_string.get(&string.trim().to_uppercase()).cloned()
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::word_list::WordList;

    #[test]
    fn test_words_are_normalized_and_deduplicated() {
        let word_list = WordList::new(["cat", "DOG", " Cat ", "", "tip"]);

        assert_eq!(word_list.len(), 3);
        assert_eq!(word_list.word(0).string, "CAT");
        assert_eq!(word_list.word(1).string, "DOG");
        assert_eq!(word_list.word(2).string, "TIP");
        assert_eq!(word_list.get_word_id("cat"), Some(0));
        assert_eq!(word_list.get_word_id("bird"), None);
    }

    #[test]
    fn test_words_that_change_length_when_uppercased_are_skipped() {
        let word_list = WordList::new(["straße", "ÉTÉ", "cat"]);

        let strings: Vec<_> = word_list.words.iter().map(|word| word.string.as_str()).collect();
        assert_eq!(strings, vec!["ÉTÉ", "CAT"]);
        assert_eq!(word_list.get_word_id("STRASSE"), None);
        assert_eq!(word_list.word(0).len(), 3);
    }

    #[test]
    fn test_glyphs_are_shared_between_words() {
        let word_list = WordList::new(["CAT", "TIP"]);

        assert_eq!(word_list.glyph_count(), 5);
        assert_eq!(word_list.word(0).glyphs[2], word_list.word(1).glyphs[0]);
        assert_eq!(word_list.word(1).len(), 3);
    }

    #[test]
    fn test_parse_ignores_score_columns_and_blank_lines() {
        let word_list = WordList::parse("cat;50\n\ndog,40\ntree\n");

        let strings: Vec<_> = word_list.words.iter().map(|word| word.string.as_str()).collect();
        assert_eq!(strings, vec!["CAT", "DOG", "TREE"]);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = WordList::load_from_path("/nonexistent/fillgrid/words.txt");

        assert!(result.is_err());
    }
}
