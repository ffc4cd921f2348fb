//! Manuscript data model – the book configuration, the chapter outline, and
//! the drafted chapter bodies. These are the structures a manifest file
//! deserialises into and the generation client fills in.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level description of the book to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookConfig {
    pub title: String,
    /// One-line subject the chapters revolve around.
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub genre: Genre,
    /// Intended readership, used to steer generated prose.
    #[serde(default)]
    pub audience: String,
    #[serde(default = "BookConfig::default_language")]
    pub language: String,
    /// Free-form voice instruction; the genre hint fills in when empty.
    #[serde(default)]
    pub tone: String,
    #[serde(default = "BookConfig::default_chapter_count")]
    pub chapter_count: usize,
    #[serde(default = "BookConfig::default_words_per_chapter")]
    pub words_per_chapter: usize,
    #[serde(default)]
    pub dedication: Option<String>,
}

impl BookConfig {
    fn default_language() -> String {
        "English".to_string()
    }

    fn default_chapter_count() -> usize {
        6
    }

    fn default_words_per_chapter() -> usize {
        800
    }

    /// Tone to write in: the configured one, or the genre hint.
    pub fn effective_tone(&self) -> &str {
        if self.tone.trim().is_empty() {
            self.genre.tone_hint()
        } else {
            &self.tone
        }
    }

    /// Check the config bounds before any work is done with it.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidConfig("title must not be empty".into()));
        }
        if self.chapter_count == 0 || self.chapter_count > 100 {
            return Err(Error::InvalidConfig(format!(
                "chapterCount must be between 1 and 100, got {}",
                self.chapter_count
            )));
        }
        if self.words_per_chapter < 50 || self.words_per_chapter > 20_000 {
            return Err(Error::InvalidConfig(format!(
                "wordsPerChapter must be between 50 and 20000, got {}",
                self.words_per_chapter
            )));
        }
        Ok(())
    }
}

/// Book genre. Unknown manifest values map to [`Genre::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Fantasy,
    ScienceFiction,
    Mystery,
    Romance,
    Adventure,
    Fable,
    #[default]
    Nonfiction,
    #[serde(other)]
    Other,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fantasy => "fantasy",
            Genre::ScienceFiction => "science fiction",
            Genre::Mystery => "mystery",
            Genre::Romance => "romance",
            Genre::Adventure => "adventure",
            Genre::Fable => "fable",
            Genre::Nonfiction => "nonfiction",
            Genre::Other => "general",
        }
    }

    /// Tone hint fed to the generation prompts.
    pub fn tone_hint(&self) -> &'static str {
        match self {
            Genre::Fantasy => "evocative and wondrous, with vivid imagery",
            Genre::ScienceFiction => "precise and speculative, grounded in ideas",
            Genre::Mystery => "measured and suspenseful, withholding just enough",
            Genre::Romance => "warm and emotionally attentive",
            Genre::Adventure => "brisk and vivid, always in motion",
            Genre::Fable => "simple and timeless, with a quiet moral",
            Genre::Nonfiction => "clear, factual and well structured",
            Genre::Other => "clear and engaging",
        }
    }
}

/// Planned chapter list produced before any prose exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    /// Working title the outline was planned under; usually the config title.
    #[serde(default)]
    pub title: String,
    pub chapters: Vec<ChapterStub>,
}

/// One planned chapter: where it sits and what it should cover.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterStub {
    /// 1-based position in the book.
    pub index: usize,
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

/// A drafted chapter: the stub plus its prose in chapter markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContent {
    /// 1-based position in the book.
    pub index: usize,
    pub title: String,
    /// Markup text: headings, paragraphs, lists, quotes, inline styles.
    pub body: String,
}

/// A complete manuscript ready for composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manuscript {
    pub config: BookConfig,
    pub outline: Outline,
    pub chapters: Vec<ChapterContent>,
}

impl Manuscript {
    /// Validate config bounds and chapter indexing.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        let mut seen = std::collections::HashSet::new();
        for chapter in &self.chapters {
            if chapter.index == 0 {
                return Err(Error::InvalidManuscript(format!(
                    "chapter `{}` has index 0; indices are 1-based",
                    chapter.title
                )));
            }
            if !seen.insert(chapter.index) {
                return Err(Error::InvalidManuscript(format!(
                    "duplicate chapter index {}",
                    chapter.index
                )));
            }
        }
        Ok(())
    }

    /// Chapters sorted by index, the order they appear in the book.
    pub fn ordered_chapters(&self) -> Vec<&ChapterContent> {
        let mut chapters: Vec<&ChapterContent> = self.chapters.iter().collect();
        chapters.sort_by_key(|c| c.index);
        chapters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> BookConfig {
        BookConfig {
            title: "The Salt Road".to_string(),
            topic: "a trade route through a drowned valley".to_string(),
            genre: Genre::Fantasy,
            audience: "adult readers".to_string(),
            language: "English".to_string(),
            tone: String::new(),
            chapter_count: 3,
            words_per_chapter: 400,
            dedication: None,
        }
    }

    #[test]
    fn config_validates() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn empty_title_rejected() {
        let mut config = sample_config();
        config.title = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_chapters_rejected() {
        let mut config = sample_config();
        config.chapter_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_genre_maps_to_other() {
        let genre: Genre = serde_json::from_str("\"cyber-western\"").unwrap();
        assert_eq!(genre, Genre::Other);
    }

    #[test]
    fn genre_uses_kebab_case() {
        let genre: Genre = serde_json::from_str("\"science-fiction\"").unwrap();
        assert_eq!(genre, Genre::ScienceFiction);
    }

    #[test]
    fn tone_falls_back_to_genre_hint() {
        let mut config = sample_config();
        assert_eq!(config.effective_tone(), Genre::Fantasy.tone_hint());
        config.tone = "dry and wry".to_string();
        assert_eq!(config.effective_tone(), "dry and wry");
    }

    #[test]
    fn duplicate_chapter_index_rejected() {
        let manuscript = Manuscript {
            config: sample_config(),
            outline: Outline::default(),
            chapters: vec![
                ChapterContent {
                    index: 1,
                    title: "One".to_string(),
                    body: "Text.".to_string(),
                },
                ChapterContent {
                    index: 1,
                    title: "Also one".to_string(),
                    body: "Text.".to_string(),
                },
            ],
        };
        assert!(manuscript.validate().is_err());
    }

    #[test]
    fn chapters_ordered_by_index() {
        let manuscript = Manuscript {
            config: sample_config(),
            outline: Outline::default(),
            chapters: vec![
                ChapterContent {
                    index: 2,
                    title: "Second".to_string(),
                    body: String::new(),
                },
                ChapterContent {
                    index: 1,
                    title: "First".to_string(),
                    body: String::new(),
                },
            ],
        };
        let ordered = manuscript.ordered_chapters();
        assert_eq!(ordered[0].title, "First");
        assert_eq!(ordered[1].title, "Second");
    }
}
