//! Audiobook and chapter domain models

use crate::types::Validator;
use serde::{Deserialize, Serialize};

/// Server-assigned identifier for an audiobook
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudiobookId(String);

impl AudiobookId {
    /// Wraps a server identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AudiobookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AudiobookId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A complete audiobook as delivered by `GET /audiobooks/{id}`
///
/// Immutable once handed to the player. Chapters are addressed by their
/// position in `chapters`; that index is the only chapter identity the
/// player uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audiobook {
    pub id: AudiobookId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub narrator: Option<String>,
    #[serde(default)]
    pub cover_url: String,
    pub chapters: Vec<Chapter>,
}

impl Audiobook {
    /// Creates an audiobook with the required fields
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        chapters: Vec<Chapter>,
    ) -> Self {
        Self {
            id: AudiobookId::new(id),
            title: title.into(),
            author: author.into(),
            narrator: None,
            cover_url: String::new(),
            chapters,
        }
    }

    /// Sets the narrator
    pub fn with_narrator(mut self, narrator: impl Into<String>) -> Self {
        self.narrator = Some(narrator.into());
        self
    }

    /// Sets the cover image URL
    pub fn with_cover_url(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = cover_url.into();
        self
    }

    /// Number of chapters
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Chapter at `index`, if in range
    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    /// True when `index` addresses the final chapter
    pub fn is_last_chapter(&self, index: usize) -> bool {
        index + 1 == self.chapters.len()
    }

    /// Sum of all chapter durations in seconds
    pub fn total_duration(&self) -> f64 {
        self.chapters.iter().map(|c| c.duration).sum()
    }
}

impl Validator for Audiobook {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title cannot be empty".to_string());
        }

        if self.chapters.is_empty() {
            errors.push("Audiobook must have at least one chapter".to_string());
        }

        for (index, chapter) in self.chapters.iter().enumerate() {
            if let Err(chapter_errors) = chapter.validate() {
                errors.extend(
                    chapter_errors
                        .into_iter()
                        .map(|e| format!("Chapter {}: {}", index, e)),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// One playable chapter of an audiobook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    /// 1-based display label
    pub number: u32,
    pub title: String,
    /// Opaque media locator handed to the transport
    pub audio_url: String,
    /// Length in seconds as advertised by the server
    pub duration: f64,
}

impl Chapter {
    /// Creates a new chapter
    pub fn new(
        id: impl Into<String>,
        number: u32,
        title: impl Into<String>,
        audio_url: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            title: title.into(),
            audio_url: audio_url.into(),
            duration,
        }
    }
}

impl Validator for Chapter {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.audio_url.trim().is_empty() {
            errors.push("Audio URL cannot be empty".to_string());
        }

        if !self.duration.is_finite() || self.duration < 0.0 {
            errors.push(format!("Invalid duration: {}", self.duration));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> Audiobook {
        Audiobook::new(
            "book-1",
            "The Long Walk",
            "A. Author",
            vec![
                Chapter::new("c1", 1, "Opening", "https://cdn.example/c1.mp3", 100.0),
                Chapter::new("c2", 2, "Middle", "https://cdn.example/c2.mp3", 200.0),
                Chapter::new("c3", 3, "Ending", "https://cdn.example/c3.mp3", 50.0),
            ],
        )
    }

    #[test]
    fn test_chapter_lookup() {
        let book = sample_book();
        assert_eq!(book.chapter_count(), 3);
        assert_eq!(book.chapter(1).map(|c| c.number), Some(2));
        assert!(book.chapter(3).is_none());
        assert!(book.is_last_chapter(2));
        assert!(!book.is_last_chapter(1));
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(sample_book().total_duration(), 350.0);
    }

    #[test]
    fn test_valid_book() {
        assert!(sample_book().is_valid());
    }

    #[test]
    fn test_book_without_chapters_is_invalid() {
        let mut book = sample_book();
        book.chapters.clear();
        let errors = book.validate().unwrap_err();
        assert!(errors[0].contains("at least one chapter"));
    }

    #[test]
    fn test_chapter_errors_carry_index() {
        let mut book = sample_book();
        book.chapters[1].audio_url = "  ".to_string();
        book.chapters[2].duration = f64::NAN;

        let errors = book.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Chapter 1"));
        assert!(errors[1].starts_with("Chapter 2"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "id": "42",
            "title": "Dune",
            "author": "Frank Herbert",
            "coverUrl": "https://cdn.example/dune.jpg",
            "chapters": [
                {"id": "a", "number": 1, "title": "One", "audioUrl": "https://cdn.example/1.mp3", "duration": 812.5}
            ]
        }"#;

        let book: Audiobook = serde_json::from_str(json).unwrap();
        assert_eq!(book.id.as_str(), "42");
        assert_eq!(book.narrator, None);
        assert_eq!(book.cover_url, "https://cdn.example/dune.jpg");
        assert_eq!(book.chapters[0].audio_url, "https://cdn.example/1.mp3");
        assert_eq!(book.chapters[0].duration, 812.5);
    }

    #[test]
    fn test_builder_helpers() {
        let book = sample_book()
            .with_narrator("N. Reader")
            .with_cover_url("https://cdn.example/cover.png");
        assert_eq!(book.narrator.as_deref(), Some("N. Reader"));
        assert_eq!(book.cover_url, "https://cdn.example/cover.png");
    }
}
