//! Catalog book domain model

use crate::types::{Duration, Validator};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a catalog book.
///
/// Seed books use short numeric ids; imported books get a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Creates a new random BookId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An audiobook as the catalog stores it.
///
/// `duration` and `progress` seed the player when the book is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogBook {
    pub id: BookId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    pub duration: Duration,
    #[serde(default = "zero_duration")]
    pub progress: Duration,
    #[serde(default)]
    pub genres: Vec<String>,
    pub added_at: NaiveDate,
}

fn zero_duration() -> Duration {
    Duration::ZERO
}

impl CatalogBook {
    /// Creates a new book with required fields and no progress
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        duration: Duration,
        added_at: NaiveDate,
    ) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            author: author.into(),
            description: String::new(),
            cover: String::new(),
            series: None,
            duration,
            progress: Duration::ZERO,
            genres: Vec::new(),
            added_at,
        }
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the series label
    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    /// Sets the stored listening progress
    pub fn with_progress(mut self, progress: Duration) -> Self {
        self.progress = progress;
        self
    }

    /// Listening progress as a fraction of the duration
    pub fn progress_fraction(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (self.progress.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Started but not finished
    pub fn is_in_progress(&self) -> bool {
        !self.progress.is_zero() && self.progress < self.duration
    }

    /// Text read aloud by the AI narrator preview
    pub fn narration_text(&self, max_description_chars: usize) -> String {
        let excerpt: String = self
            .description
            .chars()
            .take(max_description_chars)
            .collect();
        format!(
            "Here is a preview of {} by {}. {}",
            self.title, self.author, excerpt
        )
    }
}

impl Validator for CatalogBook {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title must not be empty".to_string());
        }

        if self.author.trim().is_empty() {
            errors.push("Author must not be empty".to_string());
        }

        if self.duration.is_zero() {
            errors.push("Duration must be greater than zero".to_string());
        }

        if self.progress > self.duration {
            errors.push("Progress cannot exceed duration".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
