//! In-memory catalog store and its read views

use crate::error::{AppError, Result};
use crate::types::{BookId, CatalogBook, Duration, Validator};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

/// The session's book catalog.
///
/// Books are kept in insertion order; views sort or filter on demand.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<CatalogBook>,
}

impl Catalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in starter library
    pub fn with_seed_books() -> Self {
        Self {
            books: seed_books(),
        }
    }

    /// Loads a catalog from a JSON array of books
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => AppError::from(e),
        })?;

        let books: Vec<CatalogBook> =
            serde_json::from_str(&contents).map_err(|e| AppError::CatalogParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut catalog = Self::new();
        for book in books {
            catalog.import(book)?;
        }

        log::info!(
            "Loaded {} books from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Number of books
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// True when the catalog holds no books
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// All books in insertion order
    pub fn books(&self) -> &[CatalogBook] {
        &self.books
    }

    /// Looks a book up by id
    pub fn get(&self, id: &BookId) -> Option<&CatalogBook> {
        self.books.iter().find(|b| &b.id == id)
    }

    /// Looks a book up by id, failing with `BookNotFound`
    pub fn require(&self, id: &BookId) -> Result<&CatalogBook> {
        self.get(id).ok_or_else(|| AppError::BookNotFound {
            id: id.to_string(),
        })
    }

    /// Adds a validated book to the catalog
    pub fn import(&mut self, book: CatalogBook) -> Result<BookId> {
        if let Err(errors) = book.validate() {
            return Err(AppError::InvalidBook {
                title: book.title.clone(),
                reason: errors.join("; "),
            });
        }

        if self.get(&book.id).is_some() {
            return Err(AppError::DuplicateBook {
                id: book.id.to_string(),
            });
        }

        let id = book.id.clone();
        log::debug!("Imported '{}' as {}", book.title, id);
        self.books.push(book);
        Ok(id)
    }

    /// Stores a listening position on a book, clamped to its duration
    pub fn record_progress(&mut self, id: &BookId, progress: Duration) -> Result<()> {
        let book = self
            .books
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| AppError::BookNotFound { id: id.to_string() })?;
        book.progress = progress.min(book.duration);
        Ok(())
    }

    /// Books ordered by date added, newest first
    pub fn newest_first(&self) -> Vec<&CatalogBook> {
        let mut books: Vec<&CatalogBook> = self.books.iter().collect();
        books.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        books
    }

    /// Books that are started but not finished, newest first
    pub fn in_progress(&self) -> Vec<&CatalogBook> {
        self.newest_first()
            .into_iter()
            .filter(|b| b.is_in_progress())
            .collect()
    }

    /// Books grouped by series name; books without a series are omitted
    pub fn series_groups(&self) -> BTreeMap<&str, Vec<&CatalogBook>> {
        let mut groups: BTreeMap<&str, Vec<&CatalogBook>> = BTreeMap::new();
        for book in &self.books {
            if let Some(series) = book.series.as_deref() {
                groups.entry(series).or_default().push(book);
            }
        }
        groups
    }
}

fn seed_book(
    id: &str,
    title: &str,
    author: &str,
    description: &str,
    series: Option<&str>,
    duration_secs: u64,
    progress_secs: u64,
    genres: &[&str],
    added_at: (i32, u32, u32),
) -> Option<CatalogBook> {
    let (y, m, d) = added_at;
    Some(CatalogBook {
        id: BookId::from_string(id),
        title: title.to_string(),
        author: author.to_string(),
        description: description.to_string(),
        cover: format!(
            "https://picsum.photos/seed/{}/400/600",
            title.to_lowercase().replace(' ', "")
        ),
        series: series.map(str::to_string),
        duration: Duration::from_seconds(duration_secs),
        progress: Duration::from_seconds(progress_secs),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        added_at: NaiveDate::from_ymd_opt(y, m, d)?,
    })
}

fn seed_books() -> Vec<CatalogBook> {
    [
        seed_book(
            "1",
            "The Martian",
            "Andy Weir",
            "Six days ago, astronaut Mark Watney became one of the first people to walk on Mars. Now, he's sure he'll be the first person to die there.",
            None,
            36000,
            1200,
            &["Sci-Fi", "Adventure"],
            (2023, 10, 1),
        ),
        seed_book(
            "2",
            "Project Hail Mary",
            "Andy Weir",
            "Ryland Grace is the sole survivor on a desperate, last-chance mission, and if he fails, humanity and the earth itself will perish.",
            None,
            42000,
            0,
            &["Sci-Fi", "Thriller"],
            (2023, 11, 15),
        ),
        seed_book(
            "3",
            "Dune",
            "Frank Herbert",
            "Set on the desert planet Arrakis, Dune is the story of the boy Paul Atreides, heir to a noble family tasked with ruling an inhospitable world where the only thing of value is the \"spice\" melange.",
            Some("Dune Saga #1"),
            54000,
            5400,
            &["Sci-Fi", "Epic"],
            (2023, 9, 1),
        ),
        seed_book(
            "4",
            "Atomic Habits",
            "James Clear",
            "No matter your goals, Atomic Habits offers a proven framework for improving every day.",
            None,
            20000,
            18000,
            &["Self-Help", "Psychology"],
            (2024, 1, 10),
        ),
        seed_book(
            "5",
            "The Hobbit",
            "J.R.R. Tolkien",
            "A curious Hobbit, Bilbo Baggins, journeys to the Lonely Mountain with a vigorous group of Dwarves to reclaim a treasure stolen from them by the dragon Smaug.",
            Some("Middle Earth"),
            32000,
            100,
            &["Fantasy", "Classic"],
            (2023, 8, 20),
        ),
        seed_book(
            "6",
            "1984",
            "George Orwell",
            "Among the seminal texts of the 20th century, Nineteen Eighty-Four is a rare work that grows more haunting as its futuristic purgatory becomes more real.",
            None,
            28000,
            0,
            &["Classic", "Dystopian"],
            (2023, 7, 4),
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}
