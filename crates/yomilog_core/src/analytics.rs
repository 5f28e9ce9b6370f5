//! Reading analytics over collection snapshots.
//!
//! Pure functions: they take slices the caller obtained from the engine
//! (or from a broadcast snapshot) and compute aggregates. No store
//! access, no I/O.

use crate::clock::Timestamp;
use crate::entity::{Book, EntityId, ReadingGoal, ReadingRecord};
use std::collections::{BTreeMap, HashSet};

/// Aggregate figures over a set of reading records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadingSummary {
    /// Number of reading records.
    pub record_count: usize,
    /// Sum of every record's read count.
    pub total_reads: u64,
    /// Number of distinct books read.
    pub distinct_books: usize,
}

impl ReadingSummary {
    /// Computes a summary, optionally restricted to records read at or
    /// after `since`.
    #[must_use]
    pub fn compute(records: &[ReadingRecord], since: Option<Timestamp>) -> Self {
        let mut total_reads = 0u64;
        let mut record_count = 0usize;
        let mut books = HashSet::new();

        for record in records {
            if let Some(since) = since {
                if record.read_date < since {
                    continue;
                }
            }
            record_count += 1;
            total_reads += u64::from(record.read_count);
            books.insert(record.book_id);
        }

        Self {
            record_count,
            total_reads,
            distinct_books: books.len(),
        }
    }
}

/// A book ranked by its average rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedBook {
    /// The book.
    pub book: Book,
    /// Mean of the book's `favoriteRating` values.
    pub average_rating: f64,
    /// How many records contributed to the average.
    pub record_count: usize,
}

/// Ranks books by average rating, descending, keeping at most `limit`.
///
/// Books with no reading records are excluded, as are records whose
/// book is not in `books`.
#[must_use]
pub fn top_rated_books(books: &[Book], records: &[ReadingRecord], limit: usize) -> Vec<RatedBook> {
    let mut totals: BTreeMap<EntityId, (u64, usize)> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(record.book_id).or_insert((0, 0));
        entry.0 += u64::from(record.favorite_rating);
        entry.1 += 1;
    }

    let mut rated: Vec<RatedBook> = books
        .iter()
        .filter_map(|book| {
            let (sum, count) = totals.get(&book.id)?;
            Some(RatedBook {
                book: book.clone(),
                average_rating: *sum as f64 / *count as f64,
                record_count: *count,
            })
        })
        .collect();

    rated.sort_by(|a, b| {
        b.average_rating
            .partial_cmp(&a.average_rating)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rated.truncate(limit);
    rated
}

/// Total reads per UTC day, in chronological order.
///
/// Each entry is `(day index, total reads)` where the day index counts
/// days since the Unix epoch. Days without records are absent.
#[must_use]
pub fn reading_frequency(records: &[ReadingRecord]) -> Vec<(u64, u64)> {
    let mut days: BTreeMap<u64, u64> = BTreeMap::new();
    for record in records {
        *days.entry(record.read_date.day_index()).or_insert(0) += u64::from(record.read_count);
    }
    days.into_iter().collect()
}

/// Progress toward a reading goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalProgress {
    /// Distinct books read within the goal's window.
    pub books_read: usize,
    /// The goal's target.
    pub target_books: u32,
}

impl GoalProgress {
    /// Progress as a percentage, capped at 100.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.target_books == 0 {
            return 100.0;
        }
        (self.books_read as f64 / f64::from(self.target_books) * 100.0).min(100.0)
    }

    /// Whether the target has been reached.
    #[must_use]
    pub fn is_met(&self) -> bool {
        self.books_read as u64 >= u64::from(self.target_books)
    }
}

/// Measures a goal against the records read inside its window.
///
/// The window is `[startDate, endDate]`, open-ended when the goal has
/// no end date. Only the goal owner's records count.
#[must_use]
pub fn goal_progress(goal: &ReadingGoal, records: &[ReadingRecord]) -> GoalProgress {
    let mut books = HashSet::new();
    for record in records {
        if record.owner_id != goal.owner_id {
            continue;
        }
        if record.read_date < goal.start_date {
            continue;
        }
        if let Some(end) = goal.end_date {
            if record.read_date > end {
                continue;
            }
        }
        books.insert(record.book_id);
    }

    GoalProgress {
        books_read: books.len(),
        target_books: goal.target_books,
    }
}
