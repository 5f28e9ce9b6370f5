//! Entity shapes for the six collections.
//!
//! All entities are plain `serde` records. Persisted documents use
//! camelCase field names, matching the durable layout consumed by
//! existing installations.

mod id;

pub use id::EntityId;

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};

/// An account, created by sign-up.
///
/// The credential secret is stored in the clear. This layer is an
/// intentionally simplified identity simulator, not a real identity
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique identifier.
    pub id: EntityId,
    /// Email, unique across accounts.
    pub email: String,
    /// Credential secret.
    pub secret: String,
    /// Whether the email has been verified.
    pub email_verified: bool,
    /// Display name shown in the UI.
    pub display_name: Option<String>,
    /// When the account was created.
    pub created_at: Timestamp,
    /// When the account last signed in.
    pub last_login_at: Timestamp,
}

/// A family profile, one-to-one with an account.
///
/// The profile reuses its account's id as a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// The owning account's id.
    pub id: EntityId,
    /// Family display name.
    pub family_name: String,
    /// When the profile was created.
    pub created_at: Timestamp,
    /// When the profile was last modified.
    pub updated_at: Timestamp,
}

/// A book in a family's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier.
    pub id: EntityId,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Publisher, if known.
    pub publisher: Option<String>,
    /// Year of publication, if known.
    pub published_year: Option<u16>,
    /// ISBN, if known.
    pub isbn: Option<String>,
    /// Cover image URL, if any.
    pub cover_image: Option<String>,
    /// The owning account's id.
    pub owner_id: EntityId,
    /// When the book was added.
    pub created_at: Timestamp,
    /// When the book was last modified.
    pub updated_at: Timestamp,
}

/// One read-aloud session of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    /// Unique identifier.
    pub id: EntityId,
    /// The book that was read. Must reference an existing book at
    /// creation time; deleting the book deletes this record.
    pub book_id: EntityId,
    /// The owning account's id.
    pub owner_id: EntityId,
    /// When the book was read.
    pub read_date: Timestamp,
    /// How many times it was read in this session.
    pub read_count: u32,
    /// How much the child liked it, 1-5.
    pub favorite_rating: u8,
    /// Free-text description of the child's reaction.
    pub child_reaction: String,
    /// Free-text notes.
    pub notes: String,
    /// When the record was created.
    pub created_at: Timestamp,
    /// When the record was last modified.
    pub updated_at: Timestamp,
}

/// A child in the family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    /// Unique identifier.
    pub id: EntityId,
    /// Name.
    pub name: String,
    /// Birthdate, if recorded.
    pub birthdate: Option<Timestamp>,
    /// The owning account's id.
    pub owner_id: EntityId,
    /// When the child was added.
    pub created_at: Timestamp,
    /// When the child was last modified.
    pub updated_at: Timestamp,
}

/// How often a reading goal resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    /// One day.
    Daily,
    /// One week.
    Weekly,
    /// One month.
    Monthly,
    /// One year.
    Yearly,
}

/// A reading goal for a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingGoal {
    /// Unique identifier.
    pub id: EntityId,
    /// The owning account's id.
    pub owner_id: EntityId,
    /// How many distinct books to read in the period.
    pub target_books: u32,
    /// The goal's period.
    pub period: GoalPeriod,
    /// When the goal starts.
    pub start_date: Timestamp,
    /// When the goal ends, if bounded.
    pub end_date: Option<Timestamp>,
    /// Whether the goal has been completed.
    pub is_completed: bool,
    /// When the goal was created.
    pub created_at: Timestamp,
    /// When the goal was last modified.
    pub updated_at: Timestamp,
}

/// Fields a caller provides when creating an account directly.
///
/// `sign_up` is the usual entry point; it builds this internally.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    /// Email, unique across accounts.
    pub email: String,
    /// Credential secret.
    pub secret: String,
    /// Display name, if any.
    pub display_name: Option<String>,
}

/// Fields a caller provides when creating a profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    /// The account this profile belongs to; doubles as the profile id.
    pub account_id: EntityId,
    /// Family display name.
    pub family_name: String,
}

/// Fields a caller provides when adding a book.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Publisher, if known.
    pub publisher: Option<String>,
    /// Year of publication, if known.
    pub published_year: Option<u16>,
    /// ISBN, if known.
    pub isbn: Option<String>,
    /// Cover image URL, if any.
    pub cover_image: Option<String>,
}

/// Fields a caller provides when adding a reading record.
#[derive(Debug, Clone)]
pub struct NewReadingRecord {
    /// The book that was read.
    pub book_id: EntityId,
    /// When the book was read.
    pub read_date: Timestamp,
    /// How many times it was read.
    pub read_count: u32,
    /// How much the child liked it, 1-5.
    pub favorite_rating: u8,
    /// The child's reaction.
    pub child_reaction: String,
    /// Free-text notes.
    pub notes: String,
}

/// Fields a caller provides when adding a child.
#[derive(Debug, Clone, Default)]
pub struct NewChild {
    /// Name.
    pub name: String,
    /// Birthdate, if recorded.
    pub birthdate: Option<Timestamp>,
}

/// Fields a caller provides when adding a reading goal.
#[derive(Debug, Clone)]
pub struct NewReadingGoal {
    /// How many distinct books to read in the period.
    pub target_books: u32,
    /// The goal's period.
    pub period: GoalPeriod,
    /// When the goal starts.
    pub start_date: Timestamp,
    /// When the goal ends, if bounded.
    pub end_date: Option<Timestamp>,
}

/// Partial update for an account. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    /// New display name.
    pub display_name: Option<String>,
    /// New verification state.
    pub email_verified: Option<bool>,
    /// New credential secret.
    pub secret: Option<String>,
}

/// Partial update for a profile.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    /// New family display name.
    pub family_name: Option<String>,
}

/// Partial update for a book.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    /// New title.
    pub title: Option<String>,
    /// New author.
    pub author: Option<String>,
    /// New publisher.
    pub publisher: Option<String>,
    /// New publication year.
    pub published_year: Option<u16>,
    /// New ISBN.
    pub isbn: Option<String>,
    /// New cover image URL.
    pub cover_image: Option<String>,
}

/// Partial update for a reading record. The record's book is immutable.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    /// New read date.
    pub read_date: Option<Timestamp>,
    /// New read count.
    pub read_count: Option<u32>,
    /// New rating.
    pub favorite_rating: Option<u8>,
    /// New reaction text.
    pub child_reaction: Option<String>,
    /// New notes.
    pub notes: Option<String>,
}

/// Partial update for a child.
#[derive(Debug, Clone, Default)]
pub struct ChildPatch {
    /// New name.
    pub name: Option<String>,
    /// New birthdate.
    pub birthdate: Option<Timestamp>,
}

/// Partial update for a reading goal.
#[derive(Debug, Clone, Default)]
pub struct GoalPatch {
    /// New target book count.
    pub target_books: Option<u32>,
    /// New period.
    pub period: Option<GoalPeriod>,
    /// New start date.
    pub start_date: Option<Timestamp>,
    /// New end date.
    pub end_date: Option<Timestamp>,
    /// New completion state.
    pub is_completed: Option<bool>,
}

/// Internal access shared by the owner-scoped collections.
///
/// Accounts are not covered: they have no owner and track
/// `lastLoginAt` instead of `updatedAt`.
pub(crate) trait Entity: Clone {
    /// The entity's id.
    fn id(&self) -> EntityId;
    /// The owning account's id, if the collection is owner-scoped.
    fn owner_id(&self) -> Option<EntityId>;
    /// Refreshes the modification timestamp.
    fn touch(&mut self, at: Timestamp);
}

impl Entity for Profile {
    fn id(&self) -> EntityId {
        self.id
    }

    fn owner_id(&self) -> Option<EntityId> {
        // One-to-one with the account: the id is the owner.
        Some(self.id)
    }

    fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }
}

impl Entity for Book {
    fn id(&self) -> EntityId {
        self.id
    }

    fn owner_id(&self) -> Option<EntityId> {
        Some(self.owner_id)
    }

    fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }
}

impl Entity for ReadingRecord {
    fn id(&self) -> EntityId {
        self.id
    }

    fn owner_id(&self) -> Option<EntityId> {
        Some(self.owner_id)
    }

    fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }
}

impl Entity for Child {
    fn id(&self) -> EntityId {
        self.id
    }

    fn owner_id(&self) -> Option<EntityId> {
        Some(self.owner_id)
    }

    fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }
}

impl Entity for ReadingGoal {
    fn id(&self) -> EntityId {
        self.id
    }

    fn owner_id(&self) -> Option<EntityId> {
        Some(self.owner_id)
    }

    fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }
}
