//! # Yomilog Core
//!
//! Embedded reactive reading-log engine with mock authentication.
//!
//! This crate provides:
//! - Six in-memory collections (accounts, books, reading records,
//!   profiles, children, goals) with CRUD operations
//! - Best-effort durability through a pluggable [`yomilog_store`] adapter
//! - A notification bus that broadcasts full collection snapshots to
//!   subscribers after every mutation
//! - Race-safe lazy initialization with first-run seed data
//! - A mock session layer (sign-up, sign-in, sign-out, observation)
//!
//! # Opening a Database
//!
//! ```rust,ignore
//! use yomilog_core::{Channel, Database, NewBook};
//!
//! let db = Database::open(Path::new("reading-log-data"))?;
//!
//! let account = db.sign_in("test@example.com", "password123").await?;
//! let mut books = db.subscribe(Channel::Books).await;
//!
//! db.add_book(NewBook {
//!     title: "The Very Hungry Caterpillar".into(),
//!     author: "Eric Carle".into(),
//!     ..Default::default()
//! })
//! .await?;
//!
//! // The subscription sees the registration-time snapshot first,
//! // then one snapshot per mutation.
//! let snapshot = books.recv().await;
//! ```
//!
//! For tests and ephemeral sessions use [`Database::in_memory`]; for
//! execution contexts without a durable medium use [`Database::detached`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod analytics;
mod bootstrap;
mod bus;
mod clock;
mod config;
mod database;
mod entity;
mod error;
mod seed;
mod session;

pub use bus::{Channel, NotificationBus, Snapshot, Subscription};
pub use clock::{Clock, FixedClock, SystemClock, Timestamp};
pub use config::Config;
pub use database::Database;
pub use entity::{
    Account, AccountPatch, Book, BookPatch, Child, ChildPatch, EntityId, GoalPatch, GoalPeriod,
    NewAccount, NewBook, NewChild, NewProfile, NewReadingGoal, NewReadingRecord, Profile,
    ProfilePatch, ReadingGoal, ReadingRecord, RecordPatch,
};
pub use error::{CoreError, CoreResult};
pub use seed::{DEFAULT_ACCOUNT_EMAIL, DEFAULT_ACCOUNT_SECRET};
