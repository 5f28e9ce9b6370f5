//! First-run seed content.
//!
//! A fresh durable medium gets a small demonstration library and one
//! default account so the first launch shows a populated application
//! instead of an empty shell.

use crate::clock::Clock;
use crate::entity::{Account, Book, EntityId, Profile, ReadingRecord};

/// Email of the default account.
pub const DEFAULT_ACCOUNT_EMAIL: &str = "test@example.com";

/// Credential secret of the default account.
pub const DEFAULT_ACCOUNT_SECRET: &str = "password123";

const DAY_MILLIS: u64 = 86_400_000;

/// Builds the default account and its matching profile.
pub(crate) fn default_account(clock: &dyn Clock) -> (Account, Profile) {
    let now = clock.now();
    let id = EntityId::new();

    let account = Account {
        id,
        email: DEFAULT_ACCOUNT_EMAIL.to_string(),
        secret: DEFAULT_ACCOUNT_SECRET.to_string(),
        email_verified: true,
        display_name: Some("Test User".to_string()),
        created_at: now,
        last_login_at: now,
    };

    let profile = Profile {
        id,
        family_name: "Test Family".to_string(),
        created_at: now,
        updated_at: now,
    };

    (account, profile)
}

/// Builds the demonstration library for `owner`.
///
/// Three picture books and two reading records, the second dated one
/// day before the clock's current time.
pub(crate) fn demo_library(
    owner: EntityId,
    clock: &dyn Clock,
) -> (Vec<Book>, Vec<ReadingRecord>) {
    let now = clock.now();
    let yesterday = now.saturating_sub_millis(DAY_MILLIS);

    let caterpillar = Book {
        id: EntityId::new(),
        title: "The Very Hungry Caterpillar".to_string(),
        author: "Eric Carle".to_string(),
        publisher: Some("World Publishing Company".to_string()),
        published_year: Some(1969),
        isbn: None,
        cover_image: Some("https://example.com/covers/hungry-caterpillar.jpg".to_string()),
        owner_id: owner,
        created_at: now,
        updated_at: now,
    };

    let guri_gura = Book {
        id: EntityId::new(),
        title: "Guri and Gura".to_string(),
        author: "Rieko Nakagawa".to_string(),
        publisher: Some("Fukuinkan Shoten".to_string()),
        published_year: Some(1963),
        isbn: None,
        cover_image: Some("https://example.com/covers/guri-gura.jpg".to_string()),
        owner_id: owner,
        created_at: now,
        updated_at: now,
    };

    let peekaboo = Book {
        id: EntityId::new(),
        title: "Peekaboo!".to_string(),
        author: "Miyoko Matsutani".to_string(),
        publisher: Some("Doshinsha".to_string()),
        published_year: Some(1967),
        isbn: None,
        cover_image: Some("https://example.com/covers/peekaboo.jpg".to_string()),
        owner_id: owner,
        created_at: now,
        updated_at: now,
    };

    let records = vec![
        ReadingRecord {
            id: EntityId::new(),
            book_id: caterpillar.id,
            owner_id: owner,
            read_date: now,
            read_count: 1,
            favorite_rating: 5,
            child_reaction: "Loved pointing at the food pages.".to_string(),
            notes: "Asked to read it again right away.".to_string(),
            created_at: now,
            updated_at: now,
        },
        ReadingRecord {
            id: EntityId::new(),
            book_id: guri_gura.id,
            owner_id: owner,
            read_date: yesterday,
            read_count: 2,
            favorite_rating: 4,
            child_reaction: "Giggled at the pancake scene.".to_string(),
            notes: "Re-enacted the story during playtime.".to_string(),
            created_at: yesterday,
            updated_at: yesterday,
        },
    ];

    (vec![caterpillar, guri_gura, peekaboo], records)
}
