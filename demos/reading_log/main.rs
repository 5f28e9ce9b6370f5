//! Reading-log demo.
//!
//! Drives the yomilog engine the way the UI layer would:
//! - signs in with the default account
//! - subscribes to the books and session channels
//! - adds a book and a reading record
//! - prints analytics over the current snapshots
//!
//! Run with: cargo run -p reading_log
//!
//! Diagnostic verbosity is controlled by `RUST_LOG`, e.g.
//! `RUST_LOG=yomilog_core=debug cargo run -p reading_log`.

use std::path::Path;
use yomilog_core::{
    analytics, Channel, Database, NewBook, NewReadingRecord, SystemClock, Clock,
    DEFAULT_ACCOUNT_EMAIL, DEFAULT_ACCOUNT_SECRET,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let db = Database::open(Path::new("reading-log-data"))?;

    let account = db.sign_in(DEFAULT_ACCOUNT_EMAIL, DEFAULT_ACCOUNT_SECRET).await?;
    println!(
        "signed in as {} ({})",
        account.display_name.as_deref().unwrap_or("?"),
        account.email
    );

    let mut books_feed = db.subscribe(Channel::Books).await;
    let mut session_feed = db.observe_session().await;

    // The registration-time snapshots arrive first.
    if let Some(snapshot) = books_feed.recv().await {
        let books = snapshot.as_books().unwrap_or(&[]);
        println!("library holds {} books:", books.len());
        for book in books {
            println!("  - {} by {}", book.title, book.author);
        }
    }
    if let Some(snapshot) = session_feed.recv().await {
        let active = snapshot.as_session().flatten().map(|a| a.email.clone());
        println!("session: {}", active.as_deref().unwrap_or("logged out"));
    }

    let book = db
        .add_book(NewBook {
            title: "Where the Wild Things Are".into(),
            author: "Maurice Sendak".into(),
            published_year: Some(1963),
            ..Default::default()
        })
        .await?;

    db.add_reading_record(NewReadingRecord {
        book_id: book.id,
        read_date: SystemClock.now(),
        read_count: 1,
        favorite_rating: 5,
        child_reaction: "Roared their terrible roars.".into(),
        notes: String::new(),
    })
    .await?;

    // The mutation's broadcast carries the grown collection.
    if let Some(snapshot) = books_feed.recv().await {
        let books = snapshot.as_books().unwrap_or(&[]);
        println!("after adding one, the library holds {} books", books.len());
    }

    let records = db.list_reading_records(Some(&account.id)).await;
    let books = db.list_books(Some(&account.id)).await;

    let summary = analytics::ReadingSummary::compute(&records, None);
    println!(
        "{} records, {} total reads, {} distinct books",
        summary.record_count, summary.total_reads, summary.distinct_books
    );

    for rated in analytics::top_rated_books(&books, &records, 3) {
        println!(
            "  {:.1}* {} ({} records)",
            rated.average_rating, rated.book.title, rated.record_count
        );
    }

    db.sign_out().await;
    if let Some(snapshot) = session_feed.recv().await {
        let active = snapshot.as_session().flatten().map(|a| a.email.clone());
        println!("session: {}", active.as_deref().unwrap_or("logged out"));
    }

    Ok(())
}
