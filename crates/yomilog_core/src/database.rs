//! Database facade: collection engine, durability, lazy bootstrap.

use crate::bootstrap::Bootstrap;
use crate::bus::{Channel, NotificationBus, Snapshot, Subscription};
use crate::clock::{Clock, SystemClock, Timestamp};
use crate::config::Config;
use crate::entity::{
    Account, AccountPatch, Book, BookPatch, Child, ChildPatch, Entity, EntityId, GoalPatch,
    NewAccount, NewBook, NewChild, NewProfile, NewReadingGoal, NewReadingRecord, Profile,
    ProfilePatch, ReadingGoal, ReadingRecord, RecordPatch,
};
use crate::error::{CoreError, CoreResult};
use crate::seed;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yomilog_store::{FileStore, InMemoryStore, NoopStore, RecordStore};

/// The six in-memory collections. The engine is their sole mutator.
#[derive(Debug, Default)]
struct Collections {
    accounts: Vec<Account>,
    books: Vec<Book>,
    reading_records: Vec<ReadingRecord>,
    profiles: Vec<Profile>,
    children: Vec<Child>,
    goals: Vec<ReadingGoal>,
}

/// The embedded reading-log database.
///
/// `Database` is the primary entry point. It owns the in-memory
/// collections, mirrors every mutation to an injected [`RecordStore`],
/// and broadcasts full collection snapshots through its notification
/// bus. The first operation of any kind triggers a one-time, race-safe
/// load from the record store (see the crate docs).
///
/// All collection state is mutated synchronously between suspension
/// points, so concurrent callers never observe a half-applied mutation;
/// cascade deletes apply to both collections before either broadcast.
///
/// # Opening a Database
///
/// ```rust,ignore
/// use yomilog_core::Database;
/// use std::path::Path;
///
/// // Durable, for the application:
/// let db = Database::open(Path::new("reading-log-data"))?;
///
/// // Ephemeral, for tests:
/// let db = Database::in_memory();
///
/// // No durable medium available (server-side rendering, sandboxes):
/// let db = Database::detached();
/// ```
pub struct Database {
    config: Config,
    clock: Arc<dyn Clock>,
    records: Mutex<Box<dyn RecordStore>>,
    state: Mutex<Collections>,
    session: Mutex<Option<Account>>,
    bus: NotificationBus,
    bootstrap: Bootstrap,
}

impl Database {
    /// Creates a database over the given record store.
    ///
    /// The store adapter is chosen once, here; the engine itself never
    /// inspects its execution environment.
    #[must_use]
    pub fn new(records: Box<dyn RecordStore>, config: Config) -> Self {
        Self::with_clock(records, config, Arc::new(SystemClock))
    }

    /// Creates a database with an injected clock.
    ///
    /// Tests use this with [`crate::FixedClock`] to pin timestamps.
    #[must_use]
    pub fn with_clock(
        records: Box<dyn RecordStore>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            clock,
            records: Mutex::new(records),
            state: Mutex::new(Collections::default()),
            session: Mutex::new(None),
            bus: NotificationBus::new(),
            bootstrap: Bootstrap::new(),
        }
    }

    /// Opens a durable database in the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or is locked
    /// by another process.
    pub fn open(dir: &Path) -> CoreResult<Self> {
        Self::open_with_config(dir, Config::default())
    }

    /// Opens a durable database with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or is locked
    /// by another process.
    pub fn open_with_config(dir: &Path, config: Config) -> CoreResult<Self> {
        let store = FileStore::open(dir)?;
        Ok(Self::new(Box::new(store), config))
    }

    /// Opens a fresh in-memory database for testing.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryStore::new()), Config::default())
    }

    /// Opens a database with no durable medium at all.
    ///
    /// Loads find nothing and saves are discarded; everything else
    /// behaves identically.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(Box::new(NoopStore::new()), Config::default())
    }

    /// Returns the database configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ========================================================================
    // Bootstrap
    // ========================================================================

    pub(crate) async fn ensure_ready(&self) {
        self.bootstrap.ensure(|| self.initialize()).await;
    }

    /// Returns true once lazy initialization has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.bootstrap.is_ready()
    }

    /// One-time load-and-seed, run by the bootstrap's single winner.
    async fn initialize(&self) {
        info!("loading collections from the record store");

        let (mut loaded, restored) = {
            let records = self.records.lock();
            let store: &dyn RecordStore = records.as_ref();
            let loaded = Collections {
                accounts: load_document(store, Channel::Accounts.storage_key()),
                books: load_document(store, Channel::Books.storage_key()),
                reading_records: load_document(store, Channel::ReadingRecords.storage_key()),
                profiles: load_document(store, Channel::Profiles.storage_key()),
                children: load_document(store, Channel::Children.storage_key()),
                goals: load_document(store, Channel::Goals.storage_key()),
            };
            let restored: Option<Account> = if self.config.restore_session {
                load_document(store, Channel::Session.storage_key())
            } else {
                None
            };
            (loaded, restored)
        };

        let mut seeded = false;

        if loaded.accounts.is_empty() && self.config.create_default_account {
            let (account, profile) = seed::default_account(self.clock.as_ref());
            info!(email = %account.email, "created default account");
            loaded.accounts.push(account);
            loaded.profiles.push(profile);
            seeded = true;
        }

        if (loaded.books.is_empty() || loaded.reading_records.is_empty())
            && self.config.seed_demo_data
        {
            if let Some(owner) = loaded.accounts.first().map(|a| a.id) {
                let (books, records) = seed::demo_library(owner, self.clock.as_ref());
                loaded.books = books;
                loaded.reading_records = records;
                info!("seeded demonstration library");
                seeded = true;
            } else {
                debug!("no account to own demonstration data, skipping seed");
            }
        }

        // Only restore a session whose account still exists.
        let restored = restored.filter(|a| loaded.accounts.iter().any(|b| b.id == a.id));
        if let Some(account) = &restored {
            debug!(account = %account.id, "restored active account");
        }

        *self.state.lock() = loaded;
        *self.session.lock() = restored;

        if seeded {
            self.persist_all();
        }
    }

    fn persist_all(&self) {
        let state = self.state.lock();
        self.persist_snapshot(&Snapshot::Accounts(state.accounts.clone()));
        self.persist_snapshot(&Snapshot::Books(state.books.clone()));
        self.persist_snapshot(&Snapshot::ReadingRecords(state.reading_records.clone()));
        self.persist_snapshot(&Snapshot::Profiles(state.profiles.clone()));
        self.persist_snapshot(&Snapshot::Children(state.children.clone()));
        self.persist_snapshot(&Snapshot::Goals(state.goals.clone()));
    }

    // ========================================================================
    // Durability and notification
    // ========================================================================

    /// Mirrors a snapshot to the record store, then broadcasts it.
    ///
    /// Durability is best-effort: medium failures are logged and the
    /// session continues in memory.
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        self.persist_snapshot(&snapshot);
        self.bus.broadcast(snapshot);
    }

    fn persist_snapshot(&self, snapshot: &Snapshot) {
        let key = snapshot.channel().storage_key();

        // Logged-out sessions are represented by an absent key.
        if matches!(snapshot, Snapshot::Session(None)) {
            let mut records = self.records.lock();
            if let Err(e) = records.remove(key) {
                warn!(key, error = %e, "durable remove failed, continuing in memory");
            }
            return;
        }

        let blob = match snapshot.to_document() {
            Ok(blob) => blob,
            Err(e) => {
                warn!(key, error = %CoreError::from(e), "failed to encode document");
                return;
            }
        };

        let mut records = self.records.lock();
        if let Err(e) = records.save(key, &blob) {
            warn!(key, error = %e, "durable save failed, continuing in memory");
        }
    }

    /// Subscribes to a channel.
    ///
    /// The subscription's first delivery is the current snapshot,
    /// observed when polled, never inside this call. Every subsequent
    /// mutation of the channel delivers exactly one snapshot, in
    /// mutation order.
    pub async fn subscribe(&self, channel: Channel) -> Subscription {
        self.ensure_ready().await;
        let snapshot = match channel {
            Channel::Accounts => Snapshot::Accounts(self.state.lock().accounts.clone()),
            Channel::Books => Snapshot::Books(self.state.lock().books.clone()),
            Channel::ReadingRecords => {
                Snapshot::ReadingRecords(self.state.lock().reading_records.clone())
            }
            Channel::Profiles => Snapshot::Profiles(self.state.lock().profiles.clone()),
            Channel::Children => Snapshot::Children(self.state.lock().children.clone()),
            Channel::Goals => Snapshot::Goals(self.state.lock().goals.clone()),
            Channel::Session => Snapshot::Session(self.session.lock().clone()),
        };
        self.bus.subscribe(channel, snapshot)
    }

    /// The account mutations must be stamped with.
    pub(crate) fn require_account(&self) -> CoreResult<Account> {
        self.session
            .lock()
            .clone()
            .ok_or(CoreError::NotAuthenticated)
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn set_active_account(&self, account: Option<Account>) {
        let mut session = self.session.lock();
        *session = account.clone();
        self.publish(Snapshot::Session(account));
    }

    pub(crate) fn active_account(&self) -> Option<Account> {
        self.session.lock().clone()
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Lists all accounts in insertion order.
    pub async fn list_accounts(&self) -> Vec<Account> {
        self.ensure_ready().await;
        self.state.lock().accounts.clone()
    }

    /// Gets an account by id.
    pub async fn account_by_id(&self, id: EntityId) -> Option<Account> {
        self.ensure_ready().await;
        self.state.lock().accounts.iter().find(|a| a.id == id).cloned()
    }

    /// Creates an account.
    ///
    /// [`Database::sign_up`] is the usual entry point; it activates the
    /// new account and creates its profile as well.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmailAlreadyInUse`] if an account with the
    /// same email exists.
    pub async fn add_account(&self, new: NewAccount) -> CoreResult<Account> {
        self.ensure_ready().await;
        let now = self.clock.now();

        let mut state = self.state.lock();
        if state.accounts.iter().any(|a| a.email == new.email) {
            return Err(CoreError::email_already_in_use(new.email));
        }

        let account = Account {
            id: EntityId::new(),
            email: new.email,
            secret: new.secret,
            email_verified: false,
            display_name: new.display_name,
            created_at: now,
            last_login_at: now,
        };
        state.accounts.push(account.clone());
        debug!(account = %account.id, "account added");
        self.publish(Snapshot::Accounts(state.accounts.clone()));
        Ok(account)
    }

    /// Refreshes `lastLoginAt` for the account matching both
    /// credentials exactly. Used by `sign_in`.
    pub(crate) fn touch_last_login(
        &self,
        email: &str,
        secret: &str,
        now: Timestamp,
    ) -> CoreResult<Account> {
        let mut state = self.state.lock();
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.email == email && a.secret == secret)
            .ok_or(CoreError::InvalidCredentials)?;
        account.last_login_at = now;
        let account = account.clone();
        self.publish(Snapshot::Accounts(state.accounts.clone()));
        Ok(account)
    }

    /// Updates an account, merging the patch's set fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn update_account(&self, id: EntityId, patch: AccountPatch) -> CoreResult<Account> {
        self.ensure_ready().await;

        let mut state = self.state.lock();
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::not_found(Channel::Accounts, id))?;

        if let Some(display_name) = patch.display_name {
            account.display_name = Some(display_name);
        }
        if let Some(email_verified) = patch.email_verified {
            account.email_verified = email_verified;
        }
        if let Some(secret) = patch.secret {
            account.secret = secret;
        }
        let updated = account.clone();
        self.publish(Snapshot::Accounts(state.accounts.clone()));
        drop(state);

        // Keep the active-account copy coherent with the collection.
        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|a| a.id == id) {
            *session = Some(updated.clone());
        }

        Ok(updated)
    }

    /// Deletes an account.
    ///
    /// If the account is currently active, the session is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn delete_account(&self, id: EntityId) -> CoreResult<()> {
        self.ensure_ready().await;

        {
            let mut state = self.state.lock();
            let pos = state
                .accounts
                .iter()
                .position(|a| a.id == id)
                .ok_or_else(|| CoreError::not_found(Channel::Accounts, id))?;
            state.accounts.remove(pos);
            self.publish(Snapshot::Accounts(state.accounts.clone()));
        }

        let was_active = self
            .active_account()
            .is_some_and(|account| account.id == id);
        if was_active {
            self.set_active_account(None);
        }
        Ok(())
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    /// Lists all profiles in insertion order.
    pub async fn list_profiles(&self) -> Vec<Profile> {
        self.ensure_ready().await;
        self.state.lock().profiles.clone()
    }

    /// Gets the profile for an account.
    pub async fn profile_by_id(&self, id: EntityId) -> Option<Profile> {
        self.ensure_ready().await;
        self.state.lock().profiles.iter().find(|p| p.id == id).cloned()
    }

    /// Creates the profile for an account.
    ///
    /// Profiles are one-to-one with accounts: adding a profile for an
    /// account that already has one replaces its family name instead of
    /// growing the collection.
    pub async fn add_profile(&self, new: NewProfile) -> CoreResult<Profile> {
        self.ensure_ready().await;
        let now = self.clock.now();

        let mut state = self.state.lock();
        let profile = match state.profiles.iter_mut().find(|p| p.id == new.account_id) {
            Some(existing) => {
                existing.family_name = new.family_name;
                existing.touch(now);
                existing.clone()
            }
            None => {
                let profile = Profile {
                    id: new.account_id,
                    family_name: new.family_name,
                    created_at: now,
                    updated_at: now,
                };
                state.profiles.push(profile.clone());
                profile
            }
        };
        self.publish(Snapshot::Profiles(state.profiles.clone()));
        Ok(profile)
    }

    /// Updates a profile, merging the patch's set fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn update_profile(&self, id: EntityId, patch: ProfilePatch) -> CoreResult<Profile> {
        self.ensure_ready().await;
        let now = self.clock.now();

        let mut state = self.state.lock();
        let profile = update_in(&mut state.profiles, Channel::Profiles, id, now, |p| {
            if let Some(family_name) = patch.family_name {
                p.family_name = family_name;
            }
        })?;
        self.publish(Snapshot::Profiles(state.profiles.clone()));
        Ok(profile)
    }

    /// Deletes a profile.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn delete_profile(&self, id: EntityId) -> CoreResult<()> {
        self.ensure_ready().await;

        let mut state = self.state.lock();
        remove_from(&mut state.profiles, Channel::Profiles, id)?;
        self.publish(Snapshot::Profiles(state.profiles.clone()));
        Ok(())
    }

    // ========================================================================
    // Books
    // ========================================================================

    /// Lists books in insertion order, filtered by owner when given.
    pub async fn list_books(&self, owner: Option<&EntityId>) -> Vec<Book> {
        self.ensure_ready().await;
        filter_owned(&self.state.lock().books, owner)
    }

    /// Gets a book by id.
    pub async fn book_by_id(&self, id: EntityId) -> Option<Book> {
        self.ensure_ready().await;
        self.state.lock().books.iter().find(|b| b.id == id).cloned()
    }

    /// Adds a book owned by the active account.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAuthenticated`] if no session is active.
    pub async fn add_book(&self, new: NewBook) -> CoreResult<Book> {
        self.ensure_ready().await;
        let owner = self.require_account()?;
        let now = self.clock.now();

        let book = Book {
            id: EntityId::new(),
            title: new.title,
            author: new.author,
            publisher: new.publisher,
            published_year: new.published_year,
            isbn: new.isbn,
            cover_image: new.cover_image,
            owner_id: owner.id,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock();
        state.books.push(book.clone());
        debug!(book = %book.id, owner = %owner.id, "book added");
        self.publish(Snapshot::Books(state.books.clone()));
        Ok(book)
    }

    /// Updates a book, merging the patch's set fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn update_book(&self, id: EntityId, patch: BookPatch) -> CoreResult<Book> {
        self.ensure_ready().await;
        let now = self.clock.now();

        let mut state = self.state.lock();
        let book = update_in(&mut state.books, Channel::Books, id, now, |b| {
            if let Some(title) = patch.title {
                b.title = title;
            }
            if let Some(author) = patch.author {
                b.author = author;
            }
            if let Some(publisher) = patch.publisher {
                b.publisher = Some(publisher);
            }
            if let Some(published_year) = patch.published_year {
                b.published_year = Some(published_year);
            }
            if let Some(isbn) = patch.isbn {
                b.isbn = Some(isbn);
            }
            if let Some(cover_image) = patch.cover_image {
                b.cover_image = Some(cover_image);
            }
        })?;
        self.publish(Snapshot::Books(state.books.clone()));
        Ok(book)
    }

    /// Deletes a book and all reading records that reference it.
    ///
    /// The cascade is one in-memory step: both broadcasts carry the
    /// fully cascaded state, so subscribers never observe a record whose
    /// book is gone.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn delete_book(&self, id: EntityId) -> CoreResult<()> {
        self.ensure_ready().await;

        let mut state = self.state.lock();
        let removed = remove_from(&mut state.books, Channel::Books, id)?;

        let before = state.reading_records.len();
        state.reading_records.retain(|r| r.book_id != id);
        let cascaded = before - state.reading_records.len();
        debug!(book = %removed.id, cascaded, "book deleted");

        self.publish(Snapshot::Books(state.books.clone()));
        self.publish(Snapshot::ReadingRecords(state.reading_records.clone()));
        Ok(())
    }

    // ========================================================================
    // Reading records
    // ========================================================================

    /// Lists reading records in insertion order, filtered by owner when
    /// given.
    pub async fn list_reading_records(&self, owner: Option<&EntityId>) -> Vec<ReadingRecord> {
        self.ensure_ready().await;
        filter_owned(&self.state.lock().reading_records, owner)
    }

    /// Gets a reading record by id.
    pub async fn reading_record_by_id(&self, id: EntityId) -> Option<ReadingRecord> {
        self.ensure_ready().await;
        self.state
            .lock()
            .reading_records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Lists the reading records of one book, in insertion order.
    pub async fn list_records_for_book(&self, book_id: EntityId) -> Vec<ReadingRecord> {
        self.ensure_ready().await;
        self.state
            .lock()
            .reading_records
            .iter()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect()
    }

    /// Adds a reading record owned by the active account.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAuthenticated`] if no session is active,
    /// or [`CoreError::NotFound`] if the record's book does not exist.
    pub async fn add_reading_record(&self, new: NewReadingRecord) -> CoreResult<ReadingRecord> {
        self.ensure_ready().await;
        let owner = self.require_account()?;
        let now = self.clock.now();

        let mut state = self.state.lock();
        if !state.books.iter().any(|b| b.id == new.book_id) {
            return Err(CoreError::not_found(Channel::Books, new.book_id));
        }

        let record = ReadingRecord {
            id: EntityId::new(),
            book_id: new.book_id,
            owner_id: owner.id,
            read_date: new.read_date,
            read_count: new.read_count,
            favorite_rating: new.favorite_rating,
            child_reaction: new.child_reaction,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        state.reading_records.push(record.clone());
        debug!(record = %record.id, book = %record.book_id, "reading record added");
        self.publish(Snapshot::ReadingRecords(state.reading_records.clone()));
        Ok(record)
    }

    /// Updates a reading record, merging the patch's set fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn update_reading_record(
        &self,
        id: EntityId,
        patch: RecordPatch,
    ) -> CoreResult<ReadingRecord> {
        self.ensure_ready().await;
        let now = self.clock.now();

        let mut state = self.state.lock();
        let record = update_in(
            &mut state.reading_records,
            Channel::ReadingRecords,
            id,
            now,
            |r| {
                if let Some(read_date) = patch.read_date {
                    r.read_date = read_date;
                }
                if let Some(read_count) = patch.read_count {
                    r.read_count = read_count;
                }
                if let Some(favorite_rating) = patch.favorite_rating {
                    r.favorite_rating = favorite_rating;
                }
                if let Some(child_reaction) = patch.child_reaction {
                    r.child_reaction = child_reaction;
                }
                if let Some(notes) = patch.notes {
                    r.notes = notes;
                }
            },
        )?;
        self.publish(Snapshot::ReadingRecords(state.reading_records.clone()));
        Ok(record)
    }

    /// Deletes a reading record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn delete_reading_record(&self, id: EntityId) -> CoreResult<()> {
        self.ensure_ready().await;

        let mut state = self.state.lock();
        remove_from(&mut state.reading_records, Channel::ReadingRecords, id)?;
        self.publish(Snapshot::ReadingRecords(state.reading_records.clone()));
        Ok(())
    }

    // ========================================================================
    // Children
    // ========================================================================

    /// Lists children in insertion order, filtered by owner when given.
    pub async fn list_children(&self, owner: Option<&EntityId>) -> Vec<Child> {
        self.ensure_ready().await;
        filter_owned(&self.state.lock().children, owner)
    }

    /// Gets a child by id.
    pub async fn child_by_id(&self, id: EntityId) -> Option<Child> {
        self.ensure_ready().await;
        self.state.lock().children.iter().find(|c| c.id == id).cloned()
    }

    /// Adds a child owned by the active account.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAuthenticated`] if no session is active.
    pub async fn add_child(&self, new: NewChild) -> CoreResult<Child> {
        self.ensure_ready().await;
        let owner = self.require_account()?;
        let now = self.clock.now();

        let child = Child {
            id: EntityId::new(),
            name: new.name,
            birthdate: new.birthdate,
            owner_id: owner.id,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock();
        state.children.push(child.clone());
        self.publish(Snapshot::Children(state.children.clone()));
        Ok(child)
    }

    /// Updates a child, merging the patch's set fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn update_child(&self, id: EntityId, patch: ChildPatch) -> CoreResult<Child> {
        self.ensure_ready().await;
        let now = self.clock.now();

        let mut state = self.state.lock();
        let child = update_in(&mut state.children, Channel::Children, id, now, |c| {
            if let Some(name) = patch.name {
                c.name = name;
            }
            if let Some(birthdate) = patch.birthdate {
                c.birthdate = Some(birthdate);
            }
        })?;
        self.publish(Snapshot::Children(state.children.clone()));
        Ok(child)
    }

    /// Deletes a child.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn delete_child(&self, id: EntityId) -> CoreResult<()> {
        self.ensure_ready().await;

        let mut state = self.state.lock();
        remove_from(&mut state.children, Channel::Children, id)?;
        self.publish(Snapshot::Children(state.children.clone()));
        Ok(())
    }

    // ========================================================================
    // Goals
    // ========================================================================

    /// Lists goals in insertion order, filtered by owner when given.
    pub async fn list_goals(&self, owner: Option<&EntityId>) -> Vec<ReadingGoal> {
        self.ensure_ready().await;
        filter_owned(&self.state.lock().goals, owner)
    }

    /// Gets a goal by id.
    pub async fn goal_by_id(&self, id: EntityId) -> Option<ReadingGoal> {
        self.ensure_ready().await;
        self.state.lock().goals.iter().find(|g| g.id == id).cloned()
    }

    /// Adds a goal owned by the active account.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAuthenticated`] if no session is active.
    pub async fn add_goal(&self, new: NewReadingGoal) -> CoreResult<ReadingGoal> {
        self.ensure_ready().await;
        let owner = self.require_account()?;
        let now = self.clock.now();

        let goal = ReadingGoal {
            id: EntityId::new(),
            owner_id: owner.id,
            target_books: new.target_books,
            period: new.period,
            start_date: new.start_date,
            end_date: new.end_date,
            is_completed: false,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock();
        state.goals.push(goal.clone());
        self.publish(Snapshot::Goals(state.goals.clone()));
        Ok(goal)
    }

    /// Updates a goal, merging the patch's set fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn update_goal(&self, id: EntityId, patch: GoalPatch) -> CoreResult<ReadingGoal> {
        self.ensure_ready().await;
        let now = self.clock.now();

        let mut state = self.state.lock();
        let goal = update_in(&mut state.goals, Channel::Goals, id, now, |g| {
            if let Some(target_books) = patch.target_books {
                g.target_books = target_books;
            }
            if let Some(period) = patch.period {
                g.period = period;
            }
            if let Some(start_date) = patch.start_date {
                g.start_date = start_date;
            }
            if let Some(end_date) = patch.end_date {
                g.end_date = Some(end_date);
            }
            if let Some(is_completed) = patch.is_completed {
                g.is_completed = is_completed;
            }
        })?;
        self.publish(Snapshot::Goals(state.goals.clone()));
        Ok(goal)
    }

    /// Deletes a goal.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is unknown.
    pub async fn delete_goal(&self, id: EntityId) -> CoreResult<()> {
        self.ensure_ready().await;

        let mut state = self.state.lock();
        remove_from(&mut state.goals, Channel::Goals, id)?;
        self.publish(Snapshot::Goals(state.goals.clone()));
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

/// Loads and decodes one document, degrading to the default on any
/// failure. The durable medium is a mirror, not the source of truth.
fn load_document<T: DeserializeOwned + Default>(store: &dyn RecordStore, key: &str) -> T {
    match store.load(key) {
        Ok(Some(blob)) => match serde_json::from_slice(&blob) {
            Ok(value) => value,
            Err(e) => {
                let err = CoreError::initialization_failed(format!(
                    "document {key} failed to decode: {e}"
                ));
                warn!(error = %err, "discarding corrupt document");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "durable load failed, starting empty");
            T::default()
        }
    }
}

fn filter_owned<T: Entity>(items: &[T], owner: Option<&EntityId>) -> Vec<T> {
    match owner {
        Some(owner) => items
            .iter()
            .filter(|item| item.owner_id().as_ref() == Some(owner))
            .cloned()
            .collect(),
        None => items.to_vec(),
    }
}

fn update_in<T: Entity>(
    items: &mut [T],
    collection: Channel,
    id: EntityId,
    now: Timestamp,
    apply: impl FnOnce(&mut T),
) -> CoreResult<T> {
    let item = items
        .iter_mut()
        .find(|item| item.id() == id)
        .ok_or_else(|| CoreError::not_found(collection, id))?;
    apply(item);
    item.touch(now);
    Ok(item.clone())
}

fn remove_from<T: Entity>(items: &mut Vec<T>, collection: Channel, id: EntityId) -> CoreResult<T> {
    let pos = items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| CoreError::not_found(collection, id))?;
    Ok(items.remove(pos))
}
