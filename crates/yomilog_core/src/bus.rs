//! Notification bus for observing collection changes.
//!
//! The bus distributes **full collection snapshots**, not diffs: after
//! every mutation, each subscriber of the affected channel receives the
//! entire current collection. Subscribing enqueues the current snapshot
//! immediately, so observers never see a registration-time gap, and
//! delivery always happens outside the subscriber's registration call
//! stack.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut books = db.subscribe(Channel::Books).await;
//!
//! // First delivery is the registration-time snapshot, then one
//! // snapshot per mutation, in mutation order.
//! while let Some(Snapshot::Books(books)) = books.recv().await {
//!     render(&books);
//! }
//! ```
//!
//! Subscribers receive their own queue; a slow or misbehaving consumer
//! cannot block or break delivery to the others. Dropping a
//! [`Subscription`] unregisters it, even mid-broadcast.

use crate::entity::{Account, Book, Child, Profile, ReadingGoal, ReadingRecord};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A broadcast channel: one per collection, plus the reserved session
/// channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The accounts collection.
    Accounts,
    /// The books collection.
    Books,
    /// The reading-records collection.
    ReadingRecords,
    /// The profiles collection.
    Profiles,
    /// The children collection.
    Children,
    /// The goals collection.
    Goals,
    /// The reserved session channel; carries the active account.
    Session,
}

impl Channel {
    /// The durable key this channel's state is persisted under.
    #[must_use]
    pub const fn storage_key(self) -> &'static str {
        match self {
            Channel::Accounts => "accounts",
            Channel::Books => "books",
            Channel::ReadingRecords => "reading-records",
            Channel::Profiles => "profiles",
            Channel::Children => "children",
            Channel::Goals => "goals",
            Channel::Session => "session",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_key())
    }
}

/// A full snapshot of one channel's current state.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// All accounts.
    Accounts(Vec<Account>),
    /// All books.
    Books(Vec<Book>),
    /// All reading records.
    ReadingRecords(Vec<ReadingRecord>),
    /// All profiles.
    Profiles(Vec<Profile>),
    /// All children.
    Children(Vec<Child>),
    /// All goals.
    Goals(Vec<ReadingGoal>),
    /// The active account, or `None` when logged out.
    Session(Option<Account>),
}

impl Snapshot {
    /// The channel this snapshot belongs to.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        match self {
            Snapshot::Accounts(_) => Channel::Accounts,
            Snapshot::Books(_) => Channel::Books,
            Snapshot::ReadingRecords(_) => Channel::ReadingRecords,
            Snapshot::Profiles(_) => Channel::Profiles,
            Snapshot::Children(_) => Channel::Children,
            Snapshot::Goals(_) => Channel::Goals,
            Snapshot::Session(_) => Channel::Session,
        }
    }

    /// The accounts, if this is an accounts snapshot.
    #[must_use]
    pub fn as_accounts(&self) -> Option<&[Account]> {
        match self {
            Snapshot::Accounts(v) => Some(v),
            _ => None,
        }
    }

    /// The books, if this is a books snapshot.
    #[must_use]
    pub fn as_books(&self) -> Option<&[Book]> {
        match self {
            Snapshot::Books(v) => Some(v),
            _ => None,
        }
    }

    /// The reading records, if this is a reading-records snapshot.
    #[must_use]
    pub fn as_reading_records(&self) -> Option<&[ReadingRecord]> {
        match self {
            Snapshot::ReadingRecords(v) => Some(v),
            _ => None,
        }
    }

    /// The profiles, if this is a profiles snapshot.
    #[must_use]
    pub fn as_profiles(&self) -> Option<&[Profile]> {
        match self {
            Snapshot::Profiles(v) => Some(v),
            _ => None,
        }
    }

    /// The children, if this is a children snapshot.
    #[must_use]
    pub fn as_children(&self) -> Option<&[Child]> {
        match self {
            Snapshot::Children(v) => Some(v),
            _ => None,
        }
    }

    /// The goals, if this is a goals snapshot.
    #[must_use]
    pub fn as_goals(&self) -> Option<&[ReadingGoal]> {
        match self {
            Snapshot::Goals(v) => Some(v),
            _ => None,
        }
    }

    /// The active account, if this is a session snapshot.
    #[must_use]
    pub fn as_session(&self) -> Option<Option<&Account>> {
        match self {
            Snapshot::Session(v) => Some(v.as_ref()),
            _ => None,
        }
    }

    /// Serializes the snapshot's payload as a JSON document.
    pub(crate) fn to_document(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Snapshot::Accounts(v) => serde_json::to_vec(v),
            Snapshot::Books(v) => serde_json::to_vec(v),
            Snapshot::ReadingRecords(v) => serde_json::to_vec(v),
            Snapshot::Profiles(v) => serde_json::to_vec(v),
            Snapshot::Children(v) => serde_json::to_vec(v),
            Snapshot::Goals(v) => serde_json::to_vec(v),
            Snapshot::Session(v) => serde_json::to_vec(v),
        }
    }
}

struct Registration {
    id: u64,
    tx: UnboundedSender<Snapshot>,
}

struct BusInner {
    channels: RwLock<HashMap<Channel, Vec<Registration>>>,
    next_id: AtomicU64,
}

/// Per-channel subscriber registry.
///
/// Broadcasts deliver to subscribers in subscription order. Each
/// subscriber has its own unbounded queue, so a subscriber that stops
/// polling (or drops mid-broadcast) never affects delivery to others.
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl NotificationBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a subscriber and enqueues `current` as its first
    /// delivery.
    ///
    /// The snapshot is observed when the subscription is polled, never
    /// inside this call.
    pub fn subscribe(&self, channel: Channel, current: Snapshot) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        // The receiver is not polled yet, so this cannot fail.
        let _ = tx.send(current);

        self.inner
            .channels
            .write()
            .entry(channel)
            .or_default()
            .push(Registration { id, tx });

        Subscription {
            id,
            channel,
            rx,
            bus: Arc::clone(&self.inner),
        }
    }

    /// Delivers `snapshot` to every live subscriber of its channel, in
    /// subscription order. Closed subscriptions are pruned.
    pub fn broadcast(&self, snapshot: Snapshot) {
        let channel = snapshot.channel();
        let mut channels = self.inner.channels.write();
        if let Some(subs) = channels.get_mut(&channel) {
            subs.retain(|reg| reg.tx.send(snapshot.clone()).is_ok());
        }
    }

    /// Returns the number of live subscribers on a channel.
    #[must_use]
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.inner
            .channels
            .read()
            .get(&channel)
            .map_or(0, Vec::len)
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus").finish_non_exhaustive()
    }
}

/// An opaque subscription handle.
///
/// Holds the subscriber's queue. Dropping the handle (or calling
/// [`Subscription::unsubscribe`]) removes the registration; two
/// subscriptions are never confused even if created by the same caller
/// for the same channel.
pub struct Subscription {
    id: u64,
    channel: Channel,
    rx: UnboundedReceiver<Snapshot>,
    bus: Arc<BusInner>,
}

impl Subscription {
    /// The channel this subscription observes.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the subscription has been severed and its
    /// queue drained.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Returns the next snapshot if one is already queued.
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }

    /// Removes this subscription from the bus.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.bus.channels.write();
        if let Some(subs) = channels.get_mut(&self.channel) {
            subs.retain(|reg| reg.id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books_snapshot(n: usize) -> Snapshot {
        use crate::clock::Timestamp;
        use crate::entity::EntityId;

        let owner = EntityId::new();
        let books = (0..n)
            .map(|i| Book {
                id: EntityId::new(),
                title: format!("Book {i}"),
                author: "A".into(),
                publisher: None,
                published_year: None,
                isbn: None,
                cover_image: None,
                owner_id: owner,
                created_at: Timestamp::from_millis(i as u64),
                updated_at: Timestamp::from_millis(i as u64),
            })
            .collect();
        Snapshot::Books(books)
    }

    #[tokio::test]
    async fn subscriber_sees_current_snapshot_first() {
        let bus = NotificationBus::new();
        let mut sub = bus.subscribe(Channel::Books, books_snapshot(2));

        let first = sub.recv().await.unwrap();
        assert_eq!(first.as_books().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn each_broadcast_is_delivered_once_in_order() {
        let bus = NotificationBus::new();
        let mut sub = bus.subscribe(Channel::Books, books_snapshot(0));

        bus.broadcast(books_snapshot(1));
        bus.broadcast(books_snapshot(2));

        assert_eq!(sub.recv().await.unwrap().as_books().unwrap().len(), 0);
        assert_eq!(sub.recv().await.unwrap().as_books().unwrap().len(), 1);
        assert_eq!(sub.recv().await.unwrap().as_books().unwrap().len(), 2);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn broadcasts_reach_all_subscribers() {
        let bus = NotificationBus::new();
        let mut a = bus.subscribe(Channel::Books, books_snapshot(0));
        let mut b = bus.subscribe(Channel::Books, books_snapshot(0));

        bus.broadcast(books_snapshot(3));

        // Skip the registration-time snapshots.
        a.recv().await.unwrap();
        b.recv().await.unwrap();
        assert_eq!(a.recv().await.unwrap().as_books().unwrap().len(), 3);
        assert_eq!(b.recv().await.unwrap().as_books().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn channels_are_independent() {
        let bus = NotificationBus::new();
        let mut books = bus.subscribe(Channel::Books, books_snapshot(0));
        let mut session = bus.subscribe(Channel::Session, Snapshot::Session(None));

        bus.broadcast(books_snapshot(1));

        books.recv().await.unwrap();
        assert_eq!(books.recv().await.unwrap().channel(), Channel::Books);

        session.recv().await.unwrap();
        assert!(session.try_recv().is_none());
    }

    #[tokio::test]
    async fn dropping_a_subscription_unregisters_it() {
        let bus = NotificationBus::new();
        let sub = bus.subscribe(Channel::Books, books_snapshot(0));
        assert_eq!(bus.subscriber_count(Channel::Books), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(Channel::Books), 0);

        // Broadcasting to a drained channel is fine.
        bus.broadcast(books_snapshot(1));
    }

    #[tokio::test]
    async fn unsubscribe_does_not_disturb_other_subscribers() {
        let bus = NotificationBus::new();
        let a = bus.subscribe(Channel::Books, books_snapshot(0));
        let mut b = bus.subscribe(Channel::Books, books_snapshot(0));

        a.unsubscribe();
        bus.broadcast(books_snapshot(2));

        b.recv().await.unwrap();
        assert_eq!(b.recv().await.unwrap().as_books().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn closed_receiver_is_pruned_on_broadcast() {
        let bus = NotificationBus::new();
        let mut sub = bus.subscribe(Channel::Goals, Snapshot::Goals(Vec::new()));

        // Simulate a consumer whose queue went away while its
        // registration is still present.
        let (_tx, dummy_rx) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut sub.rx, dummy_rx));
        std::mem::forget(sub);

        assert_eq!(bus.subscriber_count(Channel::Goals), 1);
        bus.broadcast(Snapshot::Goals(Vec::new()));
        assert_eq!(bus.subscriber_count(Channel::Goals), 0);
    }

    #[test]
    fn duplicate_subscriptions_are_distinct() {
        let bus = NotificationBus::new();
        let a = bus.subscribe(Channel::Books, books_snapshot(0));
        let b = bus.subscribe(Channel::Books, books_snapshot(0));
        assert_ne!(a.id, b.id);
        assert_eq!(bus.subscriber_count(Channel::Books), 2);
    }

    #[test]
    fn storage_keys_are_stable() {
        assert_eq!(Channel::ReadingRecords.storage_key(), "reading-records");
        assert_eq!(Channel::Session.storage_key(), "session");
    }
}
