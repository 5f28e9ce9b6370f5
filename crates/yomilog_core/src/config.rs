//! Engine configuration.

/// Configuration for constructing a [`crate::Database`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to seed demonstration books and reading records when the
    /// loaded books or reading-records collections are empty.
    pub seed_demo_data: bool,

    /// Whether to create the default account and profile when the
    /// loaded accounts collection is empty.
    pub create_default_account: bool,

    /// Whether to restore the persisted active account during
    /// initialization. Restoration is best-effort either way; a fresh
    /// medium always starts logged out.
    pub restore_session: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_demo_data: true,
            create_default_account: true,
            restore_session: true,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to seed demonstration data.
    #[must_use]
    pub const fn seed_demo_data(mut self, value: bool) -> Self {
        self.seed_demo_data = value;
        self
    }

    /// Sets whether to create the default account.
    #[must_use]
    pub const fn create_default_account(mut self, value: bool) -> Self {
        self.create_default_account = value;
        self
    }

    /// Sets whether to restore the persisted active account.
    #[must_use]
    pub const fn restore_session(mut self, value: bool) -> Self {
        self.restore_session = value;
        self
    }
}
