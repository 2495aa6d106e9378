use sea_orm::DatabaseConnection;

pub(crate) mod budgets;
pub(crate) mod reconcile;
pub(crate) mod reports;
pub(crate) mod sessions;
pub(crate) mod transactions;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) database: DatabaseConnection,
}

impl Engine {
    /// Creates an engine over an already-migrated database connection.
    ///
    /// The engine keeps no state of its own, so cloning is cheap and every
    /// clone shares the connection pool.
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}
