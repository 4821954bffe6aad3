use anyhow::Result;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A query that re-runs every time its table changes.
///
/// The current rows are yielded as soon as the stream is polled, then once
/// more after each write. Writes landing between two polls are coalesced
/// into a single re-query.
pub type LiveQuery<T> = BoxStream<'static, Result<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Ingredients,
    ShoppingList,
    Recipes,
}

/// Per-table version counters. Writers bump a counter, live queries hold a
/// receiver and re-query when it moves.
pub struct ChangeTracker {
    ingredients: watch::Sender<u64>,
    shopping_list: watch::Sender<u64>,
    recipes: watch::Sender<u64>,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ingredients: watch::channel(0).0,
            shopping_list: watch::channel(0).0,
            recipes: watch::channel(0).0,
        }
    }

    fn sender(&self, table: Table) -> &watch::Sender<u64> {
        match table {
            Table::Ingredients => &self.ingredients,
            Table::ShoppingList => &self.shopping_list,
            Table::Recipes => &self.recipes,
        }
    }

    pub fn notify(&self, table: Table) {
        self.sender(table)
            .send_modify(|version| *version = version.wrapping_add(1));
    }

    #[must_use]
    pub fn version(&self, table: Table) -> u64 {
        *self.sender(table).borrow()
    }

    #[must_use]
    pub fn subscribe(&self, table: Table) -> watch::Receiver<u64> {
        self.sender(table).subscribe()
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a change receiver into a stream of query results.
pub fn live_query<T, F>(changes: watch::Receiver<u64>, query: F) -> LiveQuery<T>
where
    T: Send + 'static,
    F: Fn() -> Result<T> + Send + 'static,
{
    WatchStream::new(changes).map(move |_| query()).boxed()
}

/// Like [`live_query`] but for values that are already pushed through a
/// watch channel, such as preference records.
pub fn watch_values<T>(values: watch::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + Sync + 'static,
{
    WatchStream::new(values).boxed()
}
