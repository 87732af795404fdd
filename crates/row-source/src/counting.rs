use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{
    Query, Result, Row, Table,
    store::{RowSource, RowStream, UnitOfWork, Write},
};

/// Round trips and rows observed by a [`CountingRowSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub queries: usize,
    pub rows: usize,
}

/// Wraps a row source and counts the statements sent through it.
///
/// Streamed rows are not counted; only buffered fetches report row totals.
#[derive(Debug, Default)]
pub struct CountingRowSource<S> {
    inner: S,
    queries: AtomicUsize,
    rows: AtomicUsize,
}

impl<S> CountingRowSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
            rows: AtomicUsize::new(0),
        }
    }

    /// Returns the counters accumulated since creation or the last reset.
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            queries: self.queries.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.queries.store(0, Ordering::Relaxed);
        self.rows.store(0, Ordering::Relaxed);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RowSource> RowSource for CountingRowSource<S> {
    async fn fetch_all(&self, query: &Query) -> Result<Vec<Row>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let rows = self.inner.fetch_all(query).await?;
        self.rows.fetch_add(rows.len(), Ordering::Relaxed);
        Ok(rows)
    }

    async fn fetch<'a>(&'a self, query: &'a Query) -> Result<RowStream<'a>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.inner.fetch(query).await
    }
}

#[async_trait]
impl<S: UnitOfWork> UnitOfWork for CountingRowSource<S> {
    async fn next_id(&self, table: Table) -> Result<i64> {
        self.inner.next_id(table).await
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<()> {
        self.inner.commit(writes).await
    }
}
