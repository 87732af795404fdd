//! Choosing a loading strategy.

use serde::Serialize;

/// How an order list is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Orders with customer and shipment only.
    RootsOnly,
    /// One wide join, deduplicated in memory.
    FetchJoin,
    /// A root query followed by chunked child queries.
    RootsThenBatched,
    /// One flat projection grouped in memory.
    FlatGrouped,
}

/// What a caller needs from a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadRequirements {
    /// Line items must be populated.
    pub line_items: bool,

    /// Results are paged with a limit or offset.
    pub paginated: bool,

    /// Prefer grouping a flat projection over deduplicating joined entities.
    pub prefer_flat_projection: bool,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::RootsOnly,
        Strategy::FetchJoin,
        Strategy::RootsThenBatched,
        Strategy::FlatGrouped,
    ];

    /// Picks a strategy for the given requirements.
    pub fn select(requirements: LoadRequirements) -> Self {
        if !requirements.line_items {
            Strategy::RootsOnly
        } else if requirements.paginated {
            Strategy::RootsThenBatched
        } else if requirements.prefer_flat_projection {
            Strategy::FlatGrouped
        } else {
            Strategy::FetchJoin
        }
    }

    /// Whether limits and offsets count distinct orders.
    pub fn supports_pagination(&self) -> bool {
        matches!(self, Strategy::RootsOnly | Strategy::RootsThenBatched)
    }

    /// Whether line items are populated.
    pub fn loads_line_items(&self) -> bool {
        !matches!(self, Strategy::RootsOnly)
    }

    /// Number of queries a load of `roots` orders takes.
    pub fn expected_round_trips(&self, roots: usize, batch_size: usize) -> usize {
        match self {
            Strategy::RootsThenBatched => 1 + roots.div_ceil(batch_size.max(1)),
            Strategy::RootsOnly | Strategy::FetchJoin | Strategy::FlatGrouped => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RootsOnly => "roots_only",
            Strategy::FetchJoin => "fetch_join",
            Strategy::RootsThenBatched => "roots_then_batched",
            Strategy::FlatGrouped => "flat_grouped",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
