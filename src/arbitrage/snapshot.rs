//! Per-cycle market reads for the triangle.

use std::time::Instant;

use futures::future::try_join_all;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::error::ExchangeError;
use crate::exchange::{BookLimits, ExchangeClient};
use crate::market::{Triangle, LEGS};
use crate::metrics;
use crate::orderbook::InnermostBook;

/// Innermost books and taker fees for the three pairs, in pair order.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    /// Books for pairs A, B and C.
    pub books: [InnermostBook; LEGS],
    /// Taker fees for pairs A, B and C.
    pub fees: [Decimal; LEGS],
    /// When the reads completed.
    pub fetched_at: OffsetDateTime,
}

/// Trade size bounds for pairs A, B and C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleLimits(pub [BookLimits; LEGS]);

impl TriangleLimits {
    /// Limits for the pair at `idx`.
    pub fn get(&self, idx: usize) -> Option<&BookLimits> {
        self.0.get(idx)
    }
}

/// Read all three innermost books and the fee schedule concurrently.
///
/// Fails closed: any failed read fails the snapshot.
#[instrument(skip(exchange, triangle), fields(triangle = %triangle.label()))]
pub async fn read_snapshot<E: ExchangeClient + ?Sized>(
    exchange: &E,
    triangle: &Triangle,
) -> Result<MarketSnapshot, ExchangeError> {
    let start = Instant::now();
    let pair_ids = triangle.pair_ids();

    let book_reads = try_join_all(
        triangle
            .pairs()
            .iter()
            .map(|pair| exchange.get_order_book_innermost(&pair.id)),
    );
    let (books, schedule) = tokio::try_join!(book_reads, exchange.get_fees(&pair_ids))?;

    let books: [InnermostBook; LEGS] = books
        .try_into()
        .map_err(|_| ExchangeError::Parse("expected one book per pair".to_string()))?;

    let mut fees = [Decimal::ZERO; LEGS];
    for (fee, pair) in fees.iter_mut().zip(&pair_ids) {
        *fee = schedule
            .taker_fee(pair)
            .ok_or_else(|| ExchangeError::UnknownPair(pair.clone()))?;
    }

    metrics::record_snapshot_latency(start);
    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Market snapshot read"
    );

    Ok(MarketSnapshot {
        books,
        fees,
        fetched_at: OffsetDateTime::now_utc(),
    })
}

/// Load trade size bounds for the triangle. A pair the exchange does not
/// list is an error.
#[instrument(skip(exchange, triangle), fields(triangle = %triangle.label()))]
pub async fn read_limits<E: ExchangeClient + ?Sized>(
    exchange: &E,
    triangle: &Triangle,
) -> Result<TriangleLimits, ExchangeError> {
    let pair_ids = triangle.pair_ids();
    let available = exchange.get_available_books(&pair_ids).await?;

    let mut limits = [BookLimits::new(Decimal::ZERO, Decimal::ZERO); LEGS];
    for (slot, pair) in limits.iter_mut().zip(&pair_ids) {
        *slot = *available
            .get(pair)
            .ok_or_else(|| ExchangeError::UnknownPair(pair.clone()))?;
    }

    Ok(TriangleLimits(limits))
}
