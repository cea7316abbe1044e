// ── History aggregator ──
//
// Fetches a history window and its cost report for the same date key,
// concurrently, and publishes only the newest query's result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::convert;
use crate::error::CoreError;
use crate::model::{HistoryQuery, Period, date_key, parse_date};
use crate::session::Session;

pub use crate::model::shift_date;

/// Cheaply cloneable; clones share the generation counter and the
/// published result.
#[derive(Clone, Debug)]
pub struct HistoryAggregator {
    inner: Arc<AggregatorInner>,
}

#[derive(Debug)]
struct AggregatorInner {
    session: Session,
    generation: AtomicU64,
    /// Token of the newest query; replaced (and the old one cancelled)
    /// when a newer query starts.
    pending: Mutex<CancellationToken>,
    latest: watch::Sender<Option<Arc<HistoryQuery>>>,
}

impl HistoryAggregator {
    pub fn new(session: Session) -> Self {
        let (latest, _) = watch::channel(None);
        let pending = Mutex::new(session.cancel_token().child_token());
        Self {
            inner: Arc::new(AggregatorInner {
                session,
                generation: AtomicU64::new(0),
                pending,
                latest,
            }),
        }
    }

    /// Most recently published result.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<HistoryQuery>>> {
        self.inner.latest.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<HistoryQuery>> {
        self.inner.latest.borrow().clone()
    }

    fn pending(&self) -> MutexGuard<'_, CancellationToken> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch history and costs for `period` at `date`.
    ///
    /// `date` may be `YYYY`, `YYYY-MM` or `YYYY-MM-DD`; it is re-keyed to
    /// the period's shape before being sent. Starting a new query cancels
    /// this one, which then resolves to [`CoreError::Superseded`].
    pub async fn query(&self, period: Period, date: &str) -> Result<HistoryQuery, CoreError> {
        let key = date_key(period, parse_date(date)?);

        let (generation, cancel) = {
            let mut pending = self.pending();
            pending.cancel();
            let token = self.inner.session.cancel_token().child_token();
            *pending = token.clone();
            let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
            (generation, token)
        };
        debug!(%period, key = %key, generation, "history query");

        let session = &self.inner.session;
        let fetched = tokio::try_join!(
            session.history(period, &key, &cancel),
            session.costs(period, &key, &cancel),
        );

        let (history, costs) = match fetched {
            Ok(pair) => pair,
            Err(_) if self.inner.generation.load(Ordering::Acquire) != generation => {
                return Err(CoreError::Superseded);
            }
            Err(e) => return Err(e),
        };

        let window = convert::history_window(
            history,
            period,
            &key,
            session.device_id(),
            Utc::now().fixed_offset(),
        );
        let cost = convert::cost_report(costs, period, &key, &window.samples, session.tariff());
        let result = HistoryQuery { window, cost };

        // Publish under the same lock that hands out generations.
        let _pending = self.pending();
        if self.inner.generation.load(Ordering::Acquire) != generation {
            debug!(generation, "discarding superseded history result");
            return Err(CoreError::Superseded);
        }
        self.inner.latest.send_replace(Some(Arc::new(result.clone())));
        info!(
            %period,
            key = %key,
            samples = result.window.samples.len(),
            "history updated"
        );
        Ok(result)
    }
}
