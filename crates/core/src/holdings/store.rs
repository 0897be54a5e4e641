use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::{
    api::ApiClient,
    error::{ApiError, DeleteError, LoadError, SaveError},
    models::{Brokerage, BrokerageId, Holding, HoldingId, HoldingUpdate, NewHolding, PortfolioSummary},
    notify::{Notification, NotificationSink},
};

/// Notification text for a failed holdings load.
pub const LOAD_FAILED: &str = "Failed to load holdings";
/// Notification text for a failed create.
pub const CREATE_FAILED: &str = "Failed to create holding";
/// Notification text for a failed update.
pub const UPDATE_FAILED: &str = "Failed to update holding";
/// Notification text for a failed delete.
pub const DELETE_FAILED: &str = "Failed to delete holding";
/// Notification text for a failed brokerage load.
pub const BROKERAGES_FAILED: &str = "Failed to load brokerages";

#[derive(Default)]
struct State {
    holdings: Vec<Holding>,
    brokerages: Vec<Brokerage>,
    loads_in_flight: usize,
    epoch: u64,
}

impl State {
    fn position(&self, id: HoldingId) -> Option<usize> {
        self.holdings.iter().position(|holding| holding.id == Some(id))
    }
}

/// In-memory copy of the user's holdings plus brokerage reference data.
///
/// Every operation awaits the server first and only then applies the
/// result under the lock, so a failed call leaves the list exactly as it
/// was. Results of calls issued before [`HoldingsStore::reset`] are
/// dropped on arrival.
pub struct HoldingsStore {
    api: ApiClient,
    notifier: Arc<dyn NotificationSink>,
    state: RwLock<State>,
}

impl HoldingsStore {
    /// Empty store reporting failures to `notifier`.
    pub fn new(api: ApiClient, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            api,
            notifier,
            state: RwLock::new(State::default()),
        }
    }

    /// Snapshot of the list in server order.
    pub fn holdings(&self) -> Vec<Holding> {
        self.state.read().holdings.clone()
    }

    /// Number of holdings in the list.
    pub fn len(&self) -> usize {
        self.state.read().holdings.len()
    }

    /// Returns `true` when the list is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().holdings.is_empty()
    }

    /// Copy of the entry with `id`.
    pub fn find(&self, id: HoldingId) -> Option<Holding> {
        let state = self.state.read();
        state.position(id).map(|index| state.holdings[index].clone())
    }

    /// Snapshot of the brokerage reference list.
    pub fn brokerages(&self) -> Vec<Brokerage> {
        self.state.read().brokerages.clone()
    }

    /// Name of the brokerage with `id`, if loaded.
    pub fn brokerage_name(&self, id: BrokerageId) -> Option<String> {
        self.state
            .read()
            .brokerages
            .iter()
            .find(|brokerage| brokerage.id == id)
            .map(|brokerage| brokerage.name.clone())
    }

    /// Whether a holdings load is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.read().loads_in_flight > 0
    }

    /// Totals over the current list.
    pub fn summary(&self) -> PortfolioSummary {
        PortfolioSummary::from_holdings(&self.state.read().holdings)
    }

    /// Forget everything and ignore results of calls already in flight.
    pub fn reset(&self) {
        let mut state = self.state.write();
        let epoch = state.epoch.wrapping_add(1);
        *state = State {
            epoch,
            ..State::default()
        };
        debug!(epoch, "Holdings store reset");
    }

    /// Replace the list with the server's current holdings.
    pub async fn load(&self) -> Result<Vec<Holding>, LoadError> {
        let epoch = {
            let mut state = self.state.write();
            state.loads_in_flight += 1;
            state.epoch
        };

        let result = self.api.list_holdings().await;

        {
            let mut state = self.state.write();
            if state.epoch != epoch {
                debug!("Discarding holdings loaded before reset");
                return result.map_err(LoadError::from);
            }
            state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
            if let Ok(holdings) = &result {
                state.holdings = holdings.clone();
                info!(count = holdings.len(), "Holdings loaded");
            }
        }

        result.map_err(|err| self.report(err, LOAD_FAILED).into())
    }

    /// Replace the brokerage reference list. Failure leaves holdings usable.
    pub async fn load_brokerages(&self) -> Result<Vec<Brokerage>, LoadError> {
        let epoch = self.epoch();
        let result = self.api.list_brokerages().await;
        match result {
            Ok(brokerages) => {
                let mut state = self.state.write();
                if state.epoch == epoch {
                    state.brokerages = brokerages.clone();
                    info!(count = brokerages.len(), "Brokerages loaded");
                }
                Ok(brokerages)
            }
            Err(err) => Err(self.report(err, BROKERAGES_FAILED).into()),
        }
    }

    /// Fetch one holding, refreshing its entry when it is already listed.
    /// An id missing locally is never added.
    pub async fn get(&self, id: HoldingId) -> Result<Holding, LoadError> {
        let epoch = self.epoch();
        let fetched = self
            .api
            .get_holding(id)
            .await
            .map_err(|err| self.report(err, LOAD_FAILED))?;

        let mut state = self.state.write();
        if state.epoch == epoch {
            if let Some(index) = state.position(id) {
                state.holdings[index] = fetched.clone();
                debug!(id, "Holding refreshed");
            }
        }
        Ok(fetched)
    }

    /// Create a holding and append the server's copy to the list.
    pub async fn create(&self, holding: &NewHolding) -> Result<Holding, SaveError> {
        if holding.symbol.trim().is_empty() {
            self.notifier.notify(Notification::error(CREATE_FAILED));
            return Err(SaveError::Invalid("symbol is required".to_string()));
        }

        let epoch = self.epoch();
        let created = self
            .api
            .create_holding(holding)
            .await
            .map_err(|err| self.report(err, CREATE_FAILED))?;

        let mut state = self.state.write();
        if state.epoch != epoch {
            debug!("Discarding holding created before reset");
            return Ok(created);
        }
        // A load that raced this create may already contain the new id.
        let existing = created.id.and_then(|id| state.position(id));
        match existing {
            Some(index) => state.holdings[index] = created.clone(),
            None => state.holdings.push(created.clone()),
        }
        info!(id = ?created.id, symbol = %created.symbol, "Holding created");
        Ok(created)
    }

    /// Update a holding and replace its entry in place.
    ///
    /// [`SaveError::TargetNotFound`] is returned so the caller can re-sync
    /// when the server no longer has the holding, or when the entry
    /// disappeared from the list while the call was in flight. In the
    /// latter case the server's answer is discarded.
    pub async fn update(&self, id: HoldingId, changes: &HoldingUpdate) -> Result<Holding, SaveError> {
        let epoch = self.epoch();
        let updated = match self.api.update_holding(id, changes).await {
            Ok(updated) => updated,
            Err(ApiError::NotFound) => {
                warn!(id, "Server no longer has the updated holding");
                self.notifier.notify(Notification::error(UPDATE_FAILED));
                return Err(SaveError::TargetNotFound(id));
            }
            Err(err) => return Err(self.report(err, UPDATE_FAILED).into()),
        };

        let mut state = self.state.write();
        if state.epoch != epoch {
            debug!(id, "Discarding holding updated before reset");
            return Ok(updated);
        }
        let existing = state.position(id);
        match existing {
            Some(index) => {
                state.holdings[index] = updated.clone();
                info!(id, symbol = %updated.symbol, "Holding updated");
                Ok(updated)
            }
            None => {
                drop(state);
                warn!(id, "Updated holding is no longer in the list");
                self.notifier.notify(Notification::error(UPDATE_FAILED));
                Err(SaveError::TargetNotFound(id))
            }
        }
    }

    /// Delete a holding; the entry stays visible unless the server confirms.
    pub async fn delete(&self, id: HoldingId) -> Result<(), DeleteError> {
        let epoch = self.epoch();
        self.api
            .delete_holding(id)
            .await
            .map_err(|err| self.report(err, DELETE_FAILED))?;

        let mut state = self.state.write();
        if state.epoch == epoch {
            state.holdings.retain(|holding| holding.id != Some(id));
            info!(id, "Holding deleted");
        }
        Ok(())
    }

    fn epoch(&self) -> u64 {
        self.state.read().epoch
    }

    /// Log and notify a failed call. Authorization failures are left to
    /// the caller, which owns the session reset.
    fn report(&self, err: ApiError, message: &str) -> ApiError {
        if err.is_unauthorized() {
            warn!(%err, "{message}: session rejected");
        } else {
            warn!(%err, "{message}");
            let detail = match err.server_message() {
                Some(reason) => format!("{message}: {reason}"),
                None => message.to_string(),
            };
            self.notifier.notify(Notification::error(detail));
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{scripted::ScriptedTransport, Method},
        notify::{NotificationLog, Severity},
    };
    use anyhow::Result;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    fn holding_json(id: i64, symbol: &str, quantity: f64, cost_basis: f64) -> Value {
        json!({
            "ID": id,
            "symbol": symbol,
            "quantity": quantity,
            "cost_basis": cost_basis,
            "purchase_date": "2024-01-02T00:00:00Z"
        })
    }

    fn new_holding(symbol: &str, quantity: f64, cost_basis: f64) -> NewHolding {
        NewHolding {
            symbol: symbol.to_string(),
            quantity,
            cost_basis,
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"),
            brokerage_id: None,
            note: String::new(),
        }
    }

    fn store() -> (Arc<ScriptedTransport>, NotificationLog, HoldingsStore) {
        let transport = Arc::new(ScriptedTransport::default());
        let log = NotificationLog::default();
        let store = HoldingsStore::new(ApiClient::new(transport.clone()), Arc::new(log.clone()));
        (transport, log, store)
    }

    fn ids(store: &HoldingsStore) -> Vec<Option<i64>> {
        store.holdings().iter().map(|holding| holding.id).collect()
    }

    #[tokio::test]
    async fn list_is_the_fold_of_successful_results() -> Result<()> {
        let (transport, log, store) = store();
        transport.respond(
            Method::Get,
            "/holdings",
            Ok(json!([holding_json(1, "AAPL", 10.0, 150.0)])),
        );
        transport.respond(
            Method::Post,
            "/holdings",
            Ok(holding_json(2, "MSFT", 5.0, 300.0)),
        );
        transport.respond(
            Method::Put,
            "/holdings/1",
            Ok(holding_json(1, "AAPL", 20.0, 150.0)),
        );
        transport.respond(Method::Delete, "/holdings/2", Ok(json!({ "message": "deleted" })));

        store.load().await?;
        assert_eq!(ids(&store), [Some(1)]);

        let created = store.create(&new_holding("MSFT", 5.0, 300.0)).await?;
        assert_eq!(created.id, Some(2));
        assert_eq!(ids(&store), [Some(1), Some(2)]);

        let changes = HoldingUpdate {
            quantity: Some(20.0),
            ..HoldingUpdate::default()
        };
        store.update(1, &changes).await?;
        assert_eq!(ids(&store), [Some(1), Some(2)]);
        assert_eq!(store.find(1).map(|h| h.quantity), Some(20.0));

        store.delete(2).await?;
        assert_eq!(ids(&store), [Some(1)]);
        assert!(log.snapshot().is_empty());

        let put = transport
            .calls()
            .into_iter()
            .find(|call| call.method == Method::Put)
            .expect("update was sent");
        assert_eq!(put.body, Some(json!({ "quantity": 20.0 })));
        Ok(())
    }

    #[tokio::test]
    async fn failed_operations_leave_the_list_untouched() -> Result<()> {
        let (transport, log, store) = store();
        transport.respond(
            Method::Get,
            "/holdings",
            Ok(json!([holding_json(1, "AAPL", 10.0, 150.0)])),
        );
        transport.respond(
            Method::Post,
            "/holdings",
            Err(ApiError::from_status(400, r#"{"error":"quantity must be > 0"}"#)),
        );
        transport.respond(
            Method::Put,
            "/holdings/1",
            Err(ApiError::Network("connection reset".to_string())),
        );
        transport.respond(Method::Delete, "/holdings/1", Err(ApiError::NotFound));

        store.load().await?;
        let before = store.holdings();

        assert!(store.create(&new_holding("MSFT", 0.0, 1.0)).await.is_err());
        assert!(store.update(1, &HoldingUpdate::default()).await.is_err());
        assert!(store.delete(1).await.is_err());
        assert_eq!(store.holdings(), before);

        let details: Vec<_> = log.snapshot().into_iter().map(|n| n.detail).collect();
        assert_eq!(
            details,
            [
                "Failed to create holding: quantity must be > 0",
                UPDATE_FAILED,
                DELETE_FAILED
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn load_failure_clears_busy_flag_and_notifies() {
        let (transport, log, store) = store();
        transport.respond(Method::Get, "/holdings", Err(ApiError::Network("down".to_string())));

        assert!(!store.is_loading());
        assert!(store.load().await.is_err());
        assert!(!store.is_loading());
        assert_eq!(log.latest().map(|n| n.detail), Some(LOAD_FAILED.to_string()));
    }

    #[tokio::test]
    async fn loading_flag_is_set_while_waiting() -> Result<()> {
        let (transport, _, store) = store();
        let release = transport.respond_gated(Method::Get, "/holdings", Ok(json!([])));

        let observe = async {
            tokio::task::yield_now().await;
            let busy = store.is_loading();
            let _ = release.send(());
            busy
        };
        let (result, busy) = tokio::join!(store.load(), observe);
        result?;
        assert!(busy);
        assert!(!store.is_loading());
        Ok(())
    }

    #[tokio::test]
    async fn authorization_failures_are_not_notified_here() {
        let (transport, log, store) = store();
        transport.respond(
            Method::Get,
            "/holdings",
            Err(ApiError::from_status(401, "")),
        );

        let err = store.load().await.expect_err("session rejected");
        assert!(err.is_unauthorized());
        assert!(log.snapshot().is_empty());
    }

    #[tokio::test]
    async fn update_of_vanished_entry_reports_target_not_found() -> Result<()> {
        let (transport, log, store) = store();
        transport.respond(Method::Get, "/holdings", Ok(json!([holding_json(1, "AAPL", 10.0, 150.0)])));
        transport.respond(Method::Put, "/holdings/9", Ok(holding_json(9, "TSLA", 1.0, 1.0)));

        store.load().await?;
        let err = store
            .update(9, &HoldingUpdate::default())
            .await
            .expect_err("9 is not in the list");
        assert_eq!(err, SaveError::TargetNotFound(9));
        assert_eq!(ids(&store), [Some(1)]);
        assert_eq!(log.latest().map(|n| n.severity), Some(Severity::Error));
        Ok(())
    }

    #[tokio::test]
    async fn update_rejected_as_missing_by_server_reports_target_not_found() -> Result<()> {
        let (transport, log, store) = store();
        transport.respond(Method::Get, "/holdings", Ok(json!([holding_json(1, "AAPL", 10.0, 150.0)])));
        transport.respond(
            Method::Put,
            "/holdings/1",
            Err(ApiError::from_status(404, r#"{"error":"Holding not found"}"#)),
        );

        store.load().await?;
        let err = store
            .update(1, &HoldingUpdate::default())
            .await
            .expect_err("server lost holding 1");
        assert_eq!(err, SaveError::TargetNotFound(1));
        assert_eq!(ids(&store), [Some(1)]);
        assert_eq!(log.latest().map(|n| n.detail), Some(UPDATE_FAILED.to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn create_after_racing_load_keeps_one_entry_per_id() -> Result<()> {
        let (transport, _, store) = store();
        transport.respond(Method::Get, "/holdings", Ok(json!([holding_json(2, "MSFT", 5.0, 300.0)])));
        transport.respond(Method::Post, "/holdings", Ok(holding_json(2, "MSFT", 5.0, 300.0)));

        store.load().await?;
        store.create(&new_holding("MSFT", 5.0, 300.0)).await?;
        assert_eq!(ids(&store), [Some(2)]);
        Ok(())
    }

    #[tokio::test]
    async fn blank_symbol_is_rejected_without_a_call() {
        let (transport, log, store) = store();
        let err = store
            .create(&new_holding("   ", 1.0, 1.0))
            .await
            .expect_err("symbol is blank");
        assert!(matches!(err, SaveError::Invalid(_)));
        assert_eq!(transport.call_count(), 0);
        assert_eq!(log.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn results_issued_before_reset_are_discarded() -> Result<()> {
        let (transport, _, store) = store();
        let release = transport.respond_gated(
            Method::Get,
            "/holdings",
            Ok(json!([holding_json(1, "AAPL", 10.0, 150.0)])),
        );

        let intervene = async {
            store.reset();
            let _ = release.send(());
        };
        let (result, ()) = tokio::join!(store.load(), intervene);
        assert_eq!(result?.len(), 1);
        assert!(store.is_empty());
        assert!(!store.is_loading());
        Ok(())
    }

    #[tokio::test]
    async fn brokerage_failure_is_independent() -> Result<()> {
        let (transport, log, store) = store();
        transport.respond(Method::Get, "/holdings", Ok(json!([holding_json(1, "AAPL", 10.0, 150.0)])));
        transport.respond(Method::Get, "/brokerages", Err(ApiError::Network("down".to_string())));
        transport.respond(Method::Get, "/brokerages", Ok(json!([{ "id": 3, "name": "Cathay" }])));

        let (holdings, brokerages) = tokio::join!(store.load(), store.load_brokerages());
        assert_eq!(holdings?.len(), 1);
        assert!(brokerages.is_err());
        assert_eq!(log.latest().map(|n| n.detail), Some(BROKERAGES_FAILED.to_string()));

        store.load_brokerages().await?;
        assert_eq!(store.brokerage_name(3).as_deref(), Some("Cathay"));
        assert_eq!(store.brokerage_name(4), None);
        Ok(())
    }

    #[tokio::test]
    async fn get_refreshes_listed_entries_only() -> Result<()> {
        let (transport, _, store) = store();
        transport.respond(Method::Get, "/holdings", Ok(json!([holding_json(1, "AAPL", 10.0, 150.0)])));
        transport.respond(Method::Get, "/holdings/1", Ok(holding_json(1, "AAPL", 12.0, 150.0)));
        transport.respond(Method::Get, "/holdings/5", Ok(holding_json(5, "NVDA", 2.0, 400.0)));

        store.load().await?;
        let holding = store.get(5).await?;
        assert_eq!(holding.symbol, "NVDA");
        assert_eq!(ids(&store), [Some(1)]);

        store.get(1).await?;
        assert_eq!(store.find(1).map(|h| h.quantity), Some(12.0));
        Ok(())
    }
}
