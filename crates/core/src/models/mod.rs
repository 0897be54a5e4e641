//! Shared domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

mod wire_date;

/// Server-assigned holding identifier.
pub type HoldingId = i64;
/// Server-assigned brokerage identifier.
pub type BrokerageId = i64;

/// A tracked stock position as returned by the server.
///
/// The type is deliberately not `Serialize`: valuation and bookkeeping
/// fields are display data and never travel back to the server. Writes go
/// through [`NewHolding`] and [`HoldingUpdate`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Holding {
    /// Identifier, absent only for entities that were never persisted.
    #[serde(rename = "ID", default)]
    pub id: Option<HoldingId>,
    /// Ticker symbol (e.g. `2330`).
    pub symbol: String,
    /// Company name resolved by the server, if any.
    #[serde(default)]
    pub stock_name: Option<String>,
    /// Number of shares held.
    pub quantity: f64,
    /// Price paid per share.
    pub cost_basis: f64,
    /// Date the position was opened.
    #[serde(with = "wire_date")]
    pub purchase_date: NaiveDate,
    /// Custodian of the position.
    #[serde(default)]
    pub brokerage_id: Option<BrokerageId>,
    /// Free-form note.
    #[serde(default)]
    pub note: Option<String>,
    /// Creation timestamp assigned by the server.
    #[serde(rename = "CreatedAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification timestamp assigned by the server.
    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Latest quoted price.
    #[serde(default)]
    pub current_price: Option<f64>,
    /// `current_price * quantity`.
    #[serde(default)]
    pub market_value: Option<f64>,
    /// Unrealised profit or loss.
    #[serde(default)]
    pub profit_loss: Option<f64>,
    /// Unrealised profit or loss as a percentage of cost.
    #[serde(default)]
    pub profit_loss_percent: Option<f64>,
}

impl Holding {
    /// Total amount paid for the position.
    pub fn cost_total(&self) -> f64 {
        self.quantity * self.cost_basis
    }

    /// Returns a user-facing label combining symbol and stock name.
    pub fn display_name(&self) -> String {
        match self.stock_name.as_deref() {
            Some(name) if !name.trim().is_empty() => format!("{} · {}", self.symbol, name.trim()),
            _ => self.symbol.clone(),
        }
    }
}

/// Read-only reference entity naming a holding's custodian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brokerage {
    /// Identifier.
    pub id: BrokerageId,
    /// Display name.
    pub name: String,
}

/// Editable fields of a holding, detached from any list entry.
///
/// Drafts are what the edit dialog mutates. Building one from a
/// [`Holding`] is an explicit copy so edits stay invisible to the list
/// until the server accepts them.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingDraft {
    /// Identifier of the holding being edited; `None` when creating.
    pub id: Option<HoldingId>,
    /// Ticker symbol as typed.
    pub symbol: String,
    /// Number of shares.
    pub quantity: f64,
    /// Price paid per share.
    pub cost_basis: f64,
    /// Date the position was opened.
    pub purchase_date: NaiveDate,
    /// Selected custodian.
    pub brokerage_id: Option<BrokerageId>,
    /// Free-form note.
    pub note: String,
}

impl HoldingDraft {
    /// Empty draft used by the "new holding" dialog.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            id: None,
            symbol: String::new(),
            quantity: 0.0,
            cost_basis: 0.0,
            purchase_date: today,
            brokerage_id: None,
            note: String::new(),
        }
    }

    /// Copy the editable fields of `holding`.
    pub fn from_holding(holding: &Holding) -> Self {
        Self {
            id: holding.id,
            symbol: holding.symbol.clone(),
            quantity: holding.quantity,
            cost_basis: holding.cost_basis,
            purchase_date: holding.purchase_date,
            brokerage_id: holding.brokerage_id,
            note: holding.note.clone().unwrap_or_default(),
        }
    }

    /// The only client-side rule: the symbol must be non-empty once trimmed.
    pub fn has_valid_symbol(&self) -> bool {
        !self.symbol.trim().is_empty()
    }

    /// Payload for `POST /holdings`.
    pub fn to_new_holding(&self) -> NewHolding {
        NewHolding {
            symbol: self.symbol.trim().to_string(),
            quantity: self.quantity,
            cost_basis: self.cost_basis,
            purchase_date: self.purchase_date,
            brokerage_id: self.brokerage_id,
            note: self.note.trim().to_string(),
        }
    }

    /// Payload for `PUT /holdings/:id` carrying every editable field.
    pub fn to_update(&self) -> HoldingUpdate {
        HoldingUpdate {
            symbol: Some(self.symbol.trim().to_string()),
            quantity: Some(self.quantity),
            cost_basis: Some(self.cost_basis),
            purchase_date: Some(self.purchase_date),
            brokerage_id: self.brokerage_id,
            note: Some(self.note.trim().to_string()),
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHolding {
    /// Ticker symbol, already trimmed.
    pub symbol: String,
    /// Number of shares.
    pub quantity: f64,
    /// Price paid per share.
    pub cost_basis: f64,
    /// Date the position was opened.
    #[serde(with = "wire_date")]
    pub purchase_date: NaiveDate,
    /// Selected custodian.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brokerage_id: Option<BrokerageId>,
    /// Free-form note.
    pub note: String,
}

/// Body of an update request; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HoldingUpdate {
    /// New ticker symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// New share count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// New cost basis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_basis: Option<f64>,
    /// New purchase date.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "wire_date::serialize_option"
    )]
    pub purchase_date: Option<NaiveDate>,
    /// New custodian.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brokerage_id: Option<BrokerageId>,
    /// New note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl HoldingUpdate {
    /// Returns `true` when the update would not change anything.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Identity returned by the server after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Account email.
    pub email: String,
    /// Server-side user id, when reported.
    #[serde(default)]
    pub id: Option<i64>,
}

/// Email/password pair used by login and registration.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plain-text password; only ever sent in a request body.
    pub password: String,
}

impl Credentials {
    /// Build credentials, trimming the email.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Totals across a list of holdings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortfolioSummary {
    /// Number of positions.
    pub positions: usize,
    /// Sum of `quantity * cost_basis`.
    pub cost_total: f64,
    /// Sum of reported market values.
    pub market_value: f64,
    /// Sum of reported profit/loss.
    pub profit_loss: f64,
}

impl PortfolioSummary {
    /// Aggregate the given holdings; missing valuation counts as zero.
    pub fn from_holdings<'a>(holdings: impl IntoIterator<Item = &'a Holding>) -> Self {
        holdings
            .into_iter()
            .fold(Self::default(), |mut summary, holding| {
                summary.positions += 1;
                summary.cost_total += holding.cost_total();
                summary.market_value += holding.market_value.unwrap_or(0.0);
                summary.profit_loss += holding.profit_loss.unwrap_or(0.0);
                summary
            })
    }

    /// Profit/loss relative to cost, in percent.
    pub fn profit_loss_percent(&self) -> Option<f64> {
        if self.cost_total > 0.0 {
            Some(self.profit_loss / self.cost_total * 100.0)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    fn sample() -> Result<Holding> {
        Ok(serde_json::from_value(json!({
            "ID": 7,
            "CreatedAt": "2024-03-01T08:30:00.123456+08:00",
            "UpdatedAt": "2024-03-02T00:00:00Z",
            "DeletedAt": null,
            "user_id": 1,
            "symbol": "2330",
            "stock_name": "TSMC",
            "purchase_date": "2024-02-29T00:00:00+08:00",
            "cost_basis": 600.0,
            "quantity": 10.0,
            "brokerage_id": 3,
            "note": "core",
            "current_price": 650.0,
            "market_value": 6500.0,
            "profit_loss": 500.0,
            "profit_loss_percent": 8.33
        }))?)
    }

    #[test]
    fn decodes_server_holding() -> Result<()> {
        let holding = sample()?;
        assert_eq!(holding.id, Some(7));
        assert_eq!(holding.display_name(), "2330 · TSMC");
        assert_eq!(
            holding.purchase_date,
            NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date")
        );
        assert_eq!(holding.brokerage_id, Some(3));
        assert!(holding.created_at.is_some());
        assert_eq!(holding.cost_total(), 6000.0);
        Ok(())
    }

    #[test]
    fn decodes_date_only_purchase_date() -> Result<()> {
        let holding: Holding = serde_json::from_value(json!({
            "symbol": "AAPL",
            "quantity": 1,
            "cost_basis": 150,
            "purchase_date": "2023-12-31"
        }))?;
        assert_eq!(holding.id, None);
        assert_eq!(
            holding.purchase_date,
            NaiveDate::from_ymd_opt(2023, 12, 31).expect("valid date")
        );
        assert_eq!(holding.current_price, None);
        Ok(())
    }

    #[test]
    fn draft_copy_drops_valuation_and_trims_payloads() -> Result<()> {
        let holding = sample()?;
        let mut draft = HoldingDraft::from_holding(&holding);
        draft.symbol = "  2330 ".to_string();

        let body = serde_json::to_value(draft.to_update())?;
        assert_eq!(body["symbol"], json!("2330"));
        assert_eq!(body["purchase_date"], json!("2024-02-29T00:00:00Z"));
        assert!(body.get("current_price").is_none());
        assert!(body.get("ID").is_none());

        let created = serde_json::to_value(HoldingDraft::empty(holding.purchase_date).to_new_holding())?;
        assert!(created.get("brokerage_id").is_none());
        assert_eq!(created["quantity"], json!(0.0));
        Ok(())
    }

    #[test]
    fn partial_update_serializes_only_present_fields() -> Result<()> {
        let update = HoldingUpdate {
            quantity: Some(20.0),
            ..HoldingUpdate::default()
        };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_value(&update)?, json!({ "quantity": 20.0 }));
        Ok(())
    }

    #[test]
    fn whitespace_symbol_is_invalid() {
        let mut draft = HoldingDraft::empty(NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"));
        assert!(!draft.has_valid_symbol());
        draft.symbol = " \t ".to_string();
        assert!(!draft.has_valid_symbol());
        draft.symbol = "MSFT".to_string();
        assert!(draft.has_valid_symbol());
    }

    #[test]
    fn summary_totals_reported_values() -> Result<()> {
        let holding = sample()?;
        let summary = PortfolioSummary::from_holdings([&holding, &holding]);
        assert_eq!(summary.positions, 2);
        assert_eq!(summary.cost_total, 12000.0);
        assert_eq!(summary.market_value, 13000.0);
        let percent = summary.profit_loss_percent().expect("cost is positive");
        assert!((percent - 8.333).abs() < 0.01);
        Ok(())
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new(" a@b.io ", "hunter2");
        assert_eq!(credentials.email, "a@b.io");
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }
}
