use crate::models::{Holding, HoldingId};

/// Where the delete confirmation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmState {
    /// Nothing pending.
    Idle,
    /// Waiting for the user to answer.
    Pending {
        /// Holding to delete.
        id: HoldingId,
        /// Symbol shown in the prompt.
        symbol: String,
    },
    /// Accepted; the delete is in flight.
    Deleting {
        /// Holding being deleted.
        id: HoldingId,
    },
}

/// One-shot ask-then-act gate in front of delete.
#[derive(Debug, Clone)]
pub struct ConfirmationFlow {
    state: ConfirmState,
}

impl Default for ConfirmationFlow {
    fn default() -> Self {
        Self {
            state: ConfirmState::Idle,
        }
    }
}

impl ConfirmationFlow {
    /// Current state.
    pub fn state(&self) -> &ConfirmState {
        &self.state
    }

    /// Ask before deleting `holding`, returning the prompt text.
    ///
    /// Only persisted holdings can be deleted, and only one confirmation
    /// runs at a time.
    pub fn request(&mut self, holding: &Holding) -> Option<String> {
        let id = holding.id?;
        if self.state != ConfirmState::Idle {
            return None;
        }
        self.state = ConfirmState::Pending {
            id,
            symbol: holding.symbol.clone(),
        };
        self.prompt()
    }

    /// Prompt text while pending.
    pub fn prompt(&self) -> Option<String> {
        match &self.state {
            ConfirmState::Pending { symbol, .. } => {
                Some(format!("Are you sure you want to delete {symbol}?"))
            }
            _ => None,
        }
    }

    /// Answer "no". Returns `false` if nothing was pending.
    pub fn decline(&mut self) -> bool {
        if matches!(self.state, ConfirmState::Pending { .. }) {
            self.state = ConfirmState::Idle;
            true
        } else {
            false
        }
    }

    /// Answer "yes", returning the id to delete.
    pub fn accept(&mut self) -> Option<HoldingId> {
        match self.state {
            ConfirmState::Pending { id, .. } => {
                self.state = ConfirmState::Deleting { id };
                Some(id)
            }
            _ => None,
        }
    }

    /// The delete resolved, either way.
    pub fn finish(&mut self) {
        self.state = ConfirmState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    fn holding(id: Option<i64>) -> Result<Holding> {
        Ok(serde_json::from_value(json!({
            "ID": id,
            "symbol": "TSLA",
            "quantity": 1,
            "cost_basis": 200,
            "purchase_date": "2024-01-02"
        }))?)
    }

    #[test]
    fn accept_moves_through_deleting_back_to_idle() -> Result<()> {
        let mut flow = ConfirmationFlow::default();
        let prompt = flow.request(&holding(Some(4))?);
        assert_eq!(prompt.as_deref(), Some("Are you sure you want to delete TSLA?"));

        assert_eq!(flow.accept(), Some(4));
        assert_eq!(flow.state(), &ConfirmState::Deleting { id: 4 });
        assert_eq!(flow.accept(), None);
        flow.finish();
        assert_eq!(flow.state(), &ConfirmState::Idle);
        Ok(())
    }

    #[test]
    fn decline_returns_to_idle_without_an_id() -> Result<()> {
        let mut flow = ConfirmationFlow::default();
        flow.request(&holding(Some(4))?);
        assert!(flow.decline());
        assert_eq!(flow.accept(), None);
        assert!(!flow.decline());
        Ok(())
    }

    #[test]
    fn only_persisted_holdings_are_confirmed() -> Result<()> {
        let mut flow = ConfirmationFlow::default();
        assert_eq!(flow.request(&holding(None)?), None);
        assert_eq!(flow.state(), &ConfirmState::Idle);

        flow.request(&holding(Some(1))?);
        assert_eq!(flow.request(&holding(Some(2))?), None);
        assert_eq!(flow.accept(), Some(1));
        Ok(())
    }
}
