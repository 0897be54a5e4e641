use chrono::NaiveDate;

use crate::{
    error::SaveError,
    models::{Holding, HoldingDraft, HoldingId, HoldingUpdate, NewHolding},
};

/// What the dialog is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    /// No dialog is shown.
    Closed,
    /// Creating a new holding.
    Create,
    /// Editing the holding with the given id.
    Edit(HoldingId),
}

/// A save the dialog wants dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveRequest {
    /// `POST /holdings`.
    Create(NewHolding),
    /// `PUT /holdings/:id`.
    Update(HoldingId, HoldingUpdate),
}

impl SaveRequest {
    /// Returns `true` for creates.
    pub fn is_create(&self) -> bool {
        matches!(self, SaveRequest::Create(_))
    }
}

/// Result of pressing "save".
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitAttempt {
    /// No dialog is open.
    NotOpen,
    /// A previous save has not resolved yet.
    Busy,
    /// The draft failed validation; the dialog stays open.
    Invalid,
    /// The save should be sent; the dialog is now submitting.
    Dispatch(SaveRequest),
}

/// Transient create/edit dialog state.
///
/// The draft is always a detached copy. Nothing typed here reaches the
/// list until the server accepts a save and the store applies its answer.
#[derive(Debug, Clone)]
pub struct EditSession {
    mode: DialogMode,
    draft: HoldingDraft,
    was_submitted: bool,
    submitting: bool,
}

impl EditSession {
    /// Closed dialog.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            mode: DialogMode::Closed,
            draft: HoldingDraft::empty(today),
            was_submitted: false,
            submitting: false,
        }
    }

    /// Open for creating, seeded with zeroes and `today`.
    ///
    /// Refused while a save is in flight.
    pub fn open_new(&mut self, today: NaiveDate) -> bool {
        if self.submitting {
            return false;
        }
        self.draft = HoldingDraft::empty(today);
        self.mode = DialogMode::Create;
        self.was_submitted = false;
        true
    }

    /// Open for editing a copy of `holding`.
    ///
    /// Refused for a holding that was never persisted and while a save is
    /// in flight.
    pub fn open_edit(&mut self, holding: &Holding) -> bool {
        let Some(id) = holding.id else {
            return false;
        };
        if self.submitting {
            return false;
        }
        self.draft = HoldingDraft::from_holding(holding);
        self.mode = DialogMode::Edit(id);
        self.was_submitted = false;
        true
    }

    /// Hide the dialog, discarding the draft's edits. Refused while a save
    /// is in flight so its outcome always lands on the dialog that sent it.
    pub fn close(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.mode = DialogMode::Closed;
        self.was_submitted = false;
        true
    }

    /// Force the dialog closed, forgetting any save in flight.
    pub fn reset(&mut self) {
        self.submitting = false;
        self.close();
    }

    /// Current mode.
    pub fn mode(&self) -> DialogMode {
        self.mode
    }

    /// Whether the dialog is shown.
    pub fn is_open(&self) -> bool {
        self.mode != DialogMode::Closed
    }

    /// Whether save was pressed since the dialog opened.
    pub fn was_submitted(&self) -> bool {
        self.was_submitted
    }

    /// Whether a save is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Whether the symbol field should be highlighted as invalid.
    pub fn symbol_error(&self) -> bool {
        self.was_submitted && !self.draft.has_valid_symbol()
    }

    /// The scratch copy being edited.
    pub fn draft(&self) -> &HoldingDraft {
        &self.draft
    }

    /// Mutable access to the scratch copy.
    pub fn draft_mut(&mut self) -> &mut HoldingDraft {
        &mut self.draft
    }

    /// Validate and, when valid, hand back the save to dispatch.
    pub fn begin_submit(&mut self) -> SubmitAttempt {
        if !self.is_open() {
            return SubmitAttempt::NotOpen;
        }
        if self.submitting {
            return SubmitAttempt::Busy;
        }
        self.was_submitted = true;
        if !self.draft.has_valid_symbol() {
            return SubmitAttempt::Invalid;
        }

        self.submitting = true;
        let request = match self.mode {
            DialogMode::Edit(id) => SaveRequest::Update(id, self.draft.to_update()),
            _ => SaveRequest::Create(self.draft.to_new_holding()),
        };
        SubmitAttempt::Dispatch(request)
    }

    /// Apply the outcome of a dispatched save: close on success, keep the
    /// dialog and its input on failure.
    pub fn finish_submit(&mut self, result: &Result<Holding, SaveError>) {
        self.submitting = false;
        if result.is_ok() {
            self.mode = DialogMode::Closed;
            self.was_submitted = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
    }

    fn holding() -> Result<Holding> {
        Ok(serde_json::from_value(json!({
            "ID": 1,
            "symbol": "AAPL",
            "quantity": 10,
            "cost_basis": 150,
            "purchase_date": "2024-01-02T00:00:00Z",
            "note": "long",
            "current_price": 190
        }))?)
    }

    #[test]
    fn open_new_seeds_empty_draft() {
        let mut session = EditSession::new(today());
        assert!(!session.is_open());
        session.open_new(today());
        assert_eq!(session.mode(), DialogMode::Create);
        assert_eq!(session.draft(), &HoldingDraft::empty(today()));
        assert!(!session.was_submitted());
    }

    #[test]
    fn editing_the_draft_never_touches_the_source() -> Result<()> {
        let source = holding()?;
        let original = source.clone();
        let mut session = EditSession::new(today());
        assert!(session.open_edit(&source));

        session.draft_mut().symbol = "MSFT".to_string();
        session.draft_mut().quantity = 99.0;
        assert!(session.close());

        assert_eq!(source, original);
        assert!(!session.is_open());
        Ok(())
    }

    #[test]
    fn unsaved_holding_cannot_be_edited() -> Result<()> {
        let mut unsaved = holding()?;
        unsaved.id = None;
        let mut session = EditSession::new(today());
        assert!(!session.open_edit(&unsaved));
        assert!(!session.is_open());
        Ok(())
    }

    #[test]
    fn blank_symbol_keeps_dialog_open() {
        let mut session = EditSession::new(today());
        session.open_new(today());
        session.draft_mut().symbol = "  ".to_string();

        assert_eq!(session.begin_submit(), SubmitAttempt::Invalid);
        assert!(session.is_open());
        assert!(session.was_submitted());
        assert!(session.symbol_error());
        assert!(!session.is_submitting());
    }

    #[test]
    fn second_submit_is_refused_until_the_first_resolves() -> Result<()> {
        let mut session = EditSession::new(today());
        session.open_edit(&holding()?);

        let SubmitAttempt::Dispatch(request) = session.begin_submit() else {
            panic!("expected a dispatch");
        };
        assert!(matches!(request, SaveRequest::Update(1, _)));
        assert_eq!(session.begin_submit(), SubmitAttempt::Busy);
        assert!(!session.close());
        assert!(!session.open_new(today()));

        session.finish_submit(&Err(SaveError::Invalid("rejected".to_string())));
        assert!(session.is_open());
        assert_eq!(session.draft().symbol, "AAPL");

        assert!(matches!(session.begin_submit(), SubmitAttempt::Dispatch(_)));
        session.finish_submit(&Ok(holding()?));
        assert!(!session.is_open());
        assert_eq!(session.begin_submit(), SubmitAttempt::NotOpen);
        Ok(())
    }

    #[test]
    fn reset_forgets_a_save_in_flight() {
        let mut session = EditSession::new(today());
        session.open_new(today());
        session.draft_mut().symbol = "AAPL".to_string();
        assert!(matches!(session.begin_submit(), SubmitAttempt::Dispatch(_)));

        session.reset();
        assert!(!session.is_open());
        assert!(!session.is_submitting());
        assert!(session.open_new(today()));
    }

    #[test]
    fn create_request_carries_no_id() {
        let mut session = EditSession::new(today());
        session.open_new(today());
        session.draft_mut().symbol = " msft ".to_string();

        match session.begin_submit() {
            SubmitAttempt::Dispatch(SaveRequest::Create(new)) => assert_eq!(new.symbol, "msft"),
            other => panic!("unexpected attempt {other:?}"),
        }
    }
}
