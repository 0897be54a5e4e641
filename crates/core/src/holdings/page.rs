use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::{
    confirm::ConfirmationFlow,
    edit::{EditSession, SaveRequest, SubmitAttempt},
    store::HoldingsStore,
};
use crate::{
    error::{DeleteError, LoadError, SaveError},
    models::{Brokerage, Holding, HoldingId},
    notify::{Notification, NotificationSink},
    session::SessionStore,
};

/// Remote work requested by the page.
///
/// Requests are plain values so a front-end can run them wherever it runs
/// async work and hand the [`PageResult`] back to [`HoldingsPage::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum PageRequest {
    /// Reload the holdings list.
    LoadHoldings,
    /// Reload the brokerage reference list.
    LoadBrokerages,
    /// Re-fetch one listed holding.
    Refresh(HoldingId),
    /// Send the dialog's save.
    Save(SaveRequest),
    /// Delete a confirmed holding.
    Delete(HoldingId),
}

impl PageRequest {
    /// Run the request against `store`.
    pub async fn execute(self, store: &HoldingsStore) -> PageResult {
        match self {
            PageRequest::LoadHoldings => PageResult::HoldingsLoaded(store.load().await),
            PageRequest::LoadBrokerages => {
                PageResult::BrokeragesLoaded(store.load_brokerages().await)
            }
            PageRequest::Refresh(id) => PageResult::Refreshed(store.get(id).await),
            PageRequest::Save(SaveRequest::Create(holding)) => PageResult::Saved {
                created: true,
                result: store.create(&holding).await,
            },
            PageRequest::Save(SaveRequest::Update(id, changes)) => PageResult::Saved {
                created: false,
                result: store.update(id, &changes).await,
            },
            PageRequest::Delete(id) => PageResult::Deleted {
                id,
                result: store.delete(id).await,
            },
        }
    }
}

/// Outcome of a [`PageRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    /// Holdings reload finished.
    HoldingsLoaded(Result<Vec<Holding>, LoadError>),
    /// Brokerage reload finished.
    BrokeragesLoaded(Result<Vec<Brokerage>, LoadError>),
    /// Single-holding refresh finished.
    Refreshed(Result<Holding, LoadError>),
    /// A dialog save finished.
    Saved {
        /// The save was a create.
        created: bool,
        /// Server answer.
        result: Result<Holding, SaveError>,
    },
    /// A delete finished.
    Deleted {
        /// Deleted holding.
        id: HoldingId,
        /// Server answer.
        result: Result<(), DeleteError>,
    },
}

impl PageResult {
    /// Whether the server rejected the session cookie.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            PageResult::HoldingsLoaded(Err(err))
            | PageResult::BrokeragesLoaded(Err(err))
            | PageResult::Refreshed(Err(err)) => err.is_unauthorized(),
            PageResult::Saved {
                result: Err(err), ..
            } => err.is_unauthorized(),
            PageResult::Deleted {
                result: Err(err), ..
            } => err.is_unauthorized(),
            _ => false,
        }
    }
}

/// What the front-end should do after applying a result.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Nothing further.
    Idle,
    /// Run this request next.
    Follow(PageRequest),
    /// The session is gone; leave for the login page.
    RedirectToLogin,
}

/// Controller behind the protected holdings page.
///
/// It owns the dialog and the delete confirmation, shares the holdings and
/// session stores, and is the place where an authorization failure from
/// any call turns into a session reset and a redirect.
pub struct HoldingsPage {
    store: Arc<HoldingsStore>,
    session: Arc<SessionStore>,
    notifier: Arc<dyn NotificationSink>,
    edit: EditSession,
    confirm: ConfirmationFlow,
}

impl HoldingsPage {
    /// Page over the shared stores.
    pub fn new(
        store: Arc<HoldingsStore>,
        session: Arc<SessionStore>,
        notifier: Arc<dyn NotificationSink>,
        today: NaiveDate,
    ) -> Self {
        Self {
            store,
            session,
            notifier,
            edit: EditSession::new(today),
            confirm: ConfirmationFlow::default(),
        }
    }

    /// Holdings store backing the page.
    pub fn store(&self) -> &Arc<HoldingsStore> {
        &self.store
    }

    /// Start from a clean store and request both lists.
    pub fn mount(&mut self) -> [PageRequest; 2] {
        self.store.reset();
        [PageRequest::LoadHoldings, PageRequest::LoadBrokerages]
    }

    /// Dialog state.
    pub fn edit(&self) -> &EditSession {
        &self.edit
    }

    /// Mutable dialog state, for field input.
    pub fn edit_mut(&mut self) -> &mut EditSession {
        &mut self.edit
    }

    /// Delete confirmation state.
    pub fn confirmation(&self) -> &ConfirmationFlow {
        &self.confirm
    }

    /// Open the dialog for a new holding.
    pub fn open_new(&mut self, today: NaiveDate) -> bool {
        self.edit.open_new(today)
    }

    /// Open the dialog on a copy of the holding with `id`.
    pub fn open_edit(&mut self, id: HoldingId) -> bool {
        match self.store.find(id) {
            Some(holding) => self.edit.open_edit(&holding),
            None => false,
        }
    }

    /// Cancel the dialog.
    pub fn close_dialog(&mut self) -> bool {
        self.edit.close()
    }

    /// Press "save". `None` when nothing should be sent.
    pub fn submit(&mut self) -> Option<PageRequest> {
        match self.edit.begin_submit() {
            SubmitAttempt::Dispatch(request) => Some(PageRequest::Save(request)),
            SubmitAttempt::Invalid => {
                info!("Holding form rejected: symbol is required");
                None
            }
            SubmitAttempt::Busy | SubmitAttempt::NotOpen => None,
        }
    }

    /// Ask before deleting the holding with `id`, returning the prompt.
    pub fn request_delete(&mut self, id: HoldingId) -> Option<String> {
        let holding = self.store.find(id)?;
        self.confirm.request(&holding)
    }

    /// Answer "no" to the pending confirmation.
    pub fn decline_delete(&mut self) -> bool {
        self.confirm.decline()
    }

    /// Answer "yes" to the pending confirmation.
    pub fn accept_delete(&mut self) -> Option<PageRequest> {
        self.confirm.accept().map(PageRequest::Delete)
    }

    /// Fold a finished request into the page state.
    pub fn apply(&mut self, result: PageResult) -> PageOutcome {
        if result.is_unauthorized() {
            return self.expire();
        }

        match result {
            PageResult::HoldingsLoaded(_)
            | PageResult::BrokeragesLoaded(_)
            | PageResult::Refreshed(_) => PageOutcome::Idle,
            PageResult::Saved { created, result } => {
                self.edit.finish_submit(&result);
                match result {
                    Ok(_) => {
                        let detail = if created {
                            "Holding Created"
                        } else {
                            "Holding Updated"
                        };
                        self.notifier.notify(Notification::success(detail));
                        PageOutcome::Idle
                    }
                    Err(SaveError::TargetNotFound(id)) => {
                        warn!(id, "Re-syncing holdings after update of a vanished entry");
                        PageOutcome::Follow(PageRequest::LoadHoldings)
                    }
                    Err(_) => PageOutcome::Idle,
                }
            }
            PageResult::Deleted { result, .. } => {
                self.confirm.finish();
                if result.is_ok() {
                    self.notifier.notify(Notification::success("Holding Deleted"));
                }
                PageOutcome::Idle
            }
        }
    }

    /// Run `request` to completion and apply its result.
    pub async fn run(&mut self, request: PageRequest) -> PageOutcome {
        let result = request.execute(&self.store).await;
        self.apply(result)
    }

    fn expire(&mut self) -> PageOutcome {
        self.session.invalidate();
        self.store.reset();
        self.edit.reset();
        self.confirm.finish();
        self.notifier.notify(Notification::info(
            "Session expired",
            "Please log in again",
        ));
        PageOutcome::RedirectToLogin
    }
}
