//! Holdings page: the entity store, the create/edit dialog, the delete
//! confirmation, and the controller tying them to the session.

mod confirm;
mod edit;
mod page;
mod store;

pub use confirm::{ConfirmState, ConfirmationFlow};
pub use edit::{DialogMode, EditSession, SaveRequest, SubmitAttempt};
pub use page::{HoldingsPage, PageOutcome, PageRequest, PageResult};
pub use store::{
    HoldingsStore, BROKERAGES_FAILED, CREATE_FAILED, DELETE_FAILED, LOAD_FAILED, UPDATE_FAILED,
};
