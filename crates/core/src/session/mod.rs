//! Session belief and its persistence.

mod persistence;
mod store;

pub use persistence::{
    FileSessionPersistence, MemorySessionPersistence, SessionPersistence, SessionRecord,
};
pub use store::{
    validate_login, validate_registration, SessionBelief, SessionStore, MIN_PASSWORD_LEN,
};
