#![warn(clippy::all, missing_docs)]

//! Core logic for the holdings tracker client.
//!
//! This crate hosts the data models, configuration handling, the API
//! client, the session and holdings stores, and the route guard used by
//! the terminal UI and any future frontends.

pub mod api;
pub mod config;
pub mod error;
pub mod holdings;
pub mod models;
pub mod notify;
pub mod routes;
pub mod session;

pub use api::{ApiClient, HttpTransport, Transport};
pub use config::AppConfig;
pub use error::{ApiError, AuthError, DeleteError, LoadError, SaveError};
pub use holdings::{HoldingsPage, HoldingsStore, PageOutcome, PageRequest, PageResult};
pub use models::{Brokerage, Credentials, Holding, HoldingDraft, PortfolioSummary};
pub use notify::{Notification, NotificationLog, NotificationSink, Severity};
pub use routes::{GuardDecision, Route, RouteGuard, Router};
pub use session::{FileSessionPersistence, SessionBelief, SessionStore};
