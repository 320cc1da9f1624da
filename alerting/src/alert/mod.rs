//! Alert model, factory, and store.
//!
//! The alert surface consumed by presentation layers:
//!
//! 1. **Types** (`types.rs`): the `Alert` entity, severity ladder, source
//!    tags, and the closed per-variant metadata union.
//!
//! 2. **Factory** (`factory.rs`): drafts built from grouped records plus
//!    producer context, with convenience constructors for the common
//!    producers.
//!
//! 3. **Store** (`store.rs`): capacity-bounded, severity-aware active set
//!    with an append-only history and broadcast change notification.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  AlertGroup  │────▶│ AlertFactory │────▶│  AlertStore  │
//! │  (+context)  │     │   (draft)    │     │ active + log │
//! └──────────────┘     └──────────────┘     └──────┬───────┘
//!                                                  │ broadcast
//!                                                  ▼
//!                                           ┌──────────────┐
//!                                           │ Subscribers  │
//!                                           └──────────────┘
//! ```

mod factory;
mod store;
mod types;

pub use factory::{AlertContext, AlertFactory};
pub use store::{
    AlertStore, AlertStoreConfig, AlertStoreEvent, SharedAlertStore, StoreError, StoreResult,
};
pub use types::{Alert, AlertDraft, AlertMetadata, AlertSource, Severity};
