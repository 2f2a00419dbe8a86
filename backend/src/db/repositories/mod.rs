//! Store implementations.
//!
//! - `firestore`: Google Cloud Firestore over its REST API
//! - `local`: in-memory store for development and tests
//! - `unavailable`: degraded-mode store whose writes always fail
pub mod firestore;
pub mod local;
pub mod unavailable;

pub use firestore::FirestoreStore;
pub use local::{LocalRepository, StoredDocument};
pub use unavailable::UnavailableStore;
