//! Data Manager crate for Chart Notes
//!
//! Owns durable storage ([`Backend`] with local and remote implementations)
//! and the client-side stores built over it: the optimistic [`PointStore`]
//! and the debounced [`SettingsStore`].

pub mod backend;
pub mod import;
pub mod local_store;
pub mod point_store;
pub mod remote_store;
pub mod settings_store;

pub use backend::{open_backend, Backend};
pub use import::{parse_paste, PasteImport};
pub use local_store::{FileSlot, LocalStore, MemorySlot, StorageSlot, StoreState};
pub use point_store::{BulkReport, PointStore};
pub use remote_store::RemoteStore;
pub use settings_store::{SettingsStore, DEFAULT_DEBOUNCE};
