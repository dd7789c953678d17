// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Bidscope Store
//!
//! Everything bidscope keeps on disk.
//!
//! - **SettingsStore**: API endpoint, token and fetch tuning
//! - **DatasetStore**: Named snapshots of enriched rows
//! - **EmployeeStore**: The team roster and its shift windows
//! - **Persistence**: Atomic, owner-only JSON files
//!
//! ## Usage
//!
//! ```ignore
//! use bidscope_store::{DatasetQuery, DatasetStore, SettingsStore};
//!
//! let settings = SettingsStore::load_default().await?.get().await;
//! let fetch_settings = settings.fetch_settings();
//!
//! let datasets = DatasetStore::open_default();
//! datasets.save("march", DatasetQuery::default(), rows).await?;
//! for meta in datasets.list().await? {
//!     println!("{} ({} rows)", meta.name, meta.row_count);
//! }
//! ```

pub mod datasets;
pub mod employees;
pub mod error;
pub mod persistence;
pub mod settings_store;

pub use datasets::{Dataset, DatasetMeta, DatasetQuery, DatasetStore, sanitize_name};
pub use employees::EmployeeStore;
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_data_dir, default_datasets_dir, default_employees_path,
    default_settings_path, ensure_dir, load_json, load_json_or_default, save_json,
};
pub use settings_store::{DEFAULT_API_BASE_URL, Settings, SettingsStore, TOKEN_ENV};
