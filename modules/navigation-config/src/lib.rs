//! Sidebar navigation configuration for the admin console.
//!
//! Sections and pages live in a [`ConfigStore`]; [`NavigationManager`] is the
//! front door that validates edits, plans reorders, guards deletions and keeps
//! the derived registries fresh.

pub mod config;
pub mod defaults;
pub mod draft;
pub mod error;
pub mod guard;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod registry;
pub mod render;
pub mod reorder;
pub mod store;
pub mod types;
pub mod validate;

pub use config::{AppConfig, FileConfig};
pub use defaults::{Baseline, DefaultsResetter};
pub use draft::{PageDraft, PageEdit, ResetConfirmation, SectionDraft, SectionEdit};
pub use error::{DeletionBlocked, NavError, RecordKind, Result};
pub use manager::NavigationManager;
pub use memory::MemoryConfigStore;
pub use postgres::PgConfigStore;
pub use registry::{PageRegistry, RegistryCache, SectionRegistry, Snapshot};
pub use render::{GrantedPermissions, NavGroup, NavItem, PermissionChecker};
pub use store::ConfigStore;
pub use types::*;
