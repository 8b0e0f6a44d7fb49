//! Playbook Core Library
//!
//! Document intelligence for Ansible YAML: workspace folders, completion,
//! diagnostics, execution environments and the command runner behind them.
//!

pub mod ansible;
pub mod completion;
pub mod config;
pub mod deferred;
pub mod docs;
pub mod ee;
pub mod error;
pub mod exec;
pub mod line_map;
pub mod lint;
pub mod metadata;
pub mod model;
pub mod notify;
pub mod syntax;
pub mod tool_config;
pub mod utils;
pub mod validation;
pub mod vfs;
pub mod workspace;

pub use config::Settings;
pub use utils::expand_path;
pub use workspace::{FolderContext, Services, WorkspaceManager};
