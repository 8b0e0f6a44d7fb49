//! Module documentation index.

mod finder;
mod library;
mod model;

pub use finder::{extract_documentation, parse_routing, ModuleEntry};
pub use library::DocsLibrary;
pub use model::{ModuleDoc, OptionDoc, OptionSet, PluginRoute, RouteNotice};
