//! Knowledge of the playbook structure: keywords and positional predicates.

mod keywords;
mod structure;

pub use keywords::{
    is_task_keyword, play_exclusive_keywords, play_without_task_keywords, BLOCK_KEYWORDS,
    PLAY_KEYWORDS, ROLE_KEYWORDS, TASK_KEYWORDS, TASK_LIST_KEYS,
};
pub use structure::{
    declared_collections, is_block_param, is_play_param, is_playbook, is_role_param,
    is_task_param, provided_module_names, task_param_path_with_trace, TraceKind,
};
