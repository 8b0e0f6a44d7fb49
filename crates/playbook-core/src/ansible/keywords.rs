//! Playbook keyword tables.

use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const PLAY_KEYWORDS: &[&str] = &[
    "any_errors_fatal",
    "become",
    "become_exe",
    "become_flags",
    "become_method",
    "become_user",
    "check_mode",
    "collections",
    "connection",
    "debugger",
    "diff",
    "environment",
    "fact_path",
    "force_handlers",
    "gather_facts",
    "gather_subset",
    "gather_timeout",
    "handlers",
    "hosts",
    "ignore_errors",
    "ignore_unreachable",
    "max_fail_percentage",
    "module_defaults",
    "name",
    "no_log",
    "order",
    "port",
    "post_tasks",
    "pre_tasks",
    "remote_user",
    "roles",
    "run_once",
    "serial",
    "strategy",
    "tags",
    "tasks",
    "throttle",
    "timeout",
    "vars",
    "vars_files",
    "vars_prompt",
];

pub const ROLE_KEYWORDS: &[&str] = &[
    "any_errors_fatal",
    "become",
    "become_exe",
    "become_flags",
    "become_method",
    "become_user",
    "check_mode",
    "collections",
    "connection",
    "debugger",
    "delegate_facts",
    "delegate_to",
    "diff",
    "environment",
    "ignore_errors",
    "ignore_unreachable",
    "module_defaults",
    "name",
    "no_log",
    "port",
    "remote_user",
    "run_once",
    "tags",
    "throttle",
    "timeout",
    "vars",
    "when",
];

pub const BLOCK_KEYWORDS: &[&str] = &[
    "always",
    "any_errors_fatal",
    "become",
    "become_exe",
    "become_flags",
    "become_method",
    "become_user",
    "block",
    "check_mode",
    "collections",
    "connection",
    "debugger",
    "delegate_facts",
    "delegate_to",
    "diff",
    "environment",
    "ignore_errors",
    "ignore_unreachable",
    "module_defaults",
    "name",
    "no_log",
    "notify",
    "port",
    "remote_user",
    "rescue",
    "run_once",
    "tags",
    "throttle",
    "timeout",
    "vars",
    "when",
];

pub const TASK_KEYWORDS: &[&str] = &[
    "action",
    "any_errors_fatal",
    "args",
    "async",
    "become",
    "become_exe",
    "become_flags",
    "become_method",
    "become_user",
    "changed_when",
    "check_mode",
    "collections",
    "connection",
    "debugger",
    "delay",
    "delegate_facts",
    "delegate_to",
    "diff",
    "environment",
    "failed_when",
    "ignore_errors",
    "ignore_unreachable",
    "local_action",
    "loop",
    "loop_control",
    "module_defaults",
    "name",
    "no_log",
    "notify",
    "poll",
    "port",
    "register",
    "remote_user",
    "retries",
    "run_once",
    "tags",
    "throttle",
    "timeout",
    "until",
    "vars",
    "when",
    "listen",
];

/// Keys that open a task list.
pub const TASK_LIST_KEYS: &[&str] = &[
    "tasks",
    "pre_tasks",
    "post_tasks",
    "block",
    "rescue",
    "always",
    "handlers",
];

/// Play keywords that appear in no other context.
pub fn play_exclusive_keywords() -> &'static BTreeSet<&'static str> {
    static SET: OnceLock<BTreeSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        PLAY_KEYWORDS
            .iter()
            .copied()
            .filter(|k| {
                !TASK_KEYWORDS.contains(k) && !ROLE_KEYWORDS.contains(k) && !BLOCK_KEYWORDS.contains(k)
            })
            .collect()
    })
}

/// Play keywords that are not also task keywords, in table order.
pub fn play_without_task_keywords() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        PLAY_KEYWORDS
            .iter()
            .copied()
            .filter(|k| !TASK_KEYWORDS.contains(k))
            .collect()
    })
}

pub fn is_task_keyword(key: &str) -> bool {
    TASK_KEYWORDS.contains(&key) || key.starts_with("with_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        assert_eq!(PLAY_KEYWORDS.len(), 41);
        assert_eq!(ROLE_KEYWORDS.len(), 27);
        assert_eq!(BLOCK_KEYWORDS.len(), 31);
        assert_eq!(TASK_KEYWORDS.len(), 42);
    }

    #[test]
    fn test_derived_sets() {
        let exclusive = play_exclusive_keywords();
        assert!(exclusive.contains("hosts"));
        assert!(exclusive.contains("roles"));
        assert!(!exclusive.contains("name"));
        assert!(!exclusive.contains("vars"));

        let without_task = play_without_task_keywords();
        assert!(without_task.contains(&"hosts"));
        assert!(!without_task.contains(&"become"));

        assert!(is_task_keyword("with_items"));
        assert!(is_task_keyword("loop"));
        assert!(!is_task_keyword("ansible.builtin.copy"));
    }
}
