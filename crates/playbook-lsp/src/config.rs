use playbook_core::Settings;

/// Settings section the client sends under `initializationOptions` and
/// `workspace/didChangeConfiguration`.
pub const SETTINGS_SECTION: &str = "ansible";

/// Settings found in a client payload. The payload is either the whole
/// settings tree (with an `ansible` key) or the section itself.
pub fn settings_from_payload(payload: &serde_json::Value) -> Option<Result<Settings, serde_json::Error>> {
    let section = match payload.get(SETTINGS_SECTION) {
        Some(section) if section.is_object() => section,
        _ if payload.is_object() => payload,
        _ => return None,
    };
    Some(Settings::from_json(section.clone()))
}
