use super::*;

fn root_keys(parsed: &ParsedDocument) -> Vec<String> {
    let doc = &parsed.documents[0];
    let root = doc.root().unwrap();
    let play = doc.items(root)[0];
    doc.keys(play).into_iter().map(String::from).collect()
}

#[test]
fn test_parse_playbook_structure() {
    let text = "---\n- hosts: all\n  become: true\n  tasks:\n    - name: Install\n      ansible.builtin.apt:\n        name: nginx\n        state: present\n";
    let parsed = ParsedDocument::parse(text);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    assert_eq!(parsed.documents.len(), 1);
    assert_eq!(root_keys(&parsed), vec!["hosts", "become", "tasks"]);

    let doc = &parsed.documents[0];
    let play = doc.items(doc.root().unwrap())[0];
    let tasks = doc.get(play, "tasks").unwrap();
    assert!(doc.is_sequence(tasks));
    let task = doc.items(tasks)[0];
    let module = doc.get(task, "ansible.builtin.apt").unwrap();
    assert_eq!(doc.keys(module), vec!["name", "state"]);
    let state = doc.get(module, "state").unwrap();
    assert_eq!(doc.scalar(state), Some("present"));
    assert_eq!(&text[doc.span(state).start..doc.span(state).end], "present");
}

#[test]
fn test_sequence_at_key_indentation() {
    let text = "tags:\n- a\n- b\nname: x\n";
    let parsed = ParsedDocument::parse(text);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    let doc = &parsed.documents[0];
    let root = doc.root().unwrap();
    assert_eq!(doc.keys(root), vec!["tags", "name"]);
    assert_eq!(doc.items(doc.get(root, "tags").unwrap()).len(), 2);
}

#[test]
fn test_scalar_styles() {
    let text = "a: 'it''s'\nb: \"x\\ty\"\nc: |\n  line one\n  line two\nd: >-\n  folded\n  text\ne: [1, two, {k: v}]\nf: plain # comment\n";
    let parsed = ParsedDocument::parse(text);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    let doc = &parsed.documents[0];
    let root = doc.root().unwrap();
    let scalar = |key: &str| doc.scalar(doc.get(root, key).unwrap()).unwrap().to_string();
    assert_eq!(scalar("a"), "it's");
    assert_eq!(scalar("b"), "x\ty");
    assert_eq!(scalar("c"), "line one\nline two\n");
    assert_eq!(scalar("d"), "folded text");
    assert_eq!(scalar("f"), "plain");
    let flow = doc.get(root, "e").unwrap();
    assert_eq!(doc.items(flow).len(), 3);
    assert!(doc.is_mapping(doc.items(flow)[2]));
}

#[test]
fn test_multiple_documents() {
    let parsed = ParsedDocument::parse("a: 1\n---\nb: 2\n...\n");
    assert_eq!(parsed.documents.len(), 2);
    let second = &parsed.documents[1];
    assert_eq!(second.keys(second.root().unwrap()), vec!["b"]);
}

#[test]
fn test_error_categories() {
    let parsed = ParsedDocument::parse("a: b: c\n");
    assert!(!parsed.errors.is_empty());
    assert_eq!(parsed.errors[0].kind, ErrorKind::Syntax);

    let parsed = ParsedDocument::parse("a: 1\na: 2\n");
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(parsed.errors[0].kind, ErrorKind::Semantic);

    let parsed = ParsedDocument::parse("a: *missing\n");
    assert_eq!(parsed.errors[0].kind, ErrorKind::Reference);

    let parsed = ParsedDocument::parse("base: &b {x: 1}\nother: *b\n");
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);

    let parsed = ParsedDocument::parse("a: !custom value\n");
    assert_eq!(parsed.errors[0].kind, ErrorKind::Warning);

    let parsed = ParsedDocument::parse("a: [1, 2\nb: 3\n");
    assert!(!parsed.errors.is_empty());
    assert_eq!(parsed.errors[0].kind, ErrorKind::Syntax);
}

#[test]
fn test_duplicate_key_points_at_repeat() {
    let text = "x: {k: 1, k: 2}\n";
    let parsed = ParsedDocument::parse(text);
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(parsed.errors[0].kind, ErrorKind::Semantic);
    assert_eq!(parsed.errors[0].span.start, text.rfind('k').unwrap());
}

#[test]
fn test_alias_must_follow_its_anchor() {
    let parsed = ParsedDocument::parse("first: *later\nsecond: &later 1\n");
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(parsed.errors[0].kind, ErrorKind::Reference);
    assert!(parsed.errors[0].message.contains("later"));

    let doc = &parsed.documents[0];
    let first = doc.get(doc.root().unwrap(), "first").unwrap();
    assert_eq!(doc.kind(first), &NodeKind::Alias("later".to_string()));
}

#[test]
fn test_bad_indentation_is_syntax_error() {
    let text = "- name: a\n    bad: indent\n- name: b\n";
    let parsed = ParsedDocument::parse(text);
    assert!(!parsed.errors.is_empty());
    assert!(parsed.errors.iter().all(|e| e.kind == ErrorKind::Syntax));
}

#[test]
fn test_implicit_key_error_reaches_line() {
    let text = "- hosts: all\n  tasks\n";
    let parsed = ParsedDocument::parse(text);
    assert!(!parsed.errors.is_empty());
    let span = parsed.errors[0].span;
    assert!(span.end > text.find("tasks").unwrap());
}

#[test]
fn test_empty_sequence_item_is_null() {
    let parsed = ParsedDocument::parse("- a\n-\n- c\n");
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    let doc = &parsed.documents[0];
    let items = doc.items(doc.root().unwrap());
    assert_eq!(items.len(), 3);
    assert_eq!(doc.kind(items[1]), &NodeKind::Null);
}

#[test]
fn test_path_at_synthetic_key() {
    let text = "- hosts: all\n  tasks:\n    - _:\n";
    let parsed = ParsedDocument::parse(text);
    let offset = text.find('_').unwrap();
    let path = path_at(&parsed, offset, true).unwrap();
    let doc = path.doc();

    assert_eq!(path.key_name(), Some("_"));
    // seq, play map, pair, tasks seq, task map, pair, key
    assert_eq!(path.len(), 7);

    let task_map = path.ancestry().parent_of_key();
    assert!(doc.is_mapping(task_map.node().unwrap()));
    let tasks = task_map.parent(Some(Expect::Sequence));
    assert_eq!(tasks.path().unwrap().len(), 4);
    let play = tasks.parent(Some(Expect::Mapping));
    assert_eq!(play.string_key(), Some("tasks"));
    let key_path = play.key_path().unwrap();
    assert_eq!(key_path.key_name(), Some("tasks"));
}

#[test]
fn test_path_between_key_and_value() {
    let text = "key:    value\n";
    let parsed = ParsedDocument::parse(text);
    let path = path_at(&parsed, 5, true).unwrap();
    assert_eq!(path.last(), Some(Step::Empty));
    assert!(path.doc().is_pair(path.get(1).unwrap().node().unwrap()));
}
