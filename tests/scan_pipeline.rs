//! End-to-end scan sessions over a fixture transport
//!
//! Covers event ordering, counts, ignore handling, manifest delivery and
//! cooperative cancellation.

mod common;

use common::{acquirer, emitter, fixture, FixtureTransport, REMOTE};
use std::sync::Arc;
use std::time::Duration;
use todoscan::events::ScanEvent;
use todoscan::repository::api::AcquireMode;

fn todos(events: &[ScanEvent]) -> Vec<(String, usize, String, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Todo { todo, .. } => Some((
                todo.file_path.clone(),
                todo.line_num,
                todo.todo_text.clone(),
                todo.next_line.clone(),
            )),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_marker_with_following_line() {
    let source = fixture(&[("src/parser.py", "# TODO: fix parser\ndef run():\n    pass\n")]);
    let repos = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(FixtureTransport::new(source.path()));

    let events = emitter(acquirer(repos.path(), transport))
        .start(REMOTE, AcquireMode::Sync)
        .collect_all()
        .await;

    assert_eq!(
        todos(&events),
        vec![(
            "src/parser.py".to_string(),
            1,
            "# TODO: fix parser".to_string(),
            "def run():".to_string()
        )]
    );
    assert_eq!(events.last(), Some(&ScanEvent::Complete { count: 1 }));
}

#[tokio::test]
async fn test_event_sequence_is_ordered_and_counted() {
    let source = fixture(&[
        ("b.rs", "// FIXME: second file\nfn b() {}\n"),
        ("a.rs", "// TODO: first file\nfn a() {}\n// NOTE: last line"),
        ("docs/TODO.md", "- [ ] write docs\n"),
        ("lib/c.py", "x = 1  # BUG: off by one\n"),
    ]);
    let repos = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(FixtureTransport::new(source.path()));

    let events = emitter(acquirer(repos.path(), transport))
        .start(REMOTE, AcquireMode::Sync)
        .collect_all()
        .await;

    let names = events.iter().map(ScanEvent::name).collect::<Vec<_>>();
    assert_eq!(names.first(), Some(&"init"));
    assert_eq!(&names[names.len() - 2..], &["todo_md_files", "complete"]);

    let found = todos(&events);
    let files = found.iter().map(|t| t.0.as_str()).collect::<Vec<_>>();
    assert_eq!(files, vec!["a.rs", "a.rs", "b.rs", "lib/c.py"]);
    assert_eq!(found[1].3, "", "marker on the final line has no next line");

    let counts = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Todo { count, .. } => Some(*count),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(counts, vec![1, 2, 3, 4]);
    assert_eq!(events.last(), Some(&ScanEvent::Complete { count: 4 }));

    match &events[events.len() - 2] {
        ScanEvent::TodoMdFiles { files } => {
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].file_path, "docs/TODO.md");
            assert_eq!(files[0].content, "- [ ] write docs\n");
        }
        other => panic!("expected manifest files, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exactly_one_terminal_event() {
    let source = fixture(&[("main.go", "// TODO: one\n// TODO: two\n")]);
    let repos = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(FixtureTransport::new(source.path()));

    let events = emitter(acquirer(repos.path(), transport))
        .start(REMOTE, AcquireMode::Sync)
        .collect_all()
        .await;

    let terminal = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminal, 1);
    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn test_ignore_rules_exclude_generated_files() {
    let source = fixture(&[
        (".gitignore", "*.generated.go\nvendor/\n"),
        ("api.generated.go", "// TODO: generated marker\n"),
        ("api.go", "// FIXME(bug)\n"),
        ("vendor/dep/dep.go", "// TODO: vendored marker\n"),
    ]);
    let repos = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(FixtureTransport::new(source.path()));

    let events = emitter(acquirer(repos.path(), transport))
        .start(REMOTE, AcquireMode::Sync)
        .collect_all()
        .await;

    let files = todos(&events).into_iter().map(|t| t.0).collect::<Vec<_>>();
    assert_eq!(files, vec!["api.go".to_string()]);
}

#[tokio::test]
async fn test_unknown_repository_emits_only_error() {
    let repos = tempfile::TempDir::new().unwrap();
    let source = fixture(&[]);
    let transport = Arc::new(FixtureTransport::new(source.path()));

    let events = emitter(acquirer(repos.path(), Arc::clone(&transport)))
        .start("no-such-repository", AcquireMode::Sync)
        .collect_all()
        .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        ScanEvent::Error { code, message, .. } => {
            assert_eq!(code, "NotFound");
            assert!(!message.is_empty());
        }
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(transport.clone_count(), 0);
}

#[tokio::test]
async fn test_error_event_wire_shape() {
    let repos = tempfile::TempDir::new().unwrap();
    let source = fixture(&[]);
    let transport = Arc::new(FixtureTransport::new(source.path()));

    let events = emitter(acquirer(repos.path(), transport))
        .start("", AcquireMode::Sync)
        .collect_all()
        .await;

    let json: serde_json::Value = serde_json::from_str(&events[0].to_json().unwrap()).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["code"], "NotFound");
    assert!(json["correlation_id"].as_str().unwrap().starts_with("ERR-"));
}

#[tokio::test]
async fn test_dropping_stream_cancels_scan() {
    let files = (0..200)
        .map(|i| (format!("src/file{:03}.rs", i), "// TODO: item\nfn f() {}\n".to_string()))
        .collect::<Vec<_>>();
    let borrowed = files
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect::<Vec<_>>();
    let source = fixture(&borrowed);
    let repos = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(FixtureTransport::new(source.path()));

    let mut stream = emitter(acquirer(repos.path(), transport))
        .with_capacity(1)
        .start(REMOTE, AcquireMode::Sync);

    let mut received = Vec::new();
    while received.len() < 3 {
        received.push(stream.next_event().await.unwrap());
    }
    assert_eq!(received[0].name(), "init");

    tokio::time::timeout(Duration::from_secs(10), stream.cancel())
        .await
        .expect("producer should stop after cancellation");
}

#[tokio::test]
async fn test_close_keeps_buffered_events_only() {
    let source = fixture(&[("a.rs", "// TODO: a\n// TODO: b\n// TODO: c\n")]);
    let repos = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(FixtureTransport::new(source.path()));

    let mut stream = emitter(acquirer(repos.path(), transport))
        .with_capacity(1)
        .start(REMOTE, AcquireMode::Sync);

    let first = stream.next_event().await.unwrap();
    assert_eq!(first.name(), "init");
    stream.close();

    let mut rest = Vec::new();
    while let Some(event) = stream.next_event().await {
        rest.push(event);
    }
    assert!(rest.len() <= 1, "at most the buffered event remains: {:?}", rest);
    assert!(!rest.iter().any(|e| matches!(e, ScanEvent::Complete { .. })));
}
