//! Tests for the rolling terminal line buffer and saved line logs.

use promptscan::extract;
use promptscan::line_log::{LineLog, read_line_log};

// ---------------------------------------------------------------------------
// Line assembly
// ---------------------------------------------------------------------------

#[test]
fn test_complete_lines_are_stored() {
    let mut log = LineLog::new(10);
    log.push_bytes(b"first line\nsecond line\n");

    assert_eq!(log.lines(), vec!["first line", "second line"]);
}

#[test]
fn test_partial_line_is_held_until_completed() {
    let mut log = LineLog::new(10);
    log.push_bytes(b"Do you want ");
    assert!(log.is_empty());

    log.push_bytes(b"to proceed?\n1. Y");
    assert_eq!(log.lines(), vec!["Do you want to proceed?"]);

    log.push_bytes(b"es\n");
    assert_eq!(log.lines(), vec!["Do you want to proceed?", "1. Yes"]);
}

#[test]
fn test_multibyte_char_split_across_chunks() {
    let data = "│ ❯ 1. Yes │\n".as_bytes();
    // Split inside the three-byte box character and again inside the cursor.
    let mut log = LineLog::new(10);
    log.push_bytes(&data[..1]);
    log.push_bytes(&data[1..5]);
    log.push_bytes(&data[5..]);

    assert_eq!(log.lines(), vec!["1. Yes"]);
}

#[test]
fn test_crlf_split_across_chunks() {
    let mut log = LineLog::new(10);
    log.push_bytes(b"one\r");
    log.push_bytes(b"\ntwo\n");

    assert_eq!(log.lines(), vec!["one", "two"]);
}

#[test]
fn test_mixed_line_endings() {
    let mut log = LineLog::new(10);
    log.push_bytes(b"one\r\ntwo\rthree\n\n\nfour\n");

    assert_eq!(log.lines(), vec!["one", "two", "three", "four"]);
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let mut log = LineLog::new(10);
    log.push_bytes(b"bad \xff byte\n");

    assert_eq!(log.len(), 1);
    assert!(log.lines()[0].contains('\u{FFFD}'));
}

#[test]
fn test_lines_are_cleaned() {
    let mut log = LineLog::new(10);
    log.push_str("\x1b[1m│ ❯ 1. Yes │\x1b[0m\n\x1b[2K\n   \n");

    assert_eq!(log.lines(), vec!["1. Yes"]);
}

#[test]
fn test_noise_is_dropped() {
    let mut log = LineLog::new(10);
    log.push_str("Do you want to proceed?\n1.7k tokens\n✻ Pondering…\n────\n1. Yes\n");

    assert_eq!(log.lines(), vec!["Do you want to proceed?", "1. Yes"]);
}

#[test]
fn test_custom_skip_patterns_replace_defaults() {
    let mut log = LineLog::with_skip_patterns(10, &[r"^DEBUG"]).unwrap();
    log.push_str("DEBUG noisy\n1.7k tokens\nkept\n");

    assert_eq!(log.lines(), vec!["1.7k tokens", "kept"]);
}

#[test]
fn test_invalid_skip_pattern_is_an_error() {
    let err = LineLog::with_skip_patterns(10, &["("]).unwrap_err();
    assert!(err.contains("invalid skip pattern"));
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

#[test]
fn test_oldest_lines_are_evicted() {
    let mut log = LineLog::new(3);
    for i in 0..5 {
        log.push_str(&format!("line {i}\n"));
    }

    assert_eq!(log.len(), 3);
    assert_eq!(log.lines(), vec!["line 2", "line 3", "line 4"]);
}

#[test]
fn test_zero_capacity_keeps_nothing() {
    let mut log = LineLog::new(0);
    log.push_str("line\n");
    assert!(log.is_empty());
}

#[test]
fn test_last_n() {
    let mut log = LineLog::new(10);
    log.push_str("a\nb\nc\n");

    assert_eq!(log.last_n(2), vec!["b", "c"]);
    assert_eq!(log.last_n(10), vec!["a", "b", "c"]);
    assert!(log.last_n(0).is_empty());
}

#[test]
fn test_default_capacity() {
    assert_eq!(LineLog::default().max_lines(), 500);
}

// ---------------------------------------------------------------------------
// Session change detection
// ---------------------------------------------------------------------------

#[test]
fn test_session_change_flag() {
    let mut log = LineLog::new(10);
    log.push_str("hello\n");
    assert!(!log.session_change_pending());

    log.push_str("> /compact\n");
    assert!(log.session_change_pending());
    assert!(log.acknowledge_session_change());
    assert!(!log.session_change_pending());
    assert!(!log.acknowledge_session_change());
}

#[test]
fn test_session_change_seen_on_skipped_line() {
    let mut log = LineLog::with_skip_patterns(10, &["^/"]).unwrap();
    log.push_str("/resume\n");

    assert!(log.is_empty());
    assert!(log.session_change_pending());
}

// ---------------------------------------------------------------------------
// Save / read
// ---------------------------------------------------------------------------

#[test]
fn test_save_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("line_log.txt");

    let mut log = LineLog::new(10);
    log.push_str("Do you want to proceed?\n1. Yes\n2. No\n");
    log.save_to_file(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "   0: Do you want to proceed?\n   1: 1. Yes\n   2: 2. No\n");

    let lines = read_line_log(&path, None).unwrap();
    assert_eq!(lines, log.lines());
}

#[test]
fn test_read_line_log_skips_comments_and_applies_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("line_log.txt");
    std::fs::write(
        &path,
        "# captured from a live session\n   0: Claude wants to edit main.rs\n   1: 1. Yes\nstray\n   2: 2. No\n",
    )
    .unwrap();

    assert_eq!(
        read_line_log(&path, None).unwrap(),
        vec!["Claude wants to edit main.rs", "1. Yes", "2. No"]
    );
    assert_eq!(read_line_log(&path, Some(2)).unwrap(), vec!["1. Yes", "2. No"]);
    assert_eq!(read_line_log(&path, Some(99)).unwrap().len(), 3);
}

#[test]
fn test_read_missing_line_log() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_line_log(dir.path().join("nope.txt"), None).unwrap_err();
    assert!(err.contains("failed to read line log"));
}

// ---------------------------------------------------------------------------
// Buffer to extractor
// ---------------------------------------------------------------------------

#[test]
fn test_raw_prompt_output_is_detected() {
    let mut log = LineLog::default();
    log.push_str("\x1b[1mEdit file\x1b[0m\r\n");
    log.push_str("╭──────────────────────────────────────╮\r\n");
    log.push_str("│ Do you want to make this edit?       │\r\n");
    log.push_str("│ \x1b[36m❯ 1. Yes\x1b[0m                            │\r\n");
    log.push_str("│   2. Yes, allow all edits this session │\r\n");
    log.push_str("│   3. No, and tell Claude what to do  │\r\n");
    log.push_str("╰──────────────────────────────────────╯\r\n");

    let result = extract(&log.last_n(50)).unwrap();
    assert_eq!(result.question.as_deref(), Some("Do you want to make this edit?"));
    assert_eq!(
        result.options,
        vec![
            "Yes",
            "Yes, allow all edits this session",
            "No, and tell Claude what to do"
        ]
    );
}
