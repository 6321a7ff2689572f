// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn earliest_match_prefers_stream_order() {
    let patterns = vec![
        Regex::new("bbb").unwrap(),
        Regex::new("aaa").unwrap(),
    ];
    // "aaa" occurs first in the stream even though it is the second pattern.
    let found = earliest_match(&patterns, "xx aaa yy bbb").unwrap();
    assert_eq!(found.0, 1);
    assert_eq!(found.1, 3);
}

#[test]
fn earliest_match_ties_go_to_lowest_index() {
    let patterns = vec![
        Regex::new("ab").unwrap(),
        Regex::new("abc").unwrap(),
    ];
    let found = earliest_match(&patterns, "zzabc").unwrap();
    assert_eq!(found.0, 0);
}

#[test]
fn earliest_match_none_without_match() {
    let patterns = vec![Regex::new("needle").unwrap()];
    assert!(earliest_match(&patterns, "haystack").is_none());
}

#[cfg(unix)]
mod live {
    use super::*;

    fn sh(script: &str) -> WorkerCommand {
        WorkerCommand::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let mut pty = PtySession::spawn(&sh("echo hello from worker")).unwrap();
        let outcome = pty.expect(&[], Duration::from_secs(10)).await;
        assert_eq!(outcome, ExpectOutcome::Eof);
        let output = pty.take_output();
        assert!(output.contains("hello from worker"), "output: {output:?}");
        assert_eq!(pty.close(Duration::from_secs(2)).await, Some(0));
    }

    #[tokio::test]
    async fn expect_matches_prompt_and_write_line_answers() {
        let script = r#"printf 'ready> '; read answer; echo "got $answer""#;
        let mut pty = PtySession::spawn(&sh(script)).unwrap();

        let patterns = vec![Regex::new("ready> ").unwrap()];
        let outcome = pty.expect(&patterns, Duration::from_secs(10)).await;
        match outcome {
            ExpectOutcome::Matched { index, matched, .. } => {
                assert_eq!(index, 0);
                assert_eq!(matched, "ready> ");
            }
            other => panic!("expected match, got {other:?}"),
        }

        pty.write_line("go").unwrap();

        let done = vec![Regex::new("got go").unwrap()];
        let outcome = pty.expect(&done, Duration::from_secs(10)).await;
        assert!(matches!(outcome, ExpectOutcome::Matched { .. }), "got {outcome:?}");

        pty.close(Duration::from_secs(2)).await;
    }

    #[tokio::test]
    async fn expect_times_out_while_worker_is_silent() {
        let mut pty = PtySession::spawn(&sh("sleep 5")).unwrap();
        let patterns = vec![Regex::new("never").unwrap()];
        let outcome = pty.expect(&patterns, Duration::from_millis(200)).await;
        assert_eq!(outcome, ExpectOutcome::TimedOut);
        // Zero grace goes straight to SIGKILL.
        assert_eq!(pty.close(Duration::ZERO).await, None);
    }

    #[tokio::test]
    async fn take_output_includes_matched_text() {
        let mut pty = PtySession::spawn(&sh("printf 'before MARKER after'; sleep 0.2")).unwrap();
        let patterns = vec![Regex::new("MARKER").unwrap()];
        let outcome = pty.expect(&patterns, Duration::from_secs(10)).await;
        match outcome {
            ExpectOutcome::Matched { prefix, .. } => assert_eq!(prefix, "before "),
            other => panic!("expected match, got {other:?}"),
        }
        pty.expect(&[], Duration::from_secs(10)).await;
        let output = pty.take_output();
        assert!(output.contains("before MARKER after"), "output: {output:?}");
        pty.close(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn missing_executable_surfaces_as_failed_run() {
        // On Unix the exec failure happens after the fork, so the spawn
        // itself may succeed and the child exits immediately with 127.
        match PtySession::spawn(&WorkerCommand::new("/nonexistent/worker-cli")) {
            Err(TermError::SpawnFailed(_)) => {}
            Ok(mut pty) => {
                let outcome = pty.expect(&[], Duration::from_secs(10)).await;
                assert_eq!(outcome, ExpectOutcome::Eof);
                let code = pty.close(Duration::from_secs(1)).await;
                assert_ne!(code, Some(0));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
