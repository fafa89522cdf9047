//! Plain-text rendering of command results

use super::ExecResult;

const EMPTY: &str = "(empty)";
const TRUNCATED: &str = "\n... output truncated ...";

/// Trim text and cut it to at most `limit` characters
pub fn clip_text(text: &str, limit: usize) -> String {
    let clean = text.trim();
    if clean.is_empty() {
        return EMPTY.to_string();
    }
    if clean.chars().count() <= limit {
        return clean.to_string();
    }
    let keep = limit.saturating_sub(TRUNCATED.chars().count());
    let mut clipped: String = clean.chars().take(keep).collect();
    clipped.push_str(TRUNCATED);
    clipped
}

/// Full report of one command: command line, status, timing and output
pub fn command_report(title: &str, result: &ExecResult, limit: usize) -> String {
    let status = if result.timed_out {
        "TIMEOUT".to_string()
    } else {
        result.exit_code.to_string()
    };

    let out = result.stdout.trim();
    let err = result.stderr.trim();
    let payload = match (out.is_empty(), err.is_empty()) {
        (false, false) => format!("{}\n\nstderr:\n{}", out, err),
        (true, false) => format!("stderr:\n{}", err),
        _ => out.to_string(),
    };

    format!(
        "== {} ==\n$ {}\nexit: {} | time: {:.2}s\n{}",
        title,
        result.command,
        status,
        result.duration.as_secs_f64(),
        clip_text(&payload, limit)
    )
}

/// One status line plus output per entry
///
/// Used where several commands answer one request, e.g. TCP and UDP rules
/// for the same port.
pub fn compact_report(title: &str, entries: &[(String, ExecResult)]) -> String {
    let mut lines = vec![format!("== {} ==", title)];
    for (label, result) in entries {
        let details = result.first_output().unwrap_or(EMPTY);
        lines.push(format!("{}: {}", label, result.status_label()));
        lines.push(clip_text(details, 700));
    }
    lines.join("\n")
}

/// One status line per entry, with output only for failures or stderr noise
pub fn labeled_report(title: &str, entries: &[(String, ExecResult)]) -> String {
    let mut lines = vec![format!("== {} ==", title)];
    for (label, result) in entries {
        lines.push(format!("{}: {}", label, result.status_label()));
        if !result.success() || !result.stderr.trim().is_empty() {
            let details = [result.stderr.trim(), result.stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or(EMPTY);
            lines.push(clip_text(details, 500));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(code: i32, stdout: &str, stderr: &str) -> ExecResult {
        ExecResult {
            command: "echo hi".to_string(),
            exit_code: code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(1500),
            timed_out: false,
        }
    }

    #[test]
    fn test_clip_text() {
        assert_eq!(clip_text("   ", 10), "(empty)");
        assert_eq!(clip_text(" short ", 10), "short");
        let long = "x".repeat(200);
        let clipped = clip_text(&long, 100);
        assert!(clipped.ends_with("output truncated ..."));
        assert_eq!(clipped.chars().count(), 100);
    }

    #[test]
    fn test_command_report() {
        let report = command_report("Test", &result(0, "hi\n", ""), 3000);
        assert!(report.starts_with("== Test =="));
        assert!(report.contains("$ echo hi"));
        assert!(report.contains("exit: 0 | time: 1.50s"));
        assert!(report.ends_with("hi"));
    }

    #[test]
    fn test_command_report_stderr_and_timeout() {
        let mut r = result(1, "", "boom");
        r.timed_out = true;
        let report = command_report("T", &r, 3000);
        assert!(report.contains("exit: TIMEOUT"));
        assert!(report.contains("stderr:\nboom"));
    }

    #[test]
    fn test_compact_report_lists_every_entry() {
        let entries = vec![
            ("TCP".to_string(), result(0, "", "")),
            ("UDP".to_string(), result(2, "", "bad rule")),
        ];
        let report = compact_report("Port 8080 opened", &entries);
        assert!(report.contains("TCP: OK"));
        assert!(report.contains("UDP: ERR 2"));
        assert!(report.contains("bad rule"));
    }

    #[test]
    fn test_labeled_report_hides_clean_output() {
        let entries = vec![
            ("Flush".to_string(), result(0, "noise", "")),
            ("Policy".to_string(), result(1, "", "denied")),
        ];
        let report = labeled_report("Profile", &entries);
        assert!(!report.contains("noise"));
        assert!(report.contains("Policy: ERR 1\ndenied"));
    }
}
