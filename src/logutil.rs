//! Keep user-supplied text (pet names, notices) on a single log line.

use std::fmt::Write;

/// Characters kept before a logged string is cut with an ellipsis.
pub const LOG_PREVIEW_CHARS: usize = 120;

/// Escape control characters and cap the length at [`LOG_PREVIEW_CHARS`].
pub fn escape_log(s: &str) -> String {
    escape_log_limited(s, LOG_PREVIEW_CHARS)
}

/// Same as [`escape_log`] with an explicit cap (in characters, before escaping).
pub fn escape_log_limited(s: &str, limit: usize) -> String {
    let mut out = String::with_capacity(s.len().min(limit) + 4);
    let mut chars = s.chars();
    for ch in chars.by_ref().take(limit) {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}
