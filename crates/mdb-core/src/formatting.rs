//! Formatting utilities for Telegram HTML replies.

use crate::failure::Classification;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render a classified failure for HTML mode: the message, then the tip in
/// italics when one exists.
pub fn render_failure(classification: &Classification) -> String {
    let message = escape_html(&classification.message);
    if classification.tip.is_empty() {
        return message;
    }
    format!("{message}\n\n<i>{}</i>", escape_html(&classification.tip))
}

/// Human-readable byte size (binary units, one decimal).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::classify;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn renders_failure_with_tip_in_italics() {
        let c = classify(Some(429), "");
        let html = render_failure(&c);
        assert!(html.starts_with(&c.message));
        assert!(html.contains("<i>Tip:"));
        assert!(html.ends_with("</i>"));
    }

    #[test]
    fn renders_failure_without_tip_as_plain_message() {
        let c = classify(None, "weird custom failure");
        assert_eq!(render_failure(&c), "❌ Error: weird custom failure");
    }

    #[test]
    fn escapes_embedded_error_text() {
        let c = classify(None, "tag <b> slipped & through");
        let html = render_failure(&c);
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("&amp;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(52_428_800), "50.0 MB");
        assert_eq!(format_size(2_147_483_648), "2.0 GB");
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("0123456789ab", 10), "0123456789...");
    }
}
