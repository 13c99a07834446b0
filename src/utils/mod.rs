//! Small shared helpers.

/// Escape special characters for HTML parse mode.
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Clickable mention for users without a username.
pub fn mention_html(user_id: u64, name: &str) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user_id,
        html_escape(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a < b & c > d"), "a &lt; b &amp; c &gt; d");
    }

    #[test]
    fn test_mention_escapes_name() {
        let m = mention_html(42, "<Rei>");
        assert_eq!(m, "<a href=\"tg://user?id=42\">&lt;Rei&gt;</a>");
    }
}
