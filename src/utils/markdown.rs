use ammonia::Builder;
use comrak::{markdown_to_html, Options};
use std::collections::HashSet;

/// Render message text (Markdown) to sanitized HTML.
pub fn render_markdown(raw: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.render.unsafe_ = true; // ammonia sanitizes below

    let html = markdown_to_html(raw, &options);
    sanitize_html(&html)
}

fn sanitize_html(html: &str) -> String {
    let extra_tags: HashSet<&str> = [
        "h1", "h2", "h3", "h4", "pre", "code", "blockquote", "hr", "table", "thead", "tbody",
        "tr", "th", "td", "img", "del",
    ]
    .into_iter()
    .collect();

    let url_schemes: HashSet<&str> = ["http", "https", "mailto"].into_iter().collect();

    let mut builder = Builder::default();
    builder
        .add_tags(&extra_tags)
        .add_tag_attributes("a", &["href", "title"])
        .add_tag_attributes("img", &["src", "alt", "title"])
        .add_tag_attributes("code", &["class"])
        .url_schemes(url_schemes)
        .link_rel(Some("noopener noreferrer"));

    builder.clean(html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_emphasis() {
        let html = render_markdown("Hello **world**");
        assert!(html.contains("<strong>world</strong>"));
    }

    #[test]
    fn relative_attachment_images_survive() {
        let html = render_markdown("![cat](/attachments/0123abcd.gif)");
        assert!(html.contains("<img"));
        assert!(html.contains("/attachments/0123abcd.gif"));
    }

    #[test]
    fn script_is_removed() {
        let html = render_markdown("<script>alert('x')</script>hi");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("alert"));
    }

    #[test]
    fn javascript_links_are_removed() {
        let html = render_markdown("[click](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }
}
