//! Error page rendering.
//!
//! The server only ever renders one kind of page by itself: the error page sent
//! for 404 and 500 responses. Rendering goes through [`ErrorRenderer`] so an
//! application can plug in its own template engine.

/// Values substituted into an error page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage {
    status_code: u16,
    status_message: &'static str,
}

impl ErrorPage {
    pub fn new(status_code: u16, status_message: &'static str) -> Self {
        Self { status_code, status_message }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_message(&self) -> &'static str {
        self.status_message
    }
}

/// Turns an [`ErrorPage`] into a response body.
pub trait ErrorRenderer: Send + Sync {
    fn render(&self, page: &ErrorPage) -> String;
}

impl<F> ErrorRenderer for F
where
    F: Fn(&ErrorPage) -> String + Send + Sync,
{
    fn render(&self, page: &ErrorPage) -> String {
        (self)(page)
    }
}

const TEMPLATE: &str = "<!DOCTYPE html>\n\
<html>\n\
<head><title>{{status_code}} {{status_message}}</title></head>\n\
<body>\n\
<h1>{{status_code}} {{status_message}}</h1>\n\
</body>\n\
</html>\n";

/// Renders a minimal HTML page from a fixed template.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorRenderer;

impl ErrorRenderer for DefaultErrorRenderer {
    fn render(&self, page: &ErrorPage) -> String {
        TEMPLATE
            .replace("{{status_code}}", &page.status_code.to_string())
            .replace("{{status_message}}", &escape_html(page.status_message))
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_substitutes_values() {
        let body = DefaultErrorRenderer.render(&ErrorPage::new(404, "Not Found"));
        assert!(body.contains("<title>404 Not Found</title>"));
        assert!(body.contains("<h1>404 Not Found</h1>"));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn messages_are_escaped() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
        let body = DefaultErrorRenderer.render(&ErrorPage::new(999, "<script>"));
        assert!(body.contains("&lt;script&gt;"));
    }
}
