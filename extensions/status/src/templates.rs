//! HTML shell for rendered error pages.

pub const DEFAULT_CSS: &str = r#"
:root {
  --bg-primary: #0f0f0f;
  --text-primary: #ffffff;
  --text-secondary: #a0a0a0;
  --accent-blue: #3b82f6;
}

@media (prefers-color-scheme: light) {
  :root {
    --bg-primary: #ffffff;
    --text-primary: #1a1a1a;
    --text-secondary: #495057;
  }
}

* {
  margin: 0;
  padding: 0;
  box-sizing: border-box;
}

body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
  background-color: var(--bg-primary);
  color: var(--text-primary);
  line-height: 1.6;
  min-height: 100vh;
}

.container {
  max-width: 720px;
  margin: 0 auto;
  padding: 4rem 1.5rem;
  text-align: center;
}

.status-code {
  color: var(--accent-blue);
  font-weight: 700;
  letter-spacing: 0.1em;
  margin-bottom: 1rem;
}

.content h1 {
  font-size: 2rem;
  margin-bottom: 1rem;
}

.content p {
  color: var(--text-secondary);
}
"#;

/// Escapes text for use inside HTML element content and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `content_html` is CMS-authored markup and is inserted as is; `title` is escaped.
pub fn generate_html(code: u16, title: &str, content_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta name="robots" content="noindex">
  <title>{title}</title>
  <style>{css}</style>
</head>
<body>
  <div class="container">
    <div class="status-code">{code}</div>
    <div class="content">
      {content_html}
    </div>
  </div>
</body>
</html>
"#,
        title = escape_html(title),
        css = DEFAULT_CSS,
        code = code,
        content_html = content_html,
    )
}
