use crate::templates;
use async_trait::async_trait;
use quiesce_core::{ErrorPage, PageRenderer, RenderError};

/// Renders a page straight into the default HTML shell, without an HTTP round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render_html(&self, page: &ErrorPage) -> String {
        templates::generate_html(page.error_code, &page.title, &page.content)
    }
}

#[async_trait]
impl PageRenderer for TemplateRenderer {
    async fn render(&self, page: &ErrorPage) -> Result<String, RenderError> {
        Ok(self.render_html(page))
    }
}
