use crate::content::ErrorPage;
use crate::error::RenderError;
use async_trait::async_trait;

/// Turns an [`ErrorPage`] into the final HTML a visitor would receive.
#[async_trait]
pub trait PageRenderer: Send + Sync + 'static {
    async fn render(&self, page: &ErrorPage) -> Result<String, RenderError>;
}
