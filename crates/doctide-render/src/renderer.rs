use async_trait::async_trait;
use doctide_types::{DocError, DocResult};
use std::time::Duration;
use tracing::warn;

/// Render knobs the dependency container passes down from `Options`.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub timeout: Duration,
    pub stability_wait: Duration,
    pub scroll_to_end: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            stability_wait: Duration::from_secs(2),
            scroll_to_end: true,
        }
    }
}

/// Post-execution HTML handed back to the strategy that asked for it.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: String,
}

/// Headless-browser render capability. The engine behind it is an external
/// black box — strategies only ever see this contract.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, opts: &RenderOptions) -> DocResult<RenderedPage>;
}

/// Placeholder `Renderer` used until a real browser engine is wired in.
/// Every call fails with `RendererInit`, which the one-shot lazy guard in
/// the dependency container caches as the sticky failure state — strategies
/// that never call `get_renderer` are unaffected.
#[derive(Debug, Default)]
pub struct UnavailableRenderer;

#[async_trait]
impl Renderer for UnavailableRenderer {
    async fn render(&self, url: &str, _opts: &RenderOptions) -> DocResult<RenderedPage> {
        warn!(url, "render requested but no browser engine is configured");
        Err(DocError::RendererInit(
            "no headless browser engine is configured for this build".to_string(),
        ))
    }
}

/// Constructs the renderer this build ships with. A single place to swap in
/// a real browser-backed implementation without strategies noticing.
pub fn build_default_renderer() -> DocResult<Box<dyn Renderer>> {
    Ok(Box::new(UnavailableRenderer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_renderer_fails_every_call() {
        let renderer = UnavailableRenderer;
        let err = renderer
            .render("https://example.com", &RenderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DocError::RendererInit(_)));
    }
}
