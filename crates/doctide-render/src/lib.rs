//! Renderer contract and the SPA-shell heuristics that decide when a page
//! needs it. The rendering engine itself is treated as an external black
//! box — this crate only defines the seam strategies call through.

mod renderer;
mod spa;

pub use renderer::{build_default_renderer, RenderOptions, Renderer, RenderedPage, UnavailableRenderer};
pub use spa::{needs_render, reject_after_render, visible_text};
