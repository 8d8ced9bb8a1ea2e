//! Device abstractions for Lumora.
//!
//! The renderer never talks to `wgpu` directly during recording or replay.
//! Everything goes through two seams defined here:
//!
//! - [`RenderContext`] - buffer creation and uploads
//! - [`PassEncoder`] - render pass state and draw submission
//!
//! With the `mock` feature, `MockRenderContext` and `MockPassEncoder` record
//! every call so tests can assert on the exact GPU traffic a frame produces.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use lumora_test_utils::{MockPassEncoder, PassEncoder, PassTarget, GpuTextureView};
//!
//! let view = GpuTextureView::mock(0);
//! let mut pass = MockPassEncoder::new();
//! pass.begin_pass(&PassTarget::color(&view));
//! pass.draw_indexed(0..6, 0, 0..1);
//! pass.end_pass();
//!
//! assert_eq!(pass.draw_indexed_calls(), vec![(0..6, 0)]);
//! # }
//! ```
//!
//! # Design
//!
//! GPU wrapper types are owned and cheap to clone, so no lifetimes leak into
//! renderer code. `RenderContext` is object-safe and takes `&self`; the mock
//! uses a `Mutex` to record. `PassEncoder` takes `&mut self` because a pass is
//! only ever driven by one replay loop.

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_pass;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod pass_encoder;
pub mod render_context;

pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_pass::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use pass_encoder::*;
pub use render_context::*;
