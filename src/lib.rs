//! # Laurel - Bulk Certificate Generator
//!
//! Laurel renders one certificate per recipient from a template image and a
//! stack of positioned text layers. It provides:
//!
//! - **Layer model**: recipient, static, date and identifier text layers with
//!   normalized positions and per-layer styling
//! - **Rendering**: brightness/contrast, font resolution and anti-aliased text
//! - **Batching**: sequential rendering with progress, ZIP or directory export
//! - **HTTP API**: single-certificate and archive endpoints
//!
//! ## Quick Start
//!
//! ```no_run
//! use laurel::{
//!     batch::BatchRenderer,
//!     export,
//!     layer::LayerStack,
//!     recipients::RecipientList,
//!     render::{FontBook, Renderer},
//!     template::Template,
//! };
//!
//! let fonts = FontBook::system();
//! let template = Template::open("template.png")?;
//! let layers = LayerStack::with_defaults();
//!
//! let mut recipients = RecipientList::default();
//! recipients.add("Ada Lovelace")?;
//! recipients.add("Grace Hopper")?;
//!
//! let certificates = BatchRenderer::new(Renderer::new(&fonts), &template, layers.as_slice())
//!     .run_with_progress(&recipients, |p| println!("{}%", p.percent()))?;
//!
//! export::write_archive("certificates.zip", &certificates)?;
//! # Ok::<(), laurel::LaurelError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Template decoding and limits |
//! | [`layer`] | Text layers and the layer stack |
//! | [`render`] | Compositing, fonts, text layout |
//! | [`codec`] | PNG/JPEG encoding, data URLs, file names |
//! | [`recipients`] | Recipient list and CSV import |
//! | [`batch`] | Batch driver and progress |
//! | [`export`] | Directory and ZIP output |
//! | [`session`] | Wizard state machine |
//! | [`server`] | HTTP API |
//! | [`config`] | Environment configuration |
//! | [`error`] | Error types |

pub mod batch;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod layer;
pub mod logging;
pub mod recipients;
pub mod render;
pub mod server;
pub mod session;
pub mod template;

// Re-exports for convenience
pub use batch::{BatchRenderer, Progress, RenderedCertificate};
pub use error::LaurelError;
pub use layer::{Layer, LayerKind, LayerStack};
pub use recipients::RecipientList;
pub use render::{FontBook, Renderer};
pub use template::Template;
