//! Batch driver: one certificate per recipient, rendered sequentially.
//!
//! Any single failure aborts the batch; no partial results are returned.

use std::time::Instant;

use crate::codec::{self, EncodeOptions, OutputFormat};
use crate::error::LaurelError;
use crate::layer::{self, Layer};
use crate::render::Renderer;
use crate::template::Template;

/// One rendered certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCertificate {
    pub recipient_name: String,
    /// Encoded image bytes.
    pub image: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderedCertificate {
    /// Download file name (`certificate_<name>.<ext>`).
    pub fn file_name(&self) -> String {
        codec::certificate_file_name(&self.recipient_name, self.format)
    }

    pub fn to_data_url(&self) -> String {
        codec::to_data_url(&self.image, self.format)
    }
}

/// Batch progress after an item completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Whole percent complete, rounded down.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Renders a recipient list against one template and layer set.
pub struct BatchRenderer<'a> {
    renderer: Renderer<'a>,
    template: &'a Template,
    layers: &'a [Layer],
    encode: EncodeOptions,
}

impl<'a> BatchRenderer<'a> {
    pub fn new(renderer: Renderer<'a>, template: &'a Template, layers: &'a [Layer]) -> Self {
        Self {
            renderer,
            template,
            layers,
            encode: EncodeOptions::default(),
        }
    }

    pub fn encode_options(mut self, encode: EncodeOptions) -> Self {
        self.encode = encode;
        self
    }

    /// Render every name, in order, without progress reporting.
    pub fn run<I, S>(&self, recipients: I) -> Result<Vec<RenderedCertificate>, LaurelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_with_progress(recipients, |_| {})
    }

    /// Render every name, in order, calling `on_progress` after each item.
    pub fn run_with_progress<I, S, F>(
        &self,
        recipients: I,
        mut on_progress: F,
    ) -> Result<Vec<RenderedCertificate>, LaurelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(Progress),
    {
        let names: Vec<S> = recipients.into_iter().collect();
        if names.is_empty() {
            return Err(LaurelError::Validation(
                "Please add at least one name".to_string(),
            ));
        }
        layer::ensure_single_recipient_layer(self.layers)?;

        let total = names.len();
        let started = Instant::now();
        let (width, height) = self.template.dimensions();
        tracing::info!(total, width, height, "batch started");

        let mut results = Vec::with_capacity(total);
        for (i, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let image = self
                .renderer
                .render_encoded(self.template, self.layers, name, &self.encode)
                .map_err(|e| {
                    tracing::warn!(recipient = name, error = %e, "batch aborted");
                    LaurelError::Batch {
                        recipient: name.to_string(),
                        source: Box::new(e),
                    }
                })?;

            tracing::debug!(recipient = name, bytes = image.len(), "rendered certificate");
            results.push(RenderedCertificate {
                recipient_name: name.to_string(),
                image,
                format: self.encode.format,
                width,
                height,
            });

            on_progress(Progress {
                completed: i + 1,
                total,
            });
        }

        tracing::info!(
            total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        Ok(results)
    }
}
