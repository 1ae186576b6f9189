//! Wizard session: the in-memory state behind the four-step flow
//! (template → design → recipients → generate).
//!
//! Nothing here is persisted; [`Session::reset`] returns to a fresh state.

use serde::{Deserialize, Serialize};

use crate::batch::{BatchRenderer, Progress, RenderedCertificate};
use crate::codec::EncodeOptions;
use crate::config::DEFAULT_MAX_RECIPIENTS;
use crate::error::LaurelError;
use crate::layer::LayerStack;
use crate::recipients::RecipientList;
use crate::render::{FontBook, RenderOptions, Renderer};
use crate::template::Template;

/// Name painted into previews.
pub const PREVIEW_NAME: &str = "Preview Name";

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Template,
    Design,
    Recipients,
    Generate,
}

impl Step {
    pub fn next(self) -> Step {
        match self {
            Step::Template => Step::Design,
            Step::Design => Step::Recipients,
            Step::Recipients | Step::Generate => Step::Generate,
        }
    }

    pub fn previous(self) -> Step {
        match self {
            Step::Template | Step::Design => Step::Template,
            Step::Recipients => Step::Design,
            Step::Generate => Step::Recipients,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    step: Step,
    template: Option<Template>,
    layers: LayerStack,
    recipients: RecipientList,
    render_options: RenderOptions,
    encode_options: EncodeOptions,
    certificates: Vec<RenderedCertificate>,
    progress: Option<Progress>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECIPIENTS)
    }
}

impl Session {
    /// Fresh session whose recipient list holds at most `max_recipients` names.
    pub fn new(max_recipients: usize) -> Self {
        Self {
            step: Step::Template,
            template: None,
            layers: LayerStack::with_defaults(),
            recipients: RecipientList::new(max_recipients),
            render_options: RenderOptions::default(),
            encode_options: EncodeOptions::default(),
            certificates: Vec::new(),
            progress: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    /// Replace the template wholesale and move on to design.
    pub fn set_template(&mut self, template: Template) {
        let (width, height) = template.dimensions();
        tracing::debug!(width, height, "session template set");
        self.template = Some(template);
        self.certificates.clear();
        self.progress = None;
        self.step = Step::Design;
    }

    /// Drop the template and any rendered results, back to the first step.
    pub fn clear_template(&mut self) {
        self.template = None;
        self.certificates.clear();
        self.progress = None;
        self.step = Step::Template;
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn recipients(&self) -> &RecipientList {
        &self.recipients
    }

    pub fn recipients_mut(&mut self) -> &mut RecipientList {
        &mut self.recipients
    }

    pub fn render_options(&self) -> RenderOptions {
        self.render_options
    }

    pub fn set_render_options(&mut self, options: RenderOptions) -> Result<(), LaurelError> {
        options.validate()?;
        self.render_options = options;
        Ok(())
    }

    pub fn encode_options(&self) -> EncodeOptions {
        self.encode_options
    }

    pub fn set_encode_options(&mut self, options: EncodeOptions) {
        self.encode_options = options;
    }

    /// Results of the last successful [`Session::generate`].
    pub fn certificates(&self) -> &[RenderedCertificate] {
        &self.certificates
    }

    pub fn progress(&self) -> Option<Progress> {
        self.progress
    }

    /// Check whether `step` may be entered with the current state.
    pub fn can_enter(&self, step: Step) -> Result<(), LaurelError> {
        if step >= Step::Design && self.template.is_none() {
            return Err(LaurelError::Validation(
                "Upload a template first".to_string(),
            ));
        }
        if step == Step::Generate && self.recipients.is_empty() {
            return Err(LaurelError::Validation(
                "Add at least one recipient first".to_string(),
            ));
        }
        Ok(())
    }

    /// Move to the next step.
    pub fn advance(&mut self) -> Result<Step, LaurelError> {
        self.go_to(self.step.next())
    }

    /// Move to the previous step. Stays put on the first step.
    pub fn back(&mut self) -> Step {
        self.step = self.step.previous();
        self.step
    }

    /// Jump to any step whose requirements are met.
    pub fn go_to(&mut self, step: Step) -> Result<Step, LaurelError> {
        if let Err(e) = self.can_enter(step) {
            tracing::warn!(from = ?self.step, to = ?step, error = %e, "step refused");
            return Err(e);
        }
        self.step = step;
        Ok(step)
    }

    /// Render one preview as a fast-compressed PNG.
    ///
    /// Returns `None` while no template is loaded.
    pub fn preview(&self, fonts: &FontBook, name: &str) -> Result<Option<Vec<u8>>, LaurelError> {
        let Some(template) = &self.template else {
            return Ok(None);
        };
        let name = if name.trim().is_empty() {
            PREVIEW_NAME
        } else {
            name
        };
        let renderer = Renderer::with_options(fonts, self.render_options);
        renderer
            .render_encoded(template, self.layers.as_slice(), name, &EncodeOptions::preview())
            .map(Some)
    }

    /// Render the whole recipient list. Previous results are discarded first.
    pub fn generate(&mut self, fonts: &FontBook) -> Result<&[RenderedCertificate], LaurelError> {
        self.generate_with_progress(fonts, |_| {})
    }

    /// Like [`Session::generate`], forwarding each progress update.
    pub fn generate_with_progress<F>(
        &mut self,
        fonts: &FontBook,
        mut on_progress: F,
    ) -> Result<&[RenderedCertificate], LaurelError>
    where
        F: FnMut(Progress),
    {
        self.certificates.clear();
        self.progress = None;

        let template = self.template.as_ref().ok_or_else(|| {
            LaurelError::Validation("Upload a template first".to_string())
        })?;

        let renderer = Renderer::with_options(fonts, self.render_options);
        let batch = BatchRenderer::new(renderer, template, self.layers.as_slice())
            .encode_options(self.encode_options);

        let mut last = None;
        let results = batch.run_with_progress(&self.recipients, |progress| {
            last = Some(progress);
            on_progress(progress);
        });
        self.progress = last;

        self.certificates = results?;
        Ok(&self.certificates)
    }

    /// Discard everything and start over.
    pub fn reset(&mut self) {
        *self = Self::new(self.recipients.capacity());
    }
}
