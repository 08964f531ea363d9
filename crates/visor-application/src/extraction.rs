//! Image-to-ProductInfo extraction pipeline.
//!
//! Two extraction passes (ingredient declaration, then the rest of the
//! packaging) followed by a translation pass, strictly sequential. The
//! passes are observable through a phase listener so a host UI can show
//! progress; the listener carries no semantics beyond that.

use std::sync::Arc;
use visor_core::error::Result;
use visor_core::gateway::{ExtractorGateway, InfoKind};
use visor_core::image::ImageSource;
use visor_core::product::{ProductFields, ProductInfo};

/// The observable phases of one pipeline run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractPhase {
    /// Analyzing image layout, reading the ingredient declaration.
    Analyzing,
    /// Extracting the remaining product information.
    Extracting,
    /// Translating the merged fields into the target language.
    Translating,
}

/// Callback invoked as the pipeline enters each phase.
pub type PhaseListener = Arc<dyn Fn(ExtractPhase) + Send + Sync>;

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub product: ProductInfo,
    /// False when translation failed and the fields are untranslated.
    /// The workflow proceeds to review either way; hosts may badge the
    /// untranslated case.
    pub localized: bool,
}

/// Turns a captured image into localized [`ProductInfo`].
pub struct ExtractionPipeline {
    extractor: Arc<dyn ExtractorGateway>,
    listener: Option<PhaseListener>,
}

impl ExtractionPipeline {
    pub fn new(extractor: Arc<dyn ExtractorGateway>) -> Self {
        Self {
            extractor,
            listener: None,
        }
    }

    /// Registers a progress listener for the three phases.
    pub fn with_phase_listener(mut self, listener: PhaseListener) -> Self {
        self.listener = Some(listener);
        self
    }

    fn notify(&self, phase: ExtractPhase) {
        if let Some(listener) = &self.listener {
            listener(phase);
        }
    }

    /// Runs extract → translate over the image.
    ///
    /// Either extraction pass failing aborts the run. A translation failure
    /// does not: the untranslated fields are returned with
    /// `localized: false`. The image reference is attached to the resulting
    /// product on every path.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when an extraction pass fails.
    pub async fn run(&self, image: &ImageSource, language: &str) -> Result<Extraction> {
        self.notify(ExtractPhase::Analyzing);
        let ingredient_pass = self
            .extractor
            .extract(image, InfoKind::Ingredients)
            .await?;

        self.notify(ExtractPhase::Extracting);
        let other_pass = self.extractor.extract(image, InfoKind::OtherInfo).await?;

        let mut fields = normalize_ingredient_pass(ingredient_pass);
        fields.merge(other_pass);

        self.notify(ExtractPhase::Translating);
        let (fields, localized) = match self.extractor.translate(&fields, language).await {
            Ok(translated) => (translated, true),
            Err(err) => {
                tracing::warn!(error = %err, "translation failed, continuing with untranslated fields");
                (fields, false)
            }
        };

        Ok(Extraction {
            product: ProductInfo::new(fields, image.reference()),
            localized,
        })
    }
}

/// Normalizes the ingredient pass: the service reports per-ingredient
/// amounts as a parallel array, which the open-field decoding stringifies.
/// Joined here into one human-readable field, or dropped when every amount
/// is empty.
fn normalize_ingredient_pass(mut fields: ProductFields) -> ProductFields {
    if let Some(raw) = fields.take_extra("amounts") {
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(amounts) if amounts.iter().any(|a| !a.is_empty()) => {
                fields.set_extra("amounts", amounts.join(", "));
            }
            Ok(_) => {}
            Err(_) => fields.set_extra("amounts", raw),
        }
    }
    fields
}
