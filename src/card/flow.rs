// SPDX-License-Identifier: GPL-3.0-only

//! Card flow: from a captured still to a saved card
//!
//! ```text
//! StillImage ─▶ CompositionSession ─▶ classify (vehicles) ─▶ specs
//!                     │ gestures
//!                     ▼
//!                  render ─▶ CardStore::save ─▶ ComposedCard
//!                                                   │
//!                                          customize_subject ─▶ new ComposedCard
//! ```
//!
//! Nothing reaches the store unless rendering succeeded.

use super::{CaptureType, CardFormat, ComposedCard};
use crate::errors::{AppError, AppResult, CompositionError, ServiceError};
use crate::pipelines::composition::{self, CompositionTarget};
use crate::pipelines::photo::StillImage;
use crate::services::{
    CardStore, Classifier, Identification, SpecsLookup, SpecsQuery, SubjectLifter, VehicleSpecs,
};
use crate::transform::InteractiveTransform;
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Result of asking the classifier about a session's image
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    /// The capture type is not classified
    NotRequired,
    /// Ranked candidates, best first; never empty
    Identified(Vec<Identification>),
    /// Classification failed; the user may retry
    Failed(String),
}

impl ClassificationOutcome {
    pub fn can_retry(&self) -> bool {
        matches!(self, ClassificationOutcome::Failed(_))
    }

    pub fn best(&self) -> Option<&Identification> {
        match self {
            ClassificationOutcome::Identified(candidates) => candidates.first(),
            _ => None,
        }
    }
}

/// Editing state for one card, from capture until save or abandonment
///
/// Dropping the session (or calling [`CompositionSession::retake`]) releases
/// the source image.
#[derive(Debug)]
pub struct CompositionSession {
    capture_type: CaptureType,
    target: CompositionTarget,
    source: Option<Arc<RgbaImage>>,
    transform: InteractiveTransform,
    candidates: Vec<Identification>,
    identification: Option<Identification>,
    specs: Option<VehicleSpecs>,
}

impl CompositionSession {
    pub fn new(capture_type: CaptureType, source: Arc<RgbaImage>, target: CompositionTarget) -> Self {
        debug!(
            capture_type = %capture_type,
            width = source.width(),
            height = source.height(),
            "Composition session opened"
        );
        Self {
            capture_type,
            target,
            source: Some(source),
            transform: InteractiveTransform::new(),
            candidates: Vec::new(),
            identification: None,
            specs: None,
        }
    }

    pub fn capture_type(&self) -> CaptureType {
        self.capture_type
    }

    pub fn target(&self) -> &CompositionTarget {
        &self.target
    }

    pub fn source(&self) -> Option<&Arc<RgbaImage>> {
        self.source.as_ref()
    }

    pub fn transform(&self) -> &InteractiveTransform {
        &self.transform
    }

    /// Gesture and discrete edits go through here
    pub fn transform_mut(&mut self) -> &mut InteractiveTransform {
        &mut self.transform
    }

    /// Swap in a new source; the transform and identification start over
    pub fn replace_source(&mut self, source: Arc<RgbaImage>) {
        self.source = Some(source);
        self.transform.reset();
        self.candidates.clear();
        self.identification = None;
        self.specs = None;
    }

    pub fn candidates(&self) -> &[Identification] {
        &self.candidates
    }

    pub fn identification(&self) -> Option<&Identification> {
        self.identification.as_ref()
    }

    /// Manually entered identification, replacing any classifier result
    pub fn set_identification(&mut self, identification: Identification) {
        self.identification = Some(identification);
        self.specs = None;
    }

    pub fn specs(&self) -> Option<&VehicleSpecs> {
        self.specs.as_ref()
    }

    /// Render the card image with the committed transform, without saving
    pub fn render(&mut self) -> Result<RgbaImage, CompositionError> {
        let source = self.source.as_ref().ok_or(CompositionError::EmptySource)?;
        let state = self.transform.snapshot();
        composition::render(source, &state, &self.target)
    }

    /// Abandon this capture and release its image
    pub fn retake(mut self) {
        self.source = None;
        info!(capture_type = %self.capture_type, "Capture discarded for retake");
    }
}

impl Drop for CompositionSession {
    fn drop(&mut self) {
        debug!(had_source = self.source.is_some(), "Composition session released");
    }
}

/// Ties composition to the external collaborators
pub struct CardFlow {
    store: Arc<dyn CardStore>,
    classifier: Option<Arc<dyn Classifier>>,
    specs_lookup: Option<Arc<dyn SpecsLookup>>,
    lifter: Option<Arc<dyn SubjectLifter>>,
    landscape: CompositionTarget,
    portrait: CompositionTarget,
    specs_cache: Mutex<HashMap<SpecsQuery, VehicleSpecs>>,
}

impl CardFlow {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self {
            store,
            classifier: None,
            specs_lookup: None,
            lifter: None,
            landscape: CompositionTarget::landscape(),
            portrait: CompositionTarget::portrait(),
            specs_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_specs_lookup(mut self, lookup: Arc<dyn SpecsLookup>) -> Self {
        self.specs_lookup = Some(lookup);
        self
    }

    pub fn with_subject_lifter(mut self, lifter: Arc<dyn SubjectLifter>) -> Self {
        self.lifter = Some(lifter);
        self
    }

    /// Override the output and display sizes per card format
    pub fn with_targets(mut self, landscape: CompositionTarget, portrait: CompositionTarget) -> Self {
        self.landscape = landscape;
        self.portrait = portrait;
        self
    }

    pub fn target_for(&self, format: CardFormat) -> CompositionTarget {
        match format {
            CardFormat::Landscape16x9 => self.landscape,
            CardFormat::Portrait9x16 => self.portrait,
        }
    }

    /// Open a composition session for a processed still
    pub fn begin(&self, capture_type: CaptureType, still: &StillImage) -> CompositionSession {
        let target = self.target_for(capture_type.card_format());
        CompositionSession::new(capture_type, Arc::clone(&still.image), target)
    }

    /// Classify the session's image and fetch specs for the best match
    ///
    /// Falls back to the classifier's single best guess when ranking fails.
    pub async fn classify(&self, session: &mut CompositionSession) -> ClassificationOutcome {
        if !session.capture_type.needs_classification() {
            return ClassificationOutcome::NotRequired;
        }
        let Some(classifier) = &self.classifier else {
            return ClassificationOutcome::Failed("no classifier configured".to_string());
        };
        let Some(source) = session.source.clone() else {
            return ClassificationOutcome::Failed("no image to classify".to_string());
        };

        let ranked = match classifier.identify_multiple(Arc::clone(&source)).await {
            Ok(candidates) => Ok(candidates),
            Err(e) => {
                debug!(error = %e, "Ranked classification failed, asking for a single guess");
                classifier.identify(source).await.map(|best| vec![best])
            }
        };
        let mut candidates = match ranked {
            Ok(candidates) if !candidates.is_empty() => candidates,
            Ok(_) => {
                warn!("Classifier returned no candidates");
                return ClassificationOutcome::Failed("nothing recognized".to_string());
            }
            Err(e) => {
                warn!(error = %e, "Classification failed");
                return ClassificationOutcome::Failed(e.to_string());
            }
        };
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let best = candidates[0].clone();
        info!(identification = %best, confidence = best.confidence, candidates = candidates.len(), "Vehicle identified");
        session.specs = self.lookup_specs(&best).await;
        session.identification = Some(best);
        session.candidates = candidates.clone();
        ClassificationOutcome::Identified(candidates)
    }

    /// Pick another candidate from the last classification
    pub async fn select_candidate(&self, session: &mut CompositionSession, index: usize) -> bool {
        let Some(candidate) = session.candidates.get(index).cloned() else {
            return false;
        };
        session.specs = self.lookup_specs(&candidate).await;
        session.identification = Some(candidate);
        true
    }

    /// Specs for an identification, cached per (make, model, year)
    ///
    /// Failures are logged and leave the specs unknown.
    pub async fn lookup_specs(&self, identification: &Identification) -> Option<VehicleSpecs> {
        let lookup = self.specs_lookup.as_ref()?;
        let query = identification.specs_query();

        if let Some(specs) = self.cache().get(&query) {
            debug!(make = %query.make, model = %query.model, "Specs cache hit");
            return Some(specs.clone());
        }

        match lookup.fetch_specs(query.clone()).await {
            Ok(specs) => {
                self.cache().insert(query, specs.clone());
                Some(specs)
            }
            Err(e) => {
                warn!(error = %e, make = %query.make, model = %query.model, "Specs lookup failed");
                None
            }
        }
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<SpecsQuery, VehicleSpecs>> {
        self.specs_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Render and persist the card
    ///
    /// Rendering runs on a blocking worker and must succeed before the store
    /// is called. On failure the session is left intact for another attempt.
    pub async fn save(&self, session: &mut CompositionSession) -> AppResult<Arc<ComposedCard>> {
        let source = session.source.clone().ok_or(CompositionError::EmptySource)?;
        let state = session.transform.snapshot();
        let target = session.target;

        let image = tokio::task::spawn_blocking(move || composition::render(&source, &state, &target))
            .await
            .map_err(|e| AppError::Other(format!("Render task failed: {}", e)))??;

        let card = Arc::new(ComposedCard::new(
            session.capture_type,
            image,
            session.identification.clone(),
            session.specs.clone(),
        ));
        self.store.save(Arc::clone(&card)).await?;

        info!(id = %card.id, capture_type = %card.capture_type, "Card saved");
        Ok(card)
    }

    /// Lift the subject off a saved card into a new card
    ///
    /// The original card is left as it is.
    pub async fn customize_subject(&self, card: &ComposedCard) -> AppResult<Arc<ComposedCard>> {
        let lifter = self
            .lifter
            .as_ref()
            .ok_or_else(|| ServiceError::Unavailable("no subject lifter configured".to_string()))?;

        let lifted = lifter.lift_subject(Arc::clone(&card.image)).await?;
        if lifted.dimensions() != card.image.dimensions() {
            return Err(ServiceError::Failed(format!(
                "subject lifter returned {:?}, expected {:?}",
                lifted.dimensions(),
                card.image.dimensions()
            ))
            .into());
        }

        let derived = Arc::new(card.derive(lifted));
        self.store.save(Arc::clone(&derived)).await?;
        info!(id = %derived.id, from = %card.id, "Customized card saved");
        Ok(derived)
    }
}
