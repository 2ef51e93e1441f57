// SPDX-License-Identifier: GPL-3.0-only

//! Cards: what gets composed, and the flow that produces them

pub mod flow;

pub use flow::{CardFlow, ClassificationOutcome, CompositionSession};

use crate::constants::AspectRatio;
use crate::pipelines::composition::CompositionTarget;
use crate::services::{Identification, VehicleSpecs};
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// What a card shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureType {
    Vehicle,
    Location,
    Driver,
}

impl CaptureType {
    pub const ALL: [CaptureType; 3] = [
        CaptureType::Vehicle,
        CaptureType::Location,
        CaptureType::Driver,
    ];

    pub fn card_format(&self) -> CardFormat {
        match self {
            CaptureType::Vehicle | CaptureType::Location => CardFormat::Landscape16x9,
            CaptureType::Driver => CardFormat::Portrait9x16,
        }
    }

    /// Only vehicles are sent to the classifier
    pub fn needs_classification(&self) -> bool {
        matches!(self, CaptureType::Vehicle)
    }
}

impl std::fmt::Display for CaptureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureType::Vehicle => write!(f, "vehicle"),
            CaptureType::Location => write!(f, "location"),
            CaptureType::Driver => write!(f, "driver"),
        }
    }
}

impl std::str::FromStr for CaptureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vehicle" => Ok(CaptureType::Vehicle),
            "location" => Ok(CaptureType::Location),
            "driver" => Ok(CaptureType::Driver),
            other => Err(format!("unknown capture type: {}", other)),
        }
    }
}

/// Fixed card aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardFormat {
    Landscape16x9,
    Portrait9x16,
}

impl CardFormat {
    pub fn aspect(&self) -> AspectRatio {
        match self {
            CardFormat::Landscape16x9 => AspectRatio::LANDSCAPE_16_9,
            CardFormat::Portrait9x16 => AspectRatio::PORTRAIT_9_16,
        }
    }

    /// Default output and display sizes for this format
    pub fn default_target(&self) -> CompositionTarget {
        match self {
            CardFormat::Landscape16x9 => CompositionTarget::landscape(),
            CardFormat::Portrait9x16 => CompositionTarget::portrait(),
        }
    }
}

/// A finished card. Never mutated; customization produces a new card.
#[derive(Debug, Clone)]
pub struct ComposedCard {
    pub id: Uuid,
    pub capture_type: CaptureType,
    pub format: CardFormat,
    /// Final pixels at the card's fixed aspect
    pub image: Arc<RgbaImage>,
    pub identification: Option<Identification>,
    pub specs: Option<VehicleSpecs>,
    pub created_at: DateTime<Utc>,
    /// Card this one was derived from, if any
    pub derived_from: Option<Uuid>,
}

impl ComposedCard {
    pub fn new(
        capture_type: CaptureType,
        image: RgbaImage,
        identification: Option<Identification>,
        specs: Option<VehicleSpecs>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            capture_type,
            format: capture_type.card_format(),
            image: Arc::new(image),
            identification,
            specs,
            created_at: Utc::now(),
            derived_from: None,
        }
    }

    /// New card with replaced pixels and everything else carried over
    pub fn derive(&self, image: RgbaImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            image: Arc::new(image),
            created_at: Utc::now(),
            derived_from: Some(self.id),
            ..self.clone()
        }
    }

    /// Text fields, for persistence next to the pixels
    pub fn record(&self) -> CardRecord {
        CardRecord {
            id: self.id,
            capture_type: self.capture_type,
            format: self.format,
            width: self.image.width(),
            height: self.image.height(),
            identification: self.identification.clone(),
            specs: self.specs.clone(),
            created_at: self.created_at,
            derived_from: self.derived_from,
        }
    }
}

/// Serializable card metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: Uuid,
    pub capture_type: CaptureType,
    pub format: CardFormat,
    pub width: u32,
    pub height: u32,
    pub identification: Option<Identification>,
    pub specs: Option<VehicleSpecs>,
    pub created_at: DateTime<Utc>,
    pub derived_from: Option<Uuid>,
}
