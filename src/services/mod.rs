// SPDX-License-Identifier: GPL-3.0-only

//! Ports for external collaborators
//!
//! Classification, specs lookup, image redaction, subject lifting and
//! persistence live outside this crate. Each is an object-safe trait whose
//! methods return boxed futures, so implementations can be swapped at runtime
//! and faked in tests.

use crate::card::ComposedCard;
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Future returned by every collaborator call
pub type ServiceFuture<T> = BoxFuture<'static, Result<T, ServiceError>>;

/// A classifier's guess at what a vehicle is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    pub make: String,
    pub model: String,
    pub generation: Option<String>,
    pub year: Option<u16>,
    /// In [0, 1]
    pub confidence: f32,
}

impl Identification {
    /// Key for the specs lookup
    pub fn specs_query(&self) -> SpecsQuery {
        SpecsQuery {
            make: self.make.clone(),
            model: self.model.clone(),
            year: self.year,
        }
    }
}

impl std::fmt::Display for Identification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.make, self.model)?;
        if let Some(generation) = &self.generation {
            write!(f, " ({})", generation)?;
        }
        Ok(())
    }
}

/// Specs lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecsQuery {
    pub make: String,
    pub model: String,
    pub year: Option<u16>,
}

/// Published figures for a vehicle; any field may be unknown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpecs {
    pub horsepower: Option<u32>,
    pub torque_nm: Option<u32>,
    pub zero_to_sixty_secs: Option<f32>,
    pub top_speed_kmh: Option<u32>,
    pub engine: Option<String>,
    pub drivetrain: Option<String>,
}

/// Opaque image classifier
pub trait Classifier: Send + Sync {
    /// Best single guess
    fn identify(&self, image: Arc<RgbaImage>) -> ServiceFuture<Identification>;

    /// Ranked guesses, best first
    fn identify_multiple(&self, image: Arc<RgbaImage>) -> ServiceFuture<Vec<Identification>>;
}

pub trait SpecsLookup: Send + Sync {
    fn fetch_specs(&self, query: SpecsQuery) -> ServiceFuture<VehicleSpecs>;
}

/// Blurs faces, plates and other private details before anything is kept
pub trait PrivacyRedactor: Send + Sync {
    fn redact(&self, image: Arc<RgbaImage>) -> ServiceFuture<RgbaImage>;
}

/// Separates the subject from its background
pub trait SubjectLifter: Send + Sync {
    fn lift_subject(&self, image: Arc<RgbaImage>) -> ServiceFuture<RgbaImage>;
}

/// Persists a finished card in one atomic operation
pub trait CardStore: Send + Sync {
    fn save(&self, card: Arc<ComposedCard>) -> ServiceFuture<()>;
}
