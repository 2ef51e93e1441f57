// SPDX-License-Identifier: GPL-3.0-only

//! Lens inventory
//!
//! Orders the lenses a backend reports into the fixed ultra-wide, wide,
//! telephoto sequence the session indexes into.

use super::CameraBackend;
use super::types::{LensDescriptor, LensKind, LensPosition};
use tracing::{debug, info};

/// Ordered, immutable list of lenses for one side of the device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInventory {
    lenses: Vec<LensDescriptor>,
}

impl DeviceInventory {
    /// Enumerate the lenses facing `position`
    ///
    /// Lenses the device lacks are simply absent. If the hardware reports two
    /// lenses of the same kind, the first one wins.
    pub fn enumerate(backend: &dyn CameraBackend, position: LensPosition) -> Self {
        Self::from_lenses(backend.enumerate_lenses(), position)
    }

    /// Build an inventory from an already reported lens list
    pub fn from_lenses(reported: Vec<LensDescriptor>, position: LensPosition) -> Self {
        let mut lenses: Vec<LensDescriptor> = Vec::with_capacity(3);

        for lens in reported.into_iter().filter(|l| l.position == position) {
            if lenses.iter().any(|l| l.kind == lens.kind) {
                debug!(id = %lens.id, kind = %lens.kind, "Skipping duplicate lens kind");
                continue;
            }
            lenses.push(lens);
        }

        // Stable sort keeps hardware order inside a kind, which is unique anyway
        lenses.sort_by_key(|l| l.kind);

        info!(
            count = lenses.len(),
            position = ?position,
            "Lens inventory enumerated"
        );

        Self { lenses }
    }

    pub fn lenses(&self) -> &[LensDescriptor] {
        &self.lenses
    }

    pub fn get(&self, index: usize) -> Option<&LensDescriptor> {
        self.lenses.get(index)
    }

    pub fn len(&self) -> usize {
        self.lenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lenses.is_empty()
    }

    /// Index of the lens of `kind`, if the device has one
    pub fn index_of(&self, kind: LensKind) -> Option<usize> {
        self.lenses.iter().position(|l| l.kind == kind)
    }

    /// Index of the lens the session should start on: wide, else the first
    pub fn default_index(&self) -> Option<usize> {
        self.index_of(LensKind::Wide)
            .or_else(|| (!self.lenses.is_empty()).then_some(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens(id: &str, kind: LensKind, position: LensPosition) -> LensDescriptor {
        LensDescriptor {
            id: id.to_string(),
            kind,
            position,
            min_zoom: 1.0,
            max_zoom: 5.0,
            supports_raw: false,
            flash_modes: Vec::new(),
        }
    }

    #[test]
    fn test_order_is_fixed() {
        let inventory = DeviceInventory::from_lenses(
            vec![
                lens("tele", LensKind::Telephoto, LensPosition::Back),
                lens("front", LensKind::Wide, LensPosition::Front),
                lens("wide", LensKind::Wide, LensPosition::Back),
                lens("uw", LensKind::UltraWide, LensPosition::Back),
            ],
            LensPosition::Back,
        );

        let ids: Vec<&str> = inventory.lenses().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["uw", "wide", "tele"]);
        assert_eq!(inventory.default_index(), Some(1));
    }

    #[test]
    fn test_missing_lenses_are_absent() {
        let inventory = DeviceInventory::from_lenses(
            vec![lens("wide", LensKind::Wide, LensPosition::Back)],
            LensPosition::Back,
        );
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.index_of(LensKind::UltraWide), None);
        assert_eq!(inventory.index_of(LensKind::Telephoto), None);
    }

    #[test]
    fn test_duplicate_kind_keeps_first() {
        let inventory = DeviceInventory::from_lenses(
            vec![
                lens("wide-a", LensKind::Wide, LensPosition::Back),
                lens("wide-b", LensKind::Wide, LensPosition::Back),
            ],
            LensPosition::Back,
        );
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.lenses()[0].id, "wide-a");
    }

    #[test]
    fn test_empty_inventory() {
        let inventory = DeviceInventory::from_lenses(Vec::new(), LensPosition::Back);
        assert!(inventory.is_empty());
        assert_eq!(inventory.default_index(), None);
    }
}
