// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for preview, stills and card composition
//!
//! Heavy per-image work runs on blocking workers so the live preview and the
//! caller's thread are never held up.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Preview      │ ──▶ │ Preview Pipeline  │ ──▶ │ Display      │
//! │ frames       │     │  - Orientation    │     │ (viewport    │
//! │ (latest wins)│     │  - Filter         │     │  exact size) │
//! │              │     │  - Cover/crop     │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Still        │ ──▶ │  Still Pipeline   │ ──▶ │ Composition  │ ──▶ Card
//! │ capture      │     │  - Normalize      │     │  - Transform │
//! │              │     │  - Filter         │     │  - Fill/crop │
//! │              │     │  - Redact         │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! The preview and still pipelines read the same [`crate::filters::FilterSelection`],
//! so what is captured always looks like what was previewed.
//!
//! # Modules
//!
//! - [`preview`]: Live filtered preview
//! - [`photo`]: Still capture, normalization and encoding
//! - [`composition`]: Baking the interactive transform into a card image

pub mod composition;
pub mod photo;
pub mod preview;
