// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Pipelines / card flow             │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │     Camera       │  │ Virtual Camera  │  │
//! │  │ (trait, session) │  │  (synthetic)    │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: Hardware seam, lens inventory and the capture session
//! - [`virtual_camera`]: Synthetic multi-lens device

pub mod camera;
pub mod virtual_camera;
