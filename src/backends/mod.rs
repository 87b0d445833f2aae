// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Pipeline Layer                │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │ Session control  │  │ Virtual Camera  │  │
//! │  │    (camera)      │  │   (software)    │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Backend trait, shared types and the session controller
//! - [`virtual_camera`]: Software camera used without hardware and in tests

pub mod camera;
pub mod virtual_camera;
