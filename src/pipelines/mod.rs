// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines for captured photos
//!
//! Everything after the hardware hands over a still runs here, off the
//! session thread, so encoding and network latency never hold up camera
//! start, stop or switch.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Captured     │ ──▶ │  Photo Pipeline   │ ──▶ │  Critique    │
//! │ Image (RGBA) │     │  - Resize         │     │  text or     │
//! │              │     │  - JPEG + base64  │     │  failure     │
//! │              │     │  - Feedback call  │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: Capture coordination, encoding and the critique request

pub mod photo;
