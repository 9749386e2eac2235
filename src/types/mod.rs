// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for Hue light attributes.
//!
//! This module provides type-safe representations of the values carried in
//! light snapshots and mutation requests. Numeric types validate their range
//! at construction time; mode enums map between the bridge's raw tokens and
//! the wire vocabulary published on the bus.
//!
//! # Types
//!
//! - [`Brightness`] - Brightness level (0-254)
//! - [`HueValue`] - Hue angle (0-65535)
//! - [`Saturation`] - Color saturation (0-254)
//! - [`ColorTemp`] - Color temperature in mireds
//! - [`CieXy`] - CIE chromaticity pair (each coordinate 0.0-1.0)
//! - [`TransitionTime`] - Transition duration in deciseconds
//! - [`AlertMode`], [`EffectMode`], [`ColorMode`] - mode vocabularies

mod brightness;
mod color;
mod modes;
mod transition;

pub use brightness::Brightness;
pub use color::{CieXy, ColorTemp, HueValue, Saturation};
pub use modes::{AlertMode, ColorMode, EffectMode};
pub use transition::TransitionTime;
