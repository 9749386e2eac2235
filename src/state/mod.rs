// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state management types.
//!
//! [`LightState`] is the full snapshot of a light as last reported by the
//! bridge; [`LightUpdate`] is a partial mutation request carrying only the
//! fields to change. [`ResourceStore`] holds the last snapshot per resource
//! and [`TransitionCache`] the sticky per-resource transition times.

mod snapshot;
mod store;
mod update;

pub use snapshot::LightState;
pub use store::{ResourceSnapshot, ResourceStore, TransitionCache};
pub use update::LightUpdate;
