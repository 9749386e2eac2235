// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound command parsing and routing.
//!
//! Command topics follow `PREFIX set/<resource>[/<datapoint>]` where
//! `<resource>` is `lights/<name>` or `groups/<name-or-0>`. Three payload
//! shapes are accepted: a JSON object of datapoints, a bare number as
//! brightness shorthand, and a per-datapoint scalar when the topic names a
//! single datapoint. Parsing is strict - an unknown datapoint or enum
//! token fails the whole command; nothing is silently dropped except
//! retained replays.

use serde_json::Value;

use crate::error::{Error, ParseError};
use crate::resource::ResourceAddress;
use crate::state::{LightUpdate, ResourceStore, TransitionCache};
use crate::types::{
    AlertMode, Brightness, CieXy, ColorMode, ColorTemp, EffectMode, HueValue, Saturation,
    TransitionTime,
};

/// A parsed command ready to be resolved and forwarded to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The addressed resource.
    pub address: ResourceAddress,
    /// The accumulated mutation request.
    pub update: LightUpdate,
}

/// The datapoint vocabulary addressable in topics and composite payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Datapoint {
    On,
    Bri,
    Hue,
    Sat,
    Ct,
    Alert,
    Effect,
    Colormode,
    Reachable,
    X,
    Y,
    TransitionTime,
}

impl Datapoint {
    /// Parses a datapoint name, with an optional `_inc` suffix on the
    /// fields the bridge accepts relative steps for.
    fn parse(name: &str) -> Result<(Self, bool), ParseError> {
        let (base, relative) = match name.strip_suffix("_inc") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let field = match base {
            "on" => Self::On,
            "bri" => Self::Bri,
            "hue" => Self::Hue,
            "sat" => Self::Sat,
            "ct" => Self::Ct,
            "alert" => Self::Alert,
            "effect" => Self::Effect,
            "colormode" => Self::Colormode,
            "reachable" => Self::Reachable,
            "x" => Self::X,
            "y" => Self::Y,
            "transitiontime" => Self::TransitionTime,
            _ => return Err(ParseError::UnknownDatapoint(name.to_string())),
        };
        if relative && !matches!(field, Self::Bri | Self::Hue | Self::Sat | Self::Ct) {
            return Err(ParseError::RelativeUnsupported(name.to_string()));
        }
        Ok((field, relative))
    }
}

/// Accumulates datapoint values into a [`LightUpdate`], holding the
/// chromaticity coordinates separately until both halves are known.
#[derive(Debug, Default)]
struct UpdateBuilder {
    update: LightUpdate,
    x: Option<f64>,
    y: Option<f64>,
}

impl UpdateBuilder {
    fn apply(&mut self, field: Datapoint, relative: bool, value: &Value) -> Result<(), Error> {
        if relative {
            let step = int_value(field, value)?;
            match field {
                Datapoint::Bri => self.update.bri_inc = Some(int_step(field, step)?),
                Datapoint::Hue => self.update.hue_inc = Some(int_step(field, step)?),
                Datapoint::Sat => self.update.sat_inc = Some(int_step(field, step)?),
                Datapoint::Ct => self.update.ct_inc = Some(int_step(field, step)?),
                // Datapoint::parse only hands out relative forms for the
                // four fields above.
                _ => return Err(ParseError::RelativeUnsupported(field_name(field).into()).into()),
            }
            return Ok(());
        }
        match field {
            Datapoint::On => self.update.on = Some(bool_value(field, value)?),
            Datapoint::Bri => {
                self.update.bri = Some(Brightness::new(int_value(field, value)?)?);
            }
            Datapoint::Hue => {
                self.update.hue = Some(HueValue::new(int_value(field, value)?)?);
            }
            Datapoint::Sat => {
                self.update.sat = Some(Saturation::new(int_value(field, value)?)?);
            }
            Datapoint::Ct => {
                self.update.ct = Some(ColorTemp::new(int_value(field, value)?)?);
            }
            Datapoint::Alert => {
                self.update.alert = Some(AlertMode::from_wire(token_value(field, value)?)?);
            }
            Datapoint::Effect => {
                self.update.effect = Some(EffectMode::from_wire(token_value(field, value)?)?);
            }
            Datapoint::Colormode => {
                self.update.colormode = Some(ColorMode::from_wire(token_value(field, value)?)?);
            }
            Datapoint::Reachable => self.update.reachable = Some(bool_value(field, value)?),
            Datapoint::X => self.x = Some(float_value(field, value)?),
            Datapoint::Y => self.y = Some(float_value(field, value)?),
            Datapoint::TransitionTime => {
                self.update.transitiontime =
                    Some(TransitionTime::new(int_value(field, value)?)?);
            }
        }
        Ok(())
    }

    /// Completes a half-given chromaticity pair from the last snapshot;
    /// with no counterpart available the coordinate is dropped.
    fn finish(mut self, store: &ResourceStore, path: &str) -> Result<LightUpdate, Error> {
        let cached = store.get(path).map(|snapshot| &snapshot.state);
        let pair = match (self.x, self.y) {
            (None, None) => None,
            (Some(x), Some(y)) => Some((x, y)),
            (Some(x), None) => match cached.and_then(|s| s.y) {
                Some(y) => Some((x, y)),
                None => {
                    tracing::warn!(path, "Dropping x coordinate: no cached y to pair it with");
                    None
                }
            },
            (None, Some(y)) => match cached.and_then(|s| s.x) {
                Some(x) => Some((x, y)),
                None => {
                    tracing::warn!(path, "Dropping y coordinate: no cached x to pair it with");
                    None
                }
            },
        };
        if let Some((x, y)) = pair {
            self.update.xy = Some(CieXy::new(x, y)?);
        }
        Ok(self.update)
    }
}

fn field_name(field: Datapoint) -> &'static str {
    match field {
        Datapoint::On => "on",
        Datapoint::Bri => "bri",
        Datapoint::Hue => "hue",
        Datapoint::Sat => "sat",
        Datapoint::Ct => "ct",
        Datapoint::Alert => "alert",
        Datapoint::Effect => "effect",
        Datapoint::Colormode => "colormode",
        Datapoint::Reachable => "reachable",
        Datapoint::X => "x",
        Datapoint::Y => "y",
        Datapoint::TransitionTime => "transitiontime",
    }
}

fn invalid(field: Datapoint, message: impl Into<String>) -> ParseError {
    ParseError::InvalidValue {
        field: field_name(field).to_string(),
        message: message.into(),
    }
}

fn number_value(field: Datapoint, value: &Value) -> Result<f64, ParseError> {
    value
        .as_f64()
        .ok_or_else(|| invalid(field, format!("expected a number, got {value}")))
}

/// Numeric fields truncate fractional input to integer.
fn int_value(field: Datapoint, value: &Value) -> Result<i64, ParseError> {
    let number = number_value(field, value)?;
    if !number.is_finite() {
        return Err(invalid(field, "not a finite number"));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(number.trunc() as i64)
}

fn int_step<T: TryFrom<i64>>(field: Datapoint, step: i64) -> Result<T, ParseError> {
    T::try_from(step).map_err(|_| invalid(field, format!("step {step} out of range")))
}

fn float_value(field: Datapoint, value: &Value) -> Result<f64, ParseError> {
    number_value(field, value)
}

fn bool_value(field: Datapoint, value: &Value) -> Result<bool, ParseError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        _ => Err(invalid(field, format!("expected a boolean, got {value}"))),
    }
}

fn token_value<'v>(field: Datapoint, value: &'v Value) -> Result<&'v str, ParseError> {
    value
        .as_str()
        .ok_or_else(|| invalid(field, format!("expected a token, got {value}")))
}

/// Parses inbound bus messages into mutation requests.
pub struct CommandRouter {
    prefix: String,
}

impl CommandRouter {
    /// Creates a router for the given topic prefix (trailing slash
    /// included, e.g. `hue/`).
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Routes one inbound message.
    ///
    /// Returns `Ok(Some(command))` when a mutation should be forwarded,
    /// `Ok(None)` when the message was consumed without a mutation
    /// (non-command topic, retained replay, sticky transition-time update,
    /// or a command that emptied out), and `Err` on any parse failure.
    ///
    /// # Errors
    ///
    /// Returns an error for topics outside the grammar, unknown datapoint
    /// names, enum tokens outside their vocabulary, and malformed values.
    pub fn route(
        &self,
        topic: &str,
        payload: &[u8],
        retained: bool,
        store: &ResourceStore,
        transitions: &mut TransitionCache,
    ) -> Result<Option<Command>, Error> {
        let Some(rest) = topic.strip_prefix(&self.prefix) else {
            tracing::trace!(topic, "Ignoring topic outside prefix");
            return Ok(None);
        };
        let Some(rest) = rest.strip_prefix("set/") else {
            tracing::trace!(topic, "Ignoring non-set topic");
            return Ok(None);
        };

        let segments: Vec<&str> = rest.split('/').collect();
        let (address, datapoint) = match segments[..] {
            [kind, name] => (ResourceAddress::parse(&format!("{kind}/{name}"))?, None),
            [kind, name, datapoint] => (
                ResourceAddress::parse(&format!("{kind}/{name}"))?,
                Some(Datapoint::parse(datapoint)?),
            ),
            _ => return Err(ParseError::BadTopic(rest.to_string()).into()),
        };
        let path = address.path();

        let text = std::str::from_utf8(payload)
            .map_err(|_| ParseError::BadTopic(format!("{topic}: payload is not UTF-8")))?
            .trim();

        // The sticky transition time is the one datapoint retained
        // messages may set: it seeds per-resource defaults on reconnect
        // instead of replaying a command.
        if let Some((Datapoint::TransitionTime, false)) = datapoint {
            let value = parse_scalar(Datapoint::TransitionTime, text)?;
            let tt = TransitionTime::new(int_value(Datapoint::TransitionTime, &value)?)?;
            tracing::info!(path, transitiontime = %tt, "Caching transition time");
            transitions.set(&path, tt);
            return Ok(None);
        }

        if retained {
            tracing::debug!(topic, "Ignoring retained set message");
            return Ok(None);
        }

        let mut builder = UpdateBuilder::default();
        if let Some((field, relative)) = datapoint {
            let value = parse_scalar(field, text)?;
            builder.apply(field, relative, &value)?;
        } else {
            parse_composite(&mut builder, text, &path)?;
        }

        let mut update = builder.finish(store, &path)?;
        if update.is_empty() {
            tracing::warn!(topic, "Command carried no applicable fields, dropping");
            return Ok(None);
        }
        if update.transitiontime.is_none() {
            update.transitiontime = transitions.get(&path);
        }
        Ok(Some(Command { address, update }))
    }
}

/// Parses the composite payload forms: a JSON object of datapoints or the
/// brightness shorthand number.
fn parse_composite(builder: &mut UpdateBuilder, text: &str, path: &str) -> Result<(), Error> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(members)) => {
            for (name, value) in &members {
                let (field, relative) = Datapoint::parse(name)?;
                builder.apply(field, relative, value)?;
            }
            Ok(())
        }
        Ok(Value::Number(number)) => {
            apply_brightness_shorthand(builder, &Value::Number(number), path)
        }
        Ok(other) => Err(ParseError::InvalidValue {
            field: "payload".to_string(),
            message: format!("expected an object or number, got {other}"),
        }
        .into()),
        Err(e) => Err(ParseError::Json(e).into()),
    }
}

/// The composite-scalar shorthand: below 1 turns the light off, anything
/// else turns it on at the clamped brightness.
fn apply_brightness_shorthand(
    builder: &mut UpdateBuilder,
    value: &Value,
    path: &str,
) -> Result<(), Error> {
    let number = number_value(Datapoint::Bri, value)?;
    if number < 1.0 {
        builder.update.on = Some(false);
    } else {
        builder.update.on = Some(true);
        #[allow(clippy::cast_possible_truncation)]
        let level = number.trunc() as i64;
        builder.update.bri = Some(Brightness::clamped(level));
    }
    tracing::debug!(path, value = number, "Applied brightness shorthand");
    Ok(())
}

/// Parses a per-datapoint scalar payload into a JSON value suitable for
/// the shared field parsers. Enum datapoints take their token verbatim;
/// everything else must be a number or boolean literal.
fn parse_scalar(field: Datapoint, text: &str) -> Result<Value, ParseError> {
    match field {
        Datapoint::Alert | Datapoint::Effect | Datapoint::Colormode => {
            Ok(Value::String(text.to_string()))
        }
        Datapoint::On | Datapoint::Reachable => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => serde_json::from_str(text).map_err(|_| invalid(field, format!("{text:?}"))),
        },
        _ => serde_json::from_str(text).map_err(|_| invalid(field, format!("{text:?}"))),
    }
}
