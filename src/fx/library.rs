// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::collections::HashMap;

use serde::Serialize;

use super::color::{Color, BLACK};
use super::colour::ColourEffect;
use super::effect::{Effect, OutputKind};
use super::error::FxError;
use super::position::PositionEffect;
use super::slider::{Curve, SliderEffect};

/// One parameter of an effect type, with its default as a string.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: &'static str,
}

/// Catalog entry describing an effect type to the surface.
#[derive(Debug, Clone, Serialize)]
pub struct EffectTypeInfo {
    pub name: &'static str,
    pub output: OutputKind,
    pub description: &'static str,
    pub parameters: Vec<ParamSpec>,
}

fn param(name: &'static str, default: &'static str) -> ParamSpec {
    ParamSpec { name, default }
}

/// The effect type catalog, in library order.
pub fn catalog() -> Vec<EffectTypeInfo> {
    vec![
        EffectTypeInfo {
            name: "SineWave",
            output: OutputKind::Slider,
            description: "Smooth sine oscillation between min and max",
            parameters: vec![param("min", "0"), param("max", "255")],
        },
        EffectTypeInfo {
            name: "RampUp",
            output: OutputKind::Slider,
            description: "Rises min to max, then wraps",
            parameters: vec![param("min", "0"), param("max", "255"), param("curve", "linear")],
        },
        EffectTypeInfo {
            name: "RampDown",
            output: OutputKind::Slider,
            description: "Falls max to min, then wraps",
            parameters: vec![param("min", "0"), param("max", "255"), param("curve", "linear")],
        },
        EffectTypeInfo {
            name: "Triangle",
            output: OutputKind::Slider,
            description: "Rises then falls symmetrically",
            parameters: vec![param("min", "0"), param("max", "255"), param("curve", "linear")],
        },
        EffectTypeInfo {
            name: "Pulse",
            output: OutputKind::Slider,
            description: "Attack, hold at max, then decay",
            parameters: vec![
                param("min", "0"),
                param("max", "255"),
                param("attackRatio", "0.25"),
                param("holdRatio", "0.0"),
            ],
        },
        EffectTypeInfo {
            name: "SquareWave",
            output: OutputKind::Slider,
            description: "Hard switch between max and min",
            parameters: vec![param("min", "0"), param("max", "255"), param("dutyCycle", "0.5")],
        },
        EffectTypeInfo {
            name: "Strobe",
            output: OutputKind::Slider,
            description: "Short on bursts against an off value",
            parameters: vec![
                param("offValue", "0"),
                param("onValue", "255"),
                param("onRatio", "0.1"),
            ],
        },
        EffectTypeInfo {
            name: "Flicker",
            output: OutputKind::Slider,
            description: "Deterministic candle-like flicker",
            parameters: vec![param("min", "0"), param("max", "255")],
        },
        EffectTypeInfo {
            name: "Breathe",
            output: OutputKind::Slider,
            description: "Slow breathing swell",
            parameters: vec![param("min", "0"), param("max", "255")],
        },
        EffectTypeInfo {
            name: "StaticValue",
            output: OutputKind::Slider,
            description: "Fixed level, windowed across distributed members",
            parameters: vec![param("value", "255")],
        },
        EffectTypeInfo {
            name: "ColourCycle",
            output: OutputKind::Colour,
            description: "Steps through a palette with optional crossfade",
            parameters: vec![
                param("palette", "red;green;blue"),
                param("fadeRatio", "0.25"),
            ],
        },
        EffectTypeInfo {
            name: "RainbowCycle",
            output: OutputKind::Colour,
            description: "Full hue wheel per cycle",
            parameters: vec![param("saturation", "1.0"), param("brightness", "1.0")],
        },
        EffectTypeInfo {
            name: "ColourStrobe",
            output: OutputKind::Colour,
            description: "Flashes between two colours",
            parameters: vec![
                param("on", "white"),
                param("off", "black"),
                param("onRatio", "0.1"),
            ],
        },
        EffectTypeInfo {
            name: "ColourPulse",
            output: OutputKind::Colour,
            description: "Blends a to b and back",
            parameters: vec![param("a", "red"), param("b", "blue")],
        },
        EffectTypeInfo {
            name: "ColourFade",
            output: OutputKind::Colour,
            description: "One-way or ping-pong blend between two colours",
            parameters: vec![
                param("from", "black"),
                param("to", "white"),
                param("pingPong", "false"),
            ],
        },
        EffectTypeInfo {
            name: "ColourFlicker",
            output: OutputKind::Colour,
            description: "Deterministic brightness flicker of a base colour",
            parameters: vec![param("base", "white"), param("variation", "0.3")],
        },
        EffectTypeInfo {
            name: "StaticColour",
            output: OutputKind::Colour,
            description: "Fixed colour, windowed across distributed members",
            parameters: vec![param("colour", "white")],
        },
        EffectTypeInfo {
            name: "Circle",
            output: OutputKind::Position,
            description: "Circular sweep around a center",
            parameters: vec![
                param("panCenter", "128"),
                param("tiltCenter", "128"),
                param("panRadius", "64"),
                param("tiltRadius", "64"),
            ],
        },
        EffectTypeInfo {
            name: "Figure8",
            output: OutputKind::Position,
            description: "Figure-eight sweep around a center",
            parameters: vec![
                param("panCenter", "128"),
                param("tiltCenter", "128"),
                param("panRadius", "64"),
                param("tiltRadius", "64"),
            ],
        },
        EffectTypeInfo {
            name: "Sweep",
            output: OutputKind::Position,
            description: "There-and-back sweep between two positions",
            parameters: vec![
                param("panStart", "0"),
                param("panEnd", "255"),
                param("tiltStart", "128"),
                param("tiltEnd", "128"),
                param("curve", "linear"),
            ],
        },
        EffectTypeInfo {
            name: "PanSweep",
            output: OutputKind::Position,
            description: "Pan sweep at a fixed tilt",
            parameters: vec![param("min", "0"), param("max", "255"), param("tilt", "128")],
        },
        EffectTypeInfo {
            name: "TiltSweep",
            output: OutputKind::Position,
            description: "Tilt sweep at a fixed pan",
            parameters: vec![param("min", "0"), param("max", "255"), param("pan", "128")],
        },
        EffectTypeInfo {
            name: "RandomPosition",
            output: OutputKind::Position,
            description: "Deterministic jumps around a center",
            parameters: vec![
                param("panCenter", "128"),
                param("tiltCenter", "128"),
                param("range", "64"),
            ],
        },
        EffectTypeInfo {
            name: "StaticPosition",
            output: OutputKind::Position,
            description: "Fixed position, windowed across distributed members",
            parameters: vec![param("pan", "128"), param("tilt", "128")],
        },
    ]
}

type Params<'a> = &'a HashMap<String, String>;

fn invalid(name: &str, value: &str, message: impl Into<String>) -> FxError {
    FxError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        message: message.into(),
    }
}

fn byte(params: Params, name: &str, default: u8) -> Result<u8, FxError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u8>()
            .map_err(|_| invalid(name, value, "expected a byte 0-255")),
    }
}

fn float(params: Params, name: &str, default: f64) -> Result<f64, FxError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => {
            let parsed = value
                .trim()
                .parse::<f64>()
                .map_err(|_| invalid(name, value, "expected a number"))?;
            if !parsed.is_finite() {
                return Err(invalid(name, value, "expected a finite number"));
            }
            Ok(parsed)
        }
    }
}

fn ratio(params: Params, name: &str, default: f64) -> Result<f64, FxError> {
    let value = float(params, name, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(
            name,
            &value.to_string(),
            "expected a ratio between 0 and 1",
        ));
    }
    Ok(value)
}

fn boolean(params: Params, name: &str, default: bool) -> Result<bool, FxError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(invalid(name, value, "expected true or false")),
        },
    }
}

fn curve(params: Params, name: &str) -> Result<Curve, FxError> {
    match params.get(name) {
        None => Ok(Curve::Linear),
        Some(value) => {
            Curve::from_name(value.trim()).ok_or_else(|| invalid(name, value, "unknown curve"))
        }
    }
}

/// Parses a colour as a name, `#rrggbb` hex, or an `r,g,b` triple.
fn parse_colour(name: &str, value: &str) -> Result<Color, FxError> {
    let value = value.trim();
    if value.starts_with('#') {
        return Color::from_hex(value).map_err(|message| invalid(name, value, message));
    }
    if value.contains(',') {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(invalid(name, value, "expected r,g,b"));
        }
        let component = |part: &str| {
            part.parse::<u8>()
                .map_err(|_| invalid(name, value, "expected byte components"))
        };
        return Ok(Color::new(
            component(parts[0])?,
            component(parts[1])?,
            component(parts[2])?,
        ));
    }
    Color::from_name(value).map_err(|message| invalid(name, value, message))
}

fn colour(params: Params, name: &str, default: Color) -> Result<Color, FxError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => parse_colour(name, value),
    }
}

/// Parses a semicolon-separated palette.
fn palette(params: Params, name: &str, default: &[Color]) -> Result<Vec<Color>, FxError> {
    match params.get(name) {
        None => Ok(default.to_vec()),
        Some(value) => {
            let colours: Result<Vec<Color>, FxError> = value
                .split(';')
                .filter(|part| !part.trim().is_empty())
                .map(|part| parse_colour(name, part))
                .collect();
            let colours = colours?;
            if colours.is_empty() {
                return Err(invalid(name, value, "palette must not be empty"));
            }
            Ok(colours)
        }
    }
}

/// Validates a beat division from the surface.
pub fn validate_beat_division(division: f64) -> Result<f64, FxError> {
    if !division.is_finite() || division <= 0.0 || division > 64.0 {
        return Err(FxError::InvalidBeatDivision(division.to_string()));
    }
    Ok(division)
}

const WHITE: Color = Color {
    r: 255,
    g: 255,
    b: 255,
};

/// Builds an effect from its wire name and string parameters. Unknown types
/// are rejected; unknown parameters are ignored; malformed values are
/// rejected.
pub fn build_effect(effect_type: &str, params: Params) -> Result<Effect, FxError> {
    let effect = match effect_type {
        "SineWave" => Effect::Slider(SliderEffect::SineWave {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
        }),
        "RampUp" => Effect::Slider(SliderEffect::RampUp {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
            curve: curve(params, "curve")?,
        }),
        "RampDown" => Effect::Slider(SliderEffect::RampDown {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
            curve: curve(params, "curve")?,
        }),
        "Triangle" => Effect::Slider(SliderEffect::Triangle {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
            curve: curve(params, "curve")?,
        }),
        "Pulse" => Effect::Slider(SliderEffect::Pulse {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
            attack_ratio: ratio(params, "attackRatio", 0.25)?,
            hold_ratio: ratio(params, "holdRatio", 0.0)?,
        }),
        "SquareWave" => Effect::Slider(SliderEffect::SquareWave {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
            duty_cycle: ratio(params, "dutyCycle", 0.5)?,
        }),
        "Strobe" => Effect::Slider(SliderEffect::Strobe {
            off_value: byte(params, "offValue", 0)?,
            on_value: byte(params, "onValue", 255)?,
            on_ratio: ratio(params, "onRatio", 0.1)?,
        }),
        "Flicker" => Effect::Slider(SliderEffect::Flicker {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
        }),
        "Breathe" => Effect::Slider(SliderEffect::Breathe {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
        }),
        "StaticValue" => Effect::Slider(SliderEffect::StaticValue {
            value: byte(params, "value", 255)?,
        }),
        "ColourCycle" => Effect::Colour(ColourEffect::ColourCycle {
            palette: palette(
                params,
                "palette",
                &[
                    Color { r: 255, g: 0, b: 0 },
                    Color { r: 0, g: 255, b: 0 },
                    Color { r: 0, g: 0, b: 255 },
                ],
            )?,
            fade_ratio: ratio(params, "fadeRatio", 0.25)?,
        }),
        "RainbowCycle" => Effect::Colour(ColourEffect::RainbowCycle {
            saturation: ratio(params, "saturation", 1.0)?,
            brightness: ratio(params, "brightness", 1.0)?,
        }),
        "ColourStrobe" => Effect::Colour(ColourEffect::ColourStrobe {
            on: colour(params, "on", WHITE)?,
            off: colour(params, "off", BLACK)?,
            on_ratio: ratio(params, "onRatio", 0.1)?,
        }),
        "ColourPulse" => Effect::Colour(ColourEffect::ColourPulse {
            a: colour(params, "a", Color { r: 255, g: 0, b: 0 })?,
            b: colour(params, "b", Color { r: 0, g: 0, b: 255 })?,
        }),
        "ColourFade" => Effect::Colour(ColourEffect::ColourFade {
            from: colour(params, "from", BLACK)?,
            to: colour(params, "to", WHITE)?,
            ping_pong: boolean(params, "pingPong", false)?,
        }),
        "ColourFlicker" => Effect::Colour(ColourEffect::ColourFlicker {
            base: colour(params, "base", WHITE)?,
            variation: ratio(params, "variation", 0.3)?,
        }),
        "StaticColour" => Effect::Colour(ColourEffect::StaticColour {
            colour: colour(params, "colour", WHITE)?,
        }),
        "Circle" => Effect::Position(PositionEffect::Circle {
            pan_center: byte(params, "panCenter", 128)?,
            tilt_center: byte(params, "tiltCenter", 128)?,
            pan_radius: byte(params, "panRadius", 64)?,
            tilt_radius: byte(params, "tiltRadius", 64)?,
        }),
        "Figure8" => Effect::Position(PositionEffect::Figure8 {
            pan_center: byte(params, "panCenter", 128)?,
            tilt_center: byte(params, "tiltCenter", 128)?,
            pan_radius: byte(params, "panRadius", 64)?,
            tilt_radius: byte(params, "tiltRadius", 64)?,
        }),
        "Sweep" => Effect::Position(PositionEffect::Sweep {
            pan_start: byte(params, "panStart", 0)?,
            pan_end: byte(params, "panEnd", 255)?,
            tilt_start: byte(params, "tiltStart", 128)?,
            tilt_end: byte(params, "tiltEnd", 128)?,
            curve: curve(params, "curve")?,
        }),
        "PanSweep" => Effect::Position(PositionEffect::PanSweep {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
            tilt: byte(params, "tilt", 128)?,
        }),
        "TiltSweep" => Effect::Position(PositionEffect::TiltSweep {
            min: byte(params, "min", 0)?,
            max: byte(params, "max", 255)?,
            pan: byte(params, "pan", 128)?,
        }),
        "RandomPosition" => Effect::Position(PositionEffect::RandomPosition {
            pan_center: byte(params, "panCenter", 128)?,
            tilt_center: byte(params, "tiltCenter", 128)?,
            range: byte(params, "range", 64)?,
        }),
        "StaticPosition" => Effect::Position(PositionEffect::StaticPosition {
            pan: byte(params, "pan", 128)?,
            tilt: byte(params, "tilt", 128)?,
        }),
        _ => return Err(FxError::UnknownEffectType(effect_type.to_string())),
    };
    Ok(effect)
}
