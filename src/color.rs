//! Logarithmic five-tier color scale and legend.

use serde::Serialize;
use std::fmt;

pub const TIERS: usize = 5;

/// Tier-0 fill of derived ramps.
pub const NEUTRAL: &str = "#cccccc";

/// Stands in for a zero series maximum so the scale denominator stays
/// away from ln(1.01).
const MIN_SCALE_MAX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `#rrggbb` or `#rgb`.
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            6 => Some(Self {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
            }),
            3 => {
                let short = |i: usize| channel(i..i + 1).map(|v| v * 17);
                Some(Self {
                    r: short(0)?,
                    g: short(1)?,
                    b: short(2)?,
                })
            }
            _ => None,
        }
    }

    /// Move each channel toward white; `scale` 4 keeps the color, lower
    /// scales lighten by a further fifth of the remaining distance each.
    pub fn lighten(self, scale: u8) -> Self {
        let step = |c: u8| {
            let rest = u32::from(255 - c);
            let shift = rest * u32::from(4u8.saturating_sub(scale.min(4))) / 5;
            c + shift as u8
        };
        Self {
            r: step(self.r),
            g: step(self.g),
            b: step(self.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Five fills, indexed by tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColorRamp([String; TIERS]);

impl ColorRamp {
    pub fn new(colors: [String; TIERS]) -> Self {
        Self(colors)
    }

    /// Accepts exactly five colors.
    pub fn from_slice(colors: &[String]) -> Option<Self> {
        let colors: [String; TIERS] = colors.to_vec().try_into().ok()?;
        Some(Self(colors))
    }

    /// Neutral gray, then the base color lightened 60/40/20/0%.
    pub fn derived(base: Rgb) -> Self {
        Self([
            NEUTRAL.to_string(),
            base.lighten(1).to_string(),
            base.lighten(2).to_string(),
            base.lighten(3).to_string(),
            base.lighten(4).to_string(),
        ])
    }

    pub fn color(&self, tier: usize) -> &str {
        &self.0[tier.min(TIERS - 1)]
    }

    pub fn colors(&self) -> &[String; TIERS] {
        &self.0
    }
}

fn scale_denominator(max: f64) -> f64 {
    let max = if max > 0.0 && max.is_finite() {
        max
    } else {
        MIN_SCALE_MAX
    };
    ((max + 1.0) * 1.01).ln()
}

/// Tier index in `0..5` for `value` on a log scale topped at `max`.
pub fn tier(value: f64, max: f64) -> usize {
    if !(value > 0.0) {
        return 0;
    }
    let scaled = (value + 1.0).ln() * 4.0 / scale_denominator(max);
    if !scaled.is_finite() {
        return TIERS - 1;
    }
    (scaled.floor() as usize + 1).min(TIERS - 1)
}

/// Upper value bound of tier `i`.
pub fn tier_bound(i: usize, max: f64) -> f64 {
    (i as f64 * scale_denominator(max) / 4.0).exp() - 1.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: String,
    pub lower: f64,
    pub upper: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn new(ramp: &ColorRamp, max: f64) -> Self {
        let mut entries = Vec::with_capacity(TIERS);
        entries.push(LegendEntry {
            color: ramp.color(0).to_string(),
            lower: 0.0,
            upper: 0.0,
            label: "0".to_string(),
        });

        let mut prev = 0.0;
        for i in 1..TIERS {
            let upper = tier_bound(i, max);
            entries.push(LegendEntry {
                color: ramp.color(i).to_string(),
                lower: prev,
                upper,
                label: format!("{:.2} - {:.2}", prev + 0.01, upper),
            });
            prev = upper;
        }

        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgb::parse("#0091EA"), Some(Rgb { r: 0, g: 0x91, b: 0xea }));
        assert_eq!(Rgb::parse("#fff"), Some(Rgb { r: 255, g: 255, b: 255 }));
        assert_eq!(Rgb::parse("0091EA"), None);
        assert_eq!(Rgb::parse("#12345"), None);
        assert_eq!(Rgb::parse("#gg0000"), None);
    }

    #[test]
    fn test_lighten() {
        let base = Rgb { r: 0, g: 100, b: 255 };
        assert_eq!(base.lighten(4), base);
        // 3/5 of the way to white
        assert_eq!(base.lighten(1), Rgb { r: 153, g: 193, b: 255 });
        assert_eq!(base.lighten(3).to_string(), "#3383ff");
    }

    #[test]
    fn test_derived_ramp() {
        let ramp = ColorRamp::derived(Rgb::parse("#0091ea").unwrap());
        assert_eq!(ramp.color(0), NEUTRAL);
        assert_eq!(ramp.color(4), "#0091ea");
        assert_eq!(ramp.color(9), "#0091ea");
    }

    #[test]
    fn test_ramp_from_slice_needs_five() {
        let four: Vec<String> = ["#000", "#111", "#222", "#333"].map(String::from).to_vec();
        assert!(ColorRamp::from_slice(&four).is_none());
        let mut five = four.clone();
        five.push("#444".into());
        assert_eq!(ColorRamp::from_slice(&five).unwrap().color(4), "#444");
    }

    #[test]
    fn test_tier_zero_and_range() {
        assert_eq!(tier(0.0, 100.0), 0);
        assert_eq!(tier(-3.0, 100.0), 0);
        assert_eq!(tier(f64::NAN, 100.0), 0);
        assert_eq!(tier(100.0, 100.0), 4);
        assert_eq!(tier(1.0, 100.0), 1);
        assert!(tier(1e12, 100.0) <= 4);
    }

    #[test]
    fn test_tier_monotonic() {
        let max = 250.0;
        let mut last = tier(0.0, max);
        for step in 1..=2600 {
            let t = tier(step as f64 * 0.1, max);
            assert!(t >= last, "tier dropped at {step}");
            last = t;
        }
    }

    #[test]
    fn test_tier_zero_max_guard() {
        assert_eq!(tier(0.0, 0.0), 0);
        assert!(tier(0.5, 0.0) <= 4);
        assert_eq!(tier(1.0, 0.0), tier(1.0, 1.0));
    }

    #[test]
    fn test_legend_labels() {
        let ramp = ColorRamp::derived(Rgb::parse("#0091ea").unwrap());
        let legend = Legend::new(&ramp, 99.0);

        assert_eq!(legend.entries.len(), 5);
        assert_eq!(legend.entries[0].label, "0");
        assert_eq!(legend.entries[0].color, NEUTRAL);
        for pair in legend.entries[1..].windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower);
            assert!(pair[1].upper > pair[0].upper);
        }
        // Top bound clears the max by the 1% headroom.
        assert!(legend.entries[4].upper > 99.0);
        assert_eq!(
            legend.entries[1].label,
            format!("0.01 - {:.2}", tier_bound(1, 99.0))
        );
    }

    #[test]
    fn test_legend_bounds_agree_with_tier() {
        let max = 500.0;
        for i in 1..TIERS {
            let bound = tier_bound(i, max);
            assert_eq!(tier(bound * 0.999, max), i);
        }
    }
}
