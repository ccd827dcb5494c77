//! CSS color parsing for style options.

use eframe::egui::Color32;

/// Parses a CSS color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or a basic color name.
pub fn parse_color(input: &str) -> Result<Color32, String> {
    let value = input.trim();

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| format!("Invalid hex color: {}", input));
    }

    named_color(&value.to_ascii_lowercase()).ok_or_else(|| format!("Unknown color: {}", input))
}

fn parse_hex(hex: &str) -> Option<Color32> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    let [r, g, b, a] = match hex.len() {
        3 => [nibble(0)?, nibble(1)?, nibble(2)?, 255],
        4 => [nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?],
        6 => [byte(0)?, byte(2)?, byte(4)?, 255],
        8 => [byte(0)?, byte(2)?, byte(4)?, byte(6)?],
        _ => return None,
    };

    Some(Color32::from_rgba_unmultiplied(r, g, b, a))
}

fn named_color(name: &str) -> Option<Color32> {
    let color = match name {
        "black" => Color32::from_rgb(0, 0, 0),
        "white" => Color32::from_rgb(255, 255, 255),
        "gray" | "grey" => Color32::from_rgb(128, 128, 128),
        "lightgray" | "lightgrey" => Color32::from_rgb(211, 211, 211),
        "darkgray" | "darkgrey" => Color32::from_rgb(169, 169, 169),
        "red" => Color32::from_rgb(255, 0, 0),
        "green" => Color32::from_rgb(0, 128, 0),
        "blue" => Color32::from_rgb(0, 0, 255),
        "yellow" => Color32::from_rgb(255, 255, 0),
        "orange" => Color32::from_rgb(255, 165, 0),
        "transparent" => Color32::TRANSPARENT,
        _ => return None,
    };
    Some(color)
}

/// Formats a color as `#rrggbb`, or `#rrggbbaa` when not opaque.
pub fn format_color(color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    if a == 255 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

/// Converts a color to unmultiplied RGBA floats in `0.0..=1.0` for GPU buffers.
pub fn color_to_rgba(color: Color32) -> [f32; 4] {
    color
        .to_srgba_unmultiplied()
        .map(|channel| channel as f32 / 255.0)
}

/// Serde adapter for colors written as CSS strings.
pub mod serde_color {
    use super::{format_color, parse_color};
    use eframe::egui::Color32;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_color(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color32, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_color(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_color("#fff").unwrap(), Color32::WHITE);
        assert_eq!(parse_color("#4190da").unwrap(), Color32::from_rgb(0x41, 0x90, 0xda));
        assert_eq!(parse_color("#ff000080").unwrap().a(), 128);
        assert_eq!(parse_color("#0f08").unwrap().a(), 136);
    }

    #[test]
    fn test_parse_names_and_errors() {
        assert_eq!(parse_color("gray").unwrap(), Color32::from_rgb(128, 128, 128));
        assert_eq!(parse_color(" Grey ").unwrap(), Color32::from_rgb(128, 128, 128));
        assert!(parse_color("#ggg").is_err());
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn test_format_and_rgba() {
        assert_eq!(format_color(Color32::from_rgb(0xbd, 0xbd, 0xbd)), "#bdbdbd");
        assert_eq!(color_to_rgba(Color32::WHITE), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(color_to_rgba(Color32::BLACK), [0.0, 0.0, 0.0, 1.0]);
    }
}
