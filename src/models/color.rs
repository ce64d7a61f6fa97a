use serde::{Deserialize, Serialize};

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const LIGHT_GREY: Rgb = Rgb(240, 240, 240);

    /// Parse `#rrggbb`
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Channels scaled to 0.0..=1.0
    #[must_use]
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Rgb::from_hex("#1f77b4"), Some(Rgb(0x1f, 0x77, 0xb4)));
        assert_eq!(Rgb::from_hex("1f77b4"), None);
        assert_eq!(Rgb::from_hex("#1f77"), None);
        assert_eq!(Rgb::from_hex("#zz77b4"), None);
    }

    #[test]
    fn test_unit_channels() {
        assert_eq!(Rgb::WHITE.unit(), (1.0, 1.0, 1.0));
        assert_eq!(Rgb::BLACK.unit(), (0.0, 0.0, 0.0));
    }
}
