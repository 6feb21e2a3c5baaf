use serde::{Deserialize, Serialize};

/// 8-bit RGB color, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels scaled to `[0, 1]`.
    pub fn to_unit(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

const DEFAULT_COLORS: [Rgb; 28] = [
    Rgb::new(51, 160, 44),
    Rgb::new(166, 206, 227),
    Rgb::new(178, 223, 138),
    Rgb::new(31, 120, 180),
    Rgb::new(251, 154, 153),
    Rgb::new(227, 26, 28),
    Rgb::new(253, 191, 111),
    Rgb::new(106, 61, 154),
    Rgb::new(255, 127, 0),
    Rgb::new(202, 178, 214),
    Rgb::new(255, 0, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(0, 0, 255),
    Rgb::new(255, 255, 0),
    Rgb::new(255, 0, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(127, 255, 0),
    Rgb::new(255, 127, 0),
    Rgb::new(127, 0, 255),
    Rgb::new(255, 0, 127),
    Rgb::new(0, 127, 255),
    Rgb::new(0, 255, 127),
    Rgb::new(255, 127, 127),
    Rgb::new(127, 255, 127),
    Rgb::new(127, 127, 255),
    Rgb::new(127, 127, 255),
    Rgb::new(127, 255, 127),
    Rgb::new(127, 127, 255),
];

/// Non-empty list of colors indexed cyclically by hull position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rgb>", into = "Vec<Rgb>")]
pub struct ColorPalette {
    colors: Vec<Rgb>,
}

impl ColorPalette {
    pub fn new(colors: Vec<Rgb>) -> Option<Self> {
        (!colors.is_empty()).then_some(Self { colors })
    }

    pub fn color(&self, index: usize) -> Rgb {
        self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
        }
    }
}

impl TryFrom<Vec<Rgb>> for ColorPalette {
    type Error = String;

    fn try_from(colors: Vec<Rgb>) -> Result<Self, Self::Error> {
        Self::new(colors).ok_or_else(|| "palette needs at least one color".to_string())
    }
}

impl From<ColorPalette> for Vec<Rgb> {
    fn from(palette: ColorPalette) -> Self {
        palette.colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette() {
        let palette = ColorPalette::default();
        assert_eq!(palette.len(), 28);
        assert_eq!(palette.color(0), Rgb::new(51, 160, 44));
        assert_eq!(palette.color(27), Rgb::new(127, 127, 255));
    }

    #[test]
    fn index_wraps_around() {
        let palette = ColorPalette::new(vec![Rgb::new(1, 0, 0), Rgb::new(2, 0, 0)]).unwrap();
        assert_eq!(palette.color(0), palette.color(2));
        assert_eq!(palette.color(1), palette.color(5));
        assert_eq!(palette.color(3).r, 2);
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert!(ColorPalette::new(vec![]).is_none());
        assert!(serde_json::from_str::<ColorPalette>("[]").is_err());
    }

    #[test]
    fn palette_json_is_a_list_of_triples() {
        let palette: ColorPalette = serde_json::from_str("[[255, 0, 0], [0, 128, 255]]").unwrap();
        assert_eq!(palette.color(1), Rgb::new(0, 128, 255));
        assert_eq!(
            serde_json::to_string(&palette).unwrap(),
            "[[255,0,0],[0,128,255]]"
        );
    }

    #[test]
    fn unit_channels() {
        assert_eq!(Rgb::new(255, 0, 51).to_unit(), [1.0, 0.0, 0.2]);
    }
}
