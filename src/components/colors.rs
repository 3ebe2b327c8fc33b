use image::Rgba;
use serde::{Deserialize, Serialize};

// ============================================================================
// PALETTE
// ============================================================================

/// Swatches shown in the color panel of a new document.
pub const DEFAULT_PALETTE: [Rgba<u8>; 18] = [
    Rgba([0, 0, 0, 255]),       // black
    Rgba([255, 255, 255, 255]), // white
    Rgba([230, 41, 55, 255]),   // red
    Rgba([0, 228, 48, 255]),    // green
    Rgba([0, 121, 241, 255]),   // blue
    Rgba([253, 249, 0, 255]),   // yellow
    Rgba([255, 161, 0, 255]),   // orange
    Rgba([200, 122, 255, 255]), // purple
    Rgba([255, 109, 194, 255]), // pink
    Rgba([127, 106, 79, 255]),  // brown
    Rgba([130, 130, 130, 255]), // gray
    Rgba([80, 80, 80, 255]),    // dark gray
    Rgba([200, 200, 200, 255]), // light gray
    Rgba([102, 191, 255, 255]), // sky blue
    Rgba([255, 0, 255, 255]),   // magenta
    Rgba([255, 0, 128, 255]),
    Rgba([128, 255, 0, 255]),
    Rgba([0, 128, 255, 255]),
];

/// Serialized form of one swatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgba<u8>> for PaletteEntry {
    fn from(c: Rgba<u8>) -> Self {
        Self {
            r: c[0],
            g: c[1],
            b: c[2],
            a: c[3],
        }
    }
}

impl From<PaletteEntry> for Rgba<u8> {
    fn from(e: PaletteEntry) -> Self {
        Rgba([e.r, e.g, e.b, e.a])
    }
}

/// Ordered list of swatches. Order is preserved through save/load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba<u8>>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl Palette {
    pub fn new(colors: Vec<Rgba<u8>>) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[Rgba<u8>] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Option<Rgba<u8>> {
        self.colors.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn to_entries(&self) -> Vec<PaletteEntry> {
        self.colors.iter().copied().map(PaletteEntry::from).collect()
    }

    pub fn from_entries(entries: &[PaletteEntry]) -> Self {
        Self {
            colors: entries.iter().copied().map(Rgba::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_order() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 18);
        assert_eq!(palette.get(0), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(palette.get(1), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(palette.get(17), Some(Rgba([0, 128, 255, 255])));
        assert!(palette.colors().iter().all(|c| c[3] == 255));
    }

    #[test]
    fn entries_preserve_order_and_alpha() {
        let palette = Palette::new(vec![Rgba([1, 2, 3, 4]), Rgba([5, 6, 7, 8])]);
        let entries = palette.to_entries();
        assert_eq!(entries[1], PaletteEntry { r: 5, g: 6, b: 7, a: 8 });
        assert_eq!(Palette::from_entries(&entries), palette);
    }
}
