//! Border glyphs shared by the configuration layer and the viewport engine.

/// The eight strings drawn on the border.
///
/// Row glyphs (`top`, `bottom`, `overflow_top`, `overflow_bottom`) are drawn
/// at the start of a border row. Column glyphs must each occupy exactly one
/// terminal column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderGlyphs {
    pub top: String,
    pub bottom: String,
    pub left: String,
    pub right: String,
    pub overflow_top: String,
    pub overflow_bottom: String,
    pub overflow_left: String,
    pub overflow_right: String,
}

impl Default for BorderGlyphs {
    fn default() -> Self {
        Self {
            top: "~~~~".into(),
            bottom: "~~~~".into(),
            left: "~".into(),
            right: "~".into(),
            overflow_top: "▲▲▲▲".into(),
            overflow_bottom: "▼▼▼▼".into(),
            overflow_left: "◀".into(),
            overflow_right: "▶".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_glyphs() {
        let glyphs = BorderGlyphs::default();
        assert_eq!(glyphs.top, "~~~~");
        assert_eq!(glyphs.left, "~");
        assert_eq!(glyphs.overflow_top, "▲▲▲▲");
        assert_eq!(glyphs.overflow_right, "▶");
    }
}
