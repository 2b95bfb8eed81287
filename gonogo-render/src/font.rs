use ab_glyph::FontVec;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

const CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Locates a usable sans-serif font on the host system. The display surface
/// cannot come up without one; a failure here is a load failure for the whole
/// task (the machine never starts, a static notice is shown instead).
pub fn load_font() -> Result<FontVec> {
    for path in CANDIDATES {
        if Path::new(path).exists() {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading font file {path}"))?;
            return FontVec::try_from_vec(bytes)
                .map_err(|e| anyhow!("parsing font file {path}: {e}"));
        }
    }
    Err(anyhow!("no usable system font found"))
}
