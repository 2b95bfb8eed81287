use ab_glyph::{point, Font, FontVec, Glyph, GlyphId, PxScale, ScaleFont};
use anyhow::{anyhow, Result};
use gonogo_cache::intern;
use gonogo_core::{RunSummary, Screen};
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Rect,
    Transform,
};

const BODY_PX: f32 = 26.0;
const HEADING_PX: f32 = 34.0;
const LINE_GAP: f32 = 10.0;
const STIMULUS_RADIUS: f32 = 90.0;
const CROSS_EXTENT: f32 = 40.0;
const CROSS_THICKNESS: f32 = 3.0;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const RED: [u8; 4] = [220, 60, 60, 255];

/// Display color for a stimulus identifier. Unknown identifiers fall back to
/// a light gray disc so a misconfigured catalog is visible, not invisible.
fn stimulus_color(id: &str) -> [u8; 4] {
    match id {
        "blue" => [66, 114, 220, 255],
        "orange" => [235, 140, 30, 255],
        "negative" => [170, 45, 45, 255],
        "neutral" => [130, 130, 130, 255],
        "positive" => [70, 170, 110, 255],
        _ => [200, 200, 200, 255],
    }
}

fn line_width<F: Font>(font: &F, scale: PxScale, text: &str) -> f32 {
    let sf = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(p) = prev {
            width += sf.kern(p, id);
        }
        width += sf.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Greedy word wrap. Explicit newlines are paragraph breaks and survive as
/// empty lines where doubled.
fn wrap_text<F: Font>(font: &F, scale: PxScale, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if line.is_empty() || line_width(font, scale, &candidate) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::take(&mut line));
                line = word.to_string();
            }
        }
        lines.push(line);
    }
    lines
}

/// Rasterizes one line of text into a tight transparent pixmap, premultiplied.
fn render_text_pixmap<F: Font>(text: &str, font_size: f32, font: &F, color: [u8; 4]) -> Pixmap {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }
    if min_x == f32::INFINITY {
        // Whitespace-only line: an empty pixmap with the line's height keeps
        // vertical stacking honest.
        let h = (sf.ascent() - sf.descent()).ceil().max(1.0) as u32;
        return Pixmap::new(1, h).unwrap_or_else(|| Pixmap::new(1, 1).unwrap());
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = match Pixmap::new(w, h) {
        Some(pm) => pm,
        None => return Pixmap::new(1, 1).unwrap(),
    };

    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            out.draw(|x, y, cov| {
                if cov <= f32::EPSILON {
                    return;
                }
                let ix = (x as f32 + b.min.x - min_x).floor() as i32;
                let iy = (y as f32 + b.min.y - min_y).floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;

                let a_lin = (cov * color[3] as f32 / 255.0).clamp(0.0, 1.0);
                let sr = (color[0] as f32 * a_lin) as u8;
                let sg = (color[1] as f32 * a_lin) as u8;
                let sb = (color[2] as f32 * a_lin) as u8;
                let sa = (a_lin * 255.0) as u8;

                // Over in premultiplied space; the target starts transparent
                // so overlap only occurs on kerned glyph edges.
                let inv = 1.0 - (sa as f32 / 255.0);
                let bg = dst[i];
                let r = sr.saturating_add((bg.red() as f32 * inv) as u8);
                let g2 = sg.saturating_add((bg.green() as f32 * inv) as u8);
                let b2 = sb.saturating_add((bg.blue() as f32 * inv) as u8);
                let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
                if let Some(px) = PremultipliedColorU8::from_rgba(r, g2, b2, a) {
                    dst[i] = px;
                }
            });
        }
    }
    pm
}

fn stimulus_pixmap(color: [u8; 4], radius: f32) -> Option<Pixmap> {
    let size = (radius * 2.0).ceil() as u32;
    let mut pm = Pixmap::new(size, size)?;
    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.set_color(Color::from_rgba8(color[0], color[1], color[2], color[3]));
    let mut pb = PathBuilder::new();
    pb.push_circle(radius, radius, radius);
    let path = pb.finish()?;
    pm.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    Some(pm)
}

/// Draws the engine's `Screen` values onto an offscreen canvas. Text lines
/// and stimulus discs are rasterized once and cached by interned id; every
/// frame is a full repaint of the canvas, which the display loop then copies
/// into its surface buffer.
pub struct TaskRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    font: FontVec,
    canvas: Pixmap,
    text_cache: HashMap<(usize, u32), Arc<Pixmap>>,
    stim_cache: HashMap<usize, Arc<Pixmap>>,
}

impl TaskRenderer {
    pub fn new(width: u32, height: u32, font: FontVec) -> Result<Self> {
        let mut canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid canvas size {width}x{height}"))?;
        canvas.fill(Color::from_rgba8(0, 0, 0, 255));
        Ok(TaskRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            font,
            canvas,
            text_cache: HashMap::new(),
            stim_cache: HashMap::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.center = (width as f32 / 2.0, height as f32 / 2.0);
        self.canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid canvas size {width}x{height}"))?;
        Ok(())
    }

    /// The finished frame, tightly packed premultiplied RGBA.
    pub fn frame(&self) -> &[u8] {
        self.canvas.data()
    }

    pub fn render(&mut self, screen: &Screen) {
        self.canvas.fill(Color::from_rgba8(0, 0, 0, 255));
        match screen {
            Screen::Blank => {}
            Screen::Text(text) => {
                let lines = wrap_text(
                    &self.font,
                    PxScale::from(BODY_PX),
                    text,
                    self.width as f32 * 0.78,
                );
                self.draw_lines(&lines, BODY_PX, WHITE, self.center.1);
            }
            Screen::Fixation => self.draw_fixation(),
            Screen::Stimulus { id } => self.draw_stimulus(id),
            Screen::Debrief(summary) => {
                let lines = debrief_lines(summary);
                self.draw_lines(&lines, BODY_PX, WHITE, self.center.1);
            }
            Screen::Failure(message) => {
                let heading = vec!["The task could not start.".to_string()];
                self.draw_lines(&heading, HEADING_PX, RED, self.center.1 - 80.0);
                let lines = wrap_text(
                    &self.font,
                    PxScale::from(BODY_PX),
                    message,
                    self.width as f32 * 0.78,
                );
                self.draw_lines(&lines, BODY_PX, WHITE, self.center.1 + 20.0);
            }
        }
    }

    fn draw_fixation(&mut self) {
        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color(Color::from_rgba8(255, 255, 255, 255));
        let (cx, cy) = self.center;
        let half = CROSS_EXTENT / 2.0;
        let ht = CROSS_THICKNESS / 2.0;
        if let Some(bar) = Rect::from_xywh(cx - half, cy - ht, CROSS_EXTENT, CROSS_THICKNESS) {
            self.canvas.fill_rect(bar, &paint, Transform::identity(), None);
        }
        if let Some(bar) = Rect::from_xywh(cx - ht, cy - half, CROSS_THICKNESS, CROSS_EXTENT) {
            self.canvas.fill_rect(bar, &paint, Transform::identity(), None);
        }
    }

    fn draw_stimulus(&mut self, id: &str) {
        let key = intern(id);
        let pm = match self.stim_cache.get(&key) {
            Some(pm) => Arc::clone(pm),
            None => {
                let Some(pm) = stimulus_pixmap(stimulus_color(id), STIMULUS_RADIUS) else {
                    return;
                };
                let pm = Arc::new(pm);
                self.stim_cache.insert(key, Arc::clone(&pm));
                pm
            }
        };
        self.blit_centered(&pm, self.center);
    }

    fn draw_lines(&mut self, lines: &[String], size_px: f32, color: [u8; 4], center_y: f32) {
        let line_height = size_px + LINE_GAP;
        let block_height = lines.len() as f32 * line_height;
        let mut y = center_y - block_height / 2.0 + line_height / 2.0;
        for line in lines {
            if !line.is_empty() {
                let pm = self.line_pixmap(line, size_px, color);
                self.blit_centered(&pm, (self.center.0, y));
            }
            y += line_height;
        }
    }

    fn line_pixmap(&mut self, line: &str, size_px: f32, color: [u8; 4]) -> Arc<Pixmap> {
        let key = (intern(line), size_px as u32);
        if let Some(pm) = self.text_cache.get(&key) {
            return Arc::clone(pm);
        }
        let pm = Arc::new(render_text_pixmap(line, size_px, &self.font, color));
        self.text_cache.insert(key, Arc::clone(&pm));
        pm
    }

    fn blit_centered(&mut self, pm: &Pixmap, pos: (f32, f32)) {
        let x = (pos.0 - pm.width() as f32 / 2.0).round() as i32;
        let y = (pos.1 - pm.height() as f32 / 2.0).round() as i32;
        self.canvas.draw_pixmap(
            x,
            y,
            pm.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

fn debrief_lines(summary: &RunSummary) -> Vec<String> {
    vec![
        format!(
            "You responded correctly on {}% of the trials.",
            summary.accuracy_pct
        ),
        format!(
            "Your average response time was {} ms.",
            summary.mean_rt_ms
        ),
        String::new(),
        "Press any key to complete the experiment.".to_string(),
        "Thank you!".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::load_font;

    #[test]
    fn known_stimuli_have_distinct_colors() {
        let ids = ["blue", "orange", "negative", "neutral", "positive"];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(stimulus_color(a), stimulus_color(b));
            }
        }
        assert_eq!(stimulus_color("mystery"), [200, 200, 200, 255]);
    }

    #[test]
    fn stimulus_pixmap_is_square_and_painted() {
        let pm = stimulus_pixmap([66, 114, 220, 255], 50.0).unwrap();
        assert_eq!((pm.width(), pm.height()), (100, 100));
        let center = pm.pixel(50, 50).unwrap();
        assert!(center.alpha() > 0);
        // Corners stay outside the disc.
        assert_eq!(pm.pixel(1, 1).unwrap().alpha(), 0);
    }

    #[test]
    fn debrief_text_reflects_the_summary() {
        let summary = RunSummary {
            total_response_steps: 80,
            correct_count: 72,
            accuracy_pct: 90,
            mean_rt_ms: 412,
            go_count: 50,
            go_correct: 48,
            go_accuracy_pct: 96,
            no_go_count: 30,
            no_go_correct: 24,
            no_go_accuracy_pct: 80,
        };
        let lines = debrief_lines(&summary);
        assert!(lines[0].contains("90%"));
        assert!(lines[1].contains("412 ms"));
    }

    // Font-dependent tests bail out quietly on hosts with no system fonts.

    #[test]
    fn wrapping_respects_the_width_limit() {
        let Ok(font) = load_font() else { return };
        let scale = PxScale::from(BODY_PX);
        let text = "Press the button with your index finger as fast as you can \
                    every time you see a blue circle.";
        let lines = wrap_text(&font, scale, text, 300.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line_width(&font, scale, line) <= 300.0);
        }
        // Nothing is lost in the wrap.
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn every_screen_kind_renders_without_panicking() {
        let Ok(font) = load_font() else { return };
        let mut renderer = TaskRenderer::new(640, 480, font).unwrap();
        let summary = RunSummary {
            total_response_steps: 2,
            correct_count: 1,
            accuracy_pct: 50,
            mean_rt_ms: 200,
            go_count: 2,
            go_correct: 1,
            go_accuracy_pct: 50,
            no_go_count: 0,
            no_go_correct: 0,
            no_go_accuracy_pct: 0,
        };
        for screen in [
            Screen::Blank,
            Screen::Text("Welcome to the experiment.\n\nPress any key.".into()),
            Screen::Fixation,
            Screen::Stimulus { id: "blue".into() },
            Screen::Debrief(summary),
            Screen::Failure("no usable system font found".into()),
        ] {
            renderer.render(&screen);
            assert_eq!(renderer.frame().len(), 640 * 480 * 4);
        }
        // Fixation puts white pixels at the exact center.
        renderer.render(&Screen::Fixation);
        let data = renderer.frame();
        let i = (240 * 640 + 320) * 4;
        assert_eq!(&data[i..i + 3], &[255, 255, 255]);
    }
}
