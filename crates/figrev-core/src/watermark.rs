//! Provenance watermark overlay.
//!
//! For every unwatermarked PNG or SVG item on a draft, produces a second
//! item flagged `is_watermarked=true`: a copy of the data with a scannable
//! identity code and a text line composited on top. The original item is
//! never touched, and the watermarked copy declares the same width and
//! height. Overlay failures degrade to a warning; they never abort a
//! publish.

use figrev_model::{DataItem, FigrevError, ImageFormat, Result, RevisionDraft, WatermarkOptions};
use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Side length of the identity code, in modules. 16×16 holds exactly the
/// 256 bits of a SHA-256 digest, one bit per module.
const CODE_MODULES: u32 = 16;

/// Applies the overlay configured in [`WatermarkOptions`].
pub struct Watermarker {
    options: WatermarkOptions,
}

impl Watermarker {
    pub fn new(options: WatermarkOptions) -> Self {
        Self { options }
    }

    /// Append a watermarked counterpart for every eligible image item.
    /// No-op when watermarking is disabled.
    pub fn apply(&self, draft: &mut RevisionDraft, identity: &str) {
        if !self.options.enabled {
            return;
        }
        let text = self.options.text.as_deref().unwrap_or(identity);

        let mut extra = Vec::new();
        for item in &draft.items {
            let DataItem::Image {
                name,
                format,
                data,
                is_watermarked: false,
                width,
                height,
            } = item
            else {
                continue;
            };
            let stamped = match format {
                ImageFormat::Png => self.stamp_png(data, identity, text),
                ImageFormat::Svg => self.stamp_svg(data, identity, text),
                ImageFormat::Html | ImageFormat::Snapshot => continue,
            };
            match stamped {
                Ok(bytes) => extra.push(DataItem::Image {
                    name: format!("{name} (watermarked)"),
                    format: *format,
                    data: bytes,
                    is_watermarked: true,
                    width: *width,
                    height: *height,
                }),
                Err(err) => warn!(item = name.as_str(), %err, "watermark overlay failed"),
            }
        }
        for item in extra {
            draft.push_item(item);
        }
    }

    fn stamp_png(&self, data: &[u8], identity: &str, text: &str) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(data)
            .map_err(|e| FigrevError::render(format!("png decode: {e}")))?;
        let mut img = decoded.to_rgba8();
        let (w, h) = (img.width(), img.height());

        if self.options.show_code {
            // Quiet zone of one module on each side, anchored bottom-right.
            let module = (w.min(h) / (4 * (CODE_MODULES + 2))).max(2);
            let side = module * (CODE_MODULES + 2);
            let x0 = w.saturating_sub(side);
            let y0 = h.saturating_sub(side);
            fill_rect(&mut img, x0, y0, side, side, Rgba([255, 255, 255, 255]));
            let bits = code_bits(identity);
            for (row, cols) in bits.iter().enumerate() {
                for (col, on) in cols.iter().enumerate() {
                    if *on {
                        fill_rect(
                            &mut img,
                            x0 + module * (col as u32 + 1),
                            y0 + module * (row as u32 + 1),
                            module,
                            module,
                            Rgba([0, 0, 0, 255]),
                        );
                    }
                }
            }
        }

        draw_text_strip(&mut img, text);

        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| FigrevError::render(format!("png encode: {e}")))?;
        Ok(out.into_inner())
    }

    fn stamp_svg(&self, data: &[u8], identity: &str, text: &str) -> Result<Vec<u8>> {
        let markup = std::str::from_utf8(data)
            .map_err(|e| FigrevError::render(format!("svg is not utf-8: {e}")))?;
        let Some(stripped) = markup.strip_suffix("</svg>") else {
            return Err(FigrevError::render("svg missing closing tag"));
        };

        let mut overlay = String::from("<g opacity=\"0.9\">");
        if self.options.show_code {
            let bits = code_bits(identity);
            for (row, cols) in bits.iter().enumerate() {
                for (col, on) in cols.iter().enumerate() {
                    if *on {
                        overlay.push_str(&format!(
                            "<rect x=\"{}\" y=\"{}\" width=\"2\" height=\"2\"/>",
                            2 * col,
                            2 * row
                        ));
                    }
                }
            }
        }
        overlay.push_str(&format!(
            "<text x=\"0\" y=\"{}\" font-size=\"8\">{}</text>",
            2 * CODE_MODULES + 10,
            xml_escape(text)
        ));
        overlay.push_str("</g></svg>");
        Ok(format!("{stripped}{overlay}").into_bytes())
    }
}

/// Deterministic module grid derived from the identity string.
fn code_bits(identity: &str) -> [[bool; CODE_MODULES as usize]; CODE_MODULES as usize] {
    let digest = Sha256::digest(identity.as_bytes());
    let mut bits = [[false; CODE_MODULES as usize]; CODE_MODULES as usize];
    for (i, byte) in digest.iter().enumerate() {
        for bit in 0..8 {
            let index = i * 8 + bit;
            bits[index / CODE_MODULES as usize][index % CODE_MODULES as usize] =
                byte >> bit & 1 == 1;
        }
    }
    bits
}

fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

/// White strip along the bottom-left with the identity text in a 5×7 pixel
/// font. Characters without a glyph render as blanks.
fn draw_text_strip(img: &mut RgbaImage, text: &str) {
    let strip_h = 11u32;
    let strip_w = (text.chars().count() as u32 * 6 + 4).min(img.width());
    let y0 = img.height().saturating_sub(strip_h);
    fill_rect(img, 0, y0, strip_w, strip_h, Rgba([255, 255, 255, 255]));

    let mut x = 2u32;
    for c in text.chars() {
        if x + 5 >= img.width() {
            break;
        }
        if let Some(columns) = glyph(c.to_ascii_uppercase()) {
            for (dx, column) in columns.iter().enumerate() {
                for dy in 0..7 {
                    let py = y0 + 2 + dy;
                    if column >> dy & 1 == 1 && py < img.height() {
                        img.put_pixel(x + dx as u32, py, Rgba([0, 0, 0, 255]));
                    }
                }
            }
        }
        x += 6;
    }
}

/// 5×7 glyphs as column bitmasks, least significant bit at the top.
fn glyph(c: char) -> Option<[u8; 5]> {
    Some(match c {
        '0' => [0x3E, 0x51, 0x49, 0x45, 0x3E],
        '1' => [0x00, 0x42, 0x7F, 0x40, 0x00],
        '2' => [0x42, 0x61, 0x51, 0x49, 0x46],
        '3' => [0x21, 0x41, 0x45, 0x4B, 0x31],
        '4' => [0x18, 0x14, 0x12, 0x7F, 0x10],
        '5' => [0x27, 0x45, 0x45, 0x45, 0x39],
        '6' => [0x3C, 0x4A, 0x49, 0x49, 0x30],
        '7' => [0x01, 0x71, 0x09, 0x05, 0x03],
        '8' => [0x36, 0x49, 0x49, 0x49, 0x36],
        '9' => [0x06, 0x49, 0x49, 0x29, 0x1E],
        'A' => [0x7E, 0x11, 0x11, 0x11, 0x7E],
        'B' => [0x7F, 0x49, 0x49, 0x49, 0x36],
        'C' => [0x3E, 0x41, 0x41, 0x41, 0x22],
        'D' => [0x7F, 0x41, 0x41, 0x22, 0x1C],
        'E' => [0x7F, 0x49, 0x49, 0x49, 0x41],
        'F' => [0x7F, 0x09, 0x09, 0x09, 0x01],
        'G' => [0x3E, 0x41, 0x49, 0x49, 0x7A],
        'H' => [0x7F, 0x08, 0x08, 0x08, 0x7F],
        'I' => [0x00, 0x41, 0x7F, 0x41, 0x00],
        'J' => [0x20, 0x40, 0x41, 0x3F, 0x01],
        'K' => [0x7F, 0x08, 0x14, 0x22, 0x41],
        'L' => [0x7F, 0x40, 0x40, 0x40, 0x40],
        'M' => [0x7F, 0x02, 0x0C, 0x02, 0x7F],
        'N' => [0x7F, 0x04, 0x08, 0x10, 0x7F],
        'O' => [0x3E, 0x41, 0x41, 0x41, 0x3E],
        'P' => [0x7F, 0x09, 0x09, 0x09, 0x06],
        'Q' => [0x3E, 0x41, 0x51, 0x21, 0x5E],
        'R' => [0x7F, 0x09, 0x19, 0x29, 0x46],
        'S' => [0x46, 0x49, 0x49, 0x49, 0x31],
        'T' => [0x01, 0x01, 0x7F, 0x01, 0x01],
        'U' => [0x3F, 0x40, 0x40, 0x40, 0x3F],
        'V' => [0x1F, 0x20, 0x40, 0x20, 0x1F],
        'W' => [0x3F, 0x40, 0x38, 0x40, 0x3F],
        'X' => [0x63, 0x14, 0x08, 0x14, 0x63],
        'Y' => [0x07, 0x08, 0x70, 0x08, 0x07],
        'Z' => [0x61, 0x51, 0x49, 0x45, 0x43],
        '-' => [0x08, 0x08, 0x08, 0x08, 0x08],
        '.' => [0x00, 0x60, 0x60, 0x00, 0x00],
        ',' => [0x00, 0x50, 0x30, 0x00, 0x00],
        ':' => [0x00, 0x36, 0x36, 0x00, 0x00],
        '/' => [0x20, 0x10, 0x08, 0x04, 0x02],
        '#' => [0x14, 0x7F, 0x14, 0x7F, 0x14],
        ' ' => [0x00; 5],
        _ => return None,
    })
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ChartArtifact;
    use crate::backend::{CaptureBackend, RenderOptions};
    use figrev_model::{NodeId, NodeKind, NodeRef};

    fn draft_with_images() -> RevisionDraft {
        let chart = ChartArtifact::figure(vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.5)]);
        let rendered = crate::artifacts::ChartBackend
            .render(
                &chart,
                &[ImageFormat::Png, ImageFormat::Svg],
                &RenderOptions::sized(128, 96),
            )
            .expect("render");
        let mut draft = RevisionDraft::new(NodeRef::new(
            NodeKind::Figure,
            NodeId::new("fig-1"),
            "Cell abc, Figure 1",
        ));
        for (format, out) in rendered {
            draft.push_item(DataItem::Image {
                name: "figure".to_string(),
                format,
                data: out.data,
                is_watermarked: false,
                width: out.width,
                height: out.height,
            });
        }
        draft
    }

    #[test]
    fn watermarked_copy_differs_but_keeps_dimensions() {
        let mut draft = draft_with_images();
        Watermarker::new(WatermarkOptions::default()).apply(&mut draft, "fig-1/3");

        let originals = draft.images(ImageFormat::Png, false);
        let marked = draft.images(ImageFormat::Png, true);
        assert_eq!(originals.len(), 1);
        assert_eq!(marked.len(), 1);

        let (DataItem::Image { data: a, width: wa, height: ha, .. },
             DataItem::Image { data: b, width: wb, height: hb, .. }) =
            (originals[0], marked[0])
        else {
            panic!("expected image items");
        };
        assert_ne!(a, b);
        assert_eq!((wa, ha), (wb, hb));

        // Decoded pixels keep the declared size too.
        let decoded = image::load_from_memory(b).expect("decode watermarked");
        assert_eq!(decoded.width(), 128);
        assert_eq!(decoded.height(), 96);
    }

    #[test]
    fn svg_overlay_is_appended() {
        let mut draft = draft_with_images();
        Watermarker::new(WatermarkOptions::default()).apply(&mut draft, "fig-1/3");

        let marked = draft.images(ImageFormat::Svg, true);
        assert_eq!(marked.len(), 1);
        let DataItem::Image { data, .. } = marked[0] else {
            panic!("expected image item");
        };
        let markup = String::from_utf8(data.clone()).unwrap();
        assert!(markup.contains("<text"));
        assert!(markup.ends_with("</svg>"));
    }

    #[test]
    fn disabled_watermark_produces_nothing() {
        let mut draft = draft_with_images();
        let before = draft.items.len();
        let options = WatermarkOptions {
            enabled: false,
            ..WatermarkOptions::default()
        };
        Watermarker::new(options).apply(&mut draft, "fig-1/3");
        assert_eq!(draft.items.len(), before);
    }

    #[test]
    fn code_bits_depend_on_identity() {
        assert_ne!(code_bits("fig-1/1"), code_bits("fig-1/2"));
        assert_eq!(code_bits("fig-1/1"), code_bits("fig-1/1"));
    }
}
