//! Decoded image cache.
//!
//! The renderer never decodes. On first sight of a source it records a
//! pending entry and queues a decode request; the host decodes (browser
//! `Image`, native codec) and hands back RGBA pixels through
//! [`ImageCache::complete`]. Each completion of a pending entry raises
//! exactly one redraw request.

use clise_core::Bounds;
use clise_core::model::{ImageFit, ImageProps};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Straight-alpha RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

impl Bitmap {
    /// `None` when the buffer size doesn't match the dimensions.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (rgba.len() == expected && width > 0 && height > 0).then(|| Self {
            width,
            height,
            rgba: Arc::new(rgba),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageState {
    Pending,
    Ready(Bitmap),
    Failed,
}

#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, ImageState>,
    requests: Vec<String>,
    redraw: bool,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `key`, queueing a decode the first time it is seen.
    pub fn request(&mut self, key: &str) -> &ImageState {
        if !self.entries.contains_key(key) {
            log::debug!("image: queue decode for {}", short(key));
            self.requests.push(key.to_string());
        }
        self.entries
            .entry(key.to_string())
            .or_insert(ImageState::Pending)
    }

    pub fn state(&self, key: &str) -> Option<&ImageState> {
        self.entries.get(key)
    }

    /// Sources the host should start decoding. Drains the queue.
    pub fn take_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.requests)
    }

    /// Store decoded pixels. Returns whether a redraw was requested.
    pub fn complete(&mut self, key: &str, bitmap: Bitmap) -> bool {
        let was_pending = matches!(self.entries.get(key), None | Some(ImageState::Pending));
        self.entries
            .insert(key.to_string(), ImageState::Ready(bitmap));
        if was_pending {
            self.redraw = true;
        }
        was_pending
    }

    /// Mark a decode as failed; the renderer draws a placeholder.
    pub fn fail(&mut self, key: &str, reason: &str) {
        log::warn!("image: decode failed for {}: {reason}", short(key));
        self.entries.insert(key.to_string(), ImageState::Failed);
    }

    /// Forget an entry so the next frame asks for it again.
    pub fn evict(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Consume the pending redraw request, if any.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn short(key: &str) -> &str {
    match key.char_indices().nth(48) {
        Some((i, _)) => &key[..i],
        None => key,
    }
}

// ─── Sources ─────────────────────────────────────────────────────────────

const SVG_DATA_PREFIX: &str = "data:image/svg+xml,";
const SVG_UTF8_PREFIX: &str = "data:image/svg+xml;utf8,";

/// The cache key for an image: its source, with SVG color overrides
/// substituted when the source is inline SVG markup.
pub fn resolved_source(props: &ImageProps) -> Cow<'_, str> {
    let Some(colors) = props.svg_colors.as_ref().filter(|c| !c.is_empty()) else {
        return Cow::Borrowed(&props.src);
    };
    let inline = props.src.trim_start().starts_with("<svg")
        || props.src.starts_with(SVG_DATA_PREFIX)
        || props.src.starts_with(SVG_UTF8_PREFIX);
    if !inline {
        return Cow::Borrowed(&props.src);
    }
    let mut out = props.src.clone();
    for (from, to) in colors {
        out = replace_ignore_case(&out, from, to);
    }
    Cow::Owned(out)
}

fn replace_ignore_case(haystack: &str, needle: &str, with: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (i, _) in lower.match_indices(&needle) {
        out.push_str(&haystack[last..i]);
        out.push_str(with);
        last = i + needle.len();
    }
    out.push_str(&haystack[last..]);
    out
}

// ─── Placement ───────────────────────────────────────────────────────────

/// Where to draw an image inside its element box: pairs of
/// (destination rect, source rect in pixels).
pub fn placements(props: &ImageProps, frame: &Bounds, width: u32, height: u32) -> Vec<(Bounds, Bounds)> {
    let (iw, ih) = (width as f64, height as f64);
    let full = Bounds::new(0.0, 0.0, iw, ih);
    if iw <= 0.0 || ih <= 0.0 || frame.width <= 0.0 || frame.height <= 0.0 {
        return Vec::new();
    }
    let ax = props.align_x.clamp(0.0, 1.0);
    let ay = props.align_y.clamp(0.0, 1.0);

    match props.fit {
        ImageFit::Fill => vec![(*frame, full)],
        ImageFit::Contain => {
            let s = (frame.width / iw).min(frame.height / ih);
            let (dw, dh) = (iw * s, ih * s);
            let dest = Bounds::new(
                frame.x + (frame.width - dw) * ax,
                frame.y + (frame.height - dh) * ay,
                dw,
                dh,
            );
            vec![(dest, full)]
        }
        ImageFit::Cover => {
            let s = (frame.width / iw).max(frame.height / ih);
            let (sw, sh) = (frame.width / s, frame.height / s);
            let src = Bounds::new((iw - sw) * ax, (ih - sh) * ay, sw, sh);
            vec![(*frame, src)]
        }
        ImageFit::Tile => {
            let mut out = Vec::new();
            let mut y = frame.y;
            while y < frame.max_y() {
                let th = ih.min(frame.max_y() - y);
                let mut x = frame.x;
                while x < frame.max_x() {
                    let tw = iw.min(frame.max_x() - x);
                    out.push((Bounds::new(x, y, tw, th), Bounds::new(0.0, 0.0, tw, th)));
                    x += iw;
                }
                y += ih;
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn pixel() -> Bitmap {
        Bitmap::new(1, 1, vec![255, 0, 0, 255]).unwrap()
    }

    #[test]
    fn first_request_queues_one_decode() {
        let mut cache = ImageCache::new();
        assert_eq!(cache.request("a.png"), &ImageState::Pending);
        assert_eq!(cache.request("a.png"), &ImageState::Pending);
        assert_eq!(cache.take_requests(), vec!["a.png".to_string()]);
        assert!(cache.take_requests().is_empty());
    }

    #[test]
    fn completion_requests_exactly_one_redraw() {
        let mut cache = ImageCache::new();
        cache.request("a.png");
        assert!(cache.complete("a.png", pixel()));
        assert!(cache.take_redraw_request());
        assert!(!cache.take_redraw_request());

        // A duplicate completion of a ready entry doesn't redraw again.
        assert!(!cache.complete("a.png", pixel()));
        assert!(!cache.take_redraw_request());
        assert!(matches!(cache.state("a.png"), Some(ImageState::Ready(_))));
    }

    #[test]
    fn failure_is_sticky_until_evicted() {
        let mut cache = ImageCache::new();
        cache.request("bad.png");
        cache.take_requests();
        cache.fail("bad.png", "corrupt");
        assert_eq!(cache.request("bad.png"), &ImageState::Failed);
        assert!(cache.take_requests().is_empty());
        cache.evict("bad.png");
        cache.request("bad.png");
        assert_eq!(cache.take_requests().len(), 1);
    }

    #[test]
    fn bitmap_rejects_short_buffers() {
        assert!(Bitmap::new(2, 2, vec![0; 15]).is_none());
        assert!(Bitmap::new(0, 2, vec![]).is_none());
    }

    #[test]
    fn contain_letterboxes_with_alignment() {
        let mut props = ImageProps::new("x", 200.0, 100.0);
        props.fit = ImageFit::Contain;
        props.align_y = 0.0;
        let out = placements(&props, &Bounds::new(0.0, 0.0, 100.0, 100.0), 200, 100);
        assert_eq!(out, vec![(Bounds::new(0.0, 0.0, 100.0, 50.0), Bounds::new(0.0, 0.0, 200.0, 100.0))]);
    }

    #[test]
    fn cover_crops_the_source() {
        let mut props = ImageProps::new("x", 200.0, 100.0);
        props.fit = ImageFit::Cover;
        let out = placements(&props, &Bounds::new(0.0, 0.0, 100.0, 100.0), 200, 100);
        assert_eq!(out[0].1, Bounds::new(50.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn tile_repeats_and_trims_the_last_tile() {
        let mut props = ImageProps::new("x", 40.0, 40.0);
        props.fit = ImageFit::Tile;
        let out = placements(&props, &Bounds::new(0.0, 0.0, 100.0, 40.0), 40, 40);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].0, Bounds::new(80.0, 0.0, 20.0, 40.0));
    }

    #[test]
    fn svg_overrides_rewrite_inline_markup_only() {
        let mut props = ImageProps::new("<svg fill=\"#FF0000\"/>", 10.0, 10.0);
        props.svg_colors = Some(BTreeMap::from([("#ff0000".to_string(), "#00FF00".to_string())]));
        assert_eq!(resolved_source(&props), "<svg fill=\"#00FF00\"/>");

        props.src = "logo.svg".into();
        assert_eq!(resolved_source(&props), "logo.svg");
    }
}
