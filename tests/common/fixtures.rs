use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Deterministic xorshift generator for reproducible corpora.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n.max(1) as u64) as usize
    }

    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.next_u64() as u8).collect()
    }
}

const WORDS: &[&str] = &[
    "lorem", "ipsum", "données", "ünïcode", "页面", "<b>bold</b>", "&amp;", "data:", "base64,",
    "url(", "\n", "  ", "✓",
];

const MIME_TYPES: &[&str] = &[
    "image/png",
    "image/gif",
    "font/woff2",
    "image/svg+xml;charset=utf-8",
    "application/octet-stream",
];

pub fn text_run(rng: &mut Rng, words: usize) -> String {
    let mut out = String::new();
    for _ in 0..words {
        out.push_str(WORDS[rng.below(WORDS.len())]);
        out.push(' ');
    }
    out
}

pub fn data_uri(rng: &mut Rng, payload_len: usize) -> String {
    let mime = MIME_TYPES[rng.below(MIME_TYPES.len())];
    format!("data:{};base64,{}", mime, BASE64.encode(rng.bytes(payload_len)))
}

/// Text-only page of roughly `text_bytes` bytes.
pub fn plain_page(rng: &mut Rng, text_bytes: usize) -> String {
    let mut html = String::from("<!DOCTYPE html><html><body>");
    while html.len() < text_bytes {
        html.push_str("<p>");
        html.push_str(&text_run(rng, 24));
        html.push_str("</p>");
    }
    html.push_str("</body></html>");
    html
}

/// Page mixing text with `images` base64 data URIs in attribute, CSS and
/// back-to-back positions.
pub fn mixed_page(rng: &mut Rng, text_bytes: usize, images: usize) -> String {
    let mut html = String::from("<!DOCTYPE html><html><head><style>");
    let font_len = 1 + rng.below(64);
    html.push_str(&format!(
        "@font-face{{src:url({})}}",
        data_uri(rng, font_len)
    ));
    html.push_str("</style></head><body>");
    let per_image = text_bytes / images.max(1);
    for idx in 0..images {
        let target = html.len() + per_image;
        while html.len() < target {
            html.push_str(&text_run(rng, 8));
        }
        match idx % 3 {
            0 => {
                let len = rng.below(300);
                html.push_str(&format!("<img src=\"{}\">", data_uri(rng, len)));
            }
            1 => {
                let len = 1 + rng.below(40);
                html.push_str(&format!(
                    "<div style=\"background:url('{}')\"></div>",
                    data_uri(rng, len)
                ));
            }
            _ => {
                // Both padded, so the first payload cannot run into `data`.
                let first_len = 3 * rng.below(8) + 1;
                let first = data_uri(rng, first_len);
                let second_len = 3 * rng.below(4) + 2;
                let second = data_uri(rng, second_len);
                html.push_str(&first);
                html.push_str(&second);
            }
        }
    }
    html.push_str("</body></html>");
    html
}

/// Real pages dropped under `tests/fixtures/pages`, if any.
pub fn discover_optional_pages() -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(Path::new("tests/fixtures/pages")) else {
        return Vec::new();
    };
    let mut out: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        })
        .collect();
    out.sort();
    out
}
