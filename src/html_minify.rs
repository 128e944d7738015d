//! Optional HTML pre-minification before segmentation.
//!
//! Backed by [`minify_html`]. Base64 payloads are attribute or CSS text to
//! the minifier and pass through unchanged.

use minify_html::{minify, Cfg};

use crate::error::{CompileError, CompilePhase};

/// Knobs forwarded to [`minify_html::Cfg`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HtmlMinifyOptions {
    pub keep_comments: bool,
    pub keep_closing_tags: bool,
    pub minify_css: bool,
    pub minify_inline_js: bool,
}

impl Default for HtmlMinifyOptions {
    fn default() -> Self {
        Self {
            keep_comments: false,
            keep_closing_tags: true,
            minify_css: true,
            minify_inline_js: false,
        }
    }
}

impl HtmlMinifyOptions {
    fn to_cfg(self) -> Cfg {
        let mut cfg = Cfg::new();
        cfg.keep_comments = self.keep_comments;
        cfg.keep_closing_tags = self.keep_closing_tags;
        cfg.keep_html_and_head_opening_tags = true;
        cfg.do_not_minify_doctype = true;
        cfg.minify_css = self.minify_css;
        cfg.minify_js = self.minify_inline_js;
        cfg
    }
}

/// Minifies `html`, failing only if the result is not UTF-8.
pub fn minify_html_document(
    html: &str,
    options: HtmlMinifyOptions,
) -> Result<String, CompileError> {
    let minified = minify(html.as_bytes(), &options.to_cfg());
    let out = String::from_utf8(minified).map_err(|e| {
        CompileError::new(
            CompilePhase::HtmlMinify,
            "HTML_MINIFY_UTF8",
            "minification produced invalid UTF-8",
        )
        .with_offset(e.utf8_error().valid_up_to())
    })?;
    log::debug!("minified html {} -> {} bytes", html.len(), out.len());
    Ok(out)
}
