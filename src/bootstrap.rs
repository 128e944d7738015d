//! Bootstrap script generation.
//!
//! The emitted script decodes the embedded Z85 text, decompresses it with an
//! in-script LZMA decoder, rebuilds the document from the source map and
//! replaces the current document with it. Decoder bodies live in
//! `bootstrap/*.js` and are spliced into one of two entry templates:
//!
//! - `single.js` when the whole buffer is one UTF-8 interval: no source map,
//!   no base64 encoder.
//! - `general.js` otherwise.
//!
//! The payload slot is filled after optional minification so the minifier
//! only sees code.

use crate::byte_map::{EncodingTag, Interval};
use crate::error::{CompileError, CompilePhase, MinifyError};
use crate::jsminify::ScriptMinifier;
use crate::z85;

const Z85_JS: &str = include_str!("bootstrap/z85.js");
const LZMA_JS: &str = include_str!("bootstrap/lzma.js");
const BASE64_JS: &str = include_str!("bootstrap/base64.js");
const SHOW_JS: &str = include_str!("bootstrap/show.js");
const SINGLE_JS: &str = include_str!("bootstrap/single.js");
const GENERAL_JS: &str = include_str!("bootstrap/general.js");

const DECODERS_SLOT: &str = "__DECODERS__";
const TABLE_SLOT: &str = "__Z85_TABLE__";
const SOURCE_MAP_SLOT: &str = "__SOURCE_MAP__";
const PAYLOAD_SLOT: &str = "__PAYLOAD__";

const SINGLE_HEADER: &str = "/*! Self-extracting page.
 * Z85 decoder: ZeroMQ RFC 32 alphabet.
 * LZMA decoder: after LzmaSpec.cpp from the LZMA SDK by Igor Pavlov, public domain.
 */
";

const GENERAL_HEADER: &str = "/*! Self-extracting page.
 * Z85 decoder: ZeroMQ RFC 32 alphabet.
 * LZMA decoder: after LzmaSpec.cpp from the LZMA SDK by Igor Pavlov, public domain.
 * Base64 encoder: RFC 4648 standard alphabet with padding.
 */
";

/// Which entry template a compiled page uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BootstrapVariant {
    /// The buffer is one UTF-8 run and is decoded in a single call.
    SingleSegment,
    /// Source-map driven reconstruction with base64 re-encoding.
    General,
}

impl BootstrapVariant {
    /// Picks the variant for an optimized source map.
    pub fn select(source_map: &[Interval]) -> Self {
        match source_map {
            [] => Self::SingleSegment,
            [only] if only.tag == EncodingTag::Utf8 => Self::SingleSegment,
            _ => Self::General,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleSegment => "single_segment",
            Self::General => "general",
        }
    }
}

/// Attribution comment prepended to every script of `variant`.
pub fn license_header(variant: BootstrapVariant) -> &'static str {
    match variant {
        BootstrapVariant::SingleSegment => SINGLE_HEADER,
        BootstrapVariant::General => GENERAL_HEADER,
    }
}

/// Quotes `text` as a JavaScript string literal that is safe inside an
/// HTML `<script>` element.
///
/// `<` is written as `\x3c` before `/` or `!`, so neither `</script` nor
/// `<!--` can appear in the literal.
pub fn script_literal(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for (idx, ch) in text.char_indices() {
        match ch {
            '<' if matches!(bytes.get(idx + 1), Some(b'/' | b'!')) => out.push_str("\\x3c"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Bootstrap program with the payload slot still open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptTemplate {
    variant: BootstrapVariant,
    program: String,
    minified: bool,
}

impl ScriptTemplate {
    /// Renders the entry template for `source_map`.
    pub fn new(source_map: &[Interval]) -> Result<Self, CompileError> {
        let variant = BootstrapVariant::select(source_map);
        let table = serde_json::to_string(&z85::lenient_decode_table()[..]).map_err(json_error)?;

        let mut decoders = String::with_capacity(Z85_JS.len() + LZMA_JS.len() + 1024);
        decoders.push_str(&Z85_JS.replace(TABLE_SLOT, &table));
        decoders.push_str(LZMA_JS);
        decoders.push_str(SHOW_JS);

        let program = match variant {
            BootstrapVariant::SingleSegment => SINGLE_JS.replace(DECODERS_SLOT, &decoders),
            BootstrapVariant::General => {
                decoders.push_str(BASE64_JS);
                let map = serde_json::to_string(source_map).map_err(json_error)?;
                GENERAL_JS
                    .replace(DECODERS_SLOT, &decoders)
                    .replace(SOURCE_MAP_SLOT, &map)
            }
        };

        Ok(Self {
            variant,
            program,
            minified: false,
        })
    }

    pub fn variant(&self) -> BootstrapVariant {
        self.variant
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Adopts a minifier result, keeping the current program when the
    /// minifier failed or lost the payload slot.
    pub fn apply_minified(mut self, result: Result<String, MinifyError>) -> Self {
        match result {
            Ok(minified) if minified.matches(PAYLOAD_SLOT).count() == 1 => {
                log::debug!(
                    "minified bootstrap {} -> {} bytes",
                    self.program.len(),
                    minified.len()
                );
                self.program = minified;
                self.minified = true;
            }
            Ok(_) => {
                log::warn!("script minifier dropped the payload slot; using unminified script");
            }
            Err(err) => {
                log::warn!("{}; using unminified script", err);
            }
        }
        self
    }

    /// Runs `minifier` over the program.
    pub fn minify_with(self, minifier: &dyn ScriptMinifier) -> Self {
        let result = minifier.minify(&self.program);
        self.apply_minified(result)
    }

    /// Fills the payload slot with `z85_text` and prepends the license header.
    pub fn fill(self, z85_text: &str) -> Result<GeneratedScript, CompileError> {
        let Some(slot) = self.program.find(PAYLOAD_SLOT) else {
            return Err(CompileError::new(
                CompilePhase::Bootstrap,
                "PAYLOAD_SLOT",
                "bootstrap program has no payload slot",
            ));
        };
        let header = license_header(self.variant);
        let literal = script_literal(z85_text);

        let mut script = String::with_capacity(header.len() + self.program.len() + literal.len());
        script.push_str(header);
        script.push_str(&self.program[..slot]);
        script.push_str(&literal);
        script.push_str(&self.program[slot + PAYLOAD_SLOT.len()..]);

        Ok(GeneratedScript {
            variant: self.variant,
            script,
            minified: self.minified,
        })
    }
}

/// Final bootstrap script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedScript {
    /// Entry template used.
    pub variant: BootstrapVariant,
    /// License header followed by the program.
    pub script: String,
    /// Whether the program went through a minifier successfully.
    pub minified: bool,
}

impl GeneratedScript {
    pub fn as_str(&self) -> &str {
        &self.script
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    pub fn into_string(self) -> String {
        self.script
    }
}

/// Generates the bootstrap for a Z85 payload and its optimized source map.
pub fn generate(
    z85_text: &str,
    source_map: &[Interval],
    minifier: Option<&dyn ScriptMinifier>,
) -> Result<GeneratedScript, CompileError> {
    let mut template = ScriptTemplate::new(source_map)?;
    if let Some(minifier) = minifier {
        template = template.minify_with(minifier);
    }
    let script = template.fill(z85_text)?;
    log::debug!(
        "generated {} bootstrap: {} bytes (minified={})",
        script.variant.as_str(),
        script.len(),
        script.minified
    );
    Ok(script)
}

fn json_error(err: serde_json::Error) -> CompileError {
    CompileError::new(CompilePhase::Bootstrap, "SOURCE_MAP_JSON", err.to_string())
}
