//! Compile entry points: HTML in, bootstrap script out.

use core::fmt;

use serde::Serialize;

use crate::bootstrap::{BootstrapVariant, GeneratedScript, ScriptTemplate};
use crate::byte_map::map_fragments_with_limits;
use crate::compress::{compress, CompressOptions};
use crate::error::{CompileError, CompilePhase};
use crate::html_minify::{minify_html_document, HtmlMinifyOptions};
use crate::jsminify::{BuiltinScriptMinifier, JsMinifyOptions, ScriptMinifier};
use crate::optimize::optimize;
use crate::reconstruct::CompiledPage;
use crate::segment::segment_with_limits;
use crate::z85;

/// Hard caps applied while compiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompileLimits {
    /// Max source document size in bytes.
    pub max_input_bytes: usize,
    /// Max fragments produced by the segmenter.
    pub max_fragments: usize,
    /// Max decoded size of a single data URI payload.
    pub max_payload_bytes: usize,
}

impl Default for CompileLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 256 * 1024 * 1024,
            max_fragments: 1_000_000,
            max_payload_bytes: 128 * 1024 * 1024,
        }
    }
}

impl CompileLimits {
    /// No caps at all.
    pub fn unbounded() -> Self {
        Self {
            max_input_bytes: usize::MAX,
            max_fragments: usize::MAX,
            max_payload_bytes: usize::MAX,
        }
    }
}

/// Compile configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Run the HTML minifier before segmenting.
    pub minify_html: bool,
    pub html_minify: HtmlMinifyOptions,
    /// Minify the generated bootstrap program.
    pub minify_js: bool,
    pub js_minify: JsMinifyOptions,
    pub compress: CompressOptions,
    pub limits: CompileLimits,
}

impl CompileOptions {
    /// Enables HTML pre-minification with `options`.
    pub fn with_minify_html(mut self, options: HtmlMinifyOptions) -> Self {
        self.minify_html = true;
        self.html_minify = options;
        self
    }

    /// Enables bootstrap minification with `options`.
    pub fn with_minify_js(mut self, options: JsMinifyOptions) -> Self {
        self.minify_js = true;
        self.js_minify = options;
        self
    }

    pub fn with_compress(mut self, compress: CompressOptions) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_limits(mut self, limits: CompileLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Sizes and counts observed during one compile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompileReport {
    /// Source document size before HTML minification.
    pub input_bytes: usize,
    /// Combined buffer size fed to the compressor.
    pub combined_bytes: usize,
    /// `.lzma` stream size.
    pub compressed_bytes: usize,
    /// Z85 text length.
    pub z85_chars: usize,
    /// Intervals before merging.
    pub raw_intervals: usize,
    /// Intervals after merging.
    pub merged_intervals: usize,
    /// Whether the single-segment bootstrap was emitted.
    pub fast_path: bool,
    /// Final script size, license header included.
    pub script_bytes: usize,
    /// Whether the bootstrap program was minified.
    pub minified: bool,
}

impl CompileReport {
    /// Script size over input size.
    pub fn ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        self.script_bytes as f64 / self.input_bytes as f64
    }
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input={} combined={} lzma={} z85={} intervals={}->{} fast_path={} script={} minified={} ratio={:.3}",
            self.input_bytes,
            self.combined_bytes,
            self.compressed_bytes,
            self.z85_chars,
            self.raw_intervals,
            self.merged_intervals,
            self.fast_path,
            self.script_bytes,
            self.minified,
            self.ratio()
        )
    }
}

/// Everything a compile produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledOutput {
    /// Bootstrap script body for the replacement document.
    pub script: GeneratedScript,
    /// Payload and source map, for host-side verification.
    pub page: CompiledPage,
    pub report: CompileReport,
}

/// Compiles `html`, minifying the bootstrap with the built-in minifier when
/// `options.minify_js` is set.
pub fn compile(html: &str, options: &CompileOptions) -> Result<CompiledOutput, CompileError> {
    let minifier = BuiltinScriptMinifier::new(options.js_minify);
    compile_with_minifier(html, options, &minifier)
}

/// Compiles `html` with a caller-supplied bootstrap minifier.
///
/// `minifier` only runs when `options.minify_js` is set. A minifier error is
/// logged and the unminified bootstrap is kept.
pub fn compile_with_minifier(
    html: &str,
    options: &CompileOptions,
    minifier: &dyn ScriptMinifier,
) -> Result<CompiledOutput, CompileError> {
    let staged = stage(html, options)?;
    let template = if options.minify_js {
        staged.template.minify_with(minifier)
    } else {
        staged.template
    };
    finish(template, staged.page, staged.report)
}

struct Staged {
    template: ScriptTemplate,
    page: CompiledPage,
    report: CompileReport,
}

/// Runs every stage up to, but excluding, bootstrap minification.
fn stage(html: &str, options: &CompileOptions) -> Result<Staged, CompileError> {
    let limits = options.limits;
    if html.len() > limits.max_input_bytes {
        return Err(CompileError::new(
            CompilePhase::Segment,
            "INPUT_TOO_LARGE",
            "source document exceeds input budget",
        )
        .with_limit("max_input_bytes", html.len(), limits.max_input_bytes));
    }
    if html.is_empty() {
        log::warn!("compiling an empty document");
    }

    let minified;
    let source = if options.minify_html {
        minified = minify_html_document(html, options.html_minify)?;
        minified.as_str()
    } else {
        html
    };

    let fragments = segment_with_limits(source, limits.max_fragments)?;
    let mapped = map_fragments_with_limits(&fragments, limits.max_payload_bytes)?;
    let raw_intervals = mapped.len();
    let optimized = optimize(mapped);
    let combined = optimized.concat();
    let (_, source_map) = optimized.into_parts();

    let compressed = compress(&combined, options.compress)?;
    let z85_text = z85::encode(&compressed);
    let template = ScriptTemplate::new(&source_map)?;

    let report = CompileReport {
        input_bytes: html.len(),
        combined_bytes: combined.len(),
        compressed_bytes: compressed.len(),
        z85_chars: z85_text.len(),
        raw_intervals,
        merged_intervals: source_map.len(),
        fast_path: template.variant() == BootstrapVariant::SingleSegment,
        ..CompileReport::default()
    };
    Ok(Staged {
        template,
        page: CompiledPage::new(z85_text, source_map),
        report,
    })
}

fn finish(
    template: ScriptTemplate,
    page: CompiledPage,
    mut report: CompileReport,
) -> Result<CompiledOutput, CompileError> {
    let script = template.fill(&page.z85)?;
    report.script_bytes = script.len();
    report.minified = script.minified;
    log::info!("compiled page: {}", report);
    Ok(CompiledOutput {
        script,
        page,
        report,
    })
}

#[cfg(feature = "async")]
mod nonblocking {
    use std::future::Future;
    use std::path::Path;

    use super::{finish, stage, CompileOptions, CompileReport, CompiledOutput};
    use crate::error::{CompileError, CompilePhase, MinifyError};
    use crate::jsminify::{minify_js, BuiltinScriptMinifier};

    /// Bootstrap minifier that may suspend, e.g. one driving an external
    /// process.
    pub trait AsyncScriptMinifier {
        fn minify(&self, script: &str) -> impl Future<Output = Result<String, MinifyError>> + Send;
    }

    impl AsyncScriptMinifier for BuiltinScriptMinifier {
        fn minify(&self, script: &str) -> impl Future<Output = Result<String, MinifyError>> + Send {
            std::future::ready(minify_js(script, self.options))
        }
    }

    /// [`super::compile_with_minifier`] with an awaited minifier. All other
    /// stages run synchronously on the calling task.
    pub async fn compile_async<M>(
        html: &str,
        options: &CompileOptions,
        minifier: &M,
    ) -> Result<CompiledOutput, CompileError>
    where
        M: AsyncScriptMinifier + ?Sized,
    {
        let staged = stage(html, options)?;
        let template = if options.minify_js {
            let result = minifier.minify(staged.template.program()).await;
            staged.template.apply_minified(result)
        } else {
            staged.template
        };
        finish(template, staged.page, staged.report)
    }

    /// Compiles the document at `input` and writes the replacement document
    /// to `output`.
    pub async fn compile_file_async<M>(
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        options: &CompileOptions,
        minifier: &M,
    ) -> Result<CompileReport, CompileError>
    where
        M: AsyncScriptMinifier + ?Sized,
    {
        let input = input.as_ref();
        let output = output.as_ref();
        let html = tokio::fs::read_to_string(input).await.map_err(|e| {
            CompileError::new(
                CompilePhase::Io,
                "READ_INPUT",
                format!("{}: {}", input.display(), e),
            )
        })?;

        let compiled = compile_async(&html, options, minifier).await?;
        let document = compiled.to_document()?;
        tokio::fs::write(output, document).await.map_err(|e| {
            CompileError::new(
                CompilePhase::Io,
                "WRITE_OUTPUT",
                format!("{}: {}", output.display(), e),
            )
        })?;
        Ok(compiled.report)
    }
}

#[cfg(feature = "async")]
pub use nonblocking::{compile_async, compile_file_async, AsyncScriptMinifier};
