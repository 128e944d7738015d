//! Page compiler: turns a fully-inlined HTML document into a self-extracting
//! script that rebuilds the page in the browser.
//!
//! Pipeline (each stage fully consumes the previous one):
//!
//! 1. [`segment`] splits the HTML into text and base64 `data:` URI fragments.
//! 2. [`byte_map`] turns fragments into one combined byte buffer plus a
//!    source map of tagged intervals.
//! 3. [`optimize`] merges adjacent intervals sharing a tag.
//! 4. [`compress`] runs LZMA over the combined buffer.
//! 5. [`z85`] encodes the compressed bytes as printable text.
//! 6. [`bootstrap`] emits the decoder, decompressor and reconstruction loop.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pagepress::{compile, CompileOptions};
//!
//! # fn example() -> Result<(), pagepress::CompileError> {
//! let compiled = compile("<p>hi</p>", &CompileOptions::default())?;
//! assert!(compiled.report.fast_path);
//! assert_eq!(compiled.page.reconstruct()?, "<p>hi</p>");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod bootstrap;
pub mod byte_map;
pub mod compile;
pub mod compress;
pub mod error;
pub mod html_minify;
pub mod inject;
pub mod jsminify;
pub mod optimize;
pub mod reconstruct;
pub mod segment;
pub mod z85;

pub use bootstrap::{BootstrapVariant, GeneratedScript};
pub use byte_map::{map_fragments, EncodingTag, IntermediateCompiledPage, Interval};
pub use compile::{
    compile, compile_with_minifier, CompileLimits, CompileOptions, CompileReport, CompiledOutput,
};
#[cfg(feature = "async")]
pub use compile::{compile_async, compile_file_async, AsyncScriptMinifier};
pub use compress::CompressOptions;
pub use error::{CompileError, CompilePhase, ErrorLimitContext, MinifyError, Z85Error};
pub use html_minify::HtmlMinifyOptions;
pub use inject::{inject_compiled_page, wrap_document};
pub use jsminify::{BuiltinScriptMinifier, JsMinifyOptions, ScriptMinifier};
pub use optimize::optimize;
pub use reconstruct::CompiledPage;
pub use segment::{segment, Fragment};
