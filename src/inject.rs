//! Replacement document assembly.

use crate::compile::{compile, CompileOptions, CompiledOutput};
use crate::error::{CompileError, CompilePhase};

/// Wraps a bootstrap script as the whole replacement document.
pub fn wrap_document(script: &str) -> String {
    let mut out = String::with_capacity(script.len() + 40);
    out.push_str("<html><script>");
    out.push_str(script);
    out.push_str("</script></html>");
    out
}

/// Rejects scripts that would end their `<script>` element early.
fn ensure_script_safe(script: &str) -> Result<(), CompileError> {
    let bytes = script.as_bytes();
    let closing = bytes
        .windows(b"</script".len())
        .position(|window| window.eq_ignore_ascii_case(b"</script"));
    match closing {
        Some(offset) => Err(CompileError::new(
            CompilePhase::Inject,
            "SCRIPT_CLOSE_TAG",
            "bootstrap script contains a closing script tag",
        )
        .with_offset(offset)),
        None => Ok(()),
    }
}

impl CompiledOutput {
    /// Replacement document holding this compile's script.
    pub fn to_document(&self) -> Result<String, CompileError> {
        ensure_script_safe(self.script.as_str())?;
        Ok(wrap_document(self.script.as_str()))
    }
}

/// Compiles `html` and returns the replacement document.
pub fn inject_compiled_page(html: &str, options: &CompileOptions) -> Result<String, CompileError> {
    compile(html, options)?.to_document()
}
