//! DHAT heap profiler for pagepress.
//!
//! Profiles allocation patterns across the compile pipeline:
//! segment -> byte map -> optimize -> compress -> bootstrap.
//!
//! Usage:
//!   cargo run -p pagepress-heap-profile --release -- [OPTIONS] [HTML_FILES...]
//!
//! Outputs dhat-<phase>.json files in the output directory (default: target/memory).
//! Open in https://nnethercote.github.io/dh_view/dh_view.html

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::{Path, PathBuf};
use std::process::Command;

use pagepress::compress::{compress, CompressOptions};
use pagepress::{compile, map_fragments, optimize, segment, CompileOptions, JsMinifyOptions};

const SYNTHETIC_NAME: &str = "synthetic.html";
const SYNTHETIC_TEXT_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Segment,
    ByteMap,
    Compress,
    Full,
    Verify,
}

impl Phase {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "segment" => Some(Self::Segment),
            "byte-map" | "byte_map" => Some(Self::ByteMap),
            "compress" => Some(Self::Compress),
            "full" => Some(Self::Full),
            "verify" => Some(Self::Verify),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::ByteMap => "byte_map",
            Self::Compress => "compress",
            Self::Full => "full",
            Self::Verify => "verify",
        }
    }
}

fn profile_file(path: &Path, phase: Phase) {
    let path_str = path.to_string_lossy();
    let html =
        std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {}", path_str, e));

    match phase {
        Phase::Segment => {
            let _fragments =
                segment(&html).unwrap_or_else(|e| panic!("segment {}: {}", path_str, e));
        }
        Phase::ByteMap => {
            let fragments =
                segment(&html).unwrap_or_else(|e| panic!("segment {}: {}", path_str, e));
            let page = map_fragments(&fragments)
                .unwrap_or_else(|e| panic!("byte map {}: {}", path_str, e));
            let _merged = optimize(page);
        }
        Phase::Compress => {
            let fragments =
                segment(&html).unwrap_or_else(|e| panic!("segment {}: {}", path_str, e));
            let page = map_fragments(&fragments)
                .unwrap_or_else(|e| panic!("byte map {}: {}", path_str, e));
            let combined = optimize(page).concat();
            let _packed = compress(&combined, CompressOptions::default())
                .unwrap_or_else(|e| panic!("compress {}: {}", path_str, e));
        }
        Phase::Full => {
            let options = CompileOptions::default().with_minify_js(JsMinifyOptions::default());
            let _compiled =
                compile(&html, &options).unwrap_or_else(|e| panic!("compile {}: {}", path_str, e));
        }
        Phase::Verify => {
            let compiled = compile(&html, &CompileOptions::default())
                .unwrap_or_else(|e| panic!("compile {}: {}", path_str, e));
            let rebuilt = compiled
                .page
                .reconstruct()
                .unwrap_or_else(|e| panic!("reconstruct {}: {}", path_str, e));
            if rebuilt != html {
                panic!("reconstruct {} differs from source", path_str);
            }
        }
    }
}

/// Page with prose and a base64 image every few paragraphs.
fn synthetic_page(text_bytes: usize) -> String {
    const B64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    const WORDS: &[&str] = &[
        "page", "inline", "script", "archive", "stream", "window", "buffer", "literal",
    ];

    let mut state = 0x2545_f491_u32;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };

    let mut html = String::with_capacity(text_bytes + text_bytes / 4);
    html.push_str("<!DOCTYPE html><html><head><title>synthetic</title></head><body>\n");
    let mut paragraph = 0usize;
    while html.len() < text_bytes {
        html.push_str("<p>");
        for _ in 0..48 {
            html.push_str(WORDS[next() as usize % WORDS.len()]);
            html.push(' ');
        }
        html.push_str("</p>\n");
        paragraph += 1;
        if paragraph % 6 == 0 {
            html.push_str("<img src=\"data:image/png;base64,");
            for _ in 0..(next() % 256 + 16) * 4 {
                html.push(B64[next() as usize % B64.len()] as char);
            }
            html.push_str("\">\n");
        }
    }
    html.push_str("</body></html>\n");
    html
}

/// Extract a short name from a file path for use in output filenames.
fn short_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

fn usage() {
    eprintln!("Usage: heap-profile [OPTIONS] [HTML_FILES...]");
    eprintln!();
    eprintln!("Options:");
    eprintln!(
        "  --phase <segment|byte_map|compress|full|verify>  Pipeline phase to profile (default: full)"
    );
    eprintln!("  --out-dir <DIR>                      Output directory for dhat JSON (default: target/memory)");
    eprintln!(
        "  --aggregate                          Single profile for all files (default: per-file)"
    );
    eprintln!();
    eprintln!("By default, each document gets its own clean DHAT profile (separate process).");
    eprintln!("With --aggregate, all files share one profile.");
    eprintln!();
    eprintln!("If no HTML files are given, profiles a generated page written to the output directory.");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut phase = Phase::Full;
    let mut out_dir = PathBuf::from("target/memory");
    let mut files: Vec<PathBuf> = Vec::with_capacity(8);
    let mut aggregate = false;
    // Internal flag: when set, we're a child process profiling a single file.
    let mut single_file_mode = false;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--phase" => {
                i += 1;
                let value = args.get(i).map(String::as_str).unwrap_or("");
                phase = Phase::from_str(value).unwrap_or_else(|| {
                    eprintln!("Unknown phase: {}", value);
                    usage();
                    std::process::exit(1);
                });
            }
            "--out-dir" => {
                i += 1;
                out_dir = PathBuf::from(args.get(i).map(String::as_str).unwrap_or("."));
            }
            "--aggregate" => {
                aggregate = true;
            }
            "--single-file" => {
                single_file_mode = true;
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            other => {
                files.push(PathBuf::from(other));
            }
        }
        i += 1;
    }

    std::fs::create_dir_all(&out_dir).unwrap_or_else(|e| {
        eprintln!("Failed to create output dir {}: {}", out_dir.display(), e);
        std::process::exit(1);
    });

    if files.is_empty() {
        let path = out_dir.join(SYNTHETIC_NAME);
        std::fs::write(&path, synthetic_page(SYNTHETIC_TEXT_BYTES)).unwrap_or_else(|e| {
            eprintln!("Failed to write {}: {}", path.display(), e);
            std::process::exit(1);
        });
        files.push(path);
    }

    let phase_name = phase.name();

    // Child process mode: profile exactly the one file with DHAT active.
    if single_file_mode {
        assert!(files.len() == 1, "--single-file expects exactly one file");
        let file = &files[0];
        let name = short_name(file);
        let json_path = out_dir.join(format!("dhat-{phase_name}-{name}.json"));

        let _profiler = dhat::Profiler::builder().file_name(json_path).build();
        profile_file(file, phase);
        return;
    }

    if aggregate {
        let json_path = out_dir.join(format!("dhat-{phase_name}.json"));
        eprintln!(
            "heap-profile: phase={}, files={} (aggregate), out={}",
            phase_name,
            files.len(),
            out_dir.display()
        );

        let _profiler = dhat::Profiler::builder()
            .file_name(json_path.clone())
            .build();
        for file in &files {
            eprintln!("  profiling: {}", file.display());
            profile_file(file, phase);
        }
        eprintln!(
            "Done. Open {} in https://nnethercote.github.io/dh_view/dh_view.html",
            json_path.display()
        );
        return;
    }

    let self_exe = std::env::current_exe().unwrap_or_else(|e| {
        eprintln!("Failed to determine own executable path: {}", e);
        std::process::exit(1);
    });

    eprintln!(
        "heap-profile: phase={}, files={} (per-file), out={}",
        phase_name,
        files.len(),
        out_dir.display()
    );

    let mut any_failed = false;
    for file in &files {
        let name = short_name(file);
        eprintln!(
            "  profiling: {} -> dhat-{}-{}.json",
            file.display(),
            phase_name,
            name
        );

        let status = Command::new(&self_exe)
            .arg("--single-file")
            .arg("--phase")
            .arg(phase_name)
            .arg("--out-dir")
            .arg(&out_dir)
            .arg(file)
            .status();

        match status {
            Ok(s) if s.success() => {}
            Ok(s) => {
                eprintln!("    FAILED (exit {})", s.code().unwrap_or(-1));
                any_failed = true;
            }
            Err(e) => {
                eprintln!("    FAILED to spawn: {}", e);
                any_failed = true;
            }
        }
    }

    eprintln!();
    eprintln!("Profiles saved to {}:", out_dir.display());
    for file in &files {
        let json_path = out_dir.join(format!("dhat-{phase_name}-{}.json", short_name(file)));
        if json_path.exists() {
            eprintln!("  {}", json_path.display());
        }
    }

    if any_failed {
        std::process::exit(1);
    }
}
