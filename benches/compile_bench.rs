use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use pagepress::compress::{compress, CompressOptions};
use pagepress::{compile, map_fragments, optimize, segment, z85, CompileOptions, JsMinifyOptions};

struct TrackingAllocator;

static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_BYTES: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: TrackingAllocator = TrackingAllocator;

fn grow(bytes: usize) {
    let live = LIVE_BYTES.fetch_add(bytes, Ordering::Relaxed) + bytes;
    PEAK_BYTES.fetch_max(live, Ordering::Relaxed);
}

fn shrink(bytes: usize) {
    let _ = LIVE_BYTES.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |live| {
        Some(live.saturating_sub(bytes))
    });
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            grow(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        shrink(layout.size());
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            grow(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                grow(new_size - layout.size());
            } else {
                shrink(layout.size() - new_size);
            }
        }
        new_ptr
    }
}

/// Generated page: prose plus one base64 image per `image_every` paragraphs.
fn synthetic_page(text_bytes: usize, image_every: usize) -> String {
    const B64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    const WORDS: &[&str] = &["bundle", "inline", "page", "script", "résumé", "stream", "✓"];
    let mut state = 0x853c_49e6_748f_ea9b_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut html = String::with_capacity(text_bytes + text_bytes / 4);
    html.push_str("<!DOCTYPE html><html><body>");
    let mut paragraph = 0usize;
    while html.len() < text_bytes {
        html.push_str("<p>");
        for _ in 0..32 {
            html.push_str(WORDS[next() as usize % WORDS.len()]);
            html.push(' ');
        }
        html.push_str("</p>");
        paragraph += 1;
        if image_every > 0 && paragraph % image_every == 0 {
            html.push_str("<img src=\"data:image/png;base64,");
            for _ in 0..(next() % 512 + 16) * 4 {
                html.push(B64[next() as usize % B64.len()] as char);
            }
            html.push_str("\">");
        }
    }
    html.push_str("</body></html>");
    html
}

#[derive(Clone, Debug)]
struct CaseResult {
    fixture: String,
    case: String,
    iterations: usize,
    min_ns: u128,
    median_ns: u128,
    max_ns: u128,
    median_peak_heap_bytes: usize,
    max_peak_heap_bytes: usize,
}

fn run_case<F>(fixture: &str, case: &str, warmup: usize, iters: usize, mut op: F) -> CaseResult
where
    F: FnMut() -> usize,
{
    for _ in 0..warmup {
        black_box(op());
    }

    let mut times = Vec::with_capacity(iters);
    let mut peaks = Vec::with_capacity(iters);
    for _ in 0..iters {
        let baseline = LIVE_BYTES.load(Ordering::Relaxed);
        PEAK_BYTES.store(baseline, Ordering::Relaxed);
        let start = Instant::now();
        black_box(op());
        times.push(start.elapsed().as_nanos());
        peaks.push(PEAK_BYTES.load(Ordering::Relaxed).saturating_sub(baseline));
    }
    times.sort_unstable();
    peaks.sort_unstable();

    CaseResult {
        fixture: fixture.to_string(),
        case: case.to_string(),
        iterations: iters,
        min_ns: times[0],
        median_ns: times[times.len() / 2],
        max_ns: times[times.len() - 1],
        median_peak_heap_bytes: peaks[peaks.len() / 2],
        max_peak_heap_bytes: peaks[peaks.len() - 1],
    }
}

fn main() {
    let quick = std::env::args().any(|arg| arg == "--quick");
    let warmup = if quick { 1 } else { 2 };
    let iters = if quick { 3 } else { 10 };
    let fixtures = [
        ("text-256k", synthetic_page(256 * 1024, 0)),
        ("mixed-256k", synthetic_page(256 * 1024, 8)),
        ("mixed-2m", synthetic_page(2 * 1024 * 1024, 8)),
    ];

    println!("# pagepress benchmark");
    println!(
        "# mode={} warmup_iters={} measure_iters={}",
        if quick { "quick" } else { "full" },
        warmup,
        iters
    );
    println!("fixture,case,iterations,min_ns,median_ns,max_ns,median_peak_heap_bytes,max_peak_heap_bytes");

    let mut results = Vec::new();
    for (name, html) in &fixtures {
        results.push(run_case(name, "segment_map_optimize", warmup, iters, || {
            let fragments = segment(html).unwrap_or_else(|e| panic!("segment: {}", e));
            let page = map_fragments(&fragments).unwrap_or_else(|e| panic!("map: {}", e));
            optimize(page).len()
        }));

        let combined = optimize(
            map_fragments(&segment(html).unwrap_or_else(|e| panic!("segment: {}", e)))
                .unwrap_or_else(|e| panic!("map: {}", e)),
        )
        .concat();
        results.push(run_case(name, "lzma_preset9_extreme", warmup, iters, || {
            compress(&combined, CompressOptions::default())
                .unwrap_or_else(|e| panic!("compress: {}", e))
                .len()
        }));

        let packed = compress(&combined, CompressOptions::default())
            .unwrap_or_else(|e| panic!("compress: {}", e));
        results.push(run_case(name, "z85_encode", warmup, iters, || {
            z85::encode(&packed).len()
        }));

        let options = CompileOptions::default().with_minify_js(JsMinifyOptions::default());
        results.push(run_case(name, "compile_full", warmup, iters, || {
            compile(html, &options)
                .unwrap_or_else(|e| panic!("compile: {}", e))
                .report
                .script_bytes
        }));
    }

    for result in &results {
        println!(
            "{},{},{},{},{},{},{},{}",
            result.fixture,
            result.case,
            result.iterations,
            result.min_ns,
            result.median_ns,
            result.max_ns,
            result.median_peak_heap_bytes,
            result.max_peak_heap_bytes
        );
    }
}
