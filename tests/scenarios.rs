use pagepress::bootstrap::{license_header, script_literal};
use pagepress::compress::CompressOptions;
use pagepress::{
    compile, inject_compiled_page, map_fragments, optimize, segment, z85, BootstrapVariant,
    CompileOptions, EncodingTag, Interval,
};

fn options() -> CompileOptions {
    CompileOptions::default().with_compress(CompressOptions::fast())
}

#[test]
fn text_only_page_uses_single_segment_bootstrap() {
    let html = "<p>hi</p>";
    let page = optimize(map_fragments(&segment(html).unwrap()).unwrap());
    assert_eq!(page.source_map(), &[Interval::new(EncodingTag::Utf8, 0, 9)]);

    let compiled = compile(html, &options()).unwrap();
    assert!(compiled.report.fast_path);
    assert_eq!(compiled.script.variant, BootstrapVariant::SingleSegment);
    assert!(compiled
        .script
        .as_str()
        .starts_with(license_header(BootstrapVariant::SingleSegment)));
    assert!(!compiled.script.as_str().contains("base64Encode"));
    assert_eq!(compiled.page.reconstruct().unwrap(), html);
}

#[test]
fn image_data_uri_uses_general_bootstrap() {
    let html = "<img src=\"data:image/png;base64,AAAA\">";
    let fragments = segment(html).unwrap();
    assert_eq!(fragments.len(), 3);

    let mapped = map_fragments(&fragments).unwrap();
    let binary: Vec<&Interval> = mapped
        .source_map()
        .iter()
        .filter(|interval| interval.tag == EncodingTag::Base64)
        .collect();
    assert_eq!(binary.len(), 1);
    assert_eq!(binary[0].len(), 3);

    let compiled = compile(html, &options()).unwrap();
    assert!(!compiled.report.fast_path);
    assert_eq!(compiled.script.variant, BootstrapVariant::General);
    assert!(compiled.script.as_str().contains("function base64Encode"));
    assert_eq!(
        compiled.page.source_map_json().unwrap(),
        "[[0,0,32],[1,32,35],[0,35,37]]"
    );
    let rebuilt = compiled.page.reconstruct().unwrap();
    assert_eq!(rebuilt, html);
    assert!(rebuilt.contains("base64,AAAA\""));
}

#[test]
fn z85_reference_prefix() {
    let full = [0x86, 0x4F, 0xD2, 0x6F, 0xB5, 0x59, 0xF7, 0x5B];
    let short = z85::encode(&full[..3]);
    assert_eq!(short, "Helj");
    assert_eq!(z85::encode(&full), "HelloWorld");
    assert!(z85::encode(&full).starts_with(&short[..3]));
    assert_eq!(z85::decode(&short), &full[..3]);
}

#[test]
fn injected_document_is_one_script_element() {
    let html = "<!DOCTYPE html><title>t</title><img src=\"data:image/gif;base64,R0lGODlhAQABAAAAACw=\">";
    let doc = inject_compiled_page(html, &options()).unwrap();
    assert!(doc.starts_with("<html><script>"));
    assert!(doc.ends_with("</script></html>"));
    assert_eq!(doc.to_ascii_lowercase().matches("<script").count(), 1);
    assert_eq!(doc.to_ascii_lowercase().matches("</script").count(), 1);
}

#[test]
fn minified_bootstrap_still_embeds_payload() {
    let html = "<p>hello</p><img src=\"data:image/png;base64,AAAA\">";
    let compiled = compile(
        html,
        &options().with_minify_js(pagepress::JsMinifyOptions::default()),
    )
    .unwrap();
    assert!(compiled.report.minified);
    assert!(compiled
        .script
        .as_str()
        .contains(&script_literal(&compiled.page.z85)));
    assert_eq!(compiled.page.reconstruct().unwrap(), html);
}
