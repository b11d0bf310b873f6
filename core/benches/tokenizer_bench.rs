use criterion::{criterion_group, criterion_main, Criterion};
use docsearch_core::tokenizer::normalize;

fn bench_normalize(c: &mut Criterion) {
    let page = "<h2>Rendering Elements</h2>\
        <p>Elements are the smallest building blocks of an application. \
        Unlike browser DOM elements, these are plain objects &amp; cheap to create.</p>\
        <pre><code>const element = &lt;h1&gt;Hello&lt;/h1&gt;;</code></pre>"
        .repeat(200);
    c.bench_function("normalize_page", |b| b.iter(|| normalize(&page)));
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
