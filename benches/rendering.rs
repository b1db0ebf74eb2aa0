use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gistio_server::render::{rst, smartypants};

const DOCUMENT: &str = r#"
=====================
Writing for hackers
=====================

Gists are "just files", but they deserve better typography -- don't they?

Setup
-----

1. Write a gist.
2. Swap the host.
3. Read it...

Some *emphasis*, some **strong**, and ``inline code``. See
`the docs <https://example.com/docs>`_ for details.

A literal block::

    fn main() {
        println!("it's \"quoted\"");
    }

* one
* two

----

Term
    Its definition, with 'single' quotes.
"#;

fn bench_rst(c: &mut Criterion) {
    c.bench_function("rst_render_fragment", |b| {
        b.iter(|| rst::render_fragment(black_box(DOCUMENT)))
    });
}

fn bench_smartypants(c: &mut Criterion) {
    let html = match rst::render_fragment(DOCUMENT) {
        Ok(html) => html,
        Err(e) => panic!("fixture should render: {}", e),
    };
    c.bench_function("smartypants_educate", |b| {
        b.iter(|| smartypants::educate(black_box(&html)))
    });
}

criterion_group!(benches, bench_rst, bench_smartypants);
criterion_main!(benches);
