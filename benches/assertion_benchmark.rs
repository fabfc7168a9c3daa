use criterion::{Criterion, black_box, criterion_group, criterion_main};
use web_validate::assertions::{AssertionRequest, evaluate};

fn sample_page() -> String {
    let mut html = String::from("<html><head><title>Bench</title></head><body>");
    for i in 0..2_000 {
        html.push_str(&format!(
            "<div class=\"row item-{i}\" data-index=\"{i}\"><span>row {i}</span></div>"
        ));
    }
    html.push_str("<footer id=\"end\">done</footer></body></html>");
    html
}

fn benchmark_assertions(c: &mut Criterion) {
    let html = sample_page();
    let requests = vec![
        AssertionRequest::text("row 1999"),
        AssertionRequest::selector("#end"),
        AssertionRequest::selector("div.row > span"),
        AssertionRequest::regex(r"row \d{4}</span>"),
    ];

    c.bench_function("evaluate_mixed_assertions", |b| {
        b.iter(|| evaluate(black_box(&html), black_box(&requests)))
    });
}

criterion_group!(benches, benchmark_assertions);
criterion_main!(benches);
