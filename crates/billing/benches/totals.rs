use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use crewflow_billing::{LineSpec, totals};

fn bench_totals(c: &mut Criterion) {
    let mut lines: Vec<LineSpec> = (0..50)
        .map(|i| {
            LineSpec::billable(
                format!("Line {i}"),
                Decimal::new(150 + i, 2),
                Decimal::new(9_999, 2),
            )
        })
        .collect();
    lines.push(LineSpec::tax("State tax", Decimal::new(825, 2)));
    lines.push(LineSpec::tax("County tax", Decimal::new(125, 2)));

    c.bench_function("totals_50_lines", |b| {
        b.iter(|| totals(black_box(&lines)))
    });
}

criterion_group!(benches, bench_totals);
criterion_main!(benches);
