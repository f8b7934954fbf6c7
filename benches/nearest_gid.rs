use criterion::{black_box, criterion_group, criterion_main, Criterion};
use inspire_oedi::{BoundingBox, LookupTable};
use polars::prelude::df;

fn synthetic_table(rows: usize) -> LookupTable {
    let gids: Vec<i64> = (0..rows as i64).collect();
    let lats: Vec<f64> = (0..rows).map(|i| 25.0 + (i % 500) as f64 * 0.04).collect();
    let lons: Vec<f64> = (0..rows).map(|i| -125.0 + (i / 500) as f64 * 0.04).collect();
    let df = df!(
        "gid" => gids,
        "latitude" => lats,
        "longitude" => lons,
    )
    .unwrap();
    LookupTable::from_dataframe(df).unwrap()
}

fn bench_lookup(c: &mut Criterion) {
    let table = synthetic_table(10_000);

    c.bench_function("nearest_gid_10k", |b| {
        b.iter(|| table.nearest(black_box(39.7392), black_box(-104.9903)))
    });
    c.bench_function("within_bounds_10k", |b| {
        b.iter(|| table.within_bounds(black_box(&BoundingBox::new(30.0, 35.0, -120.0, -110.0))))
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
