use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use watershed_join::config::MatchStrategy;
use watershed_join::models::{RawRow, StationLocation, SubjectPoint};
use watershed_join::processors::{NearestMatcher, StationTable};
use watershed_join::utils::coordinates::haversine_distance;

// Points spread over California-sized bounds on a fixed lattice.
fn create_test_data(subject_count: usize, station_count: usize) -> (Vec<SubjectPoint>, StationTable) {
    let subjects = (0..subject_count)
        .map(|i| {
            let lat = 32.5 + (i % 97) as f64 * 0.09;
            let lon = -124.0 + (i % 89) as f64 * 0.1;
            SubjectPoint::try_new(lat, lon, RawRow::new()).unwrap()
        })
        .collect();

    let stations = StationTable::from_locations((0..station_count).map(|i| {
        let lat = 32.6 + (i % 41) as f64 * 0.21;
        let lon = -123.9 + (i % 37) as f64 * 0.24;
        StationLocation::new(format!("SITE-{:05}", i), lat, lon)
    }));

    (subjects, stations)
}

fn benchmark_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_matcher");

    for &(subjects, stations) in &[(1_000, 50), (10_000, 200)] {
        let (points, table) = create_test_data(subjects, stations);

        for strategy in [MatchStrategy::Sequential, MatchStrategy::Parallel] {
            let matcher = NearestMatcher::new(strategy);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", strategy), format!("{}x{}", subjects, stations)),
                &(points.as_slice(), &table),
                |b, (points, table)| {
                    b.iter(|| matcher.match_all(black_box(points), black_box(table), None).unwrap())
                },
            );
        }
    }

    group.finish();
}

fn benchmark_haversine(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(38.0),
                black_box(-122.0),
                black_box(39.5),
                black_box(-120.0),
            )
        })
    });
}

criterion_group!(benches, benchmark_matcher, benchmark_haversine);
criterion_main!(benches);
