//! FILENAME: pivot-engine/benches/pivot_calculations.rs
//! Report pipeline benchmarks over a synthetic booking table.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dataset::{fields, Dataset, DatasetBuilder, Schema};
use pivot_engine::presets::{
    lead_time_cancel_rate, monthly_cancel_rate_by_hotel, period_status, segment_summary, status_breakdown,
    timeline,
};
use pivot_engine::{run_report, Period, ReportSpec, TimelineMetric};

const COUNTRIES: [&str; 8] = ["PRT", "GBR", "FRA", "ESP", "DEU", "ITA", "IRL", "BRA"];
const TIPOS: [&str; 3] = ["Leisure", "Business", "Group"];

fn build_dataset(rows: usize) -> Dataset {
    let headers = [
        fields::IS_CANCELED,
        fields::HOTEL,
        fields::COUNTRY,
        fields::TIPO,
        fields::PREVIOUS_CANCELLATIONS_GROUP,
        fields::FIRST_TIME_VISITOR,
        fields::ADR,
        fields::DIA,
        fields::LEAD_TIME,
    ];
    let mut builder = match DatasetBuilder::with_headers(&headers, &Schema::bookings()) {
        Ok(builder) => builder,
        Err(e) => panic!("bench headers rejected: {}", e),
    };

    for i in 0..rows {
        let day = i % 365;
        let month = day / 31 + 1;
        let date = format!("2016-{:02}-{:02}", month.min(12), day % 28 + 1);
        let row = [
            if i % 3 == 0 { "1".to_string() } else { "0".to_string() },
            if i % 2 == 0 { "City Hotel".to_string() } else { "Resort Hotel".to_string() },
            COUNTRIES[i % COUNTRIES.len()].to_string(),
            TIPOS[i % TIPOS.len()].to_string(),
            if i % 7 == 0 { "1+".to_string() } else { "0".to_string() },
            if i % 5 == 0 { "No".to_string() } else { "Yes".to_string() },
            format!("{:.2}", 40.0 + (i % 200) as f64 * 1.5),
            date,
            (i % 500).to_string(),
        ];
        builder.push_raw(&row);
    }
    builder.build()
}

fn reports() -> Vec<ReportSpec> {
    vec![
        status_breakdown("status_by_hotel_origin", &["hotel", "origin"]),
        segment_summary("segment_by_tipo", &["hotel", "tipo"]),
        period_status("weekly_status", &["hotel"], Period::Week),
        timeline("timeline_cancel_rate", &["hotel", "origin"], TimelineMetric::CancelRate),
        lead_time_cancel_rate("lead_time"),
        monthly_cancel_rate_by_hotel("monthly_by_hotel"),
    ]
}

fn bench_reports(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_pipeline");
    group.sample_size(20);

    for rows in [10_000usize, 100_000] {
        let ds = build_dataset(rows);
        group.throughput(Throughput::Elements(rows as u64));

        for spec in reports() {
            group.bench_with_input(BenchmarkId::new(spec.name.clone(), rows), &spec, |b, spec| {
                b.iter(|| {
                    let view = run_report(&ds, spec);
                    black_box(view)
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_reports);
criterion_main!(benches);
