use criterion::{criterion_group, criterion_main};

mod kit;

criterion_group!(
    benches,
    kit::bench_build_response_packet,
    kit::bench_extract_data_load,
    kit::bench_process_talk,
    kit::bench_process_board
);
criterion_main!(benches);
