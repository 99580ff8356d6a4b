use std::hint::black_box;
use bencher::{LARGE_HEADER, POST_FORM, SMALL_HEADER, TestCase, client_message};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use nano_http::codec::RequestDecoder;
use nano_http::ws::MessageDecoder;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("small_header_decoder", SMALL_HEADER),
        TestCase::normal("large_header_decoder", LARGE_HEADER),
        TestCase::normal("form_body_decoder", POST_FORM),
    ]
}

fn benchmark_request_decoder(criterion: &mut Criterion) {
    let test_cases = create_test_cases();
    let mut group = criterion.benchmark_group("request_decoder");

    for case in test_cases {
        group.throughput(Throughput::Bytes(case.file().content().len() as u64));
        group.bench_with_input(BenchmarkId::new(format!("{:?}", case.group()), case.name()), &case, |b, case| {
            let mut request_decoder = RequestDecoder::new();
            b.iter_batched_ref(
                || BytesMut::from(case.file().content()),
                |bytes_mut| {
                    let request = request_decoder.decode(bytes_mut).expect("input should be a valid http request").unwrap();
                    black_box(request);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_message_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("message_decoder");

    for (name, size, fragments) in [("single_frame_1k", 1024, 1), ("single_frame_60k", 60 * 1024, 1), ("fragmented_60k", 60 * 1024, 16)] {
        let wire = client_message(size, fragments);
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &wire, |b, wire| {
            let mut message_decoder = MessageDecoder::default();
            b.iter_batched_ref(
                || wire.clone(),
                |bytes_mut| {
                    let message = message_decoder.decode(bytes_mut).expect("input should be a valid message").unwrap();
                    black_box(message);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(decoder, benchmark_request_decoder, benchmark_message_decoder);
criterion_main!(decoder);
