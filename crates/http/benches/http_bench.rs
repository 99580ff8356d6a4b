use std::{
    hint::black_box,
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::BytesMut;
use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use nano_http::{
    codec::{RequestDecoder, ResponseEncoder},
    connection::HttpConnection,
    protocol::{Limits, Response},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::{Decoder, Encoder};

// Mock IO for benchmarking
#[derive(Clone)]
struct MockIO {
    read_data: Vec<u8>,
    write_data: Vec<u8>,
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: Vec<u8>) -> Self {
        Self { read_data, write_data: Vec::new(), read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        self.write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

fn bench_request_decoder(c: &mut Criterion) {
    let get = b"GET /?a=1&b=2 HTTP/1.1\r\nHost: localhost\r\n\r\n";
    let post = b"POST /form HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 23\r\n\r\nname=nano&lang=rust+fun";

    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::from(&get[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });

    c.bench_function("decode_form_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::from(&post[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    let response = Response::html("Hello World!");

    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();
            let mut response = response.clone();
            black_box(encoder.encode(&mut response, &mut bytes).unwrap());
        });
    });
}

fn bench_http_connection(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

    c.bench_function("process_simple_request", |b| {
        b.iter(|| {
            let mock_io = MockIO::new(request.to_vec());
            let (reader, writer) = (mock_io.clone(), mock_io);
            let mut connection = HttpConnection::new(reader, writer, Limits::default());
            block_on(async {
                let request = connection.read_request().await.unwrap();
                let mut response = Response::html(request.path());
                connection.send_response(&mut response).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_http_connection);
criterion_main!(benches);
