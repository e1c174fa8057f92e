use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use meshlink::protocol::{
    LogLineText, NodeTag, add_checksum, crc8, decode, encode, verify_and_strip,
};
use meshlink::{NodeId, Packet, Payload};

const SOURCE: NodeId = NodeId::new([0x24, 0x6F, 0x28, 0x01, 0x02, 0x03]);

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");

    let body = "tds=412;temp=21.5;flow=3.2;pump=on;level=80";
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("crc8_44b", |b| {
        b.iter(|| black_box(crc8(black_box(body.as_bytes()))));
    });

    group.bench_function("add_checksum", |b| {
        b.iter(|| black_box(add_checksum(black_box(body))));
    });

    let frame = add_checksum(body);
    group.bench_function("verify_and_strip", |b| {
        b.iter(|| black_box(verify_and_strip(black_box(&frame)).unwrap()));
    });

    group.finish();
}

fn bench_packets(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet");

    let text = Packet::text(SOURCE, 7, "temp=21.5");
    let text_bytes = encode(&text);
    group.throughput(Throughput::Bytes(text_bytes.len() as u64));
    group.bench_function("encode_text", |b| {
        b.iter(|| black_box(encode(black_box(&text))));
    });
    group.bench_function("decode_text", |b| {
        b.iter(|| black_box(decode(black_box(&text_bytes)).unwrap()));
    });

    let line = Packet::new(
        SOURCE,
        8,
        Payload::LogLine {
            tag: NodeTag::truncated("pump-3"),
            line: LogLineText::truncated(&"x".repeat(200)),
        },
    );
    let line_bytes = encode(&line);
    group.throughput(Throughput::Bytes(line_bytes.len() as u64));
    group.bench_function("encode_log_line", |b| {
        b.iter(|| black_box(encode(black_box(&line))));
    });
    group.bench_function("decode_log_line", |b| {
        b.iter(|| black_box(decode(black_box(&line_bytes)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_checksum, bench_packets);
criterion_main!(benches);
