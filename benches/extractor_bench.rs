use criterion::{black_box, criterion_group, criterion_main, Criterion};
use proxy_herder::extractor::ServerExtractor;

const CHANNEL_POST: &str = "
ss://YWVzLTI1Ni1nY206WTZSOXBBdHZ4eHptR0M@54.36.174.181:5001#Britain501%20%28t.me/Outline_Vpn%29
Other text
🇬🇧 #Britain

ss://YWVzLTI1Ni1nY206cEtFVzhKUEJ5VFZUTHRN@54.36.174.181:4444#Britain502%20%28t.me/Outline_Vpn%29
Definitely not clean
🇬🇧 #Britain

ss://YWVzLTI1Ni1nY206UENubkg2U1FTbmZvUzI3QDUuMzkuNzAuMTM4OjgwOTA=#FrOutlineKeys

ss://YWVzLTI1Ni1nY206S2l4THZLendqZWtHMDBybQ==@ak1394.free.www.outline.network:8080#www.outline.network%20(japan)
";

fn bench_extract(c: &mut Criterion) {
    let extractor = ServerExtractor::new().unwrap();

    c.bench_function("extract_channel_post", |b| {
        b.iter(|| extractor.extract(black_box(CHANNEL_POST)))
    });

    let noise = "no servers in here, just chatter ".repeat(100);
    c.bench_function("extract_pure_noise", |b| {
        b.iter(|| extractor.extract(black_box(&noise)))
    });
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
