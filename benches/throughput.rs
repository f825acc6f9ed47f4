use async_trait::async_trait;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use frank::handlers::{Dispatcher, Flow, Handler, HandlerResult, Registry, extract_urls};
use frank::state::TitleCache;
use frank_proto::Message;
use std::sync::Arc;
use std::time::Duration;

fn message_parsing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    let raw = ":sender!user@host PRIVMSG #channel :look at https://example.com/a_(b) ok";
    group.throughput(Throughput::Bytes(raw.len() as u64));

    group.bench_function("parse_privmsg", |b| {
        b.iter(|| raw.parse::<Message>().unwrap())
    });
    group.bench_function("extract_urls", |b| b.iter(|| extract_urls(raw).len()));

    group.finish();
}

fn title_cache_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("title_cache");
    group.throughput(Throughput::Elements(1));

    let cache = TitleCache::new(500, Duration::from_secs(24 * 3600));
    for i in 0..500 {
        cache.add(format!("https://example.com/{i}"), format!("title {i}"));
    }

    group.bench_function("add", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            cache.add(format!("https://example.org/{i}"), "title");
        })
    });
    group.bench_function("get_by_url_miss", |b| {
        b.iter(|| cache.get_by_url("https://nowhere.example/"))
    });

    group.finish();
}

struct Noop;

#[async_trait]
impl Handler for Noop {
    async fn handle(&self, _msg: &Message) -> HandlerResult {
        Ok(Flow::Continue)
    }
}

fn dispatch_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let registry = Arc::new(Registry::new());
    for i in 0..10 {
        registry.add(format!("noop {i}"), Arc::new(Noop));
    }
    let dispatcher = Dispatcher::new(registry, Duration::from_secs(30));
    let msg: Message = ":sender!user@host PRIVMSG #channel :hello".parse().unwrap();

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));
    group.bench_function("ten_listeners", |b| {
        b.to_async(&runtime).iter(|| dispatcher.run(msg.clone()))
    });
    group.finish();
}

criterion_group!(
    benches,
    message_parsing_benchmark,
    title_cache_benchmark,
    dispatch_benchmark
);
criterion_main!(benches);
