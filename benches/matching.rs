//! Benchmarks for pattern compilation and token matching.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pinyin_regex::{
    compile, is_match, MatchOptions, PatternCache, PinyinTokenizer, ReadingTable, Token, Tokenize,
};

const READINGS: &str = "\
U+97F3: yīn
U+4E50: lè,yuè
U+4E2D: zhōng,zhòng
U+5BB6: jiā
U+6211: wǒ
U+7684: de,dí,dì
U+5F88: hěn
U+597D: hǎo,hào
U+542C: tīng
U+8F66: chē
U+662F: shì
";

fn tokenizer() -> PinyinTokenizer {
    PinyinTokenizer::new(ReadingTable::parse(READINGS).unwrap())
}

/// A long text with the interesting span near the end.
fn long_tokens(tokenizer: &PinyinTokenizer) -> Vec<Token> {
    let mut text = "我的车很好是中家".repeat(64);
    text.push_str("音乐很好听");
    tokenizer
        .tokenize(&text, &MatchOptions::default().tokenize_options())
        .unwrap()
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_simple", |b| {
        b.iter(|| compile(black_box("yin(yue|le)")).unwrap())
    });

    c.bench_function("compile_bounded_repeat", |b| {
        b.iter(|| compile(black_box("(y(yue|le)){2,20}[a-z]{0,10}")).unwrap())
    });
}

fn bench_exec(c: &mut Criterion) {
    let t = tokenizer();
    let short = t
        .tokenize("音乐", &MatchOptions::default().tokenize_options())
        .unwrap();
    let long = long_tokens(&t);

    let literal = compile("yinyue").unwrap();
    c.bench_function("exec_short", |b| b.iter(|| literal.exec(black_box(&short))));
    c.bench_function("exec_long_substring", |b| {
        b.iter(|| literal.exec(black_box(&long)))
    });

    let initials = compile("y+(h|t)").unwrap();
    c.bench_function("exec_long_initials", |b| {
        b.iter(|| initials.exec(black_box(&long)))
    });

    let miss = compile("zhongguo").unwrap();
    c.bench_function("exec_long_miss", |b| b.iter(|| miss.exec(black_box(&long))));

    let any = compile(r"\z{3}yue").unwrap();
    c.bench_function("find_long_any_token", |b| {
        b.iter(|| any.find(black_box(&long)))
    });
}

fn bench_cache(c: &mut Criterion) {
    let t = tokenizer();
    let options = MatchOptions::default();

    c.bench_function("is_match_cached", |b| {
        b.iter(|| is_match(black_box("yin(yue|le)"), black_box("音乐"), &t, &options).unwrap())
    });

    c.bench_function("is_match_uncached", |b| {
        b.iter(|| {
            compile(black_box("yin(yue|le)"))
                .unwrap()
                .is_match_text(black_box("音乐"), &t, &options)
                .unwrap()
        })
    });

    let cache = PatternCache::new();
    cache.get_or_compile("yin(yue|le)").unwrap();
    c.bench_function("cache_lookup", |b| {
        b.iter(|| cache.get_or_compile(black_box("yin(yue|le)")).unwrap())
    });
}

criterion_group!(benches, bench_compile, bench_exec, bench_cache);
criterion_main!(benches);
