use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cheat_triage::config::ScanConfig;
use cheat_triage::keywords::KeywordMatcher;

fn matcher_from_defaults() -> KeywordMatcher {
    let config = ScanConfig::default();
    KeywordMatcher::new(&config.keywords.substrings, &config.keywords.exact)
}

fn bench_keyword_matching(c: &mut Criterion) {
    let matcher = matcher_from_defaults();

    let clean_path = "C:\\Users\\player\\AppData\\Local\\Programs\\editor\\resources\\app.asar.unpacked\\node_modules\\binding.dll";
    let hit_path = "C:\\Users\\player\\Downloads\\free-aimbot-loader.exe";
    let near_miss = "C:\\Games\\cheaterdetector\\uncheatable-launcher.exe";

    c.bench_function("match_clean_path", |b| {
        b.iter(|| matcher.contains_keyword(black_box(clean_path)))
    });

    c.bench_function("match_hit_path", |b| {
        b.iter(|| matcher.find_keyword(black_box(hit_path)))
    });

    c.bench_function("match_word_boundary_near_miss", |b| {
        b.iter(|| matcher.contains_keyword(black_box(near_miss)))
    });

    c.bench_function("match_exact_basename", |b| {
        b.iter(|| matcher.find_keyword(black_box("C:\\Downloads\\x22cheats.exe")))
    });
}

criterion_group!(benches, bench_keyword_matching);
criterion_main!(benches);
