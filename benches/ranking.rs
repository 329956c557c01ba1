use std::sync::Arc;

use country_recommender::{
    Country, EmbeddingMap, EmbeddingProvider, FrequencyTable, HashingEmbedder, KeywordNormalizer, LexicalIndex,
    SemanticResolver, TermFrequency,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

// 12 countries × 2000 keywords, each country using a different slice
fn synthetic_table() -> FrequencyTable {
    let mut table = FrequencyTable::new();
    for (i, &country) in Country::ALL.iter().enumerate() {
        let mut freq = TermFrequency::new();
        for k in 0..600 {
            let term = (i * 97 + k * 3) % 2000;
            freq.add_count(&format!("kw{term:04}"), ((k * 31 + i) % 50 + 1) as u64);
        }
        table.insert(country, freq);
    }
    table
}

fn ranking_benchmark(c: &mut Criterion) {
    let table = synthetic_table();

    c.bench_function("fit_lexical_index", |b| {
        b.iter(|| {
            let index: LexicalIndex = LexicalIndex::fit(black_box(&table));
            index
        });
    });

    let index: LexicalIndex = LexicalIndex::fit(&table);
    let normalizer = KeywordNormalizer::default();
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
    let mut embeddings = EmbeddingMap::new(provider.model_name());
    for term in index.vocabulary().iter().take(500) {
        if let Ok(v) = provider.embed(term) {
            embeddings.insert(term.clone(), v);
        }
    }
    let resolver = SemanticResolver::new(&normalizer, index.vocabulary(), &embeddings, provider.as_ref(), 0.6);

    let lexical_query = ["kw0003", "kw0100", "kw1500", "kw0003"];
    c.bench_function("rank_lexical", |b| {
        b.iter(|| country_recommender::rank(black_box(&lexical_query), &index, &resolver, 5, true));
    });

    let semantic_query = ["kw0003x", "unknown keyword"];
    c.bench_function("rank_semantic_fallback", |b| {
        b.iter(|| country_recommender::rank(black_box(&semantic_query), &index, &resolver, 5, true));
    });
}

criterion_group!(benches, ranking_benchmark);
criterion_main!(benches);
