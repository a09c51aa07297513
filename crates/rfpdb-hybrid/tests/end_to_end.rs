mod common;

use std::sync::Arc;

use common::{corpus, named, record};
use rfpdb_core::traits::{LexicalIndex, SemanticIndex};
use rfpdb_embed::HashEmbedder;
use rfpdb_hybrid::{HybridRanker, RankOptions, TermOverlapReranker};
use rfpdb_text::TantivyLexicalIndex;
use rfpdb_vector::VectorIndex;

#[tokio::test]
async fn tantivy_and_vector_index_fuse() {
    let corpus = corpus(vec![
        record("smart", named("스마트시티.hwp"), &["스마트시티 통합플랫폼 구축 사업", "교통 데이터 연계 방안"]),
        record("road", named("도로.hwp"), &["도로 포장 공사 입찰 안내"]),
        record("river", named("하천.hwp"), &["하천 정비 기본 계획"]),
    ]);
    let pairs = corpus.index_pairs();
    let lexical: Arc<dyn LexicalIndex> = Arc::new(TantivyLexicalIndex::build_in_ram(&pairs).expect("tantivy"));
    let semantic: Arc<dyn SemanticIndex> =
        Arc::new(VectorIndex::build(Arc::new(HashEmbedder::new(256).expect("embedder")), &pairs).expect("vectors"));

    let options = RankOptions { rerank: true, ..RankOptions::default() };
    let ranker = HybridRanker::new(Arc::clone(&corpus), options)
        .with_lexical_index(lexical)
        .with_semantic(semantic)
        .with_reranker(Arc::new(TermOverlapReranker));

    let results = ranker.rank("스마트시티 통합플랫폼", 3).await.expect("rank");
    assert!(!results.is_empty() && results.len() <= 3);
    assert_eq!(results[0].chunk.chunk_id, "smart_0");
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score())));
    assert_eq!(results[0].chunk.metadata.file_name.as_deref(), Some("스마트시티.hwp"));
}
