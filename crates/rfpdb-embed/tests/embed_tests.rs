use rfpdb_embed::{cosine, get_default_embedder, HashEmbedder};

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = get_default_embedder(384).expect("embedder");
    let texts = vec!["스마트시티 통합플랫폼".to_string(), "스마트시티 통합플랫폼".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim is 384");
    assert_eq!(embedder.dim(), 384);

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_vocabulary_is_closer() {
    let e = HashEmbedder::new(512).expect("embedder");
    let query = e.embed_text("스마트시티 플랫폼");
    let near = e.embed_text("스마트시티 통합 플랫폼 구축 사업");
    let far = e.embed_text("하천 정비 공사 입찰");
    assert!(cosine(&query, &near) > cosine(&query, &far));
}

#[test]
fn empty_text_and_zero_dim() {
    let e = HashEmbedder::new(16).expect("embedder");
    assert!(e.embed_text("   ").iter().all(|x| *x == 0.0));
    assert!(HashEmbedder::new(0).is_err());
}
