mod common;

use std::sync::Arc;

use common::{corpus, named, record};
use rfpdb_core::config::BoostSettings;
use rfpdb_core::error::Error;
use rfpdb_core::Corpus;
use rfpdb_hybrid::{MetadataBoostedSearch, SearchOptions};

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn scenario_c_file_name_match_ranks_first() {
    let mut records = vec![record(
        "rfp-07",
        named("2024_스마트시티_통합플랫폼_구축.hwp"),
        &["사업 개요 및 추진 배경", "세부 과업 내용과 일정"],
    )];
    for i in 0..9 {
        let text = format!("하천 정비 공사 {}차 설계 용역 안내", i);
        records.push(record(&format!("rfp-{:02}", i + 10), named(&format!("도로정비_{}.hwp", i)), &[text.as_str()]));
    }
    let search = MetadataBoostedSearch::new(corpus(records), BoostSettings::default());

    let results = search.search("스마트시티", 10).expect("search");
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.chunk.doc_id == "rfp-07"), "only the named document matches");
    // file name 2.0 + word in file name 0.5, scaled by 0.1
    assert!(results.iter().all(|r| r.relevance_boost.is_some_and(|b| close(b, 0.25))));
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score())));
}

#[test]
fn metadata_document_outranks_equal_text_matches() {
    let records = vec![
        record("plain", named("공고_A.hwp"), &["스마트시티 사업 설명"]),
        record("named", named("스마트시티_공고.hwp"), &["스마트시티 사업 설명"]),
    ];
    let search = MetadataBoostedSearch::new(corpus(records), BoostSettings::default());
    let results = search.search("스마트시티", 5).expect("search");
    assert_eq!(results.len(), 2);
    // both texts score 1.0; the named document is visited first and keeps its place
    assert_eq!(results[0].chunk.doc_id, "named");
    assert_eq!(results[0].relevance_boost.map(|b| close(b, 0.25)), Some(true));
    assert_eq!(results[1].relevance_boost, None);
}

#[test]
fn scenario_d_fallback_scores_are_penalized() {
    let records = vec![
        record("a", named("a.hwp"), &["스마트시티 데이터 허브 구축"]),
        record("b", named("b.hwp"), &["하천 정비 공사 입찰"]),
        record("c", named("c.hwp"), &["스마트시트 센터 운영"]),
    ];
    let search = MetadataBoostedSearch::new(corpus(records), BoostSettings::default());

    let results = search.search("스마트시티 하천", 5).expect("search");
    let got: Vec<_> = results.iter().map(|r| (r.chunk.chunk_id.as_str(), r.score())).collect();
    assert_eq!(got.len(), 3, "{:?}", got);
    assert_eq!(got[0].0, "a_0");
    assert!(close(got[0].1, 0.7));
    assert_eq!(got[1].0, "b_0");
    assert!(close(got[1].1, 0.7));
    // one substitution in five characters: raw 0.8
    assert_eq!(got[2].0, "c_0");
    assert!(close(got[2].1, 0.8 * 0.7));

    let disabled = SearchOptions { top_k: 5, fallback: Some(false), ..SearchOptions::default() };
    assert!(search.search_with("스마트시티 하천", &disabled).expect("search").is_empty());
    assert!(search.search("하천강", 5).expect("single word never falls back").is_empty());
}

#[test]
fn scenario_e_results_are_not_padded() {
    let records = vec![
        record("a", named("a.hwp"), &["입찰 참가 자격", "제출 서류 목록"]),
        record("b", named("b.hwp"), &["입찰 마감 일정"]),
        record("c", named("c.hwp"), &["기술 평가 기준", "입찰 보증금 안내"]),
        record("d", named("d.hwp"), &["사업 예산 개요"]),
    ];
    let search = MetadataBoostedSearch::new(corpus(records), BoostSettings::default());
    let results = search.search("입찰", 5).expect("search");
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.chunk.text.contains("입찰")));

    let top_two = search.search("입찰", 2).expect("search");
    assert_eq!(top_two.len(), 2);
}

#[test]
fn file_filter_restricts_documents() {
    let records = vec![
        record("a", named("a.hwp"), &["입찰 참가 자격"]),
        record("b", named("b.hwp"), &["입찰 마감 일정"]),
    ];
    let search = MetadataBoostedSearch::new(corpus(records), BoostSettings::default());
    let options = SearchOptions { top_k: 5, file_filter: Some(vec!["b".to_string()]), fallback: None };
    let results = search.search_with("입찰", &options).expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.doc_id, "b");
}

#[test]
fn constants_are_configurable() {
    let records = vec![record("named", named("스마트시티.hwp"), &["스마트시티 개요"])];
    let boost = BoostSettings { metadata_scale: 0.0, ..BoostSettings::default() };
    let search = MetadataBoostedSearch::new(corpus(records), boost);
    let results = search.search("스마트시티", 5).expect("search");
    assert_eq!(results[0].relevance_boost, Some(0.0));
}

#[test]
fn repeated_query_words_boost_each_time() {
    let records = vec![record("named", named("스마트시티.hwp"), &["스마트시티 개요"])];
    let search = MetadataBoostedSearch::new(corpus(records), BoostSettings::default());

    // two word hits in the file name, 0.5 each, scaled by 0.1
    let repeated = search.search("스마트시티 스마트시티", 5).expect("search");
    assert_eq!(repeated.len(), 1);
    assert!(repeated[0].relevance_boost.is_some_and(|b| close(b, 0.1)));

    // full query 2.0 plus one word 0.5
    let single = search.search("스마트시티", 5).expect("search");
    assert!(single[0].relevance_boost.is_some_and(|b| close(b, 0.25)));
}

#[test]
fn loading_corpus_is_not_ready() {
    let search = MetadataBoostedSearch::new(Arc::new(Corpus::new()), BoostSettings::default());
    assert!(matches!(search.search("입찰", 5), Err(Error::NotReady)));
}

#[test]
fn empty_query_or_zero_k_returns_nothing() {
    let search = MetadataBoostedSearch::new(corpus(vec![record("a", named("a.hwp"), &["입찰"])]), BoostSettings::default());
    assert!(search.search("   ", 5).expect("search").is_empty());
    assert!(search.search("입찰", 0).expect("search").is_empty());
}
