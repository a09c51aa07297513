use std::io::{Cursor, Write};

use flate2::write::DeflateEncoder;
use flate2::Compression;

use rfpdb_core::config::{ChunkingConfig, ChunkingSettings};
use rfpdb_core::error::Error;
use rfpdb_core::types::{DocumentFormat, DocumentMetadata, RawDocument};
use rfpdb_ingest::container::MemoryContainer;
use rfpdb_ingest::hwp::{SIGNATURE, TAG_PARA_TEXT};
use rfpdb_ingest::paginated::extract_paginated;
use rfpdb_ingest::{extract, extract_or_empty, CompoundDocumentExtractor, IngestPipeline, PendingDocument};

fn file_header(compressed: bool, encrypted: bool) -> Vec<u8> {
    let mut data = vec![0u8; 256];
    data[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
    let props = u32::from(compressed) | (u32::from(encrypted) << 1);
    data[36..40].copy_from_slice(&props.to_le_bytes());
    data
}

fn para(text: &str) -> Vec<u8> {
    let payload: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let header = u32::from(TAG_PARA_TEXT) | ((payload.len() as u32) << 20);
    let mut out = header.to_le_bytes().to_vec();
    out.extend_from_slice(&payload);
    out
}

fn other_record(tag: u16, len: usize) -> Vec<u8> {
    let header = u32::from(tag) | ((len as u32) << 20);
    let mut out = header.to_le_bytes().to_vec();
    out.extend(std::iter::repeat(0xAB).take(len));
    out
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Build a compound document with the given body sections.
fn build_document(compressed: bool, sections: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut file = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    {
        let mut s = file.create_stream("/FileHeader").unwrap();
        s.write_all(&file_header(compressed, false)).unwrap();
        s.flush().unwrap();
    }
    file.create_storage("/BodyText").unwrap();
    for (name, body) in sections {
        let data = if compressed { deflate(body) } else { body.clone() };
        let mut s = file.create_stream(format!("/BodyText/{}", name)).unwrap();
        s.write_all(&data).unwrap();
        s.flush().unwrap();
    }
    file.flush().unwrap();
    file.into_inner().into_inner()
}

/// A one-page PDF whose content stream selects `/F1` without declaring any
/// page resources.
fn pdf_without_font_resources() -> Vec<u8> {
    let content = "BT /F1 12 Tf 72 712 Td (Tender notice) Tj ET";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
    ];
    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    pdf.extend_from_slice(
        format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n", objects.len() + 1, xref).as_bytes(),
    );
    pdf
}

#[test]
fn sections_are_read_in_numeric_order() {
    let bytes = build_document(
        true,
        &[
            ("Section10", para("셋째 구역")),
            ("Section2", para("둘째 구역")),
            ("Section0", [other_record(66, 24), para("첫째 구역")].concat()),
        ],
    );
    let text = CompoundDocumentExtractor::new().extract_bytes("rfp", &bytes).expect("extract");
    assert_eq!(text.text, "첫째 구역\n둘째 구역\n셋째 구역");
    assert!(text.warnings.is_empty());
}

#[test]
fn scenario_b_truncated_final_record_keeps_prior_text() {
    let mut body = [para("사업 개요"), para("추진 일정")].concat();
    let header = u32::from(TAG_PARA_TEXT) | (400 << 20);
    body.extend_from_slice(&header.to_le_bytes());
    body.extend_from_slice(&[0x41, 0x00, 0x42]);

    for compressed in [false, true] {
        let bytes = build_document(compressed, &[("Section0", body.clone())]);
        let text = CompoundDocumentExtractor::new().extract_bytes("rfp", &bytes).expect("no error");
        assert_eq!(text.text, "사업 개요\n추진 일정");
        assert_eq!(text.warnings.len(), 1);
        assert!(text.warnings[0].contains("truncated"));
    }
}

#[test]
fn corrupt_compressed_section_is_a_decompression_error() {
    let container = MemoryContainer::new()
        .with_stream("FileHeader", file_header(true, false))
        .with_stream("BodyText/Section0", vec![0xff; 32]);
    let err = CompoundDocumentExtractor::new()
        .extract_from("rfp", &mut container.clone())
        .err()
        .expect("error");
    assert!(matches!(err, Error::Decompression(_)));
}

#[test]
fn header_problems_are_format_errors() {
    let mut missing = MemoryContainer::new().with_stream("BodyText/Section0", para("본문"));
    let err = CompoundDocumentExtractor::new().extract_from("a", &mut missing).err().expect("missing header");
    assert!(matches!(err, Error::Format(_)));

    let mut encrypted = MemoryContainer::new()
        .with_stream("FileHeader", file_header(false, true))
        .with_stream("BodyText/Section0", para("본문"));
    let err = CompoundDocumentExtractor::new().extract_from("b", &mut encrypted).err().expect("encrypted");
    assert!(matches!(err, Error::Format(_)));
}

#[test]
fn extract_or_empty_records_failure() {
    let raw = RawDocument::new("broken", DocumentFormat::CompoundBinary, b"not a compound file".to_vec());
    assert!(extract(&raw).is_err());
    let text = extract_or_empty(&raw);
    assert!(text.is_failed());
    assert!(text.text.is_empty());
    assert_eq!(text.doc_id, "broken");
}

#[test]
fn pipeline_isolates_a_corrupt_document() {
    let good = build_document(true, &[("Section0", para(&"스마트시티 통합플랫폼 구축 사업을 추진한다. ".repeat(40)))]);
    let docs = vec![
        PendingDocument::new(
            RawDocument::new("good", DocumentFormat::CompoundBinary, good),
            DocumentMetadata::default().with_file_name("good.hwp"),
        ),
        PendingDocument::new(
            RawDocument::new("bad", DocumentFormat::CompoundBinary, vec![0u8; 64]),
            DocumentMetadata::default(),
        ),
        PendingDocument::new(
            RawDocument::new("memo", DocumentFormat::PlainText, "도로 포장 공사 입찰 안내".as_bytes().to_vec()),
            DocumentMetadata::default(),
        ),
    ];
    let pipeline = IngestPipeline::new(ChunkingSettings::uniform(ChunkingConfig::new(300, 50, 50)), 2).expect("pipeline");
    let report = pipeline.run(docs).expect("run");

    let order: Vec<_> = report.outcomes.iter().map(|o| o.doc_id.as_str()).collect();
    assert_eq!(order, vec!["good", "bad", "memo"]);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(report.fatal().is_none());

    let records = report.into_records();
    assert!(records[0].chunks.len() > 1);
    assert_eq!(records[0].metadata.file_name.as_deref(), Some("good.hwp"));
    assert_eq!(records[1].chunks.len(), 1);
    assert_eq!(records[1].chunks[0].text, "도로 포장 공사 입찰 안내");
}

#[test]
fn zero_workers_is_invalid() {
    assert!(matches!(IngestPipeline::new(ChunkingSettings::default(), 0), Err(Error::InvalidConfig(_))));
}

#[test]
fn malformed_pdf_is_a_format_error() {
    let err = extract_paginated("notice", &pdf_without_font_resources()).err().expect("error");
    assert!(matches!(err, Error::Format(_)));
}

#[test]
fn malformed_pdf_does_not_sink_the_batch() {
    let docs = vec![
        PendingDocument::new(
            RawDocument::new("memo", DocumentFormat::PlainText, "하천 정비 기본 계획 안내".as_bytes().to_vec()),
            DocumentMetadata::default(),
        ),
        PendingDocument::new(
            RawDocument::new("notice", DocumentFormat::Paginated, pdf_without_font_resources()),
            DocumentMetadata::default(),
        ),
    ];
    let pipeline = IngestPipeline::new(ChunkingSettings::default(), 2).expect("pipeline");
    let report = pipeline.run(docs).expect("run");
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(report.fatal().is_none());
    assert!(matches!(report.outcomes[1].result, Err(Error::Format(_))));
}

#[test]
fn extraction_and_chunking_repeat_identically() {
    let bytes = build_document(true, &[("Section0", para(&"교통 데이터 연계 방안을 마련한다. ".repeat(60)))]);
    let pipeline = IngestPipeline::new(ChunkingSettings::uniform(ChunkingConfig::new(300, 50, 50)), 1).expect("pipeline");
    let pending = PendingDocument::new(
        RawDocument::new("traffic", DocumentFormat::CompoundBinary, bytes),
        DocumentMetadata::default(),
    );

    let spans = |pending: &PendingDocument| {
        let record = pipeline.process(pending).expect("process");
        record
            .chunks
            .iter()
            .map(|c| (c.chunk_id.clone(), c.char_offset_start, c.char_offset_end, c.text.clone()))
            .collect::<Vec<_>>()
    };
    let first = spans(&pending);
    assert!(first.len() > 1);
    assert_eq!(first, spans(&pending));
}
