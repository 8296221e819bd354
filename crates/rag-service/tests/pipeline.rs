mod common;

use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;

use common::{memory_store, FakeLlm};
use rag_service::providers::VectorStoreProvider;
use rag_service::{
    AllocationParser, AnswerGenerator, HybridRetriever, IngestPipeline, QueryFilter, RetrievalPath,
    StreamMode,
};

const LI_Q1: &str = "Li at 2024-Q1 allocated 60% to Apollo, 40% to Orion";

fn corpus() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("allocations.txt"),
        format!(
            "{}\n\nWang at 2024-Q1 allocated 100% to Atlas\n\nLi at 2024-Q2 allocated 100% to Orion\n",
            LI_Q1
        ),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("notes.md"),
        "# Planning\n\nApollo launch review moved to Friday\n",
    )
    .unwrap();
    dir
}

async fn collect(stream: rag_service::generation::FramedStream) -> String {
    let parts: Vec<rag_service::Result<Bytes>> = stream.collect().await;
    parts
        .into_iter()
        .map(|p| String::from_utf8(p.unwrap().to_vec()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_li_scenario_end_to_end() {
    let dir = corpus();
    let store = memory_store();
    let pipeline = IngestPipeline::new(store.clone(), dir.path());

    let report = pipeline.ingest_corpus().await.unwrap();
    assert_eq!(report.documents_added, 5);
    assert_eq!(report.documents_structured, 3);

    let llm = FakeLlm::new(
        Some(r#"{"entity": "Li", "period": "2024-Q1", "project": ""}"#),
        &["Li split ", "2024-Q1 between Apollo and Orion."],
    );

    let retriever = HybridRetriever::new(llm.clone(), store.clone());
    let retrieval = retriever.retrieve("What did Li work on in 2024-Q1?", 5).await.unwrap();
    assert_eq!(retrieval.path, RetrievalPath::Filtered);
    assert_eq!(retrieval.result.len(), 1);
    assert_eq!(retrieval.result.hits()[0].document, LI_Q1);

    let generator = AnswerGenerator::new(llm.clone(), store, 5);
    let body = collect(
        generator
            .answer("What did Li work on in 2024-Q1?", None, StreamMode::Sse)
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(
        body,
        "data: Li split \n\ndata: 2024-Q1 between Apollo and Orion.\n\n"
    );

    let prompt = llm.last_prompt().unwrap();
    assert!(prompt.contains("Entity: Li"));
    assert!(prompt.contains("Period: 2024-Q1"));
    assert!(prompt.contains("- Apollo: 60%"));
    assert!(prompt.contains("- Orion: 40%"));
    assert!(!prompt.contains("Atlas"));
}

#[tokio::test]
async fn test_unmatched_filter_falls_back_to_unfiltered_result() {
    let dir = corpus();
    let store = memory_store();
    IngestPipeline::new(store.clone(), dir.path())
        .ingest_corpus()
        .await
        .unwrap();

    let llm = FakeLlm::new(Some(r#"{"entity": "Nobody", "period": "1999", "project": "Ghost"}"#), &[]);
    let retriever = HybridRetriever::new(llm.clone(), store.clone());

    for k in [1, 3, 10] {
        let query = "Apollo launch review";
        let retrieval = retriever.retrieve(query, k).await.unwrap();
        let unfiltered = store.query(query, k, None).await.unwrap();
        assert_eq!(retrieval.path, RetrievalPath::Semantic);
        assert_eq!(retrieval.result, unfiltered);
    }
    assert_eq!(llm.complete_calls(), 3);
}

#[tokio::test]
async fn test_filtered_hits_satisfy_every_field() {
    let dir = corpus();
    let store = memory_store();
    IngestPipeline::new(store.clone(), dir.path())
        .ingest_corpus()
        .await
        .unwrap();

    let filters = [
        QueryFilter::new(Some("Li".into()), None, None),
        QueryFilter::new(None, Some("2024-Q1".into()), None),
        QueryFilter::new(None, None, Some("Orion".into())),
        QueryFilter::new(Some("Li".into()), Some("2024-Q2".into()), Some("Orion".into())),
    ];
    for filter in &filters {
        let result = store.query("allocation", 10, Some(filter)).await.unwrap();
        assert!(!result.is_empty(), "no hits for {:?}", filter);
        assert!(result.iter().all(|hit| filter.matches(&hit.metadata)));
    }

    let empty = QueryFilter::default();
    assert_eq!(
        store.query("Apollo", 3, Some(&empty)).await.unwrap(),
        store.query("Apollo", 3, None).await.unwrap()
    );
}

#[tokio::test]
async fn test_blank_queries_never_reach_the_model() {
    let llm = FakeLlm::new(Some("{}"), &["should not appear"]);
    let generator = AnswerGenerator::new(llm.clone(), memory_store(), 5);

    for mode in [StreamMode::Plain, StreamMode::Sse] {
        for query in ["", "   "] {
            let body = collect(generator.answer(query, None, mode).await.unwrap()).await;
            assert!(body.is_empty());
        }
    }
    assert_eq!(llm.complete_calls(), 0);
    assert_eq!(llm.stream_calls(), 0);
}

#[tokio::test]
async fn test_extraction_failure_still_answers() {
    let dir = corpus();
    let store = memory_store();
    IngestPipeline::new(store.clone(), dir.path())
        .ingest_corpus()
        .await
        .unwrap();

    let llm = FakeLlm::new(None, &["ok"]);
    let generator = AnswerGenerator::new(llm.clone(), store, 2);
    let body = collect(generator.answer("Apollo?", None, StreamMode::Plain).await.unwrap()).await;

    assert_eq!(body, "ok");
    assert_eq!(llm.complete_calls(), 1);
    assert!(!llm.last_prompt().unwrap().contains("Entity:"));
}

#[test]
fn test_parser_order_and_primary_projects() {
    let parser = AllocationParser::new();
    let cases = [
        ("Li", "2024-Q1", [("Apollo", "60"), ("Orion", "40")]),
        ("Wang", "H2", [("Atlas", "5"), ("Zephyr Core", "95")]),
        ("Ops-Team", "2023", [("B", "50"), ("A", "50")]),
    ];

    for (entity, period, [(a, n1), (b, n2)]) in cases {
        let text = format!("{} at {} allocated {}% in {}, {}% in {}", entity, period, n1, a, n2, b);
        let parsed = parser.parse(&text).unwrap();
        assert_eq!(parsed.entity, entity);
        assert_eq!(parsed.period, period);

        let projects: Vec<_> = parsed.allocations.iter().map(|r| r.project.as_str()).collect();
        assert_eq!(projects, vec![a, b]);

        let meta = rag_service::DocumentMetadata::with_structure("id", entity, period, parsed.allocations);
        assert_eq!(meta.primary_projects(), Some(format!("{}, {}", a, b).as_str()));
    }
}

#[tokio::test]
async fn test_store_trait_object_is_shared() {
    let store: Arc<dyn VectorStoreProvider> = memory_store();
    let dir = corpus();
    IngestPipeline::new(Arc::clone(&store), dir.path())
        .ingest_corpus()
        .await
        .unwrap();
    assert_eq!(store.count().await.unwrap(), 5);
}
