//! End-to-end tests over the public API.
//!
//! These drive the full flows with in-memory stores and mocks:
//! 1. Crawl a site, index it, ask a question, partition the answer
//! 2. Archive questions and mine popular ones

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use handbook::{
    testing::{FixedClock, MockChatModel, MockEmbedder, MockFetcher},
    AskRequest, ConversationEngine, ConversationStore, CrawlConfig, CrawlTarget, Crawler, DocumentIndex,
    Indexer, MemoryConversationStore, MemoryVectorStore, ModelReply, QuestionArchive, QuestionMiner, Role,
    ToolCall,
};

fn ontario_site() -> MockFetcher {
    MockFetcher::new()
        .with_html(
            "https://www.ontario.ca/esa",
            r#"<html><head><title>Employment Standards</title></head>
               <body><nav>Menu</nav>
               <p>Most employees are entitled to overtime pay after 44 hours of work in a week.</p>
               <a href="/esa/vacation">Vacation</a>
               <a href="/fr/esa">Français</a>
               <footer>Contact</footer></body></html>"#,
        )
        .with_html(
            "https://www.ontario.ca/esa/vacation",
            "<p>Employees earn at least two weeks of vacation after each 12-month period.</p>",
        )
}

#[tokio::test]
async fn test_crawl_index_and_ask() {
    let index = DocumentIndex::new(MemoryVectorStore::new(), MockEmbedder::new());

    // Public guidance for Ontario.
    let crawler = Crawler::new(ontario_site(), CrawlConfig::default());
    let chunks = crawler
        .crawl("https://www.ontario.ca/esa", &CrawlTarget::new("Ontario", "www.ontario.ca"))
        .await;
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| !c.content.contains("Menu")));
    assert_eq!(crawler.fetcher().calls_for("https://www.ontario.ca/fr/esa"), 0);

    let report = Indexer::new(&index).upsert("Ontario", &chunks).await;
    assert_eq!(report.indexed, 2);

    // Company policy for Acme.
    let acme = Crawler::new(
        MockFetcher::new().with_html("https://acme.example/handbook", "<p>Acme pays overtime after 40 hours.</p>"),
        CrawlConfig::default(),
    );
    let acme_chunks = acme
        .crawl(
            "https://acme.example/handbook",
            &CrawlTarget::new("Acme", "acme.example").with_company("Acme"),
        )
        .await;
    Indexer::new(&index).upsert("Acme", &acme_chunks).await;

    let model = MockChatModel::new()
        .with_reply(ModelReply::tool_call(ToolCall::new(
            "call_1",
            "retrieve",
            json!({"query": "overtime", "province": "Ontario", "company": "Acme"}),
        )))
        .with_reply(ModelReply::text(
            "**public-doc**:\nBased on the applicable law, overtime starts after 44 hours.\n[Found: Yes]\n\n\
             **company-doc**:\nAccording to Acme's internal policy, overtime starts after 40 hours.\n[Found: Yes]",
        ));
    let engine = ConversationEngine::new(model, index, MemoryConversationStore::new());

    let request = AskRequest::new("When does overtime start?", "Ontario")
        .with_company("Acme")
        .with_thread("thread-1");
    let answer = engine.ask(&request).await.unwrap();

    assert!(answer.public_found);
    assert!(answer.private_found);
    assert_eq!(
        answer.private_response,
        "According to Acme's internal policy, overtime starts after 40 hours."
    );
    assert_eq!(answer.public_metadata.len(), 2);
    assert!(answer.public_metadata.iter().all(|m| m.kind == "html"));
    assert_eq!(answer.private_metadata.len(), 1);
    assert_eq!(answer.private_metadata[0].source, "https://acme.example/handbook");

    // The decide step saw the framed question.
    let first = &engine.model().calls()[0];
    assert!(first.with_tools);
    assert!(first.messages[0].content.starts_with("question: When does overtime start?."));

    let thread = engine.history().get("thread-1").await.unwrap();
    let roles: Vec<Role> = thread.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::Human, Role::Ai, Role::Tool, Role::Ai]);
}

#[tokio::test]
async fn test_unsectioned_answer_degrades() {
    let index = DocumentIndex::new(MemoryVectorStore::new(), MockEmbedder::new());
    let model = MockChatModel::new().with_reply(ModelReply::text("Hi! Ask me about your workplace rights."));
    let engine = ConversationEngine::new(model, index, MemoryConversationStore::new());

    let answer = engine.ask(&AskRequest::new("hello", "Ontario")).await.unwrap();
    assert_eq!(answer.public_response, "Hi! Ask me about your workplace rights.");
    assert_eq!(answer.private_response, answer.public_response);
    assert!(!answer.public_found && !answer.private_found);
    assert!(answer.public_metadata.is_empty());
}

#[tokio::test]
async fn test_archive_and_mine_popular_questions() {
    let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
    let clock = FixedClock::new(now - Duration::days(8));
    let store = MemoryVectorStore::new();

    let questions = [
        ("How is overtime calculated?", vec![0.0, 0.0]),
        ("When does overtime pay start?", vec![0.1, 0.0]),
        ("How much vacation do I get?", vec![10.0, 10.0]),
        ("Can I take sick days unpaid?", vec![-10.0, 10.0]),
    ];
    let mut embedder = MockEmbedder::new().with_embedding("Is severance taxable?", vec![5.0, 5.0]);
    for (text, embedding) in &questions {
        embedder = embedder.with_embedding(*text, embedding.clone());
    }

    let model = MockChatModel::new().with_reply(ModelReply::text("Is severance taxable?"));
    for (text, _) in &questions {
        model.push_reply(ModelReply::text(*text));
    }

    let archive = QuestionArchive::new(&model, &embedder, &store, &clock);

    // Outside the 7-day window once the clock moves on.
    archive.archive("is my severance taxable??", "Alberta", "").await.unwrap();

    clock.set(now);
    for (text, _) in &questions {
        let stored = archive.archive(text, "Ontario", "").await.unwrap();
        assert!(stored.is_some());
    }

    let popular = QuestionMiner::new(&store, &clock).mine().await.unwrap();
    assert_eq!(popular.len(), 3);
    assert!(popular.iter().all(|p| p.province == "Ontario" && p.company.is_empty()));

    let texts: Vec<&str> = popular.iter().map(|p| p.text.as_str()).collect();
    assert!(texts.contains(&"How much vacation do I get?"));
    assert!(texts.contains(&"Can I take sick days unpaid?"));
}
