//! End-to-end chain runs over a real SQLite store.
//!
//! Drives `PhaseChain` with a scripted backend and checks that settled
//! conclusions land in the environment and the conclusion store.

mod common;

use colloquy::domain::models::{ChainStep, CycleConfig};
use colloquy::domain::ports::MemoryStore;
use colloquy::services::PhaseChain;
use common::{chain_with, context_with, single, sqlite_store, step, FixedEmbedding, ScriptedBackend};

#[tokio::test]
async fn test_chain_settles_and_persists_conclusion() {
    let (db, store) = sqlite_store().await;
    // Two backend calls per turn: assistant speaks, then the user replies.
    let backend = ScriptedBackend::new(&[
        "We should think about the modality first.",
        "Agreed, keep narrowing it down.",
        "Slides would suit a pitch best.",
        "Lean that way then.",
        "<INFO> PowerPoint",
        "Noted.",
    ]);
    let embedding = FixedEmbedding::new(vec![0.6, 0.8]);
    let context = context_with(backend.clone(), embedding, store.clone());

    let config = chain_with(vec![single(
        "DemandAnalysis",
        "Chief Product Officer",
        "Chief Executive Officer",
    )]);

    let mut chain = PhaseChain::new("Design a product pitch", config, context);
    chain.pre_processing();
    chain.make_recruitment();
    chain.execute_chain().await.expect("chain should complete");
    chain.post_processing().await;

    assert_eq!(backend.calls(), 6);

    let timings = chain.timings();
    assert_eq!(timings.len(), 1);
    assert_eq!(timings[0].phase_name, "DemandAnalysis");
    assert_eq!(timings[0].turns, 3);

    assert_eq!(chain.env().get("modality"), Some("powerpoint"));

    let stored = store.query_recent("DemandAnalysis", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "PowerPoint");
    assert_eq!(stored[0].embedding, vec![0.6, 0.8]);

    db.close().await;
}

#[tokio::test]
async fn test_two_phase_chain_carries_env_forward() {
    let (db, store) = sqlite_store().await;
    let backend = ScriptedBackend::new(&[
        "<INFO> PowerPoint",
        "Noted.",
        "<INFO> Python",
        "Noted.",
    ]);
    let embedding = FixedEmbedding::new(vec![1.0, 0.0]);
    let context = context_with(backend, embedding, store.clone());

    let config = chain_with(vec![
        single(
            "DemandAnalysis",
            "Chief Product Officer",
            "Chief Executive Officer",
        ),
        single(
            "LanguageChoose",
            "Chief Technology Officer",
            "Chief Executive Officer",
        ),
    ]);

    let mut chain = PhaseChain::new("Build slides", config, context);
    chain.pre_processing();
    chain.make_recruitment();
    chain.execute_chain().await.expect("chain should complete");
    chain.post_processing().await;

    assert_eq!(chain.env().get("modality"), Some("powerpoint"));
    assert_eq!(chain.env().get("language"), Some("Python"));

    let demand = store.query_recent("DemandAnalysis", 10).await.unwrap();
    let language = store.query_recent("LanguageChoose", 10).await.unwrap();
    assert_eq!(demand.len(), 1);
    assert_eq!(language.len(), 1);
    assert_eq!(language[0].content, "Python");

    db.close().await;
}

#[tokio::test]
async fn test_review_cycle_breaks_on_finished() {
    let (db, store) = sqlite_store().await;
    // Round one only: the modification phase reports the code finished,
    // which must end the cycle before rounds two and three run.
    let backend = ScriptedBackend::new(&[
        "<INFO> The code lacks docstrings.",
        "Noted.",
        "<INFO> Finished.",
        "Noted.",
    ]);
    let embedding = FixedEmbedding::new(vec![0.0, 1.0]);
    let context = context_with(backend.clone(), embedding, store.clone());

    let config = chain_with(vec![ChainStep::Cycle(CycleConfig {
        name: "CodeReview".to_string(),
        cycles: 3,
        phases: vec![
            step("CodeReviewComment", "Code Reviewer", "Programmer"),
            step("CodeReviewModification", "Programmer", "Code Reviewer"),
        ],
    })]);

    let mut chain = PhaseChain::new("Review the snake game", config, context);
    chain.pre_processing();
    chain.make_recruitment();
    chain.execute_chain().await.expect("chain should complete");
    chain.post_processing().await;

    assert_eq!(backend.calls(), 4, "cycle must settle after one round");
    assert_eq!(chain.timings().len(), 2);

    assert_eq!(
        chain.env().get("review_comments"),
        Some("The code lacks docstrings.")
    );
    // "Finished." carries no fenced block, so codes stays unset.
    assert!(!chain.env().contains("codes"));

    db.close().await;
}

#[tokio::test]
async fn test_turn_limit_falls_back_to_last_assistant_words() {
    let (db, store) = sqlite_store().await;
    let backend = ScriptedBackend::new(&[
        "Maybe a document.",
        "Keep going.",
        "A slide deck, final answer",
        "Fine.",
    ]);
    let embedding = FixedEmbedding::new(vec![0.6, 0.8]);
    let context = context_with(backend.clone(), embedding, store.clone());

    let mut limited = step(
        "DemandAnalysis",
        "Chief Product Officer",
        "Chief Executive Officer",
    );
    limited.turn_limit = Some(2);
    let config = chain_with(vec![ChainStep::Single(limited)]);

    let mut chain = PhaseChain::new("Pick a modality", config, context);
    chain.pre_processing();
    chain.make_recruitment();
    chain.execute_chain().await.expect("chain should complete");
    chain.post_processing().await;

    assert_eq!(backend.calls(), 4);
    assert_eq!(chain.timings()[0].turns, 2);
    // No marker was ever declared; the assistant's final words stand in.
    assert_eq!(
        chain.env().get("modality"),
        Some("a slide deck, final answer")
    );

    let stored = store.query_recent("DemandAnalysis", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "A slide deck, final answer");

    db.close().await;
}
