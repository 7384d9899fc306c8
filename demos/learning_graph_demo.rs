use learngraph::mastery::ActivityRecord;
use learngraph::ontology::ConceptDefinition;
use learngraph::{EngineConfig, LearningGraph};
use serde_json::{json, Map};

const HOUR: i64 = 3_600_000;

fn concept(name: &str, difficulty: &str, prerequisites: &[&str]) -> ConceptDefinition {
    ConceptDefinition {
        name: name.to_string(),
        difficulty: difficulty.to_string(),
        description: String::new(),
        prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("Learngraph v{}", learngraph::version());
    println!("==========================================");

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let graph = LearningGraph::open(config).await?;

    // 1. Domain ontology
    let summary = graph
        .build_domain_ontology(
            "mathematics",
            &[
                concept("arithmetic", "easy", &[]),
                concept("algebra", "medium", &["arithmetic"]),
                concept("geometry", "medium", &["arithmetic"]),
                concept("calculus", "hard", &["algebra", "geometry"]),
            ],
        )
        .await?;
    println!("\nOntology: {} concepts, {} prerequisites", summary.concepts, summary.prerequisites);
    graph.create_concept_relationship("calculus", "algebra", "RELATED_TO", Some(0.6)).await?;

    // 2. Learners and their activities
    let mut preferences = Map::new();
    preferences.insert("pace".to_string(), json!("steady"));
    graph.create_user_profile("ada", "visual", &preferences).await?;

    let sessions = [
        ("ada", "arithmetic", 0.9, 8),
        ("ada", "arithmetic", 1.0, 9),
        ("ada", "algebra", 0.8, 9),
        ("ada", "calculus", 0.6, 20),
        ("ada", "arithmetic", 1.0, 21),
        ("ada", "arithmetic", 1.0, 22),
        ("ada", "arithmetic", 1.0, 23),
        ("grace", "algebra", 0.7, 10),
        ("grace", "geometry", 0.9, 11),
        ("alan", "arithmetic", 0.5, 14),
    ];
    for (i, (user, concept, performance, hour)) in sessions.into_iter().enumerate() {
        let activity = ActivityRecord {
            concept_id: concept.to_string(),
            activity_type: "exercise".to_string(),
            duration: 20.0,
            performance,
            timestamp: hour * HOUR + i as i64,
        };
        let outcome = graph.track_learning_activity(user, &activity).await?;
        if let Some(update) = outcome.mastery {
            println!(
                "  {:<6} {:<11} mastery {:.3} -> {:.3}{}",
                user,
                concept,
                update.previous,
                update.mastery,
                if update.just_mastered { "  (mastered)" } else { "" }
            );
        }
    }

    // 3. Analytics
    println!("\nLearning paths arithmetic -> calculus for ada:");
    for path in graph.find_learning_path("ada", "arithmetic", "calculus", None, None).await? {
        println!("  {} (score {:.3})", path.concepts.join(" -> "), path.score);
    }

    println!("\nConcept importance in mathematics:");
    for entry in graph.compute_importance("mathematics", None, None).await? {
        println!("  {:<11} {:.4}", entry.concept, entry.importance);
    }

    println!("\nLearners similar to ada:");
    for learner in graph.find_communities("ada", 5).await? {
        println!("  {} ({})", learner.user_id, learner.score);
    }

    println!("\nStudy loops for ada:");
    for cycle in graph.detect_cycles("ada", 5).await? {
        println!("  {} [{}]", cycle.concepts.join(" -> "), serde_json::to_string(&cycle.kind)?);
    }

    println!("\nRecommendations for ada:");
    for rec in graph.get_concept_recommendations("ada", 5).await? {
        println!("  {} ({})", rec.concept, rec.score);
    }

    let patterns = graph.analyze_learning_patterns("ada").await?;
    println!("\nPatterns for ada: {}", serde_json::to_string_pretty(&patterns)?);

    // 4. Query gateway
    let mut bindings = Map::new();
    bindings.insert("user".to_string(), json!("ada"));
    let result = graph
        .execute_query("g.V($user).out('MASTERED').values('name')", &bindings)
        .await?;
    println!("\nMastered by ada: {:?}", result.results);

    match graph.execute_query("g.V().drop()", &Map::new()).await {
        Ok(_) => println!("unexpected: destructive query accepted"),
        Err(e) => println!("Rejected: {}", e),
    }

    graph.close().await?;
    Ok(())
}
