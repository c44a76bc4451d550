//! End-to-end scenarios across the assembled mesh

use std::collections::HashMap;
use std::sync::Arc;
use workflow_mesh::enhancement::EnhancementType;
use workflow_mesh::events::publisher::WorkflowRecord;
use workflow_mesh::performance::models::{PerformanceSample, ResourceUsage};
use workflow_mesh::relationships::models::RelationshipType;
use workflow_mesh::{EventStore, InMemoryEventStore, Mesh, MeshConfig};

fn mesh() -> Mesh {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    Mesh::new(MeshConfig::default(), store)
}

fn sample(execution_time: f64, error_rate: f64) -> PerformanceSample {
    PerformanceSample {
        execution_time,
        success: true,
        error_rate,
        quality_score: 0.95,
        completion_rate: 1.0,
        retry_count: 0,
        resource_usage: ResourceUsage::default(),
        user_satisfaction: None,
        last_executed: chrono::Utc::now(),
    }
}

fn record(workflow_id: &str, capabilities: &[&str], discoverable: bool) -> WorkflowRecord {
    WorkflowRecord {
        workflow_id: workflow_id.to_string(),
        owner_address: "owner-addr".to_string(),
        content: format!("workflow {}", workflow_id),
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        requirements: vec![],
        importance: 0.5,
        discoverable,
        performance: None,
    }
}

#[test]
fn degrading_execution_time_yields_exactly_one_optimization() {
    let mesh = mesh();

    // 1000ms to 2500ms, strictly increasing, error rate fixed at 2%
    for i in 0..10 {
        let time = 1000.0 + (1500.0 / 9.0) * i as f64;
        mesh.tracker.record_performance("wf-1", sample(time, 0.02));
    }

    let found = mesh.tracker.identify_enhancements("wf-1");
    let optimizations: Vec<_> = found
        .iter()
        .filter(|e| e.enhancement_type == EnhancementType::Optimization)
        .collect();
    assert_eq!(optimizations.len(), 1);
    assert!((optimizations[0].impact - 0.3).abs() < f64::EPSILON);
    assert!(!found
        .iter()
        .any(|e| e.enhancement_type == EnhancementType::ErrorHandling));
}

#[test]
fn inheritance_chain_walks_the_graph() {
    let mesh = mesh();
    mesh.relationships.create_relationship(
        "X",
        "Y",
        RelationshipType::Inherits,
        1.0,
        HashMap::new(),
    );
    mesh.relationships.create_relationship(
        "Y",
        "Z",
        RelationshipType::Inherits,
        1.0,
        HashMap::new(),
    );

    let chain = mesh.relationships.get_inheritance_chain("X");
    assert_eq!(chain, vec!["X", "Y", "Z"]);
}

#[test]
fn circular_dependency_detected_only_when_present() {
    let cyclic = mesh();
    for (source, target) in [("A", "B"), ("B", "C"), ("C", "A")] {
        cyclic.relationships.create_relationship(
            source,
            target,
            RelationshipType::DependsOn,
            0.8,
            HashMap::new(),
        );
    }
    assert!(cyclic.relationships.has_circular_dependency("A"));

    let acyclic = mesh();
    for (source, target) in [("A", "B"), ("B", "C")] {
        acyclic.relationships.create_relationship(
            source,
            target,
            RelationshipType::DependsOn,
            0.8,
            HashMap::new(),
        );
    }
    assert!(!acyclic.relationships.has_circular_dependency("A"));
}

#[tokio::test]
async fn capability_query_honors_visibility_tags() {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    let mesh = Mesh::new(MeshConfig::default(), Arc::clone(&store));
    mesh.discovery.register_hub("hub-1");

    mesh.publisher
        .publish_workflow("hub-1", record("wf-visible", &["format-conversion"], true))
        .await
        .unwrap();
    mesh.publisher
        .publish_workflow("hub-1", record("wf-hidden", &["format-conversion"], false))
        .await
        .unwrap();
    mesh.publisher
        .publish_workflow("hub-1", record("wf-other", &["monitoring"], true))
        .await
        .unwrap();

    let found = mesh.discovery.find_by_capability("format-conversion").await;
    let ids: Vec<&str> = found.iter().map(|w| w.workflow_id.as_str()).collect();
    assert_eq!(ids, vec!["wf-visible"]);
}

#[tokio::test]
async fn uninitialized_cycle_returns_idle_report() {
    let mesh = mesh();
    let report = mesh.engine.run_enhancement_cycle("wf-unknown").await;
    assert!(report.enhancements.is_empty());
    assert!(report.applied.is_empty());
    assert!(report.rejected.is_empty());
    assert_eq!(report.next_cycle_in, 86_400_000);
}

#[tokio::test]
async fn full_cycle_feeds_analytics() {
    let mesh = mesh();
    mesh.engine
        .initialize_enhancement_loop("wf-1", vec!["latency".to_string()]);

    for i in 0..10 {
        mesh.tracker
            .record_performance("wf-1", sample(1000.0 + 200.0 * i as f64, 0.02));
    }

    let report = mesh.engine.run_enhancement_cycle("wf-1").await;
    assert!(!report.applied.is_empty());

    let health = mesh.analytics.ecosystem_health();
    assert!(health.enhancement_success_rate > 0.0);
    assert!(health.overall > 0.0);

    // Applied enhancements are visible through the tracker too
    assert!(!mesh.tracker.tracked_workflows().is_empty());
}

#[test]
fn history_cap_evicts_oldest_sample() {
    let mesh = mesh();
    for i in 0..120 {
        mesh.tracker
            .record_performance("wf-1", sample(1000.0 + i as f64, 0.0));
    }

    assert_eq!(mesh.tracker.sample_count("wf-1"), 100);
    let stats = mesh.tracker.get_performance_stats("wf-1");
    let average = stats.average.unwrap();
    // Samples 20..119 survive; their mean excludes the first twenty
    let expected: f64 = (20..120).map(|i| 1000.0 + i as f64).sum::<f64>() / 100.0;
    assert!((average.execution_time - expected).abs() < 1e-6);
}

#[test]
fn same_edge_replaces_instead_of_accumulating() {
    let mesh = mesh();
    mesh.relationships.create_relationship(
        "A",
        "B",
        RelationshipType::Enhances,
        0.4,
        HashMap::new(),
    );
    mesh.relationships.create_relationship(
        "A",
        "B",
        RelationshipType::Enhances,
        0.9,
        HashMap::new(),
    );

    let edges = mesh.relationships.get_relationships("A");
    assert_eq!(edges.len(), 1);
    assert!((edges[0].strength - 0.9).abs() < f64::EPSILON);
}
