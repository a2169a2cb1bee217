//! Forward resolution: resource reference to owning team.

use std::sync::Arc;

use custodia::{
    Config, CustodiaError, GraphError, MemoryGraphStore, NodeClass, RelationKind, ResolutionError,
};

use crate::support::{self, StaticEmbedder};

const E_CHECKOUT: [f32; 4] = [1.0, 0.0, 0.0, 0.0];
const E_PAY: [f32; 4] = [0.0, 1.0, 0.0, 0.0];
const E_TEAM: [f32; 4] = [0.0, 0.0, 1.0, 0.0];
const E_MISC: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[tokio::test]
async fn direct_ownership_resolves_with_path_length_one() {
    let store = Arc::new(MemoryGraphStore::new());
    let alpha = support::team(&store, "alpha");
    let checkout = support::service(&store, "checkout-service");
    support::owns(&store, &alpha, &checkout);
    support::embed_node(&store, &checkout, E_CHECKOUT.to_vec());

    let embedder = StaticEmbedder::with(4, &[("checkout", E_CHECKOUT.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let result = reasoner.find_owner("checkout").await.unwrap();
    assert_eq!(result.owner.id, alpha);
    assert_eq!(result.owner.class, NodeClass::Team);
    assert_eq!(result.owner.label, "Team alpha");
    assert_eq!(result.path.len(), 1);
    assert_eq!(result.path.relations[0].predicate, RelationKind::OwnsDirectly);
    assert_eq!(result.path.relations[0].subject, alpha);
    assert_eq!(result.path.relations[0].object, checkout);
}

#[tokio::test]
async fn ownership_is_inherited_through_containment() {
    let store = Arc::new(MemoryGraphStore::new());
    let beta = support::team(&store, "beta");
    let ep = support::endpoint(&store, "pay-init", "/api/v1/payment/initiate");
    let api = support::service(&store, "payments-api");
    let platform = support::service(&store, "payments-platform");
    support::part_of(&store, &ep, &api);
    support::part_of(&store, &api, &platform);
    support::owns(&store, &beta, &platform);
    support::embed_node(&store, &ep, E_PAY.to_vec());

    let embedder = StaticEmbedder::with(4, &[("payment initiation", E_PAY.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let result = reasoner.find_owner("payment initiation").await.unwrap();
    assert_eq!(result.owner.id, beta);

    let kinds: Vec<RelationKind> = result
        .path
        .relations
        .iter()
        .map(|r| r.predicate)
        .collect();
    assert_eq!(
        kinds,
        vec![
            RelationKind::PartOf,
            RelationKind::PartOf,
            RelationKind::OwnsDirectly
        ]
    );
}

#[tokio::test]
async fn closest_direct_owner_shadows_a_farther_one() {
    let store = Arc::new(MemoryGraphStore::new());
    let beta = support::team(&store, "beta");
    let gamma = support::team(&store, "gamma");
    let ep = support::endpoint(&store, "pay-init", "/api/v1/payment/initiate");
    let api = support::service(&store, "payments-api");
    let platform = support::service(&store, "payments-platform");
    support::part_of(&store, &ep, &api);
    support::part_of(&store, &api, &platform);
    support::owns(&store, &beta, &platform);
    // The middle container has its own owner: that one must win for the
    // endpoint, not the platform's.
    support::owns(&store, &gamma, &api);
    support::embed_node(&store, &ep, E_PAY.to_vec());

    let embedder = StaticEmbedder::with(4, &[("payment initiation", E_PAY.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let result = reasoner.find_owner("payment initiation").await.unwrap();
    assert_eq!(result.owner.id, gamma);
    assert_eq!(result.path.len(), 2);
    assert_eq!(result.path.relations[0].predicate, RelationKind::PartOf);
    assert_eq!(result.path.relations[1].predicate, RelationKind::OwnsDirectly);
}

#[tokio::test]
async fn unmatched_reference_fails_with_not_found() {
    let store = Arc::new(MemoryGraphStore::new());
    let alpha = support::team(&store, "alpha");
    let checkout = support::service(&store, "checkout-service");
    support::owns(&store, &alpha, &checkout);
    support::embed_node(&store, &checkout, E_CHECKOUT.to_vec());

    let embedder = StaticEmbedder::with(4, &[("checkout", E_CHECKOUT.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let err = reasoner
        .find_owner("totally-unmatched-xyz")
        .await
        .unwrap_err();
    match err {
        CustodiaError::Resolution(ResolutionError::NotFound { reference }) => {
            assert_eq!(reference, "totally-unmatched-xyz");
        }
        other => panic!("expected NotFound, got {other}"),
    }
}

#[tokio::test]
async fn near_tied_candidates_fail_with_ambiguous_reference() {
    let store = Arc::new(MemoryGraphStore::new());
    let alpha = support::team(&store, "alpha");
    let svc_a = support::service(&store, "billing-core");
    let svc_b = support::service(&store, "billing-gateway");
    support::owns(&store, &alpha, &svc_a);
    support::owns(&store, &alpha, &svc_b);
    // Scores 0.91 and 0.90 against the query vector: inside the default
    // 0.05 margin.
    support::embed_node(&store, &svc_a, vec![0.41461, 0.0, 0.0, 0.91]);
    support::embed_node(&store, &svc_b, vec![0.43589, 0.0, 0.0, 0.90]);

    let embedder = StaticEmbedder::with(4, &[("billing", E_MISC.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let err = reasoner.find_owner("billing").await.unwrap_err();
    match err {
        CustodiaError::Resolution(ResolutionError::Ambiguous {
            reference,
            candidates,
        }) => {
            assert_eq!(reference, "billing");
            assert_eq!(candidates.len(), 2);
            assert!(candidates[0].score > candidates[1].score);
        }
        other => panic!("expected Ambiguous, got {other}"),
    }
}

#[tokio::test]
async fn clearly_separated_candidates_are_not_ambiguous() {
    let store = Arc::new(MemoryGraphStore::new());
    let alpha = support::team(&store, "alpha");
    let svc_a = support::service(&store, "billing-core");
    let svc_b = support::service(&store, "billing-gateway");
    support::owns(&store, &alpha, &svc_a);
    support::owns(&store, &alpha, &svc_b);
    // Scores 0.95 and 0.80: a 0.15 gap clears the 0.05 margin.
    support::embed_node(&store, &svc_a, vec![0.31225, 0.0, 0.0, 0.95]);
    support::embed_node(&store, &svc_b, vec![0.6, 0.0, 0.0, 0.8]);

    let embedder = StaticEmbedder::with(4, &[("billing", E_MISC.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let result = reasoner.find_owner("billing").await.unwrap();
    assert_eq!(result.path.relations[0].object, svc_a);
}

#[tokio::test]
async fn containment_cycle_fails_instead_of_looping() {
    let store = Arc::new(MemoryGraphStore::new());
    let svc_a = support::service(&store, "cycle-a");
    let svc_b = support::service(&store, "cycle-b");
    support::part_of(&store, &svc_a, &svc_b);
    support::part_of(&store, &svc_b, &svc_a);
    support::embed_node(&store, &svc_a, E_MISC.to_vec());

    let embedder = StaticEmbedder::with(4, &[("cycle a", E_MISC.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let err = reasoner.find_owner("cycle a").await.unwrap_err();
    assert!(matches!(
        err,
        CustodiaError::Graph(GraphError::CycleDetected(_))
    ));
}

#[tokio::test]
async fn ownerless_chain_fails_with_no_owner_found() {
    let store = Arc::new(MemoryGraphStore::new());
    let ep = support::endpoint(&store, "orphan", "/api/v1/orphan");
    let svc = support::service(&store, "orphan-service");
    support::part_of(&store, &ep, &svc);
    support::embed_node(&store, &ep, E_MISC.to_vec());

    let embedder = StaticEmbedder::with(4, &[("orphan", E_MISC.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let err = reasoner.find_owner("orphan").await.unwrap_err();
    match err {
        CustodiaError::Graph(GraphError::NoOwnerFound {
            reference,
            paths_explored,
        }) => {
            assert_eq!(reference, "orphan");
            assert!(paths_explored >= 1);
        }
        other => panic!("expected NoOwnerFound, got {other}"),
    }
}

#[tokio::test]
async fn resolving_a_team_as_a_resource_is_a_type_mismatch() {
    let store = Arc::new(MemoryGraphStore::new());
    let alpha = support::team(&store, "alpha");
    support::embed_node(&store, &alpha, E_TEAM.to_vec());

    let embedder = StaticEmbedder::with(4, &[("team alpha", E_TEAM.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let err = reasoner.find_owner("team alpha").await.unwrap_err();
    match err {
        CustodiaError::Graph(GraphError::TypeMismatch { actual, .. }) => {
            assert_eq!(actual, Some(NodeClass::Team));
        }
        other => panic!("expected TypeMismatch, got {other}"),
    }
}

#[tokio::test]
async fn multiple_direct_owners_pick_the_lexicographically_smallest() {
    let store = Arc::new(MemoryGraphStore::new());
    let alpha = support::team(&store, "alpha");
    let beta = support::team(&store, "beta");
    let checkout = support::service(&store, "checkout-service");
    support::owns(&store, &beta, &checkout);
    support::owns(&store, &alpha, &checkout);
    support::embed_node(&store, &checkout, E_CHECKOUT.to_vec());

    let embedder = StaticEmbedder::with(4, &[("checkout", E_CHECKOUT.to_vec())]);
    let reasoner = support::reasoner(&store, embedder, &Config::default());

    let result = reasoner.find_owner("checkout").await.unwrap();
    assert_eq!(result.owner.id, alpha);
}

#[tokio::test]
async fn depth_ceiling_bounds_the_outward_walk() {
    let store = Arc::new(MemoryGraphStore::new());
    let delta = support::team(&store, "delta");
    let ep = support::endpoint(&store, "deep", "/api/v1/deep");
    let s1 = support::service(&store, "layer-1");
    let s2 = support::service(&store, "layer-2");
    support::part_of(&store, &ep, &s1);
    support::part_of(&store, &s1, &s2);
    support::owns(&store, &delta, &s2);
    support::embed_node(&store, &ep, E_MISC.to_vec());

    let embedder = StaticEmbedder::with(4, &[("deep", E_MISC.to_vec())]);

    // The full path needs three relations; a ceiling of two cannot reach
    // the owner.
    let mut tight = Config::default();
    tight.traversal.max_depth = 2;
    let reasoner = support::reasoner(&store, embedder.clone(), &tight);
    let err = reasoner.find_owner("deep").await.unwrap_err();
    assert!(matches!(
        err,
        CustodiaError::Graph(GraphError::NoOwnerFound { .. })
    ));

    let mut enough = Config::default();
    enough.traversal.max_depth = 3;
    let reasoner = support::reasoner(&store, embedder, &enough);
    let result = reasoner.find_owner("deep").await.unwrap();
    assert_eq!(result.owner.id, delta);
    assert_eq!(result.path.len(), 3);
}
