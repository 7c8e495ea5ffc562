use mongopipe::{Cardinality, PopulateError, ReferenceResolver, ReferenceSpec};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn singular_reference_resolves_to_four_wire_stages() {
    let stages = ReferenceResolver::new()
        .resolve(&[ReferenceSpec::new("userId", "users").with_alias("user")]);

    assert_eq!(
        serde_json::to_value(&stages).unwrap(),
        json!([
            {"$addFields": {"metadata.userId": {"$toObjectId": "$metadata.userId"}}},
            {"$lookup": {
                "from": "users",
                "localField": "metadata.userId",
                "foreignField": "_id",
                "as": "metadata.user"
            }},
            {"$addFields": {"metadata.user": {"$cond": {
                "if": {"$eq": [{"$size": "$metadata.user"}, 0]},
                "then": "$$REMOVE",
                "else": {"$arrayElemAt": ["$metadata.user", 0]}
            }}}},
            {"$addFields": {"metadata.userId": {"$cond": {
                "if": {"$eq": ["$metadata.userId", null]},
                "then": "$$REMOVE",
                "else": "$metadata.userId"
            }}}}
        ])
    );
}

#[test]
fn plural_reference_defaults_alias_and_keeps_array() {
    let stages = ReferenceResolver::new().resolve(&[ReferenceSpec::new("documentIds", "documents")]);
    let wire = serde_json::to_value(&stages).unwrap();

    assert_eq!(stages.len(), 4);
    // Array cast over metadata.documentIds, output under metadata.document.
    assert!(wire[0]["$addFields"]["metadata.documentIds"]["$map"].is_object());
    assert_eq!(wire[1]["$lookup"]["as"], "metadata.document");
    assert_eq!(
        wire[2]["$addFields"]["metadata.document"]["$cond"]["else"],
        "$metadata.document"
    );
}

#[test]
fn excluded_fields_produce_a_fifth_redaction_stage() {
    let stages = ReferenceResolver::new().resolve(&[
        ReferenceSpec::new("userId", "users")
            .with_alias("user")
            .with_excluded(["password"]),
    ]);

    assert_eq!(stages.len(), 5);
    assert_eq!(
        serde_json::to_value(&stages[4]).unwrap(),
        json!({"$project": {"metadata.user.password": 0}})
    );
}

#[test]
fn events_metadata_reference_list_resolves_in_spec_order() {
    // Modeled on a real call site: a mix of singular, plural and redacted
    // references over several collections.
    let resolver = ReferenceResolver::new();
    let specs = vec![
        ReferenceSpec::new("certificateId", "complianceCertificates").with_alias("certificate"),
        ReferenceSpec::new("workOrderId", "workOrders").with_alias("workOrder"),
        ReferenceSpec::new("documentIds", "complianceDocuments").with_alias("documents"),
        ReferenceSpec::new("contractorIds", "users")
            .with_alias("contractors")
            .with_excluded(["password"]),
        ReferenceSpec::new("rejectedBy", "users")
            .with_alias("rejectedByUser")
            .with_excluded(["password"]),
    ];

    let stages = resolver.resolve(&specs);
    assert_eq!(stages.len(), 4 + 4 + 4 + 5 + 5);

    let wire = serde_json::to_value(&stages).unwrap();
    // Group boundaries follow input order: each group starts with its cast.
    assert!(wire[0]["$addFields"]["metadata.certificateId"].is_object());
    assert!(wire[4]["$addFields"]["metadata.workOrderId"].is_object());
    assert!(wire[8]["$addFields"]["metadata.documentIds"]["$map"].is_object());
    assert!(wire[12]["$addFields"]["metadata.contractorIds"]["$map"].is_object());
    assert_eq!(
        wire[16]["$project"],
        json!({"metadata.contractors.password": 0})
    );
    assert!(wire[17]["$addFields"]["metadata.rejectedBy"].is_object());
    assert_eq!(
        wire[21]["$project"],
        json!({"metadata.rejectedByUser.password": 0})
    );
}

#[test]
fn resolving_twice_yields_identical_sequences() {
    let resolver = ReferenceResolver::new();
    let specs = vec![
        ReferenceSpec::new("quoteId", "quotes"),
        ReferenceSpec::new("quoteIds", "quotes").with_alias("quotes"),
        ReferenceSpec::new("tenantId", "users")
            .with_alias("tenant")
            .with_excluded(["password"]),
    ];
    assert_eq!(resolver.resolve(&specs), resolver.resolve(&specs));
}

#[test]
fn duplicate_aliases_fail_fast_under_validation() {
    // The unchecked path logs a warning instead; capture it under the test
    // logger so the two behaviors stay distinguishable.
    let _ = env_logger::builder().is_test(true).try_init();
    let specs = vec![
        ReferenceSpec::new("userId", "users"),
        ReferenceSpec::new("userIds", "users").with_alias("user"),
    ];
    let err = ReferenceResolver::new().try_resolve(&specs).unwrap_err();
    assert_eq!(
        err,
        PopulateError::DuplicateAlias {
            alias: "user".to_string()
        }
    );
    assert_eq!(
        err.to_string(),
        "duplicate output alias `user` across reference specs"
    );

    // The unchecked entry point warns but still synthesizes both groups.
    assert_eq!(ReferenceResolver::new().resolve(&specs).len(), 8);
}

#[test]
fn explicit_cardinality_beats_naming_convention() {
    // `assignees` has no Ids suffix; the explicit tag makes it plural anyway.
    let spec = ReferenceSpec::new("assignees", "users")
        .with_alias("assignedUsers")
        .with_cardinality(Cardinality::Many);
    let stages = ReferenceResolver::new().resolve(std::slice::from_ref(&spec));
    let wire = serde_json::to_value(&stages).unwrap();

    assert!(wire[0]["$addFields"]["metadata.assignees"]["$map"].is_object());
    assert_eq!(
        wire[2]["$addFields"]["metadata.assignedUsers"]["$cond"]["else"],
        "$metadata.assignedUsers"
    );
}

#[test]
fn namespace_is_injected_not_ambient() {
    let stages =
        ReferenceResolver::with_namespace("context").resolve(&[ReferenceSpec::new("unitId", "units")]);
    let wire = serde_json::to_value(&stages).unwrap();
    assert_eq!(wire[1]["$lookup"]["localField"], "context.unitId");
    assert_eq!(wire[1]["$lookup"]["as"], "context.unit");
}
