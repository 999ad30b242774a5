use crate::test_utils::{bindings, collect_sorted, entry, entry_with, UnavailableMetadata};
use rdf_federation_common::{bindings_stream, StaticMetadata};
use rdf_federation_join::{
    JoinAction, JoinAlgorithmRegistry, JoinConfig, JoinMediator, JoinResult, JoinType,
};
use rdf_federation_model::{Cardinality, Metadata, MetadataVariable, Variable};
use std::sync::Arc;

fn mediator(algorithms: &[&str]) -> JoinResult<JoinMediator> {
    Ok(JoinMediator::new(
        JoinAlgorithmRegistry::with_algorithms(algorithms)?,
        JoinConfig::default(),
    ))
}

#[tokio::test]
async fn test_optional_with_empty_right_side_passes_left_through() -> JoinResult<()> {
    for algorithm in ["optional-hash", "optional-nested-loop"] {
        let action = JoinAction::optional(
            entry(vec![bindings(&[("x", 1)])], &["x"]),
            entry(Vec::new(), &["x", "z"]),
        );

        let output = mediator(&[algorithm])?.join(action).await?;

        assert_eq!(
            collect_sorted(output).await?,
            vec![bindings(&[("x", 1)])],
            "{algorithm}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_optional_keeps_every_unmatched_left_binding() -> JoinResult<()> {
    let left = vec![
        bindings(&[("x", 1)]),
        bindings(&[("x", 2)]),
        bindings(&[("x", 2)]),
    ];
    let right = vec![
        bindings(&[("x", 1), ("z", 8)]),
        bindings(&[("x", 1), ("z", 9)]),
    ];

    for algorithm in ["optional-hash", "optional-nested-loop"] {
        let action = JoinAction::optional(
            entry(left.clone(), &["x"]),
            entry(right.clone(), &["x", "z"]),
        );

        let output = mediator(&[algorithm])?.join(action).await?;

        assert_eq!(
            collect_sorted(output).await?,
            vec![
                bindings(&[("x", 1), ("z", 8)]),
                bindings(&[("x", 1), ("z", 9)]),
                bindings(&[("x", 2)]),
                bindings(&[("x", 2)]),
            ],
            "{algorithm}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_optional_marks_right_variables_as_undefinable() -> JoinResult<()> {
    let action = JoinAction::optional(
        entry(vec![bindings(&[("x", 1)])], &["x"]),
        entry(vec![bindings(&[("x", 1), ("z", 1)])], &["x", "z"]),
    );

    let output = JoinMediator::default().join(action).await?;
    let metadata = output.metadata.metadata().await?;

    let z = metadata.variable(&Variable::new_unchecked("z"));
    assert_eq!(
        z,
        Some(&MetadataVariable::undefinable(Variable::new_unchecked("z")))
    );
    assert!(!metadata.cardinality.is_exact());
    Ok(())
}

#[tokio::test]
async fn test_optional_with_undefinable_shared_variable_uses_nested_loop() -> JoinResult<()> {
    let left_metadata = Metadata::new(
        Cardinality::exact(2),
        [
            MetadataVariable::new(Variable::new_unchecked("x")),
            MetadataVariable::undefinable(Variable::new_unchecked("y")),
        ],
    );
    let left = vec![bindings(&[("x", 1)]), bindings(&[("x", 2), ("y", 5)])];
    let right = vec![bindings(&[("y", 5), ("z", 1)])];
    let action = JoinAction::optional(
        entry_with(
            bindings_stream(left),
            Arc::new(StaticMetadata::new(left_metadata)),
            &["x", "y"],
        ),
        entry(right, &["y", "z"]),
    );
    let mediator = JoinMediator::default();

    let explanation = mediator.explain(&action).await;
    let output = mediator.join(action).await?;

    assert_eq!(explanation.selected, Some("optional-nested-loop"));
    assert_eq!(
        collect_sorted(output).await?,
        vec![
            bindings(&[("x", 1), ("y", 5), ("z", 1)]),
            bindings(&[("x", 2), ("y", 5), ("z", 1)]),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_minus_removes_compatible_left_bindings() -> JoinResult<()> {
    let action = JoinAction::minus(
        entry(
            vec![
                bindings(&[("x", 1), ("y", 1)]),
                bindings(&[("x", 2), ("y", 2)]),
            ],
            &["x", "y"],
        ),
        entry(vec![bindings(&[("x", 1)])], &["x"]),
    );

    let output = JoinMediator::default().join(action).await?;

    assert_eq!(
        collect_sorted(output).await?,
        vec![bindings(&[("x", 2), ("y", 2)])]
    );
    Ok(())
}

#[tokio::test]
async fn test_minus_without_shared_variables_keeps_everything() -> JoinResult<()> {
    let left = vec![bindings(&[("x", 1)]), bindings(&[("x", 2)])];
    let action = JoinAction::minus(
        entry(left.clone(), &["x"]),
        entry(vec![bindings(&[("y", 1)])], &["y"]),
    );

    let output = JoinMediator::default().join(action).await?;

    assert_eq!(collect_sorted(output).await?, left);
    Ok(())
}

#[tokio::test]
async fn test_minus_with_unavailable_right_metadata_still_removes_bindings() -> JoinResult<()> {
    let action = JoinAction::minus(
        entry(
            vec![
                bindings(&[("x", 1), ("y", 1)]),
                bindings(&[("x", 2), ("y", 2)]),
            ],
            &["x", "y"],
        ),
        entry_with(
            bindings_stream(vec![bindings(&[("x", 1)])]),
            Arc::new(UnavailableMetadata),
            &["x"],
        ),
    );

    let output = JoinMediator::default().join(action).await?;

    assert_eq!(
        collect_sorted(output).await?,
        vec![bindings(&[("x", 2), ("y", 2)])]
    );
    Ok(())
}

#[tokio::test]
async fn test_minus_without_declared_variables_compares_bindings() -> JoinResult<()> {
    let right_metadata = Metadata::new(Cardinality::exact(2), Vec::<Variable>::new());
    let action = JoinAction::minus(
        entry(vec![bindings(&[("x", 1)]), bindings(&[("x", 2)])], &["x"]),
        entry_with(
            bindings_stream(vec![bindings(&[("x", 2)]), bindings(&[("y", 1)])]),
            Arc::new(StaticMetadata::new(right_metadata)),
            &["x", "y"],
        ),
    );

    let output = JoinMediator::default().join(action).await?;

    assert_eq!(collect_sorted(output).await?, vec![bindings(&[("x", 1)])]);
    Ok(())
}

#[tokio::test]
async fn test_optional_rejects_more_than_two_entries() -> JoinResult<()> {
    let action = JoinAction::new(
        JoinType::Optional,
        vec![
            entry(Vec::new(), &["x"]),
            entry(Vec::new(), &["x"]),
            entry(Vec::new(), &["x"]),
        ],
    );

    let error = JoinMediator::default().join(action).await.unwrap_err();

    insta::assert_snapshot!(error.to_string(), @"No join algorithm can evaluate a optional join over 3 entries (inner-none: does not support optional joins; inner-single: does not support optional joins; inner-multi-empty: does not support optional joins; inner-symmetric-hash: does not support optional joins; inner-hash: does not support optional joins; inner-multi-smallest: does not support optional joins; inner-nested-loop: does not support optional joins; optional-hash: requires exactly two entries; optional-nested-loop: requires exactly two entries; minus-hash: does not support optional joins)");
    Ok(())
}
