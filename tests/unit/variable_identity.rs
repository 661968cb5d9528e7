//! Content-derived variable identifiers.

use serde_json::json;
use std::collections::{BTreeMap, HashSet};

use ssify::variables::{Arg, ExpectType, Variable, ssi_expect};

fn corpus() -> Vec<Variable> {
    vec![
        Variable::new("tags.count"),
        Variable::new("tags.counts"),
        Variable::new("tags.pick").kwarg("limit", 3i64),
        Variable::new("tags.pick").kwarg("limit", 4i64),
        Variable::new("tags.pick").kwarg("limit", "3"),
        Variable::new("tags.pick").kwarg("max", 3i64),
        Variable::new("tags.pick").arg(3i64),
        Variable::new("tags.pair").arg(1i64).arg(2i64),
        Variable::new("tags.pair").arg(2i64).arg(1i64),
        Variable::new("tags.pair").arg(json!([1, 2])),
        Variable::new("tags.flag").arg(true),
        Variable::new("tags.flag").arg(1i64),
        Variable::new("tags.flag").arg(1.0f64),
        Variable::new("tags.nested").arg(Variable::new("tags.count")),
        Variable::new("tags.nested").arg(Arg::Value(json!({"x": 1}))),
    ]
}

#[test]
fn identifiers_are_stable_and_distinct() {
    let first = corpus().iter().map(|v| v.identifier().to_string()).collect::<Vec<_>>();
    let second = corpus().iter().map(|v| v.identifier().to_string()).collect::<Vec<_>>();
    assert_eq!(first, second);

    let unique = first.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), first.len());
    for id in &first {
        assert!(id.starts_with('v'));
        assert_eq!(id.len(), 33);
        assert!(id[1..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

#[test]
fn empty_arguments_hash_like_omitted_arguments() {
    let omitted = Variable::new("tags.count");
    let explicit = Variable::from_parts("tags.count", Vec::new(), BTreeMap::new());
    let from_short = Variable::from_definition(json!(["tags.count"])).unwrap();
    let from_long = Variable::from_definition(json!(["tags.count", [], {}])).unwrap();

    for other in [&explicit, &from_short, &from_long] {
        assert_eq!(other.identifier(), omitted.identifier());
    }
}

#[test]
fn named_argument_order_does_not_matter() {
    let ab = Variable::new("tags.range").kwarg("a", 1i64).kwarg("b", 2i64);
    let ba = Variable::new("tags.range").kwarg("b", 2i64).kwarg("a", 1i64);
    assert_eq!(ab.identifier(), ba.identifier());
}

#[test]
fn expectation_changes_identity_until_substituted() {
    let count = Variable::new("tags.count");
    let pending = Variable::new("tags.pick")
        .kwarg("limit", ssi_expect(count.clone(), ExpectType::Int).unwrap());
    let concrete = Variable::new("tags.pick").kwarg("limit", 4i64);

    assert_ne!(pending.identifier(), concrete.identifier());
    assert_eq!(ssi_expect("4", ExpectType::Int).unwrap(), Arg::from(4i64));
    let substituted =
        Variable::new("tags.pick").kwarg("limit", ssi_expect("4", ExpectType::Int).unwrap());
    assert_eq!(substituted.identifier(), concrete.identifier());
}
