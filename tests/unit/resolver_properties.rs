//! Resolution invariants over the public resolver API.

use serde_json::{Value, json};

use ssify::core::SsifyError;
use ssify::directives;
use ssify::resolver::{ResolvedTable, resolve};
use ssify::variables::{ExpectType, Expectation, Variable, VariableSet, ssi_expect};

fn compute(variable: &Variable) -> anyhow::Result<Value> {
    match variable.path() {
        "tags.count" => Ok(json!(4)),
        "tags.pick" => {
            let limit = variable.kwargs()["limit"].as_value().and_then(Value::as_i64);
            Ok(json!(limit.unwrap_or(0) / 2))
        }
        "tags.double" => {
            let value = variable.args()[0].as_value().and_then(Value::as_i64);
            Ok(json!(value.unwrap_or(0) * 2))
        }
        other => anyhow::bail!("unknown {other}"),
    }
}

fn variables() -> Vec<Variable> {
    let count = Variable::new("tags.count");
    let pick = Variable::new("tags.pick")
        .kwarg("limit", ssi_expect(count.clone(), ExpectType::Int).unwrap());
    let double = Variable::new("tags.double").arg(count.clone());
    let double_pick =
        Variable::new("tags.double").arg(ssi_expect(pick.clone(), ExpectType::Int).unwrap());
    vec![count, pick, double, double_pick]
}

fn permutations(items: &[Variable]) -> Vec<Vec<Variable>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn resolution_is_order_independent() {
    let mut results: Vec<ResolvedTable> = Vec::new();
    for order in permutations(&variables()) {
        let set = order.into_iter().collect::<VariableSet>();
        results.push(resolve(&set, compute).unwrap());
    }
    assert_eq!(results.len(), 24);
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn end_to_end_count_and_pick() {
    let vars = variables().into_iter().take(2).collect::<VariableSet>();
    let resolved = resolve(&vars, compute).unwrap();

    let count = Variable::new("tags.count");
    let rehashed = Variable::new("tags.pick").kwarg("limit", 4i64);
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved.get(count.identifier()), Some(&json!(4)));
    assert_eq!(resolved.get(rehashed.identifier()), Some(&json!(2)));

    let text = directives::serialize(&resolved);
    assert_eq!(text.matches(count.identifier()).count(), 1);
    assert_eq!(text.matches(rehashed.identifier()).count(), 1);
    assert_eq!(text.matches("<!--#set ").count(), 2);
}

#[test]
fn mutual_expectations_are_a_cycle() {
    let a = Variable::new("tags.a").arg(Expectation::new("vb")).with_identifier("va");
    let b = Variable::new("tags.b").arg(Expectation::new("va")).with_identifier("vb");
    let vars = [a, b].into_iter().collect::<VariableSet>();

    let err = resolve(&vars, compute).unwrap_err();
    match err.downcast_ref::<SsifyError>() {
        Some(SsifyError::DependencyCycle { cycle, .. }) => assert!(cycle.is_some()),
        other => panic!("expected a dependency cycle, got {other:?}"),
    }
}
