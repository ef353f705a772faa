use rstest::{fixture, rstest};
use std::collections::HashSet;
use xmlquery::xpath::{evaluate_value, Value};
use xmlquery::{Document, Expression, NodeId};

/// Pre-order ids of every element under the document element
fn preorder(doc: &Document) -> Vec<NodeId> {
    fn walk(doc: &Document, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for child in doc.node(id).unwrap().element_children() {
            walk(doc, child.id(), out);
        }
    }
    let mut out = Vec::new();
    walk(doc, doc.document_element().unwrap(), &mut out);
    out
}

#[fixture]
fn nested() -> Document {
    Document::parse(
        r#"<a x="1">
             <a x="2"><b x="3"/><a x="4"><b x="5"/></a></a>
             <b x="6"><a x="7"/></b>
             <c x="zz"/>
           </a>"#,
    )
    .unwrap()
}

#[rstest]
#[case("//a")]
#[case("//b")]
#[case("//*")]
#[case("//a//b")]
#[case("//b/..")]
#[case("//a | //b")]
#[case("//b | //a | //a/b")]
#[case("//*[@x > 2]/..")]
fn results_in_document_order_without_duplicates(nested: Document, #[case] expr: &str) {
    let found = nested.select(expr).unwrap();
    let ids = found.ids();

    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicates in {}", expr);

    let order = preorder(&nested);
    let ranks: Vec<_> = ids
        .iter()
        .map(|id| order.iter().position(|o| o == id).unwrap())
        .collect();
    assert!(ranks.windows(2).all(|w| w[0] < w[1]), "order of {}", expr);
}

#[rstest]
#[case("//a")]
#[case("//b[@x]")]
#[case("//*[position() = 1]")]
fn union_with_itself_is_idempotent(nested: Document, #[case] path: &str) {
    let alone = nested.select(path).unwrap();
    let doubled = nested.select(&format!("{} | {}", path, path)).unwrap();
    assert_eq!(alone.ids(), doubled.ids());
}

#[rstest]
#[case(0.0)]
#[case(2.0)]
#[case(4.5)]
#[case(100.0)]
fn numeric_threshold_only_keeps_numbers_above(nested: Document, #[case] threshold: f64) {
    let found = nested.select(&format!("//*[@x > {}]", threshold)).unwrap();
    for node in found.iter(&nested) {
        let x: f64 = node.attribute("x").unwrap().parse().unwrap();
        assert!(x > threshold);
    }
    let expected = preorder(&nested)
        .into_iter()
        .filter(|&id| {
            nested
                .node(id)
                .and_then(|n| n.attribute("x"))
                .and_then(|x| x.parse::<f64>().ok())
                .is_some_and(|x| x > threshold)
        })
        .count();
    assert_eq!(found.count(), expected);
}

#[rstest]
#[case("1")]
#[case("2")]
#[case("zz")]
#[case("missing")]
fn double_negation_matches_plain_predicate(nested: Document, #[case] v: &str) {
    let plain = nested.select(&format!("//*[@x='{}']", v)).unwrap();
    let doubled = nested.select(&format!("//*[not(not(@x='{}'))]", v)).unwrap();
    assert_eq!(plain.ids(), doubled.ids());
}

#[rstest]
fn multiplication_binds_tighter_than_addition() {
    let doc = Document::parse("<r><n>14</n><n>20</n></r>").unwrap();
    let root = doc.document_element().unwrap();
    let value = evaluate_value(&doc, &[root], &Expression::compile("2+3*4").unwrap()).unwrap();
    assert_eq!(value, Value::Number(14.0));

    let matched = doc.select("n[text()=2+3*4]").unwrap();
    assert_eq!(matched.texts(&doc), [Some("14")]);
}

#[rstest]
fn evaluation_does_not_mutate(nested: Document) {
    let before = nested.to_xml(nested.document_element().unwrap(), &Default::default());
    for expr in ["//a[b]", "//*[contains(name(), 'a')]", "//b/..", "//a | //c"] {
        nested.select(expr).unwrap();
    }
    let after = nested.to_xml(nested.document_element().unwrap(), &Default::default());
    assert_eq!(before, after);
}
