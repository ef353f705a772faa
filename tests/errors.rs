use rstest::rstest;
use xmlquery::xpath::evaluate;
use xmlquery::{
    Document, ElementSpec, EvaluationError, Expression, QueryError, QueryOptions, SyntaxError,
    TreeError,
};

#[rstest]
#[case::unterminated_string("//book[title='XML", 13)]
#[case::unknown_character("//a # b", 4)]
#[case::unmatched_bracket("//a[@b='1'", 10)]
#[case::unmatched_paren("//a[(1 + 2]", 10)]
#[case::missing_operand("//a[@b = ]", 9)]
#[case::unknown_function("//a[upper(@b)]", 4)]
#[case::wrong_arity("//a[contains(@b)]", 4)]
#[case::trailing_token("//a ]", 4)]
fn syntax_errors_report_offsets(#[case] expr: &str, #[case] offset: usize) {
    let err = Expression::compile(expr).unwrap_err();
    assert_eq!(err.offset, offset, "{}: {}", expr, err);
    let rendered = err.caret(expr);
    let caret_line = rendered.lines().nth(1).unwrap();
    assert_eq!(caret_line.find('^'), Some(offset));
}

#[rstest]
fn select_surfaces_syntax_errors() {
    let doc = Document::parse("<r/>").unwrap();
    let err = doc.select("//r[").unwrap_err();
    assert!(matches!(err, QueryError::Syntax(SyntaxError { offset: 4, .. })));
}

#[rstest]
fn depth_limit_is_a_syntax_error() {
    let options = QueryOptions {
        max_depth: 8,
        ..QueryOptions::default()
    };
    let deep = format!("//a[{}1{}]", "not(".repeat(20), ")".repeat(20));
    assert!(Expression::compile_with(&deep, &options).is_err());
    assert!(Expression::compile(&deep).is_ok());
}

#[rstest]
fn inserting_an_ancestor_is_a_cycle() {
    let mut doc = Document::with_root("a");
    let a = doc.document_element().unwrap();
    let b = doc.create_child(a, "b").unwrap();
    let c = doc.create_child(b, ElementSpec::new("c")).unwrap();

    assert_eq!(
        doc.append_child(c, a),
        Err(TreeError::Cycle { parent: c, child: a })
    );
    assert_eq!(
        doc.insert_child(b, 0, b),
        Err(TreeError::Cycle { parent: b, child: b })
    );
    // unchanged
    assert_eq!(doc.select("/a/b/c").unwrap().count(), 1);
}

#[rstest]
fn nodes_from_another_document_are_rejected() {
    let small = Document::parse("<r/>").unwrap();
    let mut big = Document::parse("<r><a/><b/><c/></r>").unwrap();
    let foreign = big.select("//c").unwrap().ids()[0];

    assert!(small.node(foreign).is_none());
    let expr = Expression::compile("//r").unwrap();
    assert!(matches!(
        evaluate(&small, &[foreign], &expr),
        Err(EvaluationError::InvalidRoot(_))
    ));

    let mut small = small;
    assert_eq!(
        small.set_text(foreign, "x"),
        Err(TreeError::UnknownNode(foreign))
    );
    // detaching twice is a no-op
    big.remove(foreign).unwrap();
    big.remove(foreign).unwrap();
    assert_eq!(big.select("//c").unwrap().count(), 0);
}

#[rstest]
fn type_mismatches_are_not_errors() {
    let doc = Document::parse(r#"<r><a v="x">y</a></r>"#).unwrap();
    for expr in [
        "//a[@v > 1]",
        "//a[@v + 1 = 2]",
        "//a[text() < 'z']",
        "//a[@missing = 'x']",
        "//a[contains(@missing, 'x')]",
    ] {
        assert!(doc.select(expr).unwrap().is_empty(), "{}", expr);
    }
}
