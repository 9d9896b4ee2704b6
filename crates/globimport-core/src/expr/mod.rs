//! Anchored expression parser.
//!
//! Parses exactly one expression starting at a byte offset into a larger
//! source text. This is enough to read a glob-import call and its literal
//! arguments without parsing the whole module.

pub mod ast;
mod lexer;
mod parser;
pub mod span;
pub mod token;

pub use ast::*;
pub use parser::{ParseError, ParseErrorKind};
pub use span::Span;

/// Parse one left-hand-side expression (member accesses and calls included)
/// beginning at `offset`. Spans are byte offsets into `source`.
pub fn parse_expression_at(source: &str, offset: usize) -> Result<Expr, ParseError> {
    parser::Parser::new_at(source, offset)?.parse_left_hand_side()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(expr: Expr) -> CallExpr {
        match expr {
            Expr::Call(call) => *call,
            other => panic!("expected call, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_parse_glob_call_at_offset() {
        let source = "const mods = import.meta.glob('./mods/*.ts', { eager: true });\n";
        let offset = source.find("import").unwrap();

        let expr = parse_expression_at(source, offset).unwrap();
        let span = expr.span();
        assert_eq!(&source[span.range()], "import.meta.glob('./mods/*.ts', { eager: true })");

        let call = call(expr);
        assert_eq!(call.arguments.len(), 2);
        match &call.callee {
            Callee::Expr(Expr::Member(member)) => {
                assert_eq!(member.property, MemberProp::Ident("glob".to_string()));
                assert!(matches!(member.object, Expr::MetaProperty(_)));
            }
            other => panic!("unexpected callee {other:?}"),
        }
    }

    #[test]
    fn test_parse_stops_after_expression() {
        let source = "import.meta.glob('./a/*.js')\nfoo(1, 2)";
        let expr = parse_expression_at(source, 0).unwrap();
        assert_eq!(expr.span().end as usize, source.find('\n').unwrap());
    }

    #[test]
    fn test_parse_type_argument() {
        let source = "import.meta.glob<Module>('./a/*.ts')";
        let call = call(parse_expression_at(source, 0).unwrap());
        assert_eq!(call.type_args.as_deref(), Some("Module"));
        assert_eq!(call.span.end as usize, source.len());
    }

    #[test]
    fn test_parse_arguments_shapes() {
        let source = r#"f(['./a', , ...rest], { as: 'raw', [k]: 1, "q": null, short, ...spread }, `x${y}`, a ? b : -c, x ?? y + 1 * 2)"#;
        let call = call(parse_expression_at(source, 0).unwrap());
        assert_eq!(call.arguments.len(), 5);

        let Argument::Expr(Expr::Array(array)) = &call.arguments[0] else {
            panic!("expected array");
        };
        assert_eq!(array.elements.len(), 3);
        assert!(array.elements[1].is_none());
        assert!(matches!(array.elements[2], Some(ArrayElement::Spread(_))));

        let Argument::Expr(Expr::Object(object)) = &call.arguments[1] else {
            panic!("expected object");
        };
        assert_eq!(object.members.len(), 5);
        assert!(matches!(
            &object.members[1],
            ObjectMember::Property { key: PropKey::Computed(_), .. }
        ));
        assert!(matches!(
            &object.members[3],
            ObjectMember::Property { shorthand: true, .. }
        ));
        assert!(matches!(&object.members[4], ObjectMember::Spread(_)));

        let Argument::Expr(template) = &call.arguments[2] else {
            panic!("expected template");
        };
        assert_eq!(template.kind_name(), "TemplateLiteral");

        let Argument::Expr(conditional) = &call.arguments[3] else {
            panic!("expected conditional");
        };
        assert_eq!(conditional.kind_name(), "ConditionalExpression");

        let Argument::Expr(logical) = &call.arguments[4] else {
            panic!("expected logical");
        };
        assert_eq!(logical.kind_name(), "LogicalExpression");
    }

    #[test]
    fn test_non_call_expression() {
        let expr = parse_expression_at("import.meta.glob.length", 0).unwrap();
        assert_eq!(expr.kind_name(), "MemberExpression");

        let expr = parse_expression_at("import('./x.js')", 0).unwrap();
        assert_eq!(expr.kind_name(), "ImportExpression");
    }

    #[test]
    fn test_unterminated_string_reported() {
        let source = "'import.meta.glob(\"./x\n";
        let offset = source.find("import").unwrap();
        let err = parse_expression_at(source, offset).unwrap_err();
        assert!(err.is_unterminated_string());
        assert_eq!(err.message, "Unterminated string constant");
    }

    #[test]
    fn test_unexpected_token() {
        let err = parse_expression_at("import.meta.glob(,)", 0).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
        assert_eq!(err.span.start, 17);

        let err = parse_expression_at("import.meta.glob('./a'", 0).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
    }
}
