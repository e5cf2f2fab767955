use keel_syntax::ast::{BinaryOp, Expression, Literal, Statement, StringPart, UnaryOp};
use keel_syntax::{parse_block_source, parse_expression_source};

fn parse(source: &str) -> Expression {
    let output = parse_expression_source(source, "expr.keel");
    assert!(output.diagnostics.is_empty(), "{}: {:?}", source, output.diagnostics);
    match output.expression {
        Some(expr) => expr,
        None => panic!("Expected expression for {}", source),
    }
}

fn int(expr: &Expression) -> i64 {
    match expr {
        Expression::Literal(Literal::Int(n), _) => *n,
        other => panic!("Expected integer literal, got {:?}", other),
    }
}

fn ident(expr: &Expression) -> &str {
    match expr {
        Expression::Identifier(name, _) => name,
        other => panic!("Expected identifier, got {:?}", other),
    }
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    match parse("1 + 2 * 3") {
        Expression::Binary {
            left,
            op: BinaryOp::Add,
            right,
            ..
        } => {
            assert_eq!(int(&left), 1);
            match *right {
                Expression::Binary {
                    left,
                    op: BinaryOp::Mul,
                    right,
                    ..
                } => {
                    assert_eq!(int(&left), 2);
                    assert_eq!(int(&right), 3);
                }
                other => panic!("Expected multiplication, got {:?}", other),
            }
        }
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_exponent_is_right_associative() {
    match parse("2 ** 3 ** 4") {
        Expression::Binary {
            left,
            op: BinaryOp::Pow,
            right,
            ..
        } => {
            assert_eq!(int(&left), 2);
            match *right {
                Expression::Binary {
                    left,
                    op: BinaryOp::Pow,
                    right,
                    ..
                } => {
                    assert_eq!(int(&left), 3);
                    assert_eq!(int(&right), 4);
                }
                other => panic!("Expected nested power, got {:?}", other),
            }
        }
        other => panic!("Expected power, got {:?}", other),
    }
}

#[test]
fn test_and_binds_tighter_than_or() {
    match parse("a || b && c") {
        Expression::Binary {
            left,
            op: BinaryOp::Or,
            right,
            ..
        } => {
            assert_eq!(ident(&left), "a");
            assert!(matches!(*right, Expression::Binary { op: BinaryOp::And, .. }));
        }
        other => panic!("Expected or, got {:?}", other),
    }
}

#[test]
fn test_subtraction_is_left_associative() {
    match parse("10 - 4 - 3") {
        Expression::Binary {
            left,
            op: BinaryOp::Sub,
            right,
            ..
        } => {
            assert!(matches!(*left, Expression::Binary { op: BinaryOp::Sub, .. }));
            assert_eq!(int(&right), 3);
        }
        other => panic!("Expected subtraction, got {:?}", other),
    }
}

#[test]
fn test_comparison_binds_tighter_than_equality() {
    match parse("a < b == c > d") {
        Expression::Binary {
            left,
            op: BinaryOp::Eq,
            right,
            ..
        } => {
            assert!(matches!(*left, Expression::Binary { op: BinaryOp::Lt, .. }));
            assert!(matches!(*right, Expression::Binary { op: BinaryOp::Gt, .. }));
        }
        other => panic!("Expected equality, got {:?}", other),
    }
}

#[test]
fn test_ternary_is_right_associative() {
    match parse("a ? b : c ? d : e") {
        Expression::Ternary {
            condition,
            else_expr,
            ..
        } => {
            assert_eq!(ident(&condition), "a");
            assert!(matches!(*else_expr, Expression::Ternary { .. }));
        }
        other => panic!("Expected ternary, got {:?}", other),
    }
}

#[test]
fn test_null_coalesce_below_or() {
    match parse("a ?? b || c") {
        Expression::NullCoalesce { left, right, .. } => {
            assert_eq!(ident(&left), "a");
            assert!(matches!(*right, Expression::Binary { op: BinaryOp::Or, .. }));
        }
        other => panic!("Expected null coalesce, got {:?}", other),
    }
}

#[test]
fn test_assignment_is_right_associative() {
    match parse("a = b = 1") {
        Expression::Assign { target, value, .. } => {
            assert_eq!(ident(&target), "a");
            assert!(matches!(*value, Expression::Assign { .. }));
        }
        other => panic!("Expected assignment, got {:?}", other),
    }
}

#[test]
fn test_word_operators_parse_like_symbols() {
    match parse("not a and b") {
        Expression::Binary {
            left,
            op: BinaryOp::And,
            ..
        } => {
            assert!(matches!(*left, Expression::Unary { op: UnaryOp::Not, .. }));
        }
        other => panic!("Expected and, got {:?}", other),
    }
}

#[test]
fn test_namespaced_call() {
    match parse("Math.max(a, 10)") {
        Expression::NamespacedCall {
            namespace,
            function,
            args,
            ..
        } => {
            assert_eq!(namespace, "Math");
            assert_eq!(function, "max");
            assert_eq!(args.len(), 2);
        }
        other => panic!("Expected namespaced call, got {:?}", other),
    }
}

#[test]
fn test_lowercase_namespace_is_namespaced_call() {
    match parse("user.save(true)") {
        Expression::NamespacedCall {
            namespace,
            function,
            args,
            ..
        } => {
            assert_eq!(namespace, "user");
            assert_eq!(function, "save");
            assert_eq!(args.len(), 1);
        }
        other => panic!("Expected namespaced call, got {:?}", other),
    }
}

#[test]
fn test_self_and_chained_receivers_are_method_calls() {
    match parse("self.save()") {
        Expression::MethodCall { receiver, method, .. } => {
            assert!(matches!(*receiver, Expression::SelfRef(_)), "{:?}", receiver);
            assert_eq!(method, "save");
        }
        other => panic!("Expected method call, got {:?}", other),
    }

    match parse("a.b.c()") {
        Expression::MethodCall { receiver, method, .. } => {
            assert_eq!(method, "c");
            assert!(matches!(*receiver, Expression::FieldAccess { ref field, .. } if field == "b"));
        }
        other => panic!("Expected method call, got {:?}", other),
    }
}

#[test]
fn test_postfix_chain() {
    match parse("orders[0].items?.first.price") {
        Expression::FieldAccess { receiver, field, .. } => {
            assert_eq!(field, "price");
            match *receiver {
                Expression::SafeNavigation { receiver, field, .. } => {
                    assert_eq!(field, "first");
                    assert!(matches!(*receiver, Expression::FieldAccess { .. }));
                }
                other => panic!("Expected safe navigation, got {:?}", other),
            }
        }
        other => panic!("Expected field access, got {:?}", other),
    }
}

#[test]
fn test_safe_navigation_never_becomes_method_call() {
    match parse("user?.name()") {
        Expression::Call { callee, args, .. } => {
            assert!(matches!(*callee, Expression::SafeNavigation { .. }));
            assert!(args.is_empty());
        }
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_grouped_callee_is_plain_call() {
    let expr = parse("(handlers.on_save)(record)");
    assert!(matches!(expr, Expression::Call { .. }));

    match parse("count(items)") {
        Expression::Call { callee, .. } => assert_eq!(ident(&callee), "count"),
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_collection_literals() {
    match parse("[1, 2, 3,]") {
        Expression::Array(elements, _) => assert_eq!(elements.len(), 3),
        other => panic!("Expected array, got {:?}", other),
    }
    assert!(matches!(parse("[]"), Expression::Array(ref e, _) if e.is_empty()));
    assert!(matches!(parse("{}"), Expression::Hash(ref e, _) if e.is_empty()));

    match parse("{\n  name: \"keel\",\n  \"version\": 2\n}") {
        Expression::Hash(entries, _) => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].0, "name");
            assert_eq!(entries[1].0, "version");
        }
        other => panic!("Expected hash, got {:?}", other),
    }
}

#[test]
fn test_literals() {
    assert!(matches!(parse("nil"), Expression::Nil(_)));
    assert!(matches!(parse("self"), Expression::SelfRef(_)));
    assert!(matches!(parse("false"), Expression::Literal(Literal::Bool(false), _)));
    assert!(matches!(parse("1.25"), Expression::Literal(Literal::Float(f), _) if f == 1.25));
}

#[test]
fn test_match_expression() {
    let source = "match self.status {\n  \"draft\" => 0,\n  \"published\" => 1\n  \"archived\" => -1\n}";
    match parse(source) {
        Expression::Match { subject, cases, .. } => {
            assert!(matches!(*subject, Expression::FieldAccess { .. }));
            let patterns: Vec<_> = cases.iter().map(|c| c.pattern.as_str()).collect();
            assert_eq!(patterns, vec!["draft", "published", "archived"]);
            assert!(matches!(cases[2].value, Expression::Unary { op: UnaryOp::Negate, .. }));
        }
        other => panic!("Expected match, got {:?}", other),
    }
}

#[test]
fn test_match_requires_string_patterns() {
    let output = parse_expression_source("match x { 1 => 2 }", "expr.keel");

    assert!(output.expression.is_none());
    assert_eq!(output.diagnostics.len(), 1);
}

#[test]
fn test_if_expression() {
    match parse("if a > 1 { \"big\" } elsif a > 0 { \"small\" } else { \"none\" }") {
        Expression::If(conditional) => {
            assert_eq!(conditional.elsif_branches.len(), 1);
            assert_eq!(conditional.then_body.len(), 1);
            assert!(conditional.else_body.is_some());
        }
        other => panic!("Expected if expression, got {:?}", other),
    }
}

#[test]
fn test_unless_expression_in_assignment() {
    let output = parse_block_source("let label = unless hidden { name } else { \"\" }", "b.keel");

    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    match &output.statements[0] {
        Statement::Let { value, .. } => assert!(matches!(value, Expression::Unless(_))),
        other => panic!("Expected let, got {:?}", other),
    }
}

#[test]
fn test_interpolated_string() {
    match parse("\"#{first} #{last}\"") {
        Expression::InterpolatedString { parts, .. } => {
            assert_eq!(parts.len(), 3);
            assert!(matches!(&parts[1], StringPart::Literal(s) if s == " "));
        }
        other => panic!("Expected interpolated string, got {:?}", other),
    }
}

#[test]
fn test_multiline_arguments() {
    match parse("Audit.record(\n  self,\n  \"created\",\n)") {
        Expression::NamespacedCall { args, .. } => assert_eq!(args.len(), 2),
        other => panic!("Expected namespaced call, got {:?}", other),
    }
}

#[test]
fn test_missing_operand_is_reported() {
    let output = parse_expression_source("1 +", "expr.keel");

    assert!(output.expression.is_none());
    assert_eq!(output.diagnostics.len(), 1);
}

#[test]
fn test_expression_spans() {
    let expr = parse("total + 1");
    let span = expr.span();

    assert_eq!(span.col, 1);
    assert_eq!(span.start, 0);
    assert_eq!(span.end, 9);
}
