use super::*;
use pretty_assertions::assert_eq;

fn eval_with(src: &str, vars: &[(&str, Val)]) -> Result<Val, EvalError> {
    let resolve = |name: &str| vars.iter().position(|(var, _)| *var == name);
    let expr = parse_expr(src, &resolve).unwrap();
    let slots: Vec<_> = vars.iter().map(|(_, val)| Some(val.clone())).collect();
    expr.eval(&Func::new("f"), &slots)
}

fn eval(src: &str) -> Val {
    eval_with(src, &[]).unwrap()
}

#[test]
fn follows_go_precedence() {
    assert_eq!(Val::Int(7), eval("1 + 2 * 3"));
    assert_eq!(Val::Int(9), eval("(1 + 2) * 3"));
    assert_eq!(Val::Int(1 + (8 << 1)), eval("1 + 8 << 1"));
    assert_eq!(Val::Bool(true), eval("1 < 2 && 3 != 4 || false"));
    assert_eq!(Val::Int(-3), eval("-3"));
    assert_eq!(Val::Int(!5), eval("^5"));
    assert_eq!(Val::Bool(false), eval("!(2 >= 1)"));
    assert_eq!(Val::Int(255), eval("0xff"));
}

#[test]
fn mixes_integers_and_floats() {
    assert_eq!(Val::Float(2.5), eval("1 + 1.5"));
    assert_eq!(Val::Bool(true), eval("2 == 2.0"));
    assert_eq!(Val::Bool(false), eval("1.5 < 1"));
}

#[test]
fn uses_variables() {
    let vars = [("c", Val::Int(3)), ("d", Val::Int(4))];
    assert_eq!(Ok(Val::Int(7)), eval_with("c+d", &vars));
    assert_eq!(Ok(Val::Bool(true)), eval_with("c < d", &vars));
}

#[test]
fn resolves_type_names() {
    let vars = [("t", Val::Type(Type::INT16))];
    assert_eq!(Ok(Val::Bool(false)), eval_with("t == Int32", &vars));
    assert_eq!(Ok(Val::Bool(true)), eval_with("is16BitInt(t) && isSigned(t)", &vars));
    assert_eq!(Ok(Val::Int(2)), eval_with("size(t)", &vars));
}

#[test]
fn normalizes_to_the_width_of_a_type() {
    assert_eq!(Val::Int(-128), eval("norm(Int8, 128)"));
    assert_eq!(Val::Int(128), eval("norm(UInt8, 128)"));
    assert_eq!(Val::Int(0), eval("norm(UInt16, 65536)"));
    assert_eq!(Val::Int(i32::MIN as i64), eval("norm(Int32, 2147483647 + 1)"));
    assert_eq!(Val::Int(1), eval("norm(Bool, 5)"));
    assert_eq!(Val::Float(0.1f32 as f64), eval("norm(Float32, 0.1)"));
    assert_eq!(Val::Int(0xffff), eval("zext(Int16, -1)"));
}

#[test]
fn evaluates_builtins() {
    assert_eq!(Val::Bool(true), eval("is16Bit(-32768)"));
    assert_eq!(Val::Bool(false), eval("is16Bit(32768)"));
    assert_eq!(Val::Bool(true), eval("isU16Bit(65535)"));
    assert_eq!(Val::Bool(false), eval("isU16Bit(-1)"));
    assert_eq!(Val::Bool(true), eval("isPowerOfTwo(64)"));
    assert_eq!(Val::Bool(false), eval("isPowerOfTwo(0)"));
    assert_eq!(Val::Int(6), eval("log2(64)"));
    assert_eq!(Val::Int(-1), eval("int8(255)"));
    assert_eq!(Val::Int(255), eval("uint8(-1)"));
    assert_eq!(Val::Int(1), eval("b2i(3 > 2)"));
}

#[test]
fn merges_symbols() {
    let sym = Symbol::external("x");
    let vars = [("s1", Val::Sym(Some(sym.clone()))), ("s2", Val::Sym(None))];
    assert_eq!(Ok(Val::Bool(true)), eval_with("canMergeSym(s1, s2)", &vars));
    assert_eq!(Ok(Val::Sym(Some(sym))), eval_with("mergeSym(s2, s1)", &vars));
    assert_eq!(Ok(Val::Bool(false)), eval_with("canMergeSym(s1, s1)", &vars));
    assert_eq!(Err(EvalError::MergeSym), eval_with("mergeSym(s1, s1)", &vars));
    assert_eq!(Ok(Val::Bool(true)), eval_with("s1 == \"x\"", &vars));
}

#[test]
fn reports_evaluation_errors() {
    assert_eq!(Err(EvalError::DivisionByZero), eval_with("1 / 0", &[]));
    assert_eq!(Err(EvalError::Log2(0)), eval_with("log2(0)", &[]));
    assert_eq!(
        Err(EvalError::Type {
            expected: "a bool",
            found: "integer 1".to_owned()
        }),
        eval_with("1 && true", &[])
    );
}

#[test]
fn short_circuits() {
    assert_eq!(Val::Bool(false), eval("false && 1 / 0 == 0"));
    assert_eq!(Val::Bool(true), eval("true || 1 / 0 == 0"));
}

#[test]
fn rejects_malformed_expressions() {
    let none = |_: &str| -> Option<usize> { None };
    assert_eq!(
        Err("unknown variable `x`".to_owned()),
        parse_expr("x + 1", &none)
    );
    assert_eq!(
        Err("unknown function `foo`".to_owned()),
        parse_expr("foo(1)", &none)
    );
    assert_eq!(
        Err("`norm` takes 2 arguments, got 1".to_owned()),
        parse_expr("norm(1)", &none)
    );
    assert!(parse_expr("(1 + 2", &none).is_err());
    assert!(parse_expr("1 +", &none).is_err());
}
