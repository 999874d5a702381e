use anyhow::Result;

use cel_core::ast::builder::AstBuilder;
use cel_core::env::Env;
use cel_core::interpreter::activation::EmptyActivation;
use cel_core::value::Value;

fn eval(env: &Env, b: AstBuilder, root: cel_core::ast::Expr) -> Result<Value> {
    let (expr, info) = b.build(root);
    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;
    Ok(program.eval(&EmptyActivation)?)
}

#[test]
fn starts_with_and_ends_with() -> Result<()> {
    let env = Env::new();

    let mut b = AstBuilder::new("'abc'.startsWith('ab') && 'abc'.endsWith('bc')");
    let abc = b.string("abc");
    let ab = b.string("ab");
    let starts = b.member_call(abc, "startsWith", vec![ab]);
    let abc = b.string("abc");
    let bc = b.string("bc");
    let ends = b.member_call(abc, "endsWith", vec![bc]);
    let and = b.call("_&&_", vec![starts, ends]);

    assert_eq!(eval(&env, b, and)?, Value::Bool(true));

    Ok(())
}

#[test]
fn contains() -> Result<()> {
    let env = Env::new();

    let mut b = AstBuilder::new("'hello world'.contains('lo w')");
    let text = b.string("hello world");
    let needle = b.string("lo w");
    let call = b.member_call(text, "contains", vec![needle]);
    assert_eq!(eval(&env, b, call)?, Value::Bool(true));

    let mut b = AstBuilder::new("'hello'.contains('xyz')");
    let text = b.string("hello");
    let needle = b.string("xyz");
    let call = b.member_call(text, "contains", vec![needle]);
    assert_eq!(eval(&env, b, call)?, Value::Bool(false));

    Ok(())
}

#[test]
fn size_counts_code_points() -> Result<()> {
    let env = Env::new();

    let mut b = AstBuilder::new("size('🙂')");
    let emoji = b.string("🙂");
    let call = b.call("size", vec![emoji]);
    assert_eq!(eval(&env, b, call)?, Value::Int(1));

    let mut b = AstBuilder::new("''.size()");
    let empty = b.string("");
    let call = b.member_call(empty, "size", vec![]);
    assert_eq!(eval(&env, b, call)?, Value::Int(0));

    Ok(())
}

#[test]
fn matches_applies_a_regular_expression() -> Result<()> {
    let env = Env::new();

    let mut b = AstBuilder::new("matches('cel-core', '^cel')");
    let text = b.string("cel-core");
    let pattern = b.string("^cel");
    let call = b.call("matches", vec![text, pattern]);
    assert_eq!(eval(&env, b, call)?, Value::Bool(true));

    let mut b = AstBuilder::new("'cel-core'.matches('core$')");
    let text = b.string("cel-core");
    let pattern = b.string("core$");
    let call = b.member_call(text, "matches", vec![pattern]);
    assert_eq!(eval(&env, b, call)?, Value::Bool(true));

    Ok(())
}

#[test]
fn invalid_regex_is_a_runtime_error() {
    let env = Env::new();

    let mut b = AstBuilder::new("matches('x', '(unclosed')");
    let text = b.string("x");
    let pattern = b.string("(unclosed");
    let call = b.call("matches", vec![text, pattern]);

    let error = eval(&env, b, call).unwrap_err();
    assert!(error.to_string().contains("invalid regular expression"));
}

#[test]
fn concatenation_and_conversions() -> Result<()> {
    let env = Env::new();

    let mut b = AstBuilder::new("'n = ' + string(42)");
    let prefix = b.string("n = ");
    let n = b.int(42);
    let converted = b.call("string", vec![n]);
    let joined = b.call("_+_", vec![prefix, converted]);
    assert_eq!(eval(&env, b, joined)?, Value::string("n = 42"));

    let mut b = AstBuilder::new("int('123')");
    let text = b.string("123");
    let converted = b.call("int", vec![text]);
    assert_eq!(eval(&env, b, converted)?, Value::Int(123));

    let mut b = AstBuilder::new("string(bytes('ok'))");
    let text = b.string("ok");
    let as_bytes = b.call("bytes", vec![text]);
    let back = b.call("string", vec![as_bytes]);
    assert_eq!(eval(&env, b, back)?, Value::string("ok"));

    Ok(())
}

#[test]
fn cross_numeric_comparisons() -> Result<()> {
    let env = Env::new();

    // 1 == 1u, 1 == 1.0, 2u > 1, NaN != NaN
    let mut b = AstBuilder::new("1 == 1u");
    let i = b.int(1);
    let u = b.uint(1);
    let eq = b.call("_==_", vec![i, u]);
    assert_eq!(eval(&env, b, eq)?, Value::Bool(true));

    let mut b = AstBuilder::new("1 == 1.0");
    let i = b.int(1);
    let d = b.double(1.0);
    let eq = b.call("_==_", vec![i, d]);
    assert_eq!(eval(&env, b, eq)?, Value::Bool(true));

    let mut b = AstBuilder::new("2u > 1");
    let u = b.uint(2);
    let i = b.int(1);
    let gt = b.call("_>_", vec![u, i]);
    assert_eq!(eval(&env, b, gt)?, Value::Bool(true));

    let mut b = AstBuilder::new("(0.0 / 0.0) == (0.0 / 0.0)");
    let z1 = b.double(0.0);
    let z2 = b.double(0.0);
    let nan1 = b.call("_/_", vec![z1, z2]);
    let z3 = b.double(0.0);
    let z4 = b.double(0.0);
    let nan2 = b.call("_/_", vec![z3, z4]);
    let eq = b.call("_==_", vec![nan1, nan2]);
    assert_eq!(eval(&env, b, eq)?, Value::Bool(false));

    Ok(())
}
