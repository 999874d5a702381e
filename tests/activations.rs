use anyhow::Result;

use cel_core::ast::builder::AstBuilder;
use cel_core::env::{Env, EnvConfig, VariableDecl};
use cel_core::interpreter::activation::{
    HierarchicalActivation, LazyActivation, MapActivation,
};
use cel_core::types::CelType;
use cel_core::value::Value;

fn compile(env: &Env, b: AstBuilder, root: cel_core::ast::Expr) -> Result<cel_core::Program> {
    let (expr, info) = b.build(root);
    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    Ok(env.program(&checked, &info)?)
}

#[test]
fn lazy_activation_converts_native_values() -> Result<()> {
    let env = Env::with_config(EnvConfig {
        variables: vec![VariableDecl::new(
            "payload",
            CelType::map(CelType::String, CelType::Dyn),
        )],
        ..EnvConfig::default()
    })
    .expect("environment should build");

    let mut b = AstBuilder::new("payload.count + 1");
    let payload = b.ident("payload");
    let count = b.select(payload, "count");
    let one = b.int(1);
    let sum = b.call("_+_", vec![count, one]);
    let program = compile(&env, b, sum)?;

    let activation = LazyActivation::new([(
        "payload".to_string(),
        serde_json::json!({"count": 41, "tags": ["a", "b"]}),
    )]);
    assert_eq!(program.eval(&activation)?, Value::Int(42));

    Ok(())
}

#[test]
fn hierarchical_activation_shadows() -> Result<()> {
    let env = Env::with_config(EnvConfig {
        variables: vec![VariableDecl::new("x", CelType::Int)],
        ..EnvConfig::default()
    })
    .expect("environment should build");

    let mut b = AstBuilder::new("x");
    let x = b.ident("x");
    let program = compile(&env, b, x)?;

    let parent = MapActivation::from(vec![("x", Value::Int(1))]);
    let child = MapActivation::from(vec![("x", Value::Int(2))]);
    let chained = HierarchicalActivation::new(&child, &parent);

    assert_eq!(program.eval(&chained)?, Value::Int(2));
    assert_eq!(program.eval(&parent)?, Value::Int(1));

    Ok(())
}

#[test]
fn missing_attribute_is_an_error_with_the_name() -> Result<()> {
    let env = Env::with_config(EnvConfig {
        variables: vec![VariableDecl::new("x", CelType::Int)],
        ..EnvConfig::default()
    })
    .expect("environment should build");

    let mut b = AstBuilder::new("x");
    let x = b.ident("x");
    let program = compile(&env, b, x)?;

    let error = program.eval(&MapActivation::new()).unwrap_err();
    assert_eq!(error.message, "no such attribute: 'x'");

    Ok(())
}

#[test]
fn native_projection_round_trip() -> Result<()> {
    let env = Env::with_config(EnvConfig {
        variables: vec![VariableDecl::new(
            "payload",
            CelType::map(CelType::String, CelType::Dyn),
        )],
        ..EnvConfig::default()
    })
    .expect("environment should build");

    let mut b = AstBuilder::new("payload");
    let payload = b.ident("payload");
    let program = compile(&env, b, payload)?;

    let native = serde_json::json!({"a": 1, "b": [true, "x"]});
    let activation = LazyActivation::new([("payload".to_string(), native.clone())]);
    assert_eq!(program.eval(&activation)?.native(), native);

    Ok(())
}
