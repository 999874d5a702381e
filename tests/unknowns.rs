use anyhow::Result;

use cel_core::ast::builder::AstBuilder;
use cel_core::env::{Env, EnvConfig, VariableDecl};
use cel_core::interpreter::activation::{MapActivation, PartialActivation};
use cel_core::types::CelType;
use cel_core::value::Value;

fn env_xy() -> Env {
    Env::with_config(EnvConfig {
        variables: vec![
            VariableDecl::new("x", CelType::Int),
            VariableDecl::new("y", CelType::Int),
        ],
        ..EnvConfig::default()
    })
    .expect("environment should build")
}

#[test]
fn unknown_input_propagates_with_its_node_id() -> Result<()> {
    let env = env_xy();

    let mut b = AstBuilder::new("x + y");
    let x = b.ident("x");
    let y = b.ident("y");
    let y_id = y.id;
    let sum = b.call("_+_", vec![x, y]);
    let (expr, info) = b.build(sum);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;

    let activation = PartialActivation::new(
        MapActivation::from(vec![("x", Value::Int(1))]),
        vec!["y".to_string()],
    );

    let Value::Unknown(unknown) = program.eval(&activation)? else {
        panic!("expected an unknown value");
    };
    assert_eq!(unknown.expr_ids, vec![y_id]);

    Ok(())
}

#[test]
fn unknowns_merge_across_arguments() -> Result<()> {
    let env = env_xy();

    let mut b = AstBuilder::new("x + y");
    let x = b.ident("x");
    let x_id = x.id;
    let y = b.ident("y");
    let y_id = y.id;
    let sum = b.call("_+_", vec![x, y]);
    let (expr, info) = b.build(sum);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;

    let activation = PartialActivation::new(
        MapActivation::new(),
        vec!["x".to_string(), "y".to_string()],
    );

    let Value::Unknown(unknown) = program.eval(&activation)? else {
        panic!("expected an unknown value");
    };
    assert_eq!(unknown.expr_ids, vec![x_id, y_id]);

    Ok(())
}

#[test]
fn short_circuit_absorbs_unknown() -> Result<()> {
    let env = Env::with_config(EnvConfig {
        variables: vec![VariableDecl::new("flag", CelType::Bool)],
        ..EnvConfig::default()
    })
    .expect("environment should build");

    // flag || true is true even when flag is unknown
    let mut b = AstBuilder::new("flag || true");
    let flag = b.ident("flag");
    let yes = b.boolean(true);
    let or = b.call("_||_", vec![flag, yes]);
    let (expr, info) = b.build(or);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;

    let activation =
        PartialActivation::new(MapActivation::new(), vec!["flag".to_string()]);
    assert_eq!(program.eval(&activation)?, Value::Bool(true));

    // flag && true stays unknown
    let mut b = AstBuilder::new("flag && true");
    let flag = b.ident("flag");
    let yes = b.boolean(true);
    let and = b.call("_&&_", vec![flag, yes]);
    let (expr, info) = b.build(and);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;
    assert!(program.eval(&activation)?.is_unknown());

    Ok(())
}

#[test]
fn error_wins_over_unknown() -> Result<()> {
    let env = env_xy();

    // (1 / 0 == 1) && y: the division error outranks the unknown y
    let mut b = AstBuilder::new("(1 / 0 == 1) && (y == 1)");
    let one = b.int(1);
    let zero = b.int(0);
    let div = b.call("_/_", vec![one, zero]);
    let one = b.int(1);
    let poisoned = b.call("_==_", vec![div, one]);
    let y = b.ident("y");
    let one = b.int(1);
    let y_known = b.call("_==_", vec![y, one]);
    let and = b.call("_&&_", vec![poisoned, y_known]);
    let (expr, info) = b.build(and);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;

    let activation =
        PartialActivation::new(MapActivation::new(), vec!["y".to_string()]);
    let error = program.eval(&activation).unwrap_err();
    assert_eq!(error.message, "division by zero");

    Ok(())
}
