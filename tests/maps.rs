use anyhow::Result;

use cel_core::ast::builder::AstBuilder;
use cel_core::env::{Env, EnvConfig, StructDecl, VariableDecl};
use cel_core::interpreter::activation::MapActivation;
use cel_core::types::CelType;
use cel_core::value::{MapValue, StructValue, Value};

fn map_env() -> Env {
    Env::with_config(EnvConfig {
        variables: vec![VariableDecl::new(
            "m",
            CelType::map(CelType::String, CelType::Int),
        )],
        ..EnvConfig::default()
    })
    .expect("environment should build")
}

fn sample_map() -> Value {
    let mut m = MapValue::new();
    m.insert(Value::string("k"), Value::Int(1)).unwrap();
    m.insert(Value::string("j"), Value::Int(2)).unwrap();
    Value::map(m)
}

#[test]
fn membership_in_map() -> Result<()> {
    let env = map_env();

    let mut b = AstBuilder::new("'k' in m");
    let k = b.string("k");
    let m = b.ident("m");
    let contains = b.call("@in", vec![k, m]);
    let (expr, info) = b.build(contains);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;

    let activation = MapActivation::from(vec![("m", sample_map())]);
    assert_eq!(program.eval(&activation)?, Value::Bool(true));

    let empty = MapActivation::from(vec![("m", Value::map(MapValue::new()))]);
    assert_eq!(program.eval(&empty)?, Value::Bool(false));

    Ok(())
}

#[test]
fn missing_key_is_an_error() -> Result<()> {
    let env = map_env();

    let mut b = AstBuilder::new("m['missing']");
    let m = b.ident("m");
    let key = b.string("missing");
    let indexed = b.call("_[_]", vec![m, key]);
    let (expr, info) = b.build(indexed);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;

    let activation = MapActivation::from(vec![("m", sample_map())]);
    let error = program.eval(&activation).unwrap_err();
    assert_eq!(error.message, "no such key: 'missing'");

    Ok(())
}

#[test]
fn field_select_on_map() -> Result<()> {
    let env = map_env();

    let mut b = AstBuilder::new("m.k");
    let m = b.ident("m");
    let select = b.select(m, "k");
    let (expr, info) = b.build(select);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    assert_eq!(checked.result_type(), CelType::Int);
    let program = env.program(&checked, &info)?;

    let activation = MapActivation::from(vec![("m", sample_map())]);
    assert_eq!(program.eval(&activation)?, Value::Int(1));

    Ok(())
}

#[test]
fn presence_test_on_map_and_struct() -> Result<()> {
    let env = Env::with_config(EnvConfig {
        variables: vec![
            VariableDecl::new("m", CelType::map(CelType::String, CelType::Int)),
            VariableDecl::new("msg", CelType::Struct("test.Msg".into())),
        ],
        structs: vec![StructDecl::new(
            "test.Msg",
            [("name".to_string(), CelType::String)],
        )],
        ..EnvConfig::default()
    })
    .expect("environment should build");

    let mut b = AstBuilder::new("has(m.k) && has(msg.name)");
    let m = b.ident("m");
    let has_k = b.has(m, "k");
    let msg = b.ident("msg");
    let has_name = b.has(msg, "name");
    let and = b.call("_&&_", vec![has_k, has_name]);
    let (expr, info) = b.build(and);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;

    // both present
    let mut msg = StructValue::new("test.Msg");
    msg.fields.insert("name".into(), Value::string("cel"));
    let activation = MapActivation::from(vec![
        ("m", sample_map()),
        ("msg", Value::struct_value(msg)),
    ]);
    assert_eq!(program.eval(&activation)?, Value::Bool(true));

    // both absent
    let activation = MapActivation::from(vec![
        ("m", Value::map(MapValue::new())),
        ("msg", Value::struct_value(StructValue::new("test.Msg"))),
    ]);
    assert_eq!(program.eval(&activation)?, Value::Bool(false));

    // a field explicitly set to its declared default is not present
    let mut msg = StructValue::new("test.Msg");
    msg.fields.insert("name".into(), Value::string(""));
    let activation = MapActivation::from(vec![
        ("m", sample_map()),
        ("msg", Value::struct_value(msg)),
    ]);
    assert_eq!(program.eval(&activation)?, Value::Bool(false));

    Ok(())
}

#[test]
fn absent_struct_field_reads_as_default() -> Result<()> {
    let env = Env::with_config(EnvConfig {
        variables: vec![VariableDecl::new("msg", CelType::Struct("test.Msg".into()))],
        structs: vec![StructDecl::new(
            "test.Msg",
            [
                ("count".to_string(), CelType::Int),
                ("name".to_string(), CelType::String),
                (
                    "wrapped".to_string(),
                    CelType::Struct("google.protobuf.Int64Value".into()),
                ),
            ],
        )],
        ..EnvConfig::default()
    })
    .expect("environment should build");

    for (field, expected) in [
        ("count", Value::Int(0)),
        ("name", Value::string("")),
        // wrapper fields default to null, not the zero primitive
        ("wrapped", Value::Null),
    ] {
        let mut b = AstBuilder::new("msg.<field>");
        let msg = b.ident("msg");
        let select = b.select(msg, field);
        let (expr, info) = b.build(select);

        let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
        let program = env.program(&checked, &info)?;

        let activation = MapActivation::from(vec![(
            "msg",
            Value::struct_value(StructValue::new("test.Msg")),
        )]);
        assert_eq!(program.eval(&activation)?, expected, "field {field}");
    }

    Ok(())
}

#[test]
fn struct_literal_construction() -> Result<()> {
    let env = Env::with_config(EnvConfig {
        structs: vec![StructDecl::new(
            "test.Msg",
            [
                ("name".to_string(), CelType::String),
                ("count".to_string(), CelType::Int),
            ],
        )],
        ..EnvConfig::default()
    })
    .expect("environment should build");

    let mut b = AstBuilder::new("test.Msg{name: 'a', count: 2}");
    let name = b.string("a");
    let count = b.int(2);
    let lit = b.struct_lit(
        "test.Msg",
        vec![("name".to_string(), name), ("count".to_string(), count)],
    );
    let (expr, info) = b.build(lit);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    assert_eq!(checked.result_type(), CelType::Struct("test.Msg".into()));
    let program = env.program(&checked, &info)?;

    let Value::Struct(built) = program.eval(&cel_core::interpreter::activation::EmptyActivation)?
    else {
        panic!("expected a struct value");
    };
    assert_eq!(built.type_name, "test.Msg");
    assert_eq!(built.get("name"), Some(&Value::string("a")));
    assert_eq!(built.get("count"), Some(&Value::Int(2)));

    Ok(())
}

#[test]
fn map_literal_with_duplicate_keys_errors() -> Result<()> {
    let env = Env::new();

    let mut b = AstBuilder::new("{'k': 1, 'k': 2}");
    let k1 = b.string("k");
    let v1 = b.int(1);
    let k2 = b.string("k");
    let v2 = b.int(2);
    let map = b.map_lit(vec![(k1, v1), (k2, v2)]);
    let (expr, info) = b.build(map);

    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;

    let error = program
        .eval(&cel_core::interpreter::activation::EmptyActivation)
        .unwrap_err();
    assert!(error.message.contains("duplicate map key"));

    Ok(())
}

#[test]
fn empty_containers() -> Result<()> {
    let env = Env::new();

    // size([]) == 0, size({}) == 0, 1 in [] is false
    let mut b = AstBuilder::new("size([])");
    let empty = b.list(vec![]);
    let call = b.call("size", vec![empty]);
    let (expr, info) = b.build(call);
    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;
    assert_eq!(
        program.eval(&cel_core::interpreter::activation::EmptyActivation)?,
        Value::Int(0)
    );

    let mut b = AstBuilder::new("1 in []");
    let one = b.int(1);
    let empty = b.list(vec![]);
    let contains = b.call("@in", vec![one, empty]);
    let (expr, info) = b.build(contains);
    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;
    assert_eq!(
        program.eval(&cel_core::interpreter::activation::EmptyActivation)?,
        Value::Bool(false)
    );

    let mut b = AstBuilder::new("[][0]");
    let empty = b.list(vec![]);
    let zero = b.int(0);
    let indexed = b.call("_[_]", vec![empty, zero]);
    let (expr, info) = b.build(indexed);
    let checked = env.compile(&expr, &info).map_err(|i| anyhow::anyhow!("{i}"))?;
    let program = env.program(&checked, &info)?;
    let error = program
        .eval(&cel_core::interpreter::activation::EmptyActivation)
        .unwrap_err();
    assert!(error.message.contains("index out of bounds"));

    Ok(())
}
