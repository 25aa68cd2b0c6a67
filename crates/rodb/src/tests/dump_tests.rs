use super::helpers::*;
use crate::dump::to_yaml_string;
use crate::*;
use anyhow::Result;

#[test]
fn dump_scalars_inside_array() -> Result<()> {
    let db = load_value(&Value::Array(vec![
        true.into(),
        false.into(),
        (-3).into(),
        100.0f32.into(),
        "say \"hi\"".into(),
    ]))?;

    let text = to_yaml_string(db.root())?;
    assert_eq!(
        text,
        "\n- true\n- false\n- -3\n- 100.0\n- \"say \\\"hi\\\"\"\n"
    );
    Ok(())
}

#[test]
fn dump_map_in_key_order() -> Result<()> {
    let db = load_value(&Value::map([("b", 2), ("a", 1)]))?;
    let text = to_yaml_string(db.root())?;
    assert_eq!(text, "\n\"a\": 1\n\"b\": 2\n");
    Ok(())
}

#[test]
fn dump_indents_nested_levels() -> Result<()> {
    let db = load_value(&Value::Array(vec![Value::array([1, 2]), Value::map([("k", 3)])]))?;
    let text = to_yaml_string(db.root())?;
    assert_eq!(
        text,
        "\n- \n    - 1\n    - 2\n\n- \n    \"k\": 3\n\n"
    );
    Ok(())
}

#[test]
fn container_dump_matches_root_dump() -> Result<()> {
    let db = load_value(&Value::map([("xs", Value::array([1, 2]))]))?;
    let mut out = Vec::new();
    db.dump_yaml(&mut out)?;
    assert_eq!(String::from_utf8(out)?, to_yaml_string(db.root())?);
    Ok(())
}

#[test]
fn dump_escapes_control_characters() -> Result<()> {
    let db = load_value(&Value::array(["a\nb\tc\\"]))?;
    let text = to_yaml_string(db.root())?;
    assert_eq!(text, "\n- \"a\\nb\\tc\\\\\"\n");
    Ok(())
}

#[test]
fn dump_reports_corruption_as_invalid_data() -> Result<()> {
    let map = raw_map(2, &Value::array(["a", "b"]), &Value::array([1]));
    let db = Container::from_bytes_with(with_header(&map), &LoadOptions::unverified())?;
    let err = to_yaml_string(db.root()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    Ok(())
}

// -------------------- Floats --------------------

#[test]
fn floats_use_yaml_spellings() -> Result<()> {
    let db = load_value(&Value::Array(vec![
        f32::NAN.into(),
        f32::INFINITY.into(),
        f32::NEG_INFINITY.into(),
        1e10f32.into(),
        1e30f32.into(),
        1.5e-7f32.into(),
        (-2.0f32).into(),
    ]))?;

    let text = to_yaml_string(db.root())?;
    assert_eq!(
        text,
        "\n- .nan\n- .inf\n- -.inf\n- 10000000000.0\n- 1.0e+30\n- 1.5e-7\n- -2.0\n"
    );
    Ok(())
}

/// Reads one dumped float back the way a YAML loader resolves it.
fn reread_float(text: &str) -> Option<f32> {
    match text {
        ".nan" => Some(f32::NAN),
        ".inf" => Some(f32::INFINITY),
        "-.inf" => Some(f32::NEG_INFINITY),
        // YAML floats need a fraction; bare integers would re-read as ints
        t if t.contains('.') => t.parse().ok(),
        _ => None,
    }
}

#[test]
fn dumped_floats_reread_to_the_same_values() -> Result<()> {
    let values: Vec<f32> = vec![
        0.0,
        -0.0,
        0.1,
        100.0,
        -123.456,
        1e-45,
        1e16,
        f32::MIN_POSITIVE,
        f32::MAX,
        f32::MIN,
        f32::NAN,
        f32::INFINITY,
        f32::NEG_INFINITY,
    ];
    let db = load_value(&Value::Array(values.iter().map(|&v| v.into()).collect()))?;
    let text = to_yaml_string(db.root())?;

    let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), values.len());
    for (line, expected) in lines.iter().zip(&values) {
        let item = line.strip_prefix("- ").expect("array item");
        let v = reread_float(item).unwrap_or_else(|| panic!("{:?} is not a YAML float", item));
        assert_eq!(v.to_bits(), expected.to_bits(), "{}", item);
    }
    Ok(())
}
