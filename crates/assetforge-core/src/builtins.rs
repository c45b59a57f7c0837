//! Builtin materializers: primitive literal kinds plus a few generic
//! derived operations (list building, checked addition, string
//! concatenation, workspace file loading, source-file emission).

use std::sync::Arc;

use crate::error::MaterializationError;
use crate::node::LiteralData;
use crate::registry::{Inputs, MaterializeContext, Registry};
use crate::value::Value;

type Builtin = fn(Inputs<'_>, &mut MaterializeContext<'_>) -> Result<Value, MaterializationError>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("Null", materialize_null),
    ("Bool", materialize_bool),
    ("Str", materialize_str),
    ("I8", materialize_i8),
    ("I16", materialize_i16),
    ("I32", materialize_i32),
    ("I64", materialize_i64),
    ("U8", materialize_u8),
    ("U16", materialize_u16),
    ("U32", materialize_u32),
    ("U64", materialize_u64),
    ("F32", materialize_f32),
    ("F64", materialize_f64),
    ("Map", materialize_map),
    ("Add_U32_U32", add_u32_u32),
    ("Concat_Str_Str", concat_str_str),
    ("LoadText_Str", load_text),
    ("LoadBinary_Str", load_binary),
    ("LoadTextOrDefault_Str_Str", load_text_or_default),
    ("ToSourceFile_Str_Str", to_source_file),
];

/// Registers every builtin kind. Kinds already present are left untouched.
pub fn register_builtins(registry: &mut Registry) {
    for (kind, materializer) in BUILTINS {
        if let Err(err) = registry.register(kind, *materializer) {
            tracing::warn!(kind = %kind, error = %err, "builtin not registered");
        }
    }
}

// ---------------------------------------------------------------------------
// Literal kinds
// ---------------------------------------------------------------------------

fn literal_mismatch(expected: &str, got: &LiteralData) -> MaterializationError {
    MaterializationError::msg(format!(
        "expected {expected} literal, got {}",
        got.type_name()
    ))
}

fn materialize_null(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    match inputs.literal()? {
        LiteralData::Null => Ok(Value::Null),
        other => Err(literal_mismatch("null", other)),
    }
}

fn materialize_bool(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    match inputs.literal()? {
        LiteralData::Bool(b) => Ok(Value::Bool(*b)),
        other => Err(literal_mismatch("bool", other)),
    }
}

fn materialize_str(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    match inputs.literal()? {
        LiteralData::Str(s) => Ok(Value::Str(s.clone())),
        other => Err(literal_mismatch("string", other)),
    }
}

/// Integer literal data widened to `i128` for range checks.
fn integer_literal(data: &LiteralData) -> Result<i128, MaterializationError> {
    match data {
        LiteralData::Int(v) => Ok(i128::from(*v)),
        LiteralData::UInt(v) => Ok(i128::from(*v)),
        other => Err(literal_mismatch("integer", other)),
    }
}

fn ranged(
    inputs: Inputs<'_>,
    name: &str,
    min: i128,
    max: i128,
) -> Result<i128, MaterializationError> {
    let v = integer_literal(inputs.literal()?)?;
    if v < min || v > max {
        return Err(MaterializationError::msg(format!(
            "{v} is out of range for {name} ({min}..={max})"
        )));
    }
    Ok(v)
}

macro_rules! signed_literal {
    ($fn_name:ident, $ty:ty) => {
        fn $fn_name(
            inputs: Inputs<'_>,
            _ctx: &mut MaterializeContext<'_>,
        ) -> Result<Value, MaterializationError> {
            let v = ranged(
                inputs,
                stringify!($ty),
                i128::from(<$ty>::MIN),
                i128::from(<$ty>::MAX),
            )?;
            Ok(Value::Int(v as i64))
        }
    };
}

macro_rules! unsigned_literal {
    ($fn_name:ident, $ty:ty) => {
        fn $fn_name(
            inputs: Inputs<'_>,
            _ctx: &mut MaterializeContext<'_>,
        ) -> Result<Value, MaterializationError> {
            let v = ranged(inputs, stringify!($ty), 0, i128::from(<$ty>::MAX))?;
            Ok(Value::UInt(v as u64))
        }
    };
}

signed_literal!(materialize_i8, i8);
signed_literal!(materialize_i16, i16);
signed_literal!(materialize_i32, i32);
signed_literal!(materialize_i64, i64);
unsigned_literal!(materialize_u8, u8);
unsigned_literal!(materialize_u16, u16);
unsigned_literal!(materialize_u32, u32);
unsigned_literal!(materialize_u64, u64);

fn float_literal(data: &LiteralData) -> Result<f64, MaterializationError> {
    match data {
        LiteralData::Float(v) => Ok(*v),
        LiteralData::Int(v) => Ok(*v as f64),
        LiteralData::UInt(v) => Ok(*v as f64),
        other => Err(literal_mismatch("number", other)),
    }
}

fn materialize_f32(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    let v = float_literal(inputs.literal()?)?;
    if v.is_finite() && v.abs() > f64::from(f32::MAX) {
        return Err(MaterializationError::msg(format!(
            "{v} is out of range for f32"
        )));
    }
    Ok(Value::Float(f64::from(v as f32)))
}

fn materialize_f64(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    Ok(Value::Float(float_literal(inputs.literal()?)?))
}

// ---------------------------------------------------------------------------
// Derived operations
// ---------------------------------------------------------------------------

fn materialize_map(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    Ok(Value::List(inputs.deps()?.iter().map(Arc::clone).collect()))
}

fn u32_operand(inputs: Inputs<'_>, index: usize) -> Result<u64, MaterializationError> {
    let v = inputs.u64_at(index)?;
    if v > u64::from(u32::MAX) {
        return Err(MaterializationError::msg(format!(
            "operand {index} ({v}) does not fit in u32"
        )));
    }
    Ok(v)
}

fn add_u32_u32(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    inputs.exactly(2)?;
    let lhs = u32_operand(inputs, 0)?;
    let rhs = u32_operand(inputs, 1)?;
    let sum = lhs + rhs;
    if sum > u64::from(u32::MAX) {
        return Err(MaterializationError::msg(format!(
            "{lhs} + {rhs} overflows u32"
        )));
    }
    Ok(Value::UInt(sum))
}

fn concat_str_str(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    inputs.exactly(2)?;
    let mut out = inputs.str_at(0)?.to_string();
    out.push_str(inputs.str_at(1)?);
    Ok(Value::Str(out))
}

fn load_text(
    inputs: Inputs<'_>,
    ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    inputs.exactly(1)?;
    let path = inputs.str_at(0)?;
    Ok(Value::Str(ctx.read_to_string(path)?))
}

fn load_binary(
    inputs: Inputs<'_>,
    ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    inputs.exactly(1)?;
    let path = inputs.str_at(0)?;
    Ok(Value::Binary(ctx.read(path)?))
}

/// Loads `path` if it is a regular file, otherwise yields the default text.
fn load_text_or_default(
    inputs: Inputs<'_>,
    ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    inputs.exactly(2)?;
    let path = inputs.str_at(0)?;
    let default = inputs.str_at(1)?;
    if ctx.is_file(path) {
        Ok(Value::Str(ctx.read_to_string(path)?))
    } else {
        Ok(Value::Str(default.to_string()))
    }
}

/// `(extension, content)` -> source file value.
fn to_source_file(
    inputs: Inputs<'_>,
    _ctx: &mut MaterializeContext<'_>,
) -> Result<Value, MaterializationError> {
    inputs.exactly(2)?;
    Ok(Value::SourceFile {
        extension: inputs.str_at(0)?.to_string(),
        content: inputs.str_at(1)?.to_string(),
    })
}
