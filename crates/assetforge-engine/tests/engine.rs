//! End-to-end tests for the execution engine: memoization, structural
//! sharing, eviction, error capture and file accounting.

use std::any::Any;
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use assetforge_core::value::is_error_payload;
use assetforge_core::{
    DomainValue, LiteralData, MaterializationError, Registry, SerializationError, Value, Workspace,
};
use assetforge_engine::{Engine, EngineConfig, ExecError, ProgramBuilder};

const FIVE_PLUS_SEVEN: &str = r#"[{"node":"literal","kind":"U32","data":5}, {"node":"literal","kind":"U32","data":7}, {"node":"derived","kind":"Add_U32_U32","deps":[0,1]}]"#;

/// Registry whose `Add_U32_U32` counts its invocations.
fn counted_registry(calls: &Rc<Cell<usize>>) -> Registry {
    let mut registry = Registry::new();
    registry
        .register("U32", |inputs, _ctx| match inputs.literal()? {
            LiteralData::Int(v) => Ok(Value::UInt(*v as u64)),
            other => Err(MaterializationError::msg(format!("not a u32: {other:?}"))),
        })
        .unwrap();
    let counter = Rc::clone(calls);
    registry
        .register("Add_U32_U32", move |inputs, _ctx| {
            counter.set(counter.get() + 1);
            Ok(Value::UInt(inputs.u64_at(0)? + inputs.u64_at(1)?))
        })
        .unwrap();
    registry
}

fn counted_engine(capacity: usize) -> (Engine, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let engine = Engine::new(
        counted_registry(&calls),
        Workspace::new("."),
        EngineConfig {
            cache_capacity: capacity,
        },
    );
    (engine, calls)
}

fn builtin_engine(workspace: &std::path::Path) -> Engine {
    Engine::new(
        Registry::with_builtins(),
        Workspace::new(workspace),
        EngineConfig::default(),
    )
}

fn load_text_program(path: &str) -> String {
    let mut builder = ProgramBuilder::new();
    let p = builder.literal("Str", path);
    builder.derived("LoadText_Str", [p]);
    builder.to_text()
}

// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

#[test]
fn five_plus_seven_computed_once_across_submissions() {
    let (mut engine, calls) = counted_engine(64);

    let first = engine.exec_program(FIVE_PLUS_SEVEN, true).unwrap();
    assert_eq!(first.payload, "12");
    let second = engine.exec_program(FIVE_PLUS_SEVEN, true).unwrap();
    assert_eq!(second.payload, "12");

    assert_eq!(calls.get(), 1);
    assert_eq!(engine.cache_stats().hits, 3);
}

#[test]
fn identical_final_node_shared_between_programs() {
    let (mut engine, calls) = counted_engine(64);
    let mut builder = ProgramBuilder::new();
    builder.literal("U32", 99);
    let a = builder.literal("U32", 5);
    let b = builder.literal("U32", 7);
    builder.derived("Add_U32_U32", [a, b]);

    let first = engine.exec_program(FIVE_PLUS_SEVEN, true).unwrap();
    let second = engine.exec_program(&builder.to_text(), true).unwrap();
    assert_eq!(first.payload, second.payload);
    assert_eq!(calls.get(), 1);
}

#[test]
fn dependency_order_is_part_of_identity() {
    let (mut engine, calls) = counted_engine(64);
    let mut builder = ProgramBuilder::new();
    let a = builder.literal("U32", 5);
    let b = builder.literal("U32", 7);
    builder.derived("Add_U32_U32", [b, a]);

    engine.exec_program(FIVE_PLUS_SEVEN, true).unwrap();
    let swapped = engine.exec_program(&builder.to_text(), true).unwrap();
    assert_eq!(swapped.payload, "12");
    assert_eq!(calls.get(), 2);
}

#[test]
fn eviction_forces_recomputation() {
    let (mut engine, calls) = counted_engine(2);
    engine.exec_program(FIVE_PLUS_SEVEN, true).unwrap();
    engine.exec_program(FIVE_PLUS_SEVEN, true).unwrap();

    assert_eq!(calls.get(), 2);
    assert_eq!(engine.cache_len(), 2);
    assert_eq!(engine.cache_stats().evictions, 4);
}

#[test]
fn timers_count_only_cache_misses() {
    let (mut engine, _calls) = counted_engine(64);
    engine.exec_program(FIVE_PLUS_SEVEN, true).unwrap();
    engine.exec_program(FIVE_PLUS_SEVEN, true).unwrap();

    assert_eq!(engine.timers().get("Add_U32_U32").unwrap().count, 1);
    assert_eq!(engine.timers().get("U32").unwrap().count, 2);
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

#[test]
fn captured_failure_becomes_error_payload() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = builtin_engine(dir.path());

    let out = engine
        .exec_program(&load_text_program("missing.txt"), false)
        .unwrap();
    assert!(out.failed);
    assert!(is_error_payload(&out.payload));
    let wire: serde_json::Value = serde_json::from_str(&out.payload).unwrap();
    assert!(wire["info"][0]
        .as_str()
        .unwrap()
        .starts_with("error materializing 'LoadText_Str'"));
    assert!(out.files.contains("missing.txt"));
}

#[test]
fn propagated_failure_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = builtin_engine(dir.path());

    let err = engine
        .exec_program(&load_text_program("missing.txt"), true)
        .unwrap_err();
    assert!(matches!(err, ExecError::Materialization(ref e) if e.kind == "LoadText_Str"));
}

#[test]
fn failures_are_retried_on_the_next_request() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = builtin_engine(dir.path());
    let program = load_text_program("late.txt");

    assert!(engine.exec_program(&program, false).unwrap().failed);
    std::fs::write(dir.path().join("late.txt"), "arrived").unwrap();
    let out = engine.exec_program(&program, false).unwrap();
    assert!(!out.failed);
    assert_eq!(out.payload, "\"arrived\"");
}

#[test]
fn unknown_operation_is_fatal_even_when_capturing() {
    let (mut engine, _calls) = counted_engine(64);
    let err = engine
        .exec_program(r#"[{"node":"literal","kind":"Mesh","data":1}]"#, false)
        .unwrap_err();
    assert!(matches!(err, ExecError::UnknownOperation { index: 0, .. }));
}

#[test]
fn parse_errors_are_fatal_even_when_capturing() {
    let (mut engine, _calls) = counted_engine(64);
    let err = engine.exec_program("[{]", false).unwrap_err();
    assert!(matches!(err, ExecError::Parse { .. }));
}

#[derive(Debug)]
struct Unencodable;

impl DomainValue for Unencodable {
    fn type_name(&self) -> &str {
        "Unencodable"
    }

    fn encode(&self) -> Result<serde_json::Value, SerializationError> {
        Err(SerializationError::new("Unencodable", "no wire format"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn serialization_errors_are_fatal_even_when_capturing() {
    let mut registry = Registry::with_builtins();
    registry
        .register("Opaque", |_inputs, _ctx| {
            Ok(Value::Domain(Arc::new(Unencodable)))
        })
        .unwrap();
    let mut engine = Engine::new(registry, Workspace::new("."), EngineConfig::default());

    let err = engine
        .exec_program(r#"[{"node":"derived","kind":"Opaque"}]"#, false)
        .unwrap_err();
    assert!(matches!(err, ExecError::Serialization(_)));
}

// ---------------------------------------------------------------------------
// File accounting
// ---------------------------------------------------------------------------

#[test]
fn cache_hits_replay_file_reads() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    let mut engine = builtin_engine(dir.path());

    let first = engine.exec_program(&load_text_program("a.txt"), true).unwrap();
    assert_eq!(first.files.to_vec(), vec![PathBuf::from("a.txt")]);

    let mut builder = ProgramBuilder::new();
    let p = builder.literal("Str", "a.txt");
    let text = builder.derived("LoadText_Str", [p]);
    let suffix = builder.literal("Str", "!");
    builder.derived("Concat_Str_Str", [text, suffix]);

    let second = engine.exec_program(&builder.to_text(), true).unwrap();
    assert_eq!(second.payload, "\"alpha!\"");
    assert!(second.files.contains("a.txt"));
    assert_eq!(engine.timers().get("LoadText_Str").unwrap().count, 1);
}

#[test]
fn edited_file_invalidates_cached_loader_and_dependents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    let mut engine = builtin_engine(dir.path());

    let mut builder = ProgramBuilder::new();
    let p = builder.literal("Str", "a.txt");
    let text = builder.derived("LoadText_Str", [p]);
    let suffix = builder.literal("Str", "!");
    builder.derived("Concat_Str_Str", [text, suffix]);
    let program = builder.to_text();

    assert_eq!(engine.exec_program(&program, true).unwrap().payload, "\"alpha!\"");

    std::fs::write(dir.path().join("a.txt"), "beta").unwrap();
    let out = engine.exec_program(&program, true).unwrap();
    assert_eq!(out.payload, "\"beta!\"");
    assert_eq!(out.files.to_vec(), vec![PathBuf::from("a.txt")]);
    assert_eq!(engine.timers().get("LoadText_Str").unwrap().count, 2);
    assert_eq!(engine.timers().get("Concat_Str_Str").unwrap().count, 2);
}

#[test]
fn unedited_files_keep_their_cache_hits() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    let mut engine = builtin_engine(dir.path());
    let program = load_text_program("a.txt");

    engine.exec_program(&program, true).unwrap();
    let out = engine.exec_program(&program, true).unwrap();
    assert_eq!(out.payload, "\"alpha\"");
    assert_eq!(engine.timers().get("LoadText_Str").unwrap().count, 1);
    assert_eq!(engine.cache_stats().hits, 2);
}

#[test]
fn file_appearing_invalidates_a_cached_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = builtin_engine(dir.path());

    let mut builder = ProgramBuilder::new();
    let path = builder.literal("Str", "opt.txt");
    let fallback = builder.literal("Str", "default");
    builder.derived("LoadTextOrDefault_Str_Str", [path, fallback]);
    let program = builder.to_text();

    assert_eq!(engine.exec_program(&program, true).unwrap().payload, "\"default\"");
    std::fs::write(dir.path().join("opt.txt"), "custom").unwrap();
    assert_eq!(engine.exec_program(&program, true).unwrap().payload, "\"custom\"");
}

#[test]
fn binary_results_are_base64_encoded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("blob.bin"), [0u8, 1, 2]).unwrap();
    let mut engine = builtin_engine(dir.path());

    let mut builder = ProgramBuilder::new();
    let p = builder.literal("Str", "blob.bin");
    builder.derived("LoadBinary_Str", [p]);
    let out = engine.exec_program(&builder.to_text(), true).unwrap();
    assert_eq!(out.payload, r#"{"data":"AAEC","kind":"Binary"}"#);
}
