//! The python engine driven through the manager, the way a host uses it

use scriptbridge_core::{BeanType, BridgeError, EngineState, HostValue, Manager, OutputBuffer};

fn manager() -> (Manager, OutputBuffer) {
    let manager = Manager::new();
    scriptbridge_python::install(&manager);
    let buffer = OutputBuffer::default();
    manager.set_output(buffer.clone());
    (manager, buffer)
}

#[test]
fn test_unknown_language() {
    let (manager, _) = manager();
    assert!(matches!(
        manager.load_scripting_engine("jython"),
        Err(BridgeError::UnknownEngine(_))
    ));
}

#[test]
fn test_load_is_singleton() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    let first = manager.load_scripting_engine("python")?;
    let second = manager.load_scripting_engine("python")?;
    assert!(first.same_instance(&second));
    assert_eq!(first.state(), EngineState::Initialized);
    second.exec("Test.py", 0, 0, "pass")?;
    assert_eq!(first.state(), EngineState::Active);
    Ok(())
}

#[test]
fn test_exec_print_without_newline() -> Result<(), BridgeError> {
    let (manager, buffer) = manager();
    manager.exec("python", "Test.py", 0, 0, "print \"PASSED\",")?;
    assert_eq!(buffer.contents(), "PASSED");
    Ok(())
}

#[test]
fn test_eval_arithmetic() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    let handle = manager.load_scripting_engine("python")?;
    assert_eq!(handle.eval("Test.py", 0, 0, "1 + 1")?, HostValue::Int(2));
    assert_eq!(manager.eval("python", "Test.py", 0, 0, "7 / 2")?, HostValue::Int(3));
    assert_eq!(manager.eval("python", "Test.py", 0, 0, "7 / 2.0")?, HostValue::Float(3.5));
    Ok(())
}

#[test]
fn test_call_defined_function() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    let handle = manager.load_scripting_engine("python")?;
    handle.exec("Test.py", 0, 0, "def addOne(f):\n\t return f + 1\n")?;
    assert_eq!(handle.call(None, "addOne", &[1.into()])?, HostValue::Int(2));
    assert!(matches!(
        handle.call(None, "addOne", &[1.into(), 2.into()]),
        Err(BridgeError::Call { .. })
    ));
    Ok(())
}

#[test]
fn test_iexec_runs_first_line_only() -> Result<(), BridgeError> {
    let (manager, buffer) = manager();
    manager.iexec("python", "Test.py", 0, 0, "print \"PASSED\",\nprint \"FAILED\",")?;
    assert_eq!(buffer.contents(), "PASSED");
    Ok(())
}

#[test]
fn test_lookup_bean_roundtrip() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    let lookup = "bsf.lookupBean(\"foo\")";

    assert!(manager.eval("python", "Test.py", 0, 0, lookup)?.is_null());

    manager.register_bean("foo", 1);
    assert_eq!(manager.eval("python", "Test.py", 0, 0, lookup)?, HostValue::Int(1));

    manager.unregister_bean("foo");
    assert!(manager.eval("python", "Test.py", 0, 0, lookup)?.is_null());
    assert_eq!(
        manager.eval("python", "Test.py", 0, 0, "bsf.lookupBean(\"foo\") is None")?,
        HostValue::Bool(true)
    );
    Ok(())
}

#[test]
fn test_declared_bean_arithmetic() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    manager.declare_bean("foo", 1, BeanType::Integer);
    assert_eq!(manager.eval("python", "Test.py", 0, 0, "foo + 1")?, HostValue::Int(2));

    manager.undeclare_bean("foo");
    match manager.eval("python", "Test.py", 0, 0, "foo + 1") {
        Err(BridgeError::UndefinedName { name, location }) => {
            assert_eq!(name, "foo");
            assert_eq!(location.map(|l| l.source_name), Some("Test.py".to_string()));
        }
        other => panic!("expected UndefinedName, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_scripts_manage_beans_through_bridge() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    manager.exec(
        "python",
        "Test.py",
        0,
        0,
        "bsf.registerBean(\"answer\", 42)\nbsf.declareBean(\"name\", \"bridge\", \"String\")",
    )?;
    let answer = manager.lookup_bean("answer").map(|b| b.value);
    assert_eq!(answer, Some(HostValue::Int(42)));
    assert_eq!(
        manager.eval("python", "Test.py", 0, 0, "name.upper()")?,
        HostValue::Str("BRIDGE".to_string())
    );
    Ok(())
}

#[test]
fn test_absent_names_are_idempotent() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    manager.unregister_bean("never");
    manager.undeclare_bean("never");
    manager.exec("python", "Test.py", 0, 0, "bsf.unregisterBean(\"never\")")?;
    Ok(())
}

#[test]
fn test_host_object_methods_from_script() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    let list = manager.eval("python", "Test.py", 0, 0, "[3, 1, 2]")?;
    manager.declare_bean("numbers", list.clone(), BeanType::Object);
    assert_eq!(
        manager.eval("python", "Test.py", 0, 0, "numbers.append(4)\nlen(numbers)")?,
        HostValue::Int(4)
    );
    let popped = list.as_object().map(|o| o.invoke("pop", &[]));
    assert!(matches!(popped, Some(Ok(HostValue::Int(4)))));
    Ok(())
}

#[test]
fn test_runtime_error_location() {
    let (manager, _) = manager();
    let err = manager.exec("python", "Test.py", 20, 0, "x = 1\ny = x / 0\n");
    match err {
        Err(BridgeError::Execution { location, message, .. }) => {
            assert_eq!(location.source_name, "Test.py");
            assert_eq!(location.line, 21);
            assert!(message.contains("ZeroDivisionError"));
        }
        other => panic!("expected Execution, got {:?}", other),
    }
}

#[test]
fn test_apply_anonymous_function() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    let params = vec!["a".to_string(), "b".to_string()];
    let value = manager.apply("python", "Test.py", 0, 0, "a + b", &params, &[40.into(), 2.into()])?;
    assert_eq!(value, HostValue::Int(42));
    assert!(matches!(
        manager.apply("python", "Test.py", 0, 0, "a", &params, &[1.into()]),
        Err(BridgeError::Call { .. })
    ));
    Ok(())
}

#[test]
fn test_unload_terminates_handle() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    let handle = manager.load_scripting_engine("python")?;
    handle.exec("Test.py", 0, 0, "x = 1")?;
    assert!(manager.unload_scripting_engine("python"));
    assert!(matches!(
        handle.eval("Test.py", 0, 0, "x"),
        Err(BridgeError::IllegalState(_))
    ));

    // a fresh load builds a new interpreter with empty globals
    let fresh = manager.load_scripting_engine("python")?;
    assert!(!fresh.same_instance(&handle));
    assert!(matches!(
        fresh.eval("Test.py", 0, 0, "x"),
        Err(BridgeError::UndefinedName { .. })
    ));
    Ok(())
}

#[test]
fn test_concurrent_first_load_builds_once() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    let handles: Vec<_> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| manager.load_scripting_engine("python")))
            .collect();
        workers.into_iter().filter_map(|w| w.join().ok()).collect()
    });
    let handles = handles.into_iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(handles.len(), 8);
    assert!(handles.windows(2).all(|w| w[0].same_instance(&w[1])));
    Ok(())
}

#[test]
fn test_language_for_script_path() -> Result<(), BridgeError> {
    let (manager, _) = manager();
    assert_eq!(manager.language_for_path(std::path::Path::new("demo/Test.py"))?, "python");
    assert!(manager.language_for_path(std::path::Path::new("Test.rb")).is_err());
    Ok(())
}
