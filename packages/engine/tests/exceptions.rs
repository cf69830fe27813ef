mod common;

use std::sync::{Arc, Mutex};

use latebind::{
    call_method, exception_options, format_exception, get_value, last_exception,
    reset_last_exception, set_exception_options, show_exception, toggle_exceptions, Context,
    Exception, ExceptionOptions,
};
use latebind_core::{Cell, ErrorCode, Fault};
use latebind_expando::Expando;

fn scanner() -> latebind_core::ObjectRef {
    Expando::new("Scanner")
        .with_property("Name", "Flatbed")
        .with_method("Acquire", |args| match args {
            [Cell::I32(dpi)] if *dpi > 0 => Ok(Cell::Empty),
            [_] => Err(Fault::exception("WIA.Scanner", "resolution out of range")
                .with_help("wia.chm", 4012)
                .at_argument(1)),
            _ => Err(Fault::bad_param_count()),
        })
        .into_object()
}

/// Restores default options when dropped.
struct Defaults;

impl Drop for Defaults {
    fn drop(&mut self) {
        set_exception_options(ExceptionOptions::default());
    }
}

#[test]
fn test_remote_failure_is_recorded_with_its_payload() {
    let _guard = common::guard();
    reset_last_exception();
    let obj = scanner();

    let err = call_method!(&obj, ".Acquire(%d)", -5).unwrap_err();
    assert!(err.is_remote());
    assert_eq!(err.code(), ErrorCode::EXCEPTION);

    let exc = last_exception().unwrap();
    assert_eq!(exc.initial_function, "call_method");
    assert_eq!(exc.error_function, "invoke");
    assert_eq!(exc.member, "Acquire");
    assert_eq!(exc.complete_member, ".Acquire(-5)");
    assert_eq!(exc.description.as_deref(), Some("resolution out of range"));
    assert_eq!(exc.source.as_deref(), Some("WIA.Scanner"));
    assert_eq!(exc.help_file.as_deref(), Some("wia.chm"));
    assert_eq!(exc.help_context, 4012);
    assert_eq!(exc.arg_error, Some(1));
    assert!(exc.remote);
}

#[test]
fn test_local_failures_carry_no_remote_payload() {
    let _guard = common::guard();
    reset_last_exception();
    let obj = scanner();

    get_value!("%d", &obj, ".Name").unwrap_err();
    let exc = last_exception().unwrap();
    assert_eq!(exc.error_function, "coerce");
    assert_eq!(exc.code, ErrorCode::TYPE_MISMATCH);
    assert!(!exc.remote);
    assert!(exc.source.is_none());
    assert!(exc.arg_error.is_none());
}

#[test]
fn test_record_is_overwritten_and_kept_until_reset() {
    let _guard = common::guard();
    reset_last_exception();
    let obj = scanner();

    call_method!(&obj, ".Acquire(%d)", 0).unwrap_err();
    call_method!(&obj, ".Calibrate").unwrap_err();
    assert_eq!(last_exception().unwrap().member, "Calibrate");

    // success leaves the record alone
    call_method!(&obj, ".Acquire(%d)", 300).unwrap();
    assert_eq!(last_exception().unwrap().member, "Calibrate");

    reset_last_exception();
    assert!(last_exception().is_none());
}

#[test]
fn test_disabled_recording_leaves_only_the_return_code() {
    let _guard = common::guard();
    let _defaults = Defaults;
    reset_last_exception();
    set_exception_options(ExceptionOptions {
        record_exceptions: false,
        ..ExceptionOptions::default()
    });

    let obj = scanner();
    let mut ctx = Context::new();
    let err = ctx.call_method(&obj, ".Calibrate", &[]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UNKNOWN_NAME);
    assert!(ctx.last_exception().is_none());
    assert!(last_exception().is_none());
}

#[test]
fn test_callback_receives_each_exception() {
    let _guard = common::guard();
    let _defaults = Defaults;
    let seen: Arc<Mutex<Vec<Exception>>> = Arc::default();
    let sink = seen.clone();
    set_exception_options(ExceptionOptions {
        app_name: "scan-tool".to_string(),
        show_exceptions: true,
        callback: Some(Arc::new(move |exc: &Exception| {
            sink.lock().unwrap().push(exc.clone());
        })),
        ..ExceptionOptions::default()
    });

    let obj = scanner();
    call_method!(&obj, ".Acquire(%d)", -1).unwrap_err();
    call_method!(&obj, ".Acquire(%q)", 1).unwrap_err();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].error_function, "invoke");
    assert_eq!(seen[1].error_function, "parse");
    assert_eq!(seen[1].code, ErrorCode::INVALID_ARG);
    assert_eq!(exception_options().app_name, "scan-tool");
}

#[test]
fn test_shown_exceptions_go_to_stderr_without_a_callback() {
    let _guard = common::guard();
    let _defaults = Defaults;
    reset_last_exception();
    toggle_exceptions(true);
    assert!(exception_options().callback.is_none());

    let obj = scanner();
    call_method!(&obj, ".Acquire(%d)", -2).unwrap_err();
    let exc = last_exception().unwrap();
    assert_eq!(exc.member, "Acquire");
    show_exception(&exc);
}

#[test]
fn test_toggle_exceptions() {
    let _guard = common::guard();
    let _defaults = Defaults;
    toggle_exceptions(true);
    assert!(exception_options().show_exceptions);
    toggle_exceptions(false);
    assert!(!exception_options().show_exceptions);
}

#[test]
fn test_formatted_exception() {
    let _guard = common::guard();
    reset_last_exception();
    let obj = scanner();

    call_method!(&obj, ".Acquire(%d)", -5).unwrap_err();
    let text = format_exception(&last_exception().unwrap(), true);
    assert!(text.contains("Member     : Acquire"));
    assert!(text.contains("Source     : WIA.Scanner"));
    assert!(text.contains("Help File  : wia.chm (4012)"));
    assert!(text.contains("Argument   : 1"));
    assert!(text.contains("Path       : .Acquire(-5)"));
}

#[test]
fn test_contexts_keep_their_own_record() {
    let _guard = common::guard();
    let obj = scanner();
    let mut first = Context::new();
    let mut second = Context::new();

    first.call_method(&obj, ".Calibrate", &[]).unwrap_err();
    second.get_value("%d", &obj, ".Name", &[]).unwrap_err();

    assert_eq!(first.last_exception().unwrap().member, "Calibrate");
    assert_eq!(second.last_exception().unwrap().member, "Name");
    assert_eq!(first.take_exception().unwrap().initial_function, "call_method");
    assert!(first.last_exception().is_none());
}

#[test]
fn test_record_is_per_thread() {
    let _guard = common::guard();
    reset_last_exception();

    std::thread::spawn(|| {
        let obj = scanner();
        call_method!(&obj, ".Calibrate").unwrap_err();
        assert!(last_exception().is_some());
    })
    .join()
    .unwrap();

    assert!(last_exception().is_none());
}
