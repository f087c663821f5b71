// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the execution context: session lifecycle, serial
//! task execution, and sensitive parameter handling.

use std::sync::Arc;
use std::time::Duration;

use rivet_core::{PluginError, RunOptions, TaskParams};
use rivet_executor::ExecutionContext;
use rivet_test_utils::mock_compiler::{task_with_required_param, task_with_sensitive_param};
use rivet_test_utils::{MockCompiler, MockCompilerFactory, MockTransport};
use serde_json::json;

fn params(value: serde_json::Value) -> TaskParams {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("params must be an object"),
    }
}

fn context(
    compiler: MockCompiler,
    transport: MockTransport,
) -> (ExecutionContext, Arc<MockCompilerFactory>, Arc<MockTransport>) {
    let factory = Arc::new(MockCompilerFactory::new(compiler));
    let transport = Arc::new(transport);
    let ctx = ExecutionContext::builder("/tmp/rivet-project")
        .compiler_factory(factory.clone())
        .transport(transport.clone())
        .build();
    (ctx, factory, transport)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_execute_one_at_a_time() {
    let (ctx, factory, transport) = context(
        MockCompiler::new().with_task(task_with_required_param()),
        MockTransport::new().with_delay(Duration::from_millis(20)),
    );

    let runs = (0..5).map(|i| {
        ctx.run_local_task(
            "test::required",
            params(json!({"param": format!("call-{i}")})),
            RunOptions::default(),
        )
    });
    let results = futures::future::join_all(runs).await;

    assert!(results.iter().all(|r| r.as_ref().is_ok_and(|r| r.ok())));
    assert_eq!(transport.run_count(), 5);
    assert_eq!(transport.max_concurrency(), 1);
    assert_eq!(factory.created(), 5);
    assert_eq!(factory.torn_down(), 5);
}

#[tokio::test]
async fn cancelled_run_tears_down_its_session() {
    let (ctx, factory, _transport) = context(
        MockCompiler::new().with_task(task_with_required_param()),
        MockTransport::new().with_delay(Duration::from_secs(5)),
    );

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        ctx.run_local_task(
            "test::required",
            params(json!({"param": "slow"})),
            RunOptions::default(),
        ),
    )
    .await;

    assert!(outcome.is_err(), "run should have timed out");
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.torn_down(), 1);
}

#[tokio::test]
async fn failed_lookup_still_tears_down() {
    let (ctx, factory, transport) = context(MockCompiler::new(), MockTransport::new());

    let err = ctx
        .run_local_task("test::missing", TaskParams::new(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PluginError::UnknownTask(ref name) if name == "test::missing"));
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.torn_down(), 1);
    assert_eq!(transport.run_count(), 0);
}

#[tokio::test]
async fn unavailable_compiler_is_reported() {
    let ctx = ExecutionContext::builder("/tmp/rivet-project")
        .compiler_factory(Arc::new(MockCompilerFactory::failing()))
        .transport(Arc::new(MockTransport::new()))
        .build();

    let err = ctx
        .get_validated_task("test::required", None)
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::Compiler(_)));
}

#[tokio::test]
async fn ambient_session_is_never_torn_down() {
    let compiler = MockCompiler::new().with_task(task_with_required_param());
    let factory = Arc::new(MockCompilerFactory::new(MockCompiler::new()));
    let ctx = ExecutionContext::builder("/tmp/rivet-project")
        .ambient_compiler(Arc::new(compiler))
        .compiler_factory(factory.clone())
        .transport(Arc::new(MockTransport::new()))
        .build();

    for _ in 0..3 {
        ctx.get_validated_task("test::required", Some(&params(json!({"param": "x"}))))
            .await
            .unwrap();
    }
    assert!(ctx.has_ambient_compiler());
    assert_eq!(factory.created(), 0);
    assert_eq!(factory.torn_down(), 0);
}

#[tokio::test]
async fn invalid_parameters_never_reach_the_transport() {
    let (ctx, _factory, transport) = context(
        MockCompiler::new().with_task(task_with_required_param()),
        MockTransport::new(),
    );

    let err = ctx
        .run_local_task(
            "test::required",
            params(json!({"param": 7, "extra": true})),
            RunOptions::default(),
        )
        .await
        .unwrap_err();

    match err {
        PluginError::InvalidParameters { task, errors } => {
            assert_eq!(task, "test::required");
            assert_eq!(errors.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.run_count(), 0);
}

#[tokio::test]
async fn sensitive_parameters_are_wrapped_for_the_transport() {
    let (ctx, _factory, transport) = context(
        MockCompiler::new().with_task(task_with_sensitive_param()),
        MockTransport::new().with_response("test::login", json!({"value": "ok"})),
    );

    let result = ctx
        .run_local_task(
            "test::login",
            params(json!({"user": "deploy", "password": "hunter2"})),
            RunOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(result.value["value"], "ok");

    let run = &transport.runs()[0];
    assert_eq!(run.target, "localhost");
    assert_eq!(run.sensitive_args(), vec!["password"]);
    assert_eq!(run.args["password"].expose(), "hunter2");
    assert!(!format!("{:?}", run.args).contains("hunter2"));
}

#[tokio::test]
async fn required_parameter_is_enforced() {
    let (ctx, _factory, _transport) = context(
        MockCompiler::new().with_task(task_with_required_param()),
        MockTransport::new(),
    );

    let err = ctx
        .validate_params("test::required", &TaskParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::InvalidParameters { .. }));

    ctx.validate_params("test::required", &params(json!({"param": "value"})))
        .await
        .unwrap();
}
