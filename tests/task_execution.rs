//! Integration tests for task execution

mod common;

use common::{names, quiet_context, write_file};
use std::fs;
use tempfile::TempDir;
use weave::config::{parse_config, validate_config, OutputDirs};
use weave::error::{ExecutionError, RunError};
use weave::runner::{Mode, Profile, Registry, Runner, Task};

fn task(yaml: &str, name: &str) -> Task {
    let config = parse_config(yaml, None).unwrap();
    validate_config(&config).unwrap();
    let task_config = config.tasks.get(name).unwrap();
    Task::from_config(name.to_string(), task_config.clone()).unwrap()
}

fn registry(yaml: &str) -> Registry {
    let config = parse_config(yaml, None).unwrap();
    validate_config(&config).unwrap();
    Registry::from_config(&config).unwrap()
}

#[test]
fn test_execute_simple_task() {
    let yaml = r#"
tasks:
  hello:
    run: echo "Hello, World!"
"#;

    let temp_dir = TempDir::new().unwrap();
    let mut ctx = quiet_context(temp_dir.path());
    assert!(task(yaml, "hello").execute(&mut ctx).is_ok());
}

#[test]
fn test_execute_task_with_variables() {
    let yaml = r#"
tasks:
  greet:
    vars:
      name: Rust
    run: echo "Hello, ${name}!" > greeting.txt
"#;

    let temp_dir = TempDir::new().unwrap();
    let mut ctx = quiet_context(temp_dir.path());
    task(yaml, "greet").execute(&mut ctx).unwrap();

    let greeting = fs::read_to_string(temp_dir.path().join("greeting.txt")).unwrap();
    assert_eq!(greeting.trim(), "Hello, Rust!");
}

#[test]
fn test_execute_task_with_failing_command() {
    let yaml = r#"
tasks:
  fail:
    run: "false"
"#;

    let temp_dir = TempDir::new().unwrap();
    let mut ctx = quiet_context(temp_dir.path());
    let result = task(yaml, "fail").execute(&mut ctx);

    assert!(matches!(result, Err(ExecutionError::CommandFailed(Some(1)))));
}

#[test]
fn test_ignore_errors_continues() {
    let yaml = r#"
tasks:
  lint:
    run:
      - command:
          exec: "false"
          ignore-errors: true
      - touch linted.txt
"#;

    let temp_dir = TempDir::new().unwrap();
    let mut ctx = quiet_context(temp_dir.path());
    task(yaml, "lint").execute(&mut ctx).unwrap();

    assert!(temp_dir.path().join("linted.txt").exists());
}

#[test]
fn test_finally_runs_even_on_failure() {
    let yaml = r#"
tasks:
  fail_with_finally:
    run: "false"
    finally:
      - echo "Finally block" > finally_ran.txt
"#;

    let temp_dir = TempDir::new().unwrap();
    let mut ctx = quiet_context(temp_dir.path());
    let result = task(yaml, "fail_with_finally").execute(&mut ctx);

    // Task should fail
    assert!(matches!(result, Err(ExecutionError::CommandFailed(_))));

    // But finally block should have run
    assert!(temp_dir.path().join("finally_ran.txt").exists());
}

#[test]
fn test_execute_task_with_conditional() {
    let yaml = r#"
tasks:
  conditional:
    run:
      - when:
          - equal:
              left: "${env}"
              right: "prod"
        command: touch production.txt
      - touch always.txt
"#;

    let temp_dir = TempDir::new().unwrap();
    let conditional = task(yaml, "conditional");

    let mut ctx = quiet_context(temp_dir.path());
    ctx.set_var("env".to_string(), "dev".to_string());
    conditional.execute(&mut ctx).unwrap();
    assert!(!temp_dir.path().join("production.txt").exists());
    assert!(temp_dir.path().join("always.txt").exists());

    ctx.set_var("env".to_string(), "prod".to_string());
    conditional.execute(&mut ctx).unwrap();
    assert!(temp_dir.path().join("production.txt").exists());
}

#[test]
fn test_execute_task_with_set_environment() {
    let yaml = r#"
tasks:
  set_env:
    run:
      - set-environment:
          MY_VAR: "test_value"
      - command: echo "$MY_VAR" > my_var.txt
"#;

    let temp_dir = TempDir::new().unwrap();
    let mut ctx = quiet_context(temp_dir.path());
    task(yaml, "set_env").execute(&mut ctx).unwrap();

    assert!(ctx.get_var("MY_VAR").is_none());
    let exported = fs::read_to_string(temp_dir.path().join("my_var.txt")).unwrap();
    assert_eq!(exported.trim(), "test_value");
}

#[test]
fn test_when_condition_command_check() {
    let yaml = r#"
tasks:
  check_cmd:
    run:
      - when:
          - command: "true"
        command: touch ran.txt
      - when:
          - command: which nonexistent_command_xyz
        command: touch skipped.txt
"#;

    let temp_dir = TempDir::new().unwrap();
    let mut ctx = quiet_context(temp_dir.path());
    task(yaml, "check_cmd").execute(&mut ctx).unwrap();

    assert!(temp_dir.path().join("ran.txt").exists());
    assert!(!temp_dir.path().join("skipped.txt").exists());
}

#[test]
fn test_when_condition_file_exists() {
    let yaml = r#"
tasks:
  check_file:
    run:
      - when:
          - exists: exists.txt
        command: touch found.txt
      - when:
          - exists: notexists.txt
        command: touch missing.txt
"#;

    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "exists.txt", "test");

    let mut ctx = quiet_context(temp_dir.path());
    task(yaml, "check_file").execute(&mut ctx).unwrap();

    assert!(temp_dir.path().join("found.txt").exists());
    assert!(!temp_dir.path().join("missing.txt").exists());
}

#[test]
fn test_production_profile() {
    let yaml = r#"
tasks:
  scripts:
    run:
      - when:
          - production: true
        command: echo minified > bundle.js
      - when:
          - production: false
        command: echo sourcemaps > bundle.js
      - command: echo "${out_dir}" > out_dir.txt
"#;

    let temp_dir = TempDir::new().unwrap();
    let profile = Profile::new(Mode::Production, &OutputDirs::default());
    let mut ctx = quiet_context(temp_dir.path()).with_profile(profile);
    task(yaml, "scripts").execute(&mut ctx).unwrap();

    let bundle = fs::read_to_string(temp_dir.path().join("bundle.js")).unwrap();
    assert_eq!(bundle.trim(), "minified");
    let out_dir = fs::read_to_string(temp_dir.path().join("out_dir.txt")).unwrap();
    assert_eq!(out_dir.trim(), "dist");
}

#[test]
fn test_spawn_background_process() {
    let yaml = r#"
tasks:
  server:
    run:
      - spawn: sleep 30
"#;

    let temp_dir = TempDir::new().unwrap();
    let mut ctx = quiet_context(temp_dir.path());
    task(yaml, "server").execute(&mut ctx).unwrap();
    assert_eq!(ctx.background_count(), 1);

    ctx.stop_background();
    assert_eq!(ctx.background_count(), 0);
}

#[test]
fn test_build_pipeline() {
    let yaml = r#"
tasks:
  clean:
    run:
      clean: "${out_dir}"
  copy:app:
    run:
      - copy:
          src: ["app/**/*.{html,png}", "!app/**/draft.html"]
          dest: "${out_dir}/public"
  step-templates:
    run:
      - concat:
          src: step-templates/*.json
          output: "${out_dir}/step-templates.json"
          header: "["
          separator: ","
          footer: "]"
  build:
    deps: ["copy:app", step-templates]
  default:
    deps: [clean, build]
"#;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "build/stale.txt", "old");
    write_file(root, "app/index.html", "<html></html>");
    write_file(root, "app/draft.html", "draft");
    write_file(root, "app/content/img/logo.png", "png");
    write_file(root, "step-templates/a.json", r#"{"id":"a"}"#);
    write_file(root, "step-templates/b.json", r#"{"id":"b"}"#);

    let registry = registry(yaml);
    let mut ctx = quiet_context(root);
    let report = Runner::new(&registry)
        .run(&names(&["default"]), &mut ctx)
        .unwrap();

    assert_eq!(
        report.executed,
        vec!["clean", "copy:app", "step-templates", "build", "default"]
    );
    assert!(!root.join("build/stale.txt").exists());
    assert!(root.join("build/public/index.html").exists());
    assert!(root.join("build/public/content/img/logo.png").exists());
    assert!(!root.join("build/public/draft.html").exists());
    assert_eq!(
        fs::read_to_string(root.join("build/step-templates.json")).unwrap(),
        r#"[{"id":"a"},{"id":"b"}]"#
    );
}

#[test]
fn test_unknown_dependency_runs_nothing() {
    let yaml = r#"
tasks:
  setup:
    run: touch setup.txt
  build:
    deps: [setup, missing]
"#;

    let temp_dir = TempDir::new().unwrap();
    let registry = registry(yaml);
    let mut ctx = quiet_context(temp_dir.path());
    let result = Runner::new(&registry).run(&names(&["build"]), &mut ctx);

    assert!(matches!(result, Err(RunError::UnknownTask(name)) if name == "missing"));
    assert!(!temp_dir.path().join("setup.txt").exists());
}

#[test]
fn test_cycle_in_config() {
    let yaml = r#"
tasks:
  a:
    deps: b
  b:
    deps: a
"#;

    let temp_dir = TempDir::new().unwrap();
    let registry = registry(yaml);
    let mut ctx = quiet_context(temp_dir.path());

    match Runner::new(&registry).run(&names(&["a"]), &mut ctx) {
        Err(RunError::Cycle { chain, .. }) => assert_eq!(chain, "a -> b -> a"),
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_failing_prerequisite_stops_dependents() {
    let yaml = r#"
tasks:
  lint:
    run: "false"
  scripts:
    run: touch scripts.txt
  build:
    deps: [lint, scripts]
"#;

    let temp_dir = TempDir::new().unwrap();
    let registry = registry(yaml);
    let mut ctx = quiet_context(temp_dir.path());

    match Runner::new(&registry).run(&names(&["build"]), &mut ctx) {
        Err(RunError::Task { name, source }) => {
            assert_eq!(name, "lint");
            assert!(matches!(source, ExecutionError::CommandFailed(_)));
        }
        other => panic!("expected lint to fail, got {:?}", other),
    }
    assert!(!temp_dir.path().join("scripts.txt").exists());
}

#[test]
fn test_shared_prerequisite_runs_once() {
    let yaml = r#"
tasks:
  clean:
    run: echo clean >> log.txt
  scripts:
    deps: clean
  styles:
    deps: clean
  build:
    deps: [scripts, styles]
"#;

    let temp_dir = TempDir::new().unwrap();
    let registry = registry(yaml);
    let mut ctx = quiet_context(temp_dir.path());
    Runner::new(&registry)
        .run(&names(&["build", "clean"]), &mut ctx)
        .unwrap();

    let log = fs::read_to_string(temp_dir.path().join("log.txt")).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn test_task_vars_do_not_leak_into_later_tasks() {
    let yaml = r#"
tasks:
  styles:
    vars:
      out_dir: elsewhere
    run: mkdir -p "${out_dir}" && touch "${out_dir}/app.css"
  scripts:
    run: mkdir -p "${out_dir}" && touch "${out_dir}/app.js"
  build:
    deps: [styles, scripts]
"#;

    let temp_dir = TempDir::new().unwrap();
    let registry = registry(yaml);
    let mut ctx = quiet_context(temp_dir.path());
    Runner::new(&registry)
        .run(&names(&["build"]), &mut ctx)
        .unwrap();

    assert!(temp_dir.path().join("elsewhere/app.css").exists());
    assert!(temp_dir.path().join("build/app.js").exists());
    assert!(!temp_dir.path().join("elsewhere/app.js").exists());
    assert_eq!(
        ctx.get_var("out_dir").map(String::as_str),
        ctx.profile.out_dir.to_str()
    );
}

#[test]
fn test_inject_references_into_template() {
    let yaml = r#"
tasks:
  build:client:
    run:
      - inject:
          template: server/views/index.html
          sources:
            - "${out_dir}/public/**/*.{js,css}"
            - "!${out_dir}/public/**/vendor/**"
          dest: "${out_dir}/views"
          ignore-path: "${out_dir}/public"
"#;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(
        root,
        "server/views/index.html",
        "<head>\n  <!-- inject:css -->\n  <!-- endinject -->\n</head>\n<body>\n  <!-- inject:js -->\n  <!-- endinject -->\n</body>\n",
    );
    write_file(root, "build/public/app/app.js", "");
    write_file(root, "build/public/styles/main.css", "");
    write_file(root, "build/public/app/vendor/react.js", "");

    let mut ctx = quiet_context(root);
    task(yaml, "build:client").execute(&mut ctx).unwrap();

    let rendered = fs::read_to_string(root.join("build/views/index.html")).unwrap();
    assert!(rendered.contains("  <link rel=\"stylesheet\" href=\"/styles/main.css\">\n"));
    assert!(rendered.contains("  <script src=\"/app/app.js\"></script>\n"));
    assert!(!rendered.contains("react.js"));
    // The source template is left alone
    let source = fs::read_to_string(root.join("server/views/index.html")).unwrap();
    assert!(!source.contains("app.js"));
}
