use emx_core::{EmxError, ErrorInfo};

fn sample(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_path("/data/logs/arm8")
        .with_context("id", "arm8/exps2/p1/d1")
}

#[test]
fn not_found_exposes_its_payload() {
    let err = EmxError::NotFound(sample("db.experiment_missing", "no such record"));
    assert_eq!(err.info().code, "db.experiment_missing");
    assert!(err.to_string().starts_with("not found:"));
}

#[test]
fn already_exists_exposes_its_payload() {
    let err = EmxError::AlreadyExists(sample("db.experiment_exists", "record exists"));
    assert_eq!(err.info().code, "db.experiment_exists");
    assert!(err.to_string().starts_with("already exists:"));
}

#[test]
fn missing_file_exposes_its_payload() {
    let err = EmxError::MissingFile(sample("db.code_hash_missing", "code.hash absent"));
    assert_eq!(err.info().code, "db.code_hash_missing");
    assert!(err.to_string().starts_with("missing file:"));
}

#[test]
fn malformed_input_exposes_its_payload() {
    let err = EmxError::MalformedInput(sample("db.document_parse", "not valid JSON"));
    assert_eq!(err.info().code, "db.document_parse");
    assert!(err.to_string().starts_with("malformed input:"));
}

#[test]
fn dirty_workspace_exposes_its_payload() {
    let err = EmxError::DirtyWorkspace(sample("plat.dirty", "local modifications"));
    assert_eq!(err.info().code, "plat.dirty");
    assert!(err.to_string().starts_with("dirty workspace:"));
}

#[test]
fn git_exposes_its_payload() {
    let err = EmxError::Git(sample("plat.rev_parse", "could not resolve revision"));
    assert_eq!(err.info().code, "plat.rev_parse");
    assert!(err.to_string().starts_with("git failure:"));
}

#[test]
fn execution_exposes_its_payload() {
    let err = EmxError::Execution(sample("plat.run_failed", "make exited non zero"));
    assert_eq!(err.info().code, "plat.run_failed");
    assert!(err.to_string().starts_with("execution failure:"));
}

#[test]
fn precondition_exposes_its_payload() {
    let err = EmxError::Precondition(sample("plat.not_writable", "clean check required"));
    assert_eq!(err.info().code, "plat.not_writable");
    assert!(err.to_string().starts_with("precondition violated:"));
}

#[test]
fn io_exposes_its_payload() {
    let err = EmxError::Io(sample("db.run_remove", "permission denied"));
    assert_eq!(err.info().code, "db.run_remove");
    assert!(err.to_string().starts_with("io failure:"));
}

#[test]
fn display_includes_code_path_context_and_hint() {
    let err = EmxError::DirtyWorkspace(
        ErrorInfo::new("plat.dirty", "working tree has local modifications")
            .with_path("/src/platform")
            .with_context("status", "2 entries")
            .with_hint("commit and push your changes or clean the checkout"),
    );
    let rendered = err.to_string();
    assert!(rendered.contains("[plat.dirty]"));
    assert!(rendered.contains("at /src/platform"));
    assert!(rendered.contains("status=2 entries"));
    assert!(rendered.contains("(commit and push your changes or clean the checkout)"));
}

#[test]
fn errors_serialize_with_family_tags() {
    let err = EmxError::Git(sample("plat.rev_parse", "could not resolve revision"));
    let json = serde_json::to_value(&err).expect("error should serialize");
    assert_eq!(json["family"], "Git");
    assert_eq!(json["detail"]["code"], "plat.rev_parse");
    assert_eq!(json["detail"]["context"]["id"], "arm8/exps2/p1/d1");

    let back: EmxError = serde_json::from_value(json).expect("error should deserialize");
    assert_eq!(back, err);
}
