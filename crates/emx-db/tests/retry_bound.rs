use std::fs;

use emx_core::{EmxError, ExpId, RunId};
use emx_db::{Experiment, LogsDb, RetryPolicy, RetryState, OUTPUT_LOG_FILE, RESULT_FILE};

fn setup() -> (tempfile::TempDir, Experiment) {
    let temp = tempfile::tempdir().expect("temp dir");
    let db = LogsDb::open(temp.path()).expect("open db");
    let id = ExpId::parse("arm8/exps2/p1/d1").expect("id");
    db.create_experiment(&id, &[]).expect("create");
    let experiment = db.experiment(&id).expect("open record");
    (temp, experiment)
}

fn record_run(experiment: &Experiment, run_id: &RunId, result: &str) {
    let dir = experiment.run_dir(run_id);
    fs::create_dir_all(&dir).expect("run directory");
    fs::write(dir.join(OUTPUT_LOG_FILE), b"uart").expect("device log");
    fs::write(dir.join(RESULT_FILE), result).expect("result document");
}

#[test]
fn clean_results_succeed_on_the_first_attempt() {
    let (_temp, experiment) = setup();
    let run_id = RunId::new("c0ffee", "rpi3");
    let mut policy = RetryPolicy::new();

    record_run(&experiment, &run_id, r#"{"output":"RESULT ok"}"#);
    policy.record_attempt(&run_id);
    let incomplete = policy
        .is_incomplete(&experiment, &run_id)
        .expect("policy decision");
    assert!(!incomplete);
    assert_eq!(policy.state(), RetryState::Succeeded);
    assert!(experiment.run_is_complete(&run_id));
}

#[test]
fn exceptional_results_cap_at_three_executions() {
    let (_temp, experiment) = setup();
    let run_id = RunId::new("c0ffee", "rpi3");
    let mut policy = RetryPolicy::new();
    let mut executions = 0;

    loop {
        record_run(
            &experiment,
            &run_id,
            r#"{"output":"data abort exception"}"#,
        );
        executions += 1;
        policy.record_attempt(&run_id);
        if !policy
            .is_incomplete(&experiment, &run_id)
            .expect("policy decision")
        {
            break;
        }
        assert!(
            !experiment.run_dir(&run_id).exists(),
            "a scheduled retry removes the exceptional run"
        );
    }

    assert_eq!(executions, 3);
    assert_eq!(policy.state(), RetryState::Failed);
    assert!(
        experiment.run_is_complete(&run_id),
        "the final exceptional result stays recorded"
    );
}

#[test]
fn querying_before_any_attempt_is_a_precondition_violation() {
    let (_temp, experiment) = setup();
    let run_id = RunId::new("c0ffee", "rpi3");
    let mut policy = RetryPolicy::new();

    let err = policy
        .is_incomplete(&experiment, &run_id)
        .expect_err("no attempt was recorded");
    assert!(matches!(err, EmxError::Precondition(_)));
    assert_eq!(policy.state(), RetryState::Pending);
}

#[test]
fn missing_artifacts_leave_the_run_incomplete() {
    let (_temp, experiment) = setup();
    let run_id = RunId::new("c0ffee", "rpi3");
    let mut policy = RetryPolicy::new();

    // Only the device log exists; the result document is missing.
    let dir = experiment.run_dir(&run_id);
    fs::create_dir_all(&dir).expect("run directory");
    fs::write(dir.join(OUTPUT_LOG_FILE), b"uart").expect("device log");

    policy.record_attempt(&run_id);
    let incomplete = policy
        .is_incomplete(&experiment, &run_id)
        .expect("policy decision");
    assert!(incomplete);
    assert_eq!(policy.state(), RetryState::Attempted(0));
    assert!(dir.exists(), "incomplete runs are not deleted");
}

#[test]
fn switching_run_identity_restarts_the_cycle() {
    let (_temp, experiment) = setup();
    let run_a = RunId::new("aaaa", "rpi3");
    let run_b = RunId::new("bbbb", "rpi3");
    let mut policy = RetryPolicy::new();

    for _ in 0..2 {
        record_run(&experiment, &run_a, r#"{"output":"exception"}"#);
        policy.record_attempt(&run_a);
        assert!(policy
            .is_incomplete(&experiment, &run_a)
            .expect("policy decision"));
    }
    assert_eq!(policy.state(), RetryState::Attempted(2));

    record_run(&experiment, &run_b, r#"{"output":"RESULT ok"}"#);
    policy.record_attempt(&run_b);
    let incomplete = policy
        .is_incomplete(&experiment, &run_b)
        .expect("policy decision");
    assert!(!incomplete);
    assert_eq!(policy.state(), RetryState::Succeeded);
}

#[test]
fn the_result_is_read_from_the_last_attempted_run() {
    let (_temp, experiment) = setup();
    let run_a = RunId::new("aaaa", "rpi3");
    let run_b = RunId::new("bbbb", "rpi3");
    let mut policy = RetryPolicy::new();

    record_run(&experiment, &run_a, r#"{"output":"RESULT ok"}"#);
    policy.record_attempt(&run_b);
    let err = policy
        .is_incomplete(&experiment, &run_a)
        .expect_err("run b has no result document");
    assert!(matches!(err, EmxError::MissingFile(_)));
}

#[test]
fn a_lower_bound_fails_sooner() {
    let (_temp, experiment) = setup();
    let run_id = RunId::new("c0ffee", "rpi3");
    let mut policy = RetryPolicy::new().with_max_attempts(1);

    record_run(&experiment, &run_id, r#"{"output":"exception"}"#);
    policy.record_attempt(&run_id);
    let incomplete = policy
        .is_incomplete(&experiment, &run_id)
        .expect("policy decision");
    assert!(!incomplete);
    assert_eq!(policy.state(), RetryState::Failed);
    assert!(experiment.run_is_complete(&run_id));
}
