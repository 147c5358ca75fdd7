use std::path::PathBuf;

use emx_core::{EmxError, ExpId, RunId};

#[test]
fn four_segment_identities_parse_into_their_components() {
    let id = ExpId::parse("arm8/exps2/paramsA/data9").expect("well formed id");
    assert_eq!(id.arch(), "arm8");
    assert_eq!(id.exp_type(), "exps2");
    assert_eq!(id.params_id(), "paramsA");
    assert_eq!(id.data_id(), "data9");
    assert_eq!(id.to_string(), "arm8/exps2/paramsA/data9");
    assert_eq!(id.rel_path(), PathBuf::from("arm8/exps2/paramsA/data9"));
}

#[test]
fn wrong_segment_counts_are_rejected() {
    for raw in ["arm8", "arm8/exps2/p1", "arm8/exps2/p1/d1/extra"] {
        let err = ExpId::parse(raw).expect_err("segment count should be rejected");
        assert!(matches!(err, EmxError::NotFound(_)), "{raw}");
    }
}

#[test]
fn empty_segments_are_rejected() {
    for raw in ["arm8//p1/d1", "/exps2/p1/d1", "arm8/exps2/p1/"] {
        let err = ExpId::parse(raw).expect_err("empty segment should be rejected");
        assert!(matches!(err, EmxError::NotFound(_)), "{raw}");
    }
}

#[test]
fn relative_path_segments_are_rejected() {
    for raw in ["a/../../b", "./exps2/p1/d1", "arm8/exps2/p1/..", "arm8/./p1/d1"] {
        let err = ExpId::parse(raw).expect_err("relative segment should be rejected");
        assert!(matches!(err, EmxError::NotFound(_)), "{raw}");
    }
}

#[test]
fn run_identities_join_commit_and_board() {
    let run = RunId::new("c0ffee42", "rpi3");
    assert_eq!(run.commit(), "c0ffee42");
    assert_eq!(run.board(), "rpi3");
    assert_eq!(run.to_string(), "c0ffee42.rpi3");

    let back = RunId::parse("c0ffee42.rpi3").expect("well formed run id");
    assert_eq!(back, run);
}

#[test]
fn run_id_parsing_splits_on_the_first_dot() {
    let run = RunId::parse("abc123.rpi.v2").expect("board may contain dots");
    assert_eq!(run.commit(), "abc123");
    assert_eq!(run.board(), "rpi.v2");
}

#[test]
fn malformed_run_identities_are_rejected() {
    for raw in ["nodot", ".rpi3", "abc123."] {
        let err = RunId::parse(raw).expect_err("run id should be rejected");
        assert!(matches!(err, EmxError::MalformedInput(_)), "{raw}");
    }
}
