//! Three-document walkthrough of fit, predict_proba and predict.

use pretty_assertions::assert_eq;

use e2e_tests::{scenario_input, test_params, TestHarness};
use llda_engine::{LabeledLda, Prediction};
use llda_types::CorpusInput;

#[test]
fn test_scenario_theta_respects_label_mask() {
    let (x, y) = scenario_input();
    let mut clf = LabeledLda::new(test_params(50)).unwrap();
    let model = clf.fit(&x, &y).unwrap();

    assert_eq!(model.theta()[0][1], 0.0);
    assert_eq!(model.theta()[0][0], 1.0);
    assert_eq!(model.theta()[1][0], 0.0);
    assert_eq!(model.theta()[1][1], 1.0);

    let mixed: f64 = model.theta()[2].iter().sum();
    assert!((mixed - 1.0).abs() < 1e-9);
    assert!(model.theta()[2].iter().all(|&p| p > 0.0));
    assert_eq!(model.likelihood().len(), 50);
}

#[test]
fn test_scenario_held_out_document_leans_to_label_zero() {
    let (x, y) = scenario_input();
    let mut clf = LabeledLda::new(test_params(50)).unwrap();
    clf.fit(&x, &y).unwrap();

    let probs = clf
        .predict_proba(&CorpusInput::Dense(vec![vec![1, 1, 0, 0]]))
        .unwrap();
    assert_eq!(probs.len(), 1);
    assert_eq!(probs[0].len(), 2);
    assert!(
        probs[0][0] > probs[0][1],
        "topic 0 should dominate, got {:?}",
        probs[0]
    );
}

#[test]
fn test_scenario_predict_binarized() {
    let (x, y) = scenario_input();
    let mut clf = LabeledLda::new(test_params(50)).unwrap();
    clf.fit(&x, &y).unwrap();

    let prediction = clf
        .predict(&CorpusInput::Dense(vec![vec![3, 2, 0, 0], vec![0, 0, 2, 4]]))
        .unwrap();
    match prediction {
        Prediction::Indicator(rows) => {
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0][0], 1);
            assert_eq!(rows[1][1], 1);
        }
        other => panic!("Expected indicator rows, got {:?}", other),
    }
}

#[test]
fn test_scenario_repeat_fit_is_deterministic() {
    let (x, y) = scenario_input();
    let mut first = LabeledLda::new(test_params(30)).unwrap();
    let mut second = LabeledLda::new(test_params(30)).unwrap();
    let a = first.fit(&x, &y).unwrap().clone();
    let b = second.fit(&x, &y).unwrap().clone();
    assert_eq!(a, b);

    let held_out = CorpusInput::Dense(vec![vec![1, 0, 1, 1]]);
    assert_eq!(
        first.predict_proba(&held_out).unwrap(),
        second.predict_proba(&held_out).unwrap()
    );
}

#[test]
fn test_scenario_through_store() {
    let harness = TestHarness::new();
    let (x, y) = scenario_input();
    let mut clf = harness.classifier(test_params(50));
    let fitted = clf.fit(&x, &y).unwrap().clone();

    // A fresh classifier sees only the artifacts on disk.
    let reloaded = harness.classifier(test_params(50));
    assert!(reloaded.is_fitted());
    let model = reloaded.model().unwrap();
    assert_eq!(model.theta(), fitted.theta());
    assert_eq!(model.n_wz(), fitted.n_wz());
    assert_eq!(model.likelihood().len(), fitted.likelihood().len());

    let held_out = CorpusInput::Dense(vec![vec![1, 1, 0, 0]]);
    let probs = reloaded.predict_proba(&held_out).unwrap();
    assert!(probs[0][0] > probs[0][1]);
}
