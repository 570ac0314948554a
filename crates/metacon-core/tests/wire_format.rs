use metacon_core::{BridgeError, DecisionRequest, DecisionResponse, Observation};

fn sample() -> Observation {
    Observation {
        throughput: 8400.0,
        throughput_max: 8400.0,
        avg_delay: 0.02,
        min_delay: 0.02,
        loss_count: 0.0,
        smoothed_rtt: 0.004,
        window_size: 14000.0,
    }
}

#[test]
fn test_request_layout() {
    let req = DecisionRequest { observation: sample(), window: 14000.0 };
    let json: serde_json::Value = serde_json::to_value(req).unwrap();

    // Observation travels as a positional array, not an object
    let obs = json["observation"].as_array().expect("observation must be an array");
    assert_eq!(obs.len(), 7);
    assert_eq!(obs[0].as_f64(), Some(8400.0));
    assert_eq!(obs[6].as_f64(), Some(14000.0));
    assert_eq!(json["window"].as_f64(), Some(14000.0));
}

#[test]
fn test_request_accepts_integer_fields() {
    // Peers written in dynamic languages send whole numbers without a fraction
    let raw = r#"{"observation": [0, 0, 0, 0, 3, 0, 14000], "window": 14000}"#;
    let req: DecisionRequest = serde_json::from_str(raw).unwrap();
    assert_eq!(req.observation.loss_count, 3.0);
    assert_eq!(req.window, 14000.0);
}

#[test]
fn test_missing_action_holds() {
    let resp: DecisionResponse = serde_json::from_str("{}").unwrap();
    assert_eq!(resp, DecisionResponse::HOLD);

    let resp: DecisionResponse = serde_json::from_str(r#"{"action": -0.5}"#).unwrap();
    assert_eq!(resp.action, -0.5);
}

#[test]
fn test_short_observation_rejected() {
    let raw = r#"{"observation": [1, 2, 3], "window": 1}"#;
    let err: BridgeError = serde_json::from_str::<DecisionRequest>(raw).unwrap_err().into();
    assert!(matches!(err, BridgeError::MalformedFrame(_)));
}

#[test]
fn test_error_classification() {
    let aborted = BridgeError::ExchangeAborted(Box::new(BridgeError::ChannelClosed));
    assert!(aborted.poisons_connection());
    assert!(matches!(aborted.root_cause(), BridgeError::ChannelClosed));

    let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
    assert!(!BridgeError::ConnectFailed(refused).poisons_connection());
}
