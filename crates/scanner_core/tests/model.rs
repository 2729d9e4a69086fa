use chrono::Utc;
use scanner_core::{Card, CardError, ScanConfig, ScanError, SessionState, StopReason};

#[test]
fn config_rejects_zero_values() {
    assert_eq!(ScanConfig::new(0, 3), Err(ScanError::ZeroThreshold));
    assert_eq!(ScanConfig::new(20, 0), Err(ScanError::ZeroMaxFailures));

    let config = ScanConfig::new(20, 3).unwrap();
    assert_eq!(config.threshold(), 20);
    assert_eq!(config.max_failures(), 3);
    assert_eq!(config.with_max_failures(0), Err(ScanError::ZeroMaxFailures));
    assert_eq!(config.with_max_failures(7).unwrap().max_failures(), 7);
}

#[test]
fn session_rejects_invalid_limits() {
    assert_eq!(SessionState::new(0, 0), Err(ScanError::ZeroMaxFailures));
    assert_eq!(
        SessionState::resume(0, 4, 3),
        Err(ScanError::FailuresAboveLimit {
            consecutive_failures: 4,
            max_failures: 3,
        })
    );

    let at_ceiling = SessionState::resume(9, 3, 3).unwrap();
    assert!(at_ceiling.limit_reached());
    assert_eq!(at_ceiling.cursor(), 9);
}

#[test]
fn card_requires_http_url_when_present() {
    let now = Utc::now();
    assert!(Card::new(0, Some("https://cdn.example.com/a.mp4".into()), 1, now).is_ok());
    assert!(Card::new(0, Some("http://cdn.example.com/a.webp".into()), 1, now).is_ok());
    assert!(Card::new(0, None, 1, now).is_ok());

    assert_eq!(
        Card::new(0, Some("   ".into()), 1, now),
        Err(CardError::EmptyUrl)
    );
    assert!(matches!(
        Card::new(0, Some("/relative/path.webp".into()), 1, now),
        Err(CardError::InvalidUrl { .. })
    ));
    assert!(matches!(
        Card::new(0, Some("data:image/png;base64,AAAA".into()), 1, now),
        Err(CardError::UnsupportedScheme { .. })
    ));
}

#[test]
fn stop_reason_codes_are_stable() {
    let reasons = [
        (StopReason::EndOfProfile, "end_of_profile"),
        (StopReason::NoHitsAfterLimit, "no_hits_after_limit"),
        (StopReason::ProviderUnavailable, "provider_unavailable"),
        (StopReason::InvalidCard, "invalid_card"),
        (
            StopReason::Provider("session expired".to_string()),
            "provider_error: session expired",
        ),
    ];
    for (reason, code) in reasons {
        assert_eq!(reason.code(), code);
        assert_eq!(reason.to_string(), code);
    }
}

#[test]
fn provider_message_cannot_pose_as_fixed_code() {
    let reason = StopReason::Provider("end_of_profile".to_string());
    assert_eq!(reason.to_string(), "provider_error: end_of_profile");
    assert_ne!(reason.code(), StopReason::EndOfProfile.code());
}
