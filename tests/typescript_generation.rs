//! TypeScript Generation Tests
//!
//! Validates that the types a timing UI consumes can be exported to
//! TypeScript when the tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_core_types_implement_specta_type() {
    use specta::Type;

    // If this compiles, all types are properly configured for TypeScript export.
    fn assert_type<T: Type>() {}

    // Events
    assert_type::<fds_timing::TimingEvent>();
    assert_type::<fds_timing::SessionPhase>();
    assert_type::<fds_timing::Outcome>();
    assert_type::<fds_timing::WallClockTime>();
    assert_type::<fds_timing::Packet>();
    assert_type::<fds_timing::UpdateRate>();

    // Configuration
    assert_type::<fds_timing::TimingConfig>();
    assert_type::<fds_timing::Precision>();
    assert_type::<fds_timing::TimeFormat>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    // Types still compile without specta::Type
    let _ = fds_timing::UpdateRate::Native;
    let _ = fds_timing::TimingConfig::default();
}
