//! 执行器时序测试
//!
//! 使用虚拟时钟验证运动时长、写入顺序、原点状态和故障处理。

use dispenser_driver::*;
use dispenser_gpio::PinLevel;
use dispenser_gpio::mock::MockBackend;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SETTLE: Duration = Duration::from_millis(100);

fn enabled_config() -> ActuatorConfig {
    ActuatorConfig {
        enabled: true,
        ..Default::default()
    }
}

fn build(config: ActuatorConfig, backend: &MockBackend) -> (ActuatorController, VirtualClock) {
    let clock = VirtualClock::new();
    let controller = ActuatorBuilder::new(config)
        .clock(Arc::new(clock.clone()))
        .build(backend)
        .unwrap();
    (controller, clock)
}

fn w(line: &str, level: PinLevel) -> (String, PinLevel) {
    (line.to_string(), level)
}

/// 2s 运动 + 2s 停顿：总时长落在 [6000, 6400] ms
#[test]
fn test_trigger_total_time_within_bounds() {
    let backend = MockBackend::new();
    let (mut controller, clock) = build(enabled_config(), &backend);
    controller.home().unwrap();

    let before = clock.elapsed();
    let report = controller.trigger().unwrap();

    assert!(!report.simulated);
    let ms = report.total_time_ms();
    assert!((6000..=6400).contains(&ms), "total_time_ms = {}", ms);
    assert_eq!(clock.elapsed() - before, report.total);
    assert!(controller.is_home());
}

/// 伸出和缩回使用完全相同的时长，每次停止后都有静止延迟
#[test]
fn test_trigger_sleeps_are_symmetric() {
    let backend = MockBackend::new();
    let config = ActuatorConfig {
        movement_time: Duration::from_millis(1500),
        pause_time: Duration::from_millis(700),
        cooldown: Duration::from_millis(250),
        ..enabled_config()
    };
    let (mut controller, clock) = build(config, &backend);
    controller.home().unwrap();
    clock.clear_sleeps();

    controller.trigger().unwrap();

    let movement = Duration::from_millis(1500);
    assert_eq!(
        clock.sleeps(),
        vec![
            movement,
            SETTLE,
            Duration::from_millis(700),
            movement,
            SETTLE,
            Duration::from_millis(250),
        ]
    );
}

#[test]
fn test_trigger_write_order() {
    let backend = MockBackend::new();
    let (mut controller, _) = build(enabled_config(), &backend);
    controller.home().unwrap();
    backend.clear_events();

    controller.trigger().unwrap();

    assert_eq!(
        backend.writes(),
        vec![
            // 伸出
            w("GPIO8", PinLevel::High),
            w("GPIO7", PinLevel::Low),
            // 停止
            w("GPIO8", PinLevel::Low),
            w("GPIO7", PinLevel::Low),
            // 缩回
            w("GPIO8", PinLevel::Low),
            w("GPIO7", PinLevel::High),
            // 停止
            w("GPIO8", PinLevel::Low),
            w("GPIO7", PinLevel::Low),
        ]
    );
}

#[test]
fn test_trigger_from_unknown_still_ends_home() {
    let backend = MockBackend::new();
    let (mut controller, _) = build(enabled_config(), &backend);
    assert_eq!(controller.phase(), ActuatorPhase::Unknown);

    controller.trigger().unwrap();
    assert!(controller.is_home());
}

#[test]
fn test_home_from_any_resting_state() {
    let backend = MockBackend::new();
    let (mut controller, clock) = build(enabled_config(), &backend);

    // Unknown -> Home
    controller.home().unwrap();
    assert!(controller.is_home());

    // 伸出后 -> Home
    controller.extend(Duration::from_secs(2)).unwrap();
    assert!(!controller.is_home());
    clock.clear_sleeps();
    controller.home().unwrap();
    assert!(controller.is_home());
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(10), SETTLE]);

    // Home -> Home
    controller.home().unwrap();
    assert!(controller.is_home());
}

/// 单向缩回不会把未知提升为原点，即使时长超过归零时长
#[test]
fn test_retract_does_not_claim_home() {
    let backend = MockBackend::new();
    let (mut controller, _) = build(enabled_config(), &backend);

    controller.retract(Duration::from_secs(30)).unwrap();
    assert_eq!(controller.phase(), ActuatorPhase::Unknown);
    assert!(!controller.is_home());

    // 已在原点时缩回，仍然在原点
    controller.home().unwrap();
    controller.retract(Duration::from_millis(200)).unwrap();
    assert!(controller.is_home());
}

#[test]
fn test_extend_and_retract_use_caller_duration() {
    let backend = MockBackend::new();
    let (mut controller, clock) = build(enabled_config(), &backend);

    controller.extend(Duration::from_millis(1200)).unwrap();
    controller.retract(Duration::from_millis(1200)).unwrap();

    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_millis(1200),
            SETTLE,
            Duration::from_millis(1200),
            SETTLE
        ]
    );
}

#[test]
fn test_simulated_mode_zero_hardware_calls() {
    let backend = MockBackend::new().with_missing("GPIO25");
    let (mut controller, clock) = build(enabled_config(), &backend);
    assert!(controller.is_simulated());
    let acquisitions = backend.hardware_calls();

    controller.home().unwrap();
    clock.clear_sleeps();
    let report = controller.trigger().unwrap();
    controller.extend(Duration::from_secs(1)).unwrap();
    controller.retract(Duration::from_secs(1)).unwrap();
    controller.stop_motor().unwrap();
    controller.cleanup();

    assert_eq!(backend.hardware_calls(), acquisitions);
    assert!(report.simulated);
    assert_eq!(report.total_time_ms(), 6200);
    // 仿真模式同样执行等待
    assert_eq!(clock.sleeps()[..5].iter().sum::<Duration>(), report.total);
}

#[test]
fn test_simulated_matches_real_timing() {
    let real_backend = MockBackend::new();
    let (mut real, _) = build(enabled_config(), &real_backend);
    let (mut simulated, _) = build(ActuatorConfig::default(), &MockBackend::new());

    let real_report = real.trigger().unwrap();
    let simulated_report = simulated.trigger().unwrap();

    assert_eq!(real_report.total, simulated_report.total);
}

#[test]
fn test_write_failure_aborts_movement() {
    let backend = MockBackend::new();
    let (mut controller, clock) = build(enabled_config(), &backend);
    controller.home().unwrap();
    clock.clear_sleeps();

    backend.fail_writes("GPIO8");
    let err = controller.trigger().unwrap_err();

    assert!(err.is_hardware_write());
    assert!(matches!(
        err,
        DriverError::HardwareWrite {
            role: LineRole::DirectionA,
            ..
        }
    ));
    assert_eq!(controller.phase(), ActuatorPhase::Unknown);
    // 中止后不再等待
    assert!(clock.sleeps().is_empty());
    // 尽力停止：direction-B 已置低
    assert_eq!(backend.level("GPIO7"), Some(PinLevel::Low));

    // 恢复后可以重新归零
    backend.restore_writes("GPIO8");
    controller.home().unwrap();
    assert!(controller.is_home());
}

#[test]
fn test_cleanup_without_init_is_noop() {
    let mut controller =
        ActuatorController::new(ActuatorConfig::default(), Arc::new(VirtualClock::new())).unwrap();
    controller.cleanup();
    controller.cleanup();
    assert!(!controller.is_initialized());
}

#[test]
fn test_primitives_after_cleanup_fail() {
    let backend = MockBackend::new();
    let (mut controller, _) = build(enabled_config(), &backend);
    controller.cleanup();

    assert!(matches!(
        controller.extend(Duration::from_secs(1)),
        Err(DriverError::NotInitialized)
    ));
}

/// 真实时钟：实际耗时不少于标称时长
#[test]
fn test_system_clock_lower_bound() {
    let config = ActuatorConfig {
        movement_time: Duration::from_millis(30),
        pause_time: Duration::from_millis(20),
        settling_delay: Duration::from_millis(5),
        homing_duration: Duration::from_millis(100),
        ..Default::default()
    };
    let mut controller = ActuatorBuilder::new(config.clone()).build_simulated().unwrap();

    let start = Instant::now();
    let report = controller.trigger().unwrap();
    let wall = start.elapsed();

    assert_eq!(report.total, Duration::from_millis(90));
    assert!(wall >= Duration::from_millis(90), "wall = {:?}", wall);
}

proptest! {
    #[test]
    fn prop_trigger_covers_both_strokes_and_pause(
        movement_ms in 1u64..5_000,
        pause_ms in 1u64..5_000,
    ) {
        let backend = MockBackend::new();
        let config = ActuatorConfig {
            movement_time: Duration::from_millis(movement_ms),
            pause_time: Duration::from_millis(pause_ms),
            homing_duration: Duration::from_millis(movement_ms + 1),
            ..enabled_config()
        };
        let (mut controller, _) = build(config, &backend);

        let report = controller.trigger().unwrap();
        prop_assert!(report.total_time_ms() >= 2 * movement_ms + pause_ms);
        prop_assert_eq!(
            report.total_time_ms(),
            2 * movement_ms + pause_ms + 2 * SETTLE.as_millis() as u64
        );
        prop_assert!(controller.is_home());
    }
}
