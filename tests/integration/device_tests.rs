//! Device drivers against slave models and traced sockets.

use modbang::adapters::sim::{SimBoard, SimDelay, SimLine, SimSlave, Trace};
use modbang::board::{SocketPin, SocketType, spi_pins};
use modbang::drivers::lcd::{self, CharLcd, Geometry};
use modbang::drivers::stepper::{self, Direction, MotorState, Stepper, reg};
use modbang::sensors::{Adc16, Channel, Daq8, DistanceSensor, adc16, daq8};
use modbang::{DistanceConfig, Error, SensorError};

use crate::mock_hw::{board_with_slave, echo_for, trace_all_pins};

// ── DAQ ───────────────────────────────────────────────────────

#[test]
fn daq_p1_sends_0x0200_then_reads_result() -> anyhow::Result<()> {
    let slave = crate::mock_hw::slave(daq8::BUS.mode(), daq8::FRAME_WIDTH);
    slave.respond_all(&[0x0000, 0xF800]);
    let mut board = board_with_slave(1, &[SocketType::Y], &slave);
    let mut daq = Daq8::from_socket(&mut board, 1, SimDelay::new())?;

    // Upper nibble is outside the 12-bit result and must be dropped.
    assert_eq!(daq.read_raw(Channel::P1)?, 0x800);
    assert_eq!(slave.received_words(), vec![vec![0x0200, 0x0000]]);
    Ok(())
}

#[test]
fn daq_read_all_walks_channels_in_order() -> anyhow::Result<()> {
    let slave = crate::mock_hw::slave(daq8::BUS.mode(), daq8::FRAME_WIDTH);
    for code in 0..8u32 {
        slave.respond_all(&[0, code * 0x100]);
    }
    let mut board = board_with_slave(2, &[SocketType::Y, SocketType::X], &slave);
    let mut daq = Daq8::from_socket(&mut board, 2, SimDelay::new())?;

    let volts = daq.read_all()?;
    let commands: Vec<u32> = slave.received_words().iter().map(|f| f[0]).collect();
    assert_eq!(
        commands,
        vec![0x0200, 0x0400, 0x0600, 0x0800, 0x0A00, 0x0C00, 0x0E00, 0x1000]
    );
    assert_eq!(volts[0], 0.0);
    assert!((volts[4] - 4.096 * 1024.0 / 4095.0).abs() < 1e-4);
    Ok(())
}

// ── 16-bit ADC ────────────────────────────────────────────────

#[test]
fn adc16_full_scale_is_4_096() -> anyhow::Result<()> {
    let slave = crate::mock_hw::slave(adc16::BUS.mode(), adc16::FRAME_WIDTH);
    slave.respond(0x3FFF);
    let mut board = board_with_slave(1, &[SocketType::Y], &slave);
    let mut adc = Adc16::from_socket(&mut board, 1, SimDelay::new())?;
    assert_eq!(adc.read_voltage()?, 4.096);
    assert_eq!(slave.frames().len(), 1);
    Ok(())
}

// ── Stepper ───────────────────────────────────────────────────

type SimStepper = Stepper<SimLine, SimLine, SimLine, SimLine, SimDelay, SimLine>;

fn stepper_rig(replies: &[u32]) -> anyhow::Result<(SimStepper, SimSlave, SimBoard)> {
    let slave = crate::mock_hw::slave(stepper::BUS.mode(), 8);
    slave.respond_all(replies);
    let mut board = board_with_slave(3, &[SocketType::Y], &slave);
    let motor = Stepper::from_socket(&mut board, 3, SimDelay::new())?;
    Ok((motor, slave, board))
}

fn frames(slave: &SimSlave) -> Vec<u32> {
    slave.received_words().into_iter().flatten().collect()
}

#[test]
fn stepper_holds_reset_high_and_reserves_five_pins() -> anyhow::Result<()> {
    let (_motor, _slave, mut board) = stepper_rig(&[])?;
    assert_eq!(board.reserved_count(), 5);
    assert!(board.line(3, stepper::RESET_PIN).level());
    assert!(board.is_reserved(3, spi_pins::CS));
    Ok(())
}

#[test]
fn stepper_set_param_is_one_frame_per_byte() -> anyhow::Result<()> {
    let (mut motor, slave, _board) = stepper_rig(&[])?;
    motor.set_param(reg::ACC, 0x08A)?;
    assert_eq!(slave.frames().len(), 3);
    assert_eq!(frames(&slave), vec![0x05, 0x00, 0x8A]);
    Ok(())
}

#[test]
fn stepper_rejects_value_wider_than_register() -> anyhow::Result<()> {
    let (mut motor, slave, _board) = stepper_rig(&[])?;
    assert!(matches!(
        motor.set_param(reg::KVAL_RUN, 0x100),
        Err(Error::InvalidParameter(_))
    ));
    assert!(motor.move_steps(Direction::Forward, stepper::MAX_STEPS + 1).is_err());
    assert!(motor.run(Direction::Forward, 1.0e6).is_err());
    assert!(slave.frames().is_empty());
    Ok(())
}

#[test]
fn stepper_run_encodes_direction_and_speed() -> anyhow::Result<()> {
    let (mut motor, slave, _board) = stepper_rig(&[])?;
    motor.run(Direction::Forward, 1.0)?;
    motor.move_steps(Direction::Reverse, 0x01_0203)?;
    assert_eq!(
        frames(&slave),
        vec![0x51, 0x00, 0x00, 0x43, 0x40, 0x01, 0x02, 0x03]
    );
    Ok(())
}

#[test]
fn stepper_go_to_negative_position() -> anyhow::Result<()> {
    let (mut motor, slave, _board) = stepper_rig(&[])?;
    motor.go_to(-2)?;
    assert_eq!(frames(&slave), vec![0x60, 0x3F, 0xFF, 0xFE]);
    Ok(())
}

#[test]
fn stepper_reads_signed_position() -> anyhow::Result<()> {
    let (mut motor, slave, _board) = stepper_rig(&[0x00, 0x3F, 0xFF, 0xFF])?;
    assert_eq!(motor.position()?, -1);
    assert_eq!(frames(&slave), vec![0x21, 0x00, 0x00, 0x00]);
    Ok(())
}

#[test]
fn stepper_status_decodes_flags() -> anyhow::Result<()> {
    // BUSY released, running forward at constant speed, no faults.
    let (mut motor, slave, _board) = stepper_rig(&[0x00, 0x7E, 0x72])?;
    let status = motor.status()?;
    assert_eq!(status.raw(), 0x7E72);
    assert!(!status.busy());
    assert_eq!(status.direction(), Direction::Forward);
    assert_eq!(status.motor_state(), MotorState::ConstantSpeed);
    assert!(!status.has_fault());
    assert_eq!(frames(&slave), vec![0xD0, 0x00, 0x00]);
    Ok(())
}

#[test]
fn stepper_speed_and_acceleration_conversions() -> anyhow::Result<()> {
    let (mut motor, slave, _board) = stepper_rig(&[])?;
    // 1000 * 0.065536 = 65.5 -> 0x42
    motor.set_max_speed(1000.0)?;
    // 100 * 4.194304 = 419.4 -> 0x1A3
    motor.set_min_speed(100.0)?;
    // 2000 * 0.0687195 = 137.4 -> 0x89
    motor.set_acceleration(2000.0)?;
    // 1000 * 0.0687195 = 68.7 -> 0x45
    motor.set_deceleration(1000.0)?;
    assert_eq!(
        frames(&slave),
        vec![0x07, 0x00, 0x42, 0x08, 0x01, 0xA3, 0x05, 0x00, 0x89, 0x06, 0x00, 0x45]
    );
    Ok(())
}

#[test]
fn stepper_out_of_range_conversions_send_nothing() -> anyhow::Result<()> {
    let (mut motor, slave, _board) = stepper_rig(&[])?;
    assert!(matches!(motor.set_max_speed(1.0e6), Err(Error::InvalidParameter(_))));
    assert!(matches!(motor.set_min_speed(-1.0), Err(Error::InvalidParameter(_))));
    assert!(matches!(motor.set_acceleration(1.0e6), Err(Error::InvalidParameter(_))));
    assert!(matches!(motor.set_deceleration(f32::NAN), Err(Error::InvalidParameter(_))));
    assert!(slave.frames().is_empty());
    Ok(())
}

#[test]
fn stepper_hard_reset_pulses_reset_low() -> anyhow::Result<()> {
    let slave = crate::mock_hw::slave(stepper::BUS.mode(), 8);
    let mut board = board_with_slave(3, &[SocketType::Y], &slave);
    let trace = Trace::new();
    board.attach(3, stepper::RESET_PIN, SimLine::new("rst").traced(&trace));
    let mut motor = Stepper::from_socket(&mut board, 3, SimDelay::new())?;
    assert_eq!(trace.levels("rst"), vec![true]);

    trace.clear();
    motor.hard_reset()?;
    assert_eq!(trace.levels("rst"), vec![false, true]);
    assert!(board.line(3, stepper::RESET_PIN).level());
    assert!(slave.frames().is_empty());
    Ok(())
}

#[test]
fn stepper_is_busy_follows_busy_flag() -> anyhow::Result<()> {
    // BUSY is active low: 0x7E72 has it released, 0x7E70 asserted.
    let (mut motor, slave, _board) = stepper_rig(&[0x00, 0x7E, 0x72, 0x00, 0x7E, 0x70])?;
    assert!(!motor.is_busy()?);
    assert!(motor.is_busy()?);
    assert_eq!(frames(&slave), vec![0xD0, 0x00, 0x00, 0xD0, 0x00, 0x00]);
    Ok(())
}

#[test]
fn stepper_single_byte_commands() -> anyhow::Result<()> {
    let (mut motor, slave, _board) = stepper_rig(&[])?;
    motor.soft_stop()?;
    motor.hard_stop()?;
    motor.soft_hiz()?;
    motor.hard_hiz()?;
    motor.go_home()?;
    motor.reset_position()?;
    motor.reset_device()?;
    assert_eq!(
        frames(&slave),
        vec![0xB0, 0xB8, 0xA0, 0xA8, 0x70, 0xD8, 0xC0]
    );
    Ok(())
}

// ── Character LCD ─────────────────────────────────────────────

#[test]
fn lcd_on_socket_sends_init_nibbles() -> anyhow::Result<()> {
    let trace = Trace::new();
    let mut board = SimBoard::new().with_socket(4, &[SocketType::Y]);
    trace_all_pins(&mut board, 4, &trace);
    let mut display = CharLcd::from_socket(&mut board, 4, SimDelay::new(), Geometry::default())?;
    assert!(board.line(4, lcd::BACKLIGHT_PIN).level());

    trace.clear();
    display.init()?;
    display.set_cursor(1, 0)?;
    display.print("ok")?;

    let mut expected: Vec<(bool, u8)> = lcd::INIT_SEQUENCE
        .iter()
        .flat_map(|b| [(false, b >> 4), (false, b & 0x0F)])
        .collect();
    expected.extend([(false, 0xC), (false, 0x0)]);
    expected.extend([(true, 0x6), (true, 0xF), (true, 0x6), (true, 0xB)]);

    let data = lcd::DATA_PINS.map(SocketPin::name);
    let nibbles = crate::mock_hw::lcd_nibbles(
        &trace,
        lcd::E_PIN.name(),
        lcd::RS_PIN.name(),
        data,
    );
    assert_eq!(nibbles, expected);
    Ok(())
}

#[test]
fn lcd_clear_home_and_display_commands() -> anyhow::Result<()> {
    let trace = Trace::new();
    let mut board = SimBoard::new().with_socket(4, &[SocketType::Y]);
    trace_all_pins(&mut board, 4, &trace);
    let mut display = CharLcd::from_socket(&mut board, 4, SimDelay::new(), Geometry::default())?;

    trace.clear();
    display.clear()?;
    display.home()?;
    display.display(false)?;
    display.cursor(true, true)?;
    display.display(true)?;

    let data = lcd::DATA_PINS.map(SocketPin::name);
    let nibbles = crate::mock_hw::lcd_nibbles(&trace, lcd::E_PIN.name(), lcd::RS_PIN.name(), data);
    assert_eq!(
        nibbles,
        vec![
            (false, 0x0),
            (false, 0x1),
            (false, 0x0),
            (false, 0x2),
            (false, 0x0),
            (false, 0x8),
            // Cursor and blink on, display still blanked.
            (false, 0x0),
            (false, 0xB),
            (false, 0x0),
            (false, 0xF),
        ]
    );
    Ok(())
}

#[test]
fn lcd_backlight_toggles_line() -> anyhow::Result<()> {
    let mut board = SimBoard::new().with_socket(4, &[SocketType::Y]);
    let mut display = CharLcd::from_socket(&mut board, 4, SimDelay::new(), Geometry { rows: 4, cols: 20 })?;
    display.backlight(false)?;
    assert!(!board.line(4, lcd::BACKLIGHT_PIN).level());
    assert!(display.set_cursor(3, 19).is_ok());
    assert!(display.set_cursor(4, 0).is_err());
    Ok(())
}

// ── Distance ──────────────────────────────────────────────────

#[test]
fn distance_on_x_socket_averages_pings() -> anyhow::Result<()> {
    let mut board = SimBoard::new().with_socket(5, &[SocketType::X]);
    let echo = SimLine::scripted("echo", &echo_for(116), false);
    echo.push_levels(&echo_for(174));
    board.attach(5, SocketPin::Three, echo);
    let trigger_trace = Trace::new();
    board.attach(5, SocketPin::Four, SimLine::new("trig").traced(&trigger_trace));

    let mut ranger = DistanceSensor::from_socket(&mut board, 5, SimDelay::new(), DistanceConfig::default())?;
    let cm = ranger.measure_cm(2)?;
    assert!((cm - 25.0).abs() < 1e-2, "got {cm}");
    // Idle low at reservation, then one high-low pulse per ping.
    assert_eq!(trigger_trace.levels("trig"), vec![false, true, false, true, false]);
    Ok(())
}

#[test]
fn distance_config_rate_above_100_is_clamped() -> anyhow::Result<()> {
    let mut board = SimBoard::new().with_socket(5, &[SocketType::X]);
    let config = DistanceConfig {
        acceptable_error_rate: 150,
        ..DistanceConfig::default()
    };
    let ranger = DistanceSensor::from_socket(&mut board, 5, SimDelay::new(), config)?;
    assert_eq!(ranger.config().acceptable_error_rate, 100);
    Ok(())
}

#[test]
fn distance_without_echo_reports_no_echo() -> anyhow::Result<()> {
    let mut board = SimBoard::new().with_socket(5, &[SocketType::Y]);
    board.attach(5, SocketPin::Three, SimLine::scripted("echo", &[], false));
    let mut ranger = DistanceSensor::from_socket(&mut board, 5, SimDelay::new(), DistanceConfig::default())?;
    assert_eq!(ranger.measure_cm(3), Err(Error::Sensor(SensorError::NoEcho)));
    Ok(())
}
