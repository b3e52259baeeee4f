//! Construction on the mainboard: socket type checks, pin conflicts and
//! rollback of partial reservations.

use modbang::adapters::sim::{SimBoard, SimDelay, Trace};
use modbang::board::{SocketPin, SocketType, spi_pins};
use modbang::drivers::lcd::{CharLcd, Geometry};
use modbang::drivers::stepper::Stepper;
use modbang::sensors::{Adc16, Daq8, DistanceSensor};
use modbang::{DistanceConfig, Error, SocketError};

use crate::mock_hw::trace_all_pins;

#[test]
fn unsupported_socket_reserves_and_drives_nothing() {
    let trace = Trace::new();
    let mut board = SimBoard::new().with_socket(6, &[SocketType::A, SocketType::I]);
    trace_all_pins(&mut board, 6, &trace);

    let daq = Daq8::from_socket(&mut board, 6, SimDelay::new());
    assert!(matches!(
        daq,
        Err(Error::Socket(SocketError::UnsupportedType { socket: 6, driver: "Daq8" }))
    ));
    let adc = Adc16::from_socket(&mut board, 6, SimDelay::new());
    assert!(adc.is_err());
    let motor = Stepper::from_socket(&mut board, 6, SimDelay::new());
    assert!(motor.is_err());
    let display = CharLcd::from_socket(&mut board, 6, SimDelay::new(), Geometry::default());
    assert!(display.is_err());
    let ranger = DistanceSensor::from_socket(&mut board, 6, SimDelay::new(), DistanceConfig::default());
    assert!(ranger.is_err());

    assert_eq!(board.reserved_count(), 0);
    assert!(trace.events().is_empty(), "no line may be touched");
}

#[test]
fn missing_socket_is_reported() {
    let mut board = SimBoard::new().with_socket(1, &[SocketType::Y]);
    assert!(matches!(
        Daq8::from_socket(&mut board, 9, SimDelay::new()),
        Err(Error::Socket(SocketError::NoSuchSocket(9)))
    ));
}

#[test]
fn pin_conflict_rolls_back_second_driver() -> anyhow::Result<()> {
    let mut board = SimBoard::new().with_socket(1, &[SocketType::Y]);
    let _daq = Daq8::from_socket(&mut board, 1, SimDelay::new())?;
    assert_eq!(board.reserved_count(), 4);

    // Reset pin 3 is free, so the stepper gets it before hitting CS.
    let motor = Stepper::from_socket(&mut board, 1, SimDelay::new());
    assert!(matches!(
        motor,
        Err(Error::Socket(SocketError::PinInUse { socket: 1, pin: 6 }))
    ));
    assert_eq!(board.reserved_count(), 4);
    assert!(!board.is_reserved(1, SocketPin::Three));
    assert!(board.is_reserved(1, spi_pins::CS));
    Ok(())
}

#[test]
fn unrouted_pin_rolls_back_lcd() {
    let mut board = SimBoard::new().with_socket(2, &[SocketType::Y]);
    board.unroute(2, SocketPin::Eight);
    let display = CharLcd::from_socket(&mut board, 2, SimDelay::new(), Geometry::default());
    assert!(matches!(
        display,
        Err(Error::Socket(SocketError::PinNotRouted { socket: 2, pin: 8 }))
    ));
    assert_eq!(board.reserved_count(), 0);
}

#[test]
fn bad_geometry_fails_before_reserving() {
    let mut board = SimBoard::new().with_socket(2, &[SocketType::Y]);
    let display = CharLcd::from_socket(&mut board, 2, SimDelay::new(), Geometry { rows: 5, cols: 16 });
    assert!(matches!(display, Err(Error::InvalidParameter(_))));
    assert_eq!(board.reserved_count(), 0);
}

#[test]
fn ranger_and_adc_share_a_y_socket() -> anyhow::Result<()> {
    // Ranger uses pins 3/4, the bus uses 6..9.
    let mut board = SimBoard::new().with_socket(1, &[SocketType::Y]);
    let _ranger = DistanceSensor::from_socket(&mut board, 1, SimDelay::new(), DistanceConfig::default())?;
    let _adc = Adc16::from_socket(&mut board, 1, SimDelay::new())?;
    assert_eq!(board.reserved_count(), 6);
    Ok(())
}
