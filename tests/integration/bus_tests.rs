//! Chip-select framing and word shifting on a traced loopback bus.

use std::panic::{AssertUnwindSafe, catch_unwind};

use modbang::Error;
use modbang::bus::ClockMode;

use crate::mock_hw::{LoopbackRig, MODES, board_with_slave, slave};

/// Indices of every clock write in the trace.
fn clock_edges(rig: &LoopbackRig) -> Vec<usize> {
    rig.trace
        .events()
        .iter()
        .enumerate()
        .filter(|(_, (name, _))| *name == "sck")
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn select_brackets_every_clock_edge() -> anyhow::Result<()> {
    for mode in MODES {
        let mut rig = LoopbackRig::new(mode);
        let mut word = [0x2C3Au32];
        rig.spi.transfer_words(&mut rig.cs, &mut word, 14)?;

        assert_eq!(rig.trace.levels("cs"), vec![false, true], "{mode:?}");
        let asserted = rig.trace.first("cs", false).unwrap();
        let released = rig.trace.last("cs").unwrap();
        let edges = clock_edges(&rig);
        assert_eq!(edges.len(), 28, "two edges per bit");
        assert!(asserted < edges[0]);
        assert!(released > *edges.last().unwrap());
        assert_eq!(word[0], 0x2C3A);
    }
    Ok(())
}

#[test]
fn failing_body_still_releases_select() {
    let mut rig = LoopbackRig::new(ClockMode::MODE_0);
    let result: Result<(), Error> = rig.spi.with_select(&mut rig.cs, |spi| {
        spi.shift_word(0xF, 4)?;
        Err(Error::InvalidParameter("device rejected command"))
    });
    assert_eq!(result, Err(Error::InvalidParameter("device rejected command")));
    assert_eq!(rig.trace.levels("cs"), vec![false, true]);
    assert!(rig.trace.last("cs").unwrap() > *clock_edges(&rig).last().unwrap());
}

#[test]
fn invalid_width_inside_transaction_releases_select() {
    let mut rig = LoopbackRig::new(ClockMode::MODE_0);
    let result = rig
        .spi
        .with_select(&mut rig.cs, |spi| spi.shift_word(1, 40));
    assert!(matches!(result, Err(Error::InvalidParameter(_))));
    assert_eq!(rig.trace.levels("cs"), vec![false, true]);
    assert!(clock_edges(&rig).is_empty());
}

#[test]
fn panicking_body_still_releases_select() {
    let mut rig = LoopbackRig::new(ClockMode::MODE_3);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), Error> = rig.spi.with_select(&mut rig.cs, |spi| {
            spi.shift_word(0xA, 4)?;
            panic!("driver bug");
        });
    }));
    assert!(outcome.is_err());
    assert_eq!(rig.trace.levels("cs"), vec![false, true]);
}

#[test]
fn a5_loops_back() -> anyhow::Result<()> {
    let mut rig = LoopbackRig::new(ClockMode::MODE_0);
    assert_eq!(rig.spi.shift_word(0xA5, 8)?, 0xA5);
    Ok(())
}

#[test]
fn two_bit_word_goes_msb_first() -> anyhow::Result<()> {
    let mut rig = LoopbackRig::new(ClockMode::MODE_0);
    rig.spi.shift_word(0b10, 2)?;
    assert_eq!(rig.trace.levels("mosi"), vec![true, false]);
    Ok(())
}

#[test]
fn slave_exchange_in_every_mode_and_width() -> anyhow::Result<()> {
    use modbang::bus::{BusDevice, Polarity};
    use modbang::{BusConfig, SocketType};
    use modbang::adapters::sim::SimDelay;

    for mode in MODES {
        for (width, out, reply) in [
            (8u8, 0x3Cu32, 0xC3u32),
            (14, 0x2001, 0x1FFE),
            (16, 0xBEEF, 0x1234),
            (32, 0x8000_0001, 0x7FFF_FFFE),
        ] {
            let dev_slave = slave(mode, width);
            dev_slave.respond(reply);
            let mut board = board_with_slave(1, &[SocketType::Y], &dev_slave);
            let config = BusConfig {
                clock_idle: mode.idle,
                sample_edge: mode.sample,
                select_polarity: Polarity::ActiveLow,
                settle_ns: 0,
            };
            let mut dev = BusDevice::open(
                &mut board,
                1,
                &[SocketType::Y],
                "probe",
                &config,
                SimDelay::new(),
            )?;
            assert_eq!(dev.exchange(out, width)?, reply, "{mode:?} width {width}");
            assert_eq!(dev_slave.received_words(), vec![vec![out]]);
            assert!(!dev_slave.is_selected());
        }
    }
    Ok(())
}
