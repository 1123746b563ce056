//! Property tests: whatever goes into the design comes out, byte for byte,
//! in order.

use proptest::prelude::*;
use strobe_config::{DelayRange, RunConfig};
use strobe_sim::{AxisFifo, AxisLoopback, Design};
use strobe_tb::{
    AxiStreamBus, AxiStreamDriveLogic, AxiStreamReceiveLogic, Driver, Environment, Monitor,
    RunReport, Scoreboard, Transaction,
};

fn run(
    design: impl Design + 'static,
    config: RunConfig,
    packets: Vec<Transaction>,
    scoreboard: Option<Scoreboard>,
) -> RunReport {
    let mut env = Environment::new(design, config).unwrap();
    if let Some(scoreboard) = scoreboard {
        env.set_scoreboard(scoreboard);
    }
    let s = AxiStreamBus::from_prefix("s_axis", env.signals()).unwrap();
    let m = AxiStreamBus::from_prefix("m_axis", env.signals()).unwrap();
    let seed = env.component_seed();
    env.add_driver(
        Driver::new("s_axis", AxiStreamDriveLogic::new(s), seed),
        move |_: &RunConfig| packets.clone(),
    );
    let seed = env.component_seed();
    env.add_monitor(Monitor::new("m_axis", AxiStreamReceiveLogic::new(m), seed));
    env.add_reset_signal("rst").unwrap();
    env.run().unwrap()
}

fn config(target: usize, seed: u64) -> RunConfig {
    RunConfig {
        scoreboard_expected_matches: Some(target as u64),
        seed: Some(seed),
        watchdog_timeout_cycles: 100_000,
        driver_pre_delay_range: DelayRange::new(0, 2),
        driver_post_delay_range: DelayRange::new(0, 2),
        ..RunConfig::default()
    }
}

fn packets() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..=40), 1..=6)
}

fn width() -> impl Strategy<Value = u32> {
    prop::sample::select(vec![8u32, 16, 32, 64])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn loopback_round_trip_without_stalls(packets in packets(), width in width(), seed in any::<u64>()) {
        let count = packets.len();
        let report = run(
            AxisLoopback::new(width, true).unwrap(),
            config(count, seed),
            packets.into_iter().map(Transaction::new).collect(),
            None,
        );
        prop_assert_eq!(report.matches, count as u64);
        prop_assert_eq!(report.received, count as u64);
    }

    #[test]
    fn fifo_round_trip_under_stalls(
        packets in packets(),
        width in width(),
        depth in 1usize..=4,
        driver_stall in 0.0f64..0.9,
        monitor_stall in 0.0f64..0.9,
        seed in any::<u64>(),
    ) {
        let count = packets.len();
        let config = RunConfig {
            driver_stall_probability: driver_stall,
            monitor_stall_probability: monitor_stall,
            ..config(count, seed)
        };
        let report = run(
            AxisFifo::new(width, depth, true).unwrap(),
            config,
            packets.into_iter().map(Transaction::new).collect(),
            None,
        );
        prop_assert_eq!(report.matches, count as u64);
        prop_assert_eq!(report.driven, count as u64);
    }

    #[test]
    fn identity_model_changes_nothing(packets in packets(), seed in any::<u64>()) {
        let count = packets.len();
        let report = run(
            AxisLoopback::new(32, true).unwrap(),
            config(count, seed),
            packets.into_iter().map(Transaction::new).collect(),
            Some(Scoreboard::new().with_model(|t| Transaction::new(t.into_bytes()))),
        );
        prop_assert_eq!(report.matches, count as u64);
    }
}
