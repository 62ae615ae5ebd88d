//! Property-based tests for the locomotor crate.
//!
//! The intermitter must never engage crawler and feeder together, whatever
//! the cycle reports and reflexes thrown at it, and every bout it records
//! must respect the configured bounds. The turner must stay finite.

use larva_core::{
    AgentRng, BoutDistribution, CrawlerConfig, FeederConfig, IntermitterConfig, TurnerConfig,
    TurnerMode,
};
use larva_locomotor::{
    BoutKind, Coupling, Crawler, Feeder, Intermitter, PhaseState, Turner, TurnerInhibition,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_intermitter_config() -> impl Strategy<Value = IntermitterConfig> {
    (
        0.2f64..5.0,
        0.0f64..3.0,
        1.0f64..5.0,
        1.1f64..2.5,
        1.0f64..30.0,
        0.0f64..=1.0,
        prop::option::of(0.0f64..=1.0),
    )
        .prop_map(|(mean, std, pause_max, alpha, chain_max, eeb, reoccurence)| IntermitterConfig {
            pause_dist: BoutDistribution::Lognormal {
                mean,
                std,
                range: [0.1, 0.1 + pause_max],
            },
            stridechain_dist: BoutDistribution::Powerlaw {
                alpha,
                range: [1.0, chain_max],
            },
            eeb,
            feeder_reoccurence_rate: reoccurence,
            ..IntermitterConfig::default()
        })
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Tick { crawl_done: bool, feed_done: bool },
    Trigger,
    Interrupt,
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        8 => (any::<bool>(), any::<bool>())
            .prop_map(|(crawl_done, feed_done)| Event::Tick { crawl_done, feed_done }),
        1 => Just(Event::Trigger),
        1 => Just(Event::Interrupt),
    ]
}

// ============================================================================
// Intermitter
// ============================================================================

proptest! {
    #[test]
    fn intermitter_never_engages_both(
        cfg in arb_intermitter_config(),
        events in prop::collection::vec(arb_event(), 1..400),
        seed in any::<u64>(),
    ) {
        let mut rng = AgentRng::seeded(seed);
        let mut i = Intermitter::new(&cfg, 0.1, true, true).unwrap();
        for event in events {
            match event {
                Event::Tick { crawl_done, feed_done } => i.update(&mut rng, crawl_done, feed_done),
                Event::Trigger => i.trigger_locomotion(&mut rng),
                Event::Interrupt => i.interrupt_locomotion(&mut rng),
            }
            prop_assert!(
                !(i.crawler_engaged() && i.feeder_engaged()),
                "crawler and feeder engaged together in {:?}", i.state()
            );
        }
    }

    #[test]
    fn uninterrupted_bouts_respect_bounds(
        cfg in arb_intermitter_config(),
        seed in any::<u64>(),
    ) {
        let mut rng = AgentRng::seeded(seed);
        let mut i = Intermitter::new(&cfg, 0.1, true, true).unwrap();
        for t in 0..2000u32 {
            // strides every 7 ticks, bites every 3
            i.update(&mut rng, t % 7 == 0, t % 3 == 0);
        }
        let (pause_lo, pause_hi) = cfg.pause_dist.tick_bounds(0.1);
        let (_, chain_hi) = cfg.stridechain_dist.count_bounds();
        for r in i.records() {
            match r.kind {
                BoutKind::Pause => prop_assert!(
                    r.duration_ticks >= pause_lo && r.duration_ticks <= pause_hi,
                    "pause of {} ticks outside [{}, {}]", r.duration_ticks, pause_lo, pause_hi
                ),
                BoutKind::Stridechain => prop_assert!(
                    r.length >= 1 && r.length <= chain_hi,
                    "stride chain of {} outside [1, {}]", r.length, chain_hi
                ),
                BoutKind::Feedchain => prop_assert!(r.length >= 1),
            }
        }
    }
}

// ============================================================================
// Effectors
// ============================================================================

proptest! {
    #[test]
    fn turner_output_is_finite(
        seed in any::<u64>(),
        neural in any::<bool>(),
        noise in 0.0f64..0.5,
        a_in in -2.0f64..2.0,
        inhibited in any::<bool>(),
        attenuation in 0.0f64..=1.0,
    ) {
        let mut rng = AgentRng::seeded(seed);
        let cfg = TurnerConfig {
            mode: if neural { TurnerMode::Neural(Default::default()) } else { TurnerMode::default() },
            noise,
            rebound: true,
        };
        let mut turner = Turner::new(&cfg, 0.1, &mut rng).unwrap();
        let inhibition = TurnerInhibition { inhibited, attenuation };
        for _ in 0..200 {
            let out = turner.step(&mut rng, inhibition, a_in);
            prop_assert!(out.is_finite(), "turner produced {}", out);
        }
    }

    #[test]
    fn crawler_never_moves_backward(
        seed in any::<u64>(),
        noise in 0.0f64..2.0,
        body_length in 0.1f64..10.0,
    ) {
        let mut rng = AgentRng::seeded(seed);
        let cfg = CrawlerConfig { noise, ..CrawlerConfig::default() };
        let mut crawler = Crawler::new(&cfg, 0.1, &mut rng).unwrap();
        crawler.start();
        for _ in 0..200 {
            let v = crawler.step(&mut rng, body_length);
            prop_assert!(v >= 0.0 && v.is_finite(), "crawler velocity {}", v);
        }
    }

    #[test]
    fn coupling_ignores_idle_effectors(
        crawler_phase in 0.0f64..10.0,
        feeder_phase in 0.0f64..10.0,
    ) {
        let coupling = Coupling::new(&larva_core::CouplingConfig {
            crawler_window: larva_core::PhaseWindow { offset: 0.0, width: 0.0 },
            feeder_window: larva_core::PhaseWindow { offset: 0.0, width: 0.0 },
            attenuation: 0.0,
        }).unwrap();
        let r = coupling.compute(
            Some(PhaseState::new(false, crawler_phase)),
            Some(PhaseState::new(false, feeder_phase)),
        );
        prop_assert!(!r.inhibited);
    }
}

#[test]
fn test_feeder_bites_only_when_engaged() {
    let mut rng = AgentRng::seeded(3);
    let mut feeder = Feeder::new(&FeederConfig::default(), 0.1, &mut rng).unwrap();
    let cfg = IntermitterConfig {
        eeb: 1.0,
        feeder_reoccurence_rate: Some(0.5),
        ..IntermitterConfig::default()
    };
    let mut i = Intermitter::new(&cfg, 0.1, false, true).unwrap();
    let mut bites = 0u64;
    for _ in 0..3000 {
        i.update(&mut rng, false, feeder.cycle_complete());
        if i.feeder_engaged() && !feeder.is_active() {
            feeder.start();
        } else if !i.feeder_engaged() && feeder.is_active() {
            feeder.stop();
        }
        if feeder.step() {
            assert!(i.feeder_engaged());
            bites += 1;
        }
    }
    assert!(bites > 0);
    assert_eq!(bites, feeder.bites());
}
