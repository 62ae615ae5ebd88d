//! Feeder: mouth-hook motion. One completed cycle is one bite.

use larva_core::{AgentRng, FeederConfig, Oscillator, Result};

#[derive(Debug, Clone)]
pub struct Feeder {
    osc: Oscillator,
    bite_volume: f64,
    feed_radius: f64,
    bites: u64,
}

impl Feeder {
    pub fn new(cfg: &FeederConfig, dt: f64, rng: &mut AgentRng) -> Result<Self> {
        cfg.validate()?;
        let mut osc = Oscillator::new("feeder", cfg.freq, cfg.freq_range, dt)?;
        if cfg.random_phase {
            osc.randomize_phase(rng);
        }
        Ok(Self {
            osc,
            bite_volume: cfg.bite_volume,
            feed_radius: cfg.feed_radius,
            bites: 0,
        })
    }

    /// Advance one tick. Returns true on the tick a bite completes.
    pub fn step(&mut self) -> bool {
        let bite = self.osc.advance();
        if bite {
            self.bites += 1;
        }
        bite
    }

    /// Volume one bite can take for an agent of `agent_volume`.
    /// How much is actually ingested is up to the food source.
    pub fn bite_amount(&self, agent_volume: f64) -> f64 {
        self.bite_volume * agent_volume
    }

    pub fn feed_radius(&self) -> f64 {
        self.feed_radius
    }

    pub fn bites(&self) -> u64 {
        self.bites
    }

    pub fn start(&mut self) {
        self.osc.start();
    }

    pub fn stop(&mut self) {
        self.osc.stop();
    }

    pub fn is_active(&self) -> bool {
        self.osc.is_active()
    }

    pub fn cycle_complete(&self) -> bool {
        self.osc.cycle_complete()
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.osc
    }

    pub fn oscillator_mut(&mut self) -> &mut Oscillator {
        &mut self.osc
    }
}
