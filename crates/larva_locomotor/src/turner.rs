//! Turner: lateral bending (head casting) generator.
//!
//! Two interchangeable generators sit behind one inhibition/rebound/noise
//! pipeline:
//!
//! - **Oscillatory**: amp · sin(phase), biased by the sensory drive.
//! - **Neural**: a left/right half-center of excitatory (E) and contralateral
//!   inhibitory (C) rate units with slow adaptation (H). Forward-Euler, one
//!   step per tick. The output E_r − E_l keeps drifting even under constant
//!   drive, which gives the continuous micro-turning seen in real larvae.

use crate::coupling::TurnerInhibition;
use larva_core::{AgentRng, NeuralTurnerConfig, Oscillator, Result, TurnerConfig, TurnerMode};

#[derive(Debug, Clone)]
pub struct Turner {
    generator: Generator,
    noise: f64,
    rebound: bool,
    rebound_buffer: f64,
    last_output: f64,
}

#[derive(Debug, Clone)]
enum Generator {
    Oscillatory { osc: Oscillator, amp: f64, amp_noise: f64 },
    Neural(NeuralOscillator),
}

impl Turner {
    pub fn new(cfg: &TurnerConfig, dt: f64, rng: &mut AgentRng) -> Result<Self> {
        cfg.validate()?;
        let generator = match &cfg.mode {
            TurnerMode::Oscillatory {
                freq,
                freq_range,
                random_phase,
                amp,
                amp_noise,
            } => {
                let mut osc = Oscillator::new("turner", *freq, *freq_range, dt)?;
                if *random_phase {
                    osc.randomize_phase(rng);
                }
                osc.start();
                Generator::Oscillatory {
                    osc,
                    amp: *amp,
                    amp_noise: *amp_noise,
                }
            }
            TurnerMode::Neural(n) => Generator::Neural(NeuralOscillator::new(n, dt, rng)),
        };
        Ok(Self {
            generator,
            noise: cfg.noise,
            rebound: cfg.rebound,
            rebound_buffer: 0.0,
            last_output: 0.0,
        })
    }

    /// Advance one tick and return the angular activity.
    ///
    /// `a_in` is the combined sensory activation in [−1, 1].
    pub fn step(&mut self, rng: &mut AgentRng, inhibition: TurnerInhibition, a_in: f64) -> f64 {
        let a_in = if a_in.is_finite() { a_in.clamp(-1.0, 1.0) } else { 0.0 };
        let activity = self.generate(rng, a_in);

        let output = if !inhibition.inhibited {
            let released = activity + self.rebound_buffer;
            self.rebound_buffer = 0.0;
            released
        } else if inhibition.attenuation > 0.0 {
            if self.rebound {
                self.rebound_buffer += activity * (1.0 - inhibition.attenuation);
            }
            activity * inhibition.attenuation
        } else {
            self.last_output = 0.0;
            return 0.0;
        };

        self.last_output = output + rng.normal(0.0, self.noise * self.characteristic_magnitude());
        self.last_output
    }

    fn generate(&mut self, rng: &mut AgentRng, a_in: f64) -> f64 {
        match &mut self.generator {
            Generator::Oscillatory { osc, amp, amp_noise } => {
                osc.advance();
                let amp_now = *amp + rng.normal(0.0, *amp_noise * *amp);
                amp_now * osc.phase().sin() + *amp * a_in
            }
            Generator::Neural(neural) => neural.step(rng, a_in),
        }
    }

    /// Typical output scale, used to size the output noise.
    pub fn characteristic_magnitude(&self) -> f64 {
        match &self.generator {
            Generator::Oscillatory { amp, .. } => *amp,
            Generator::Neural(n) => n.m * n.output_gain,
        }
    }

    /// Phase of the oscillatory generator; `None` in neural mode.
    pub fn phase(&self) -> Option<f64> {
        match &self.generator {
            Generator::Oscillatory { osc, .. } => Some(osc.phase()),
            Generator::Neural(_) => None,
        }
    }

    pub fn is_neural(&self) -> bool {
        matches!(self.generator, Generator::Neural(_))
    }

    pub fn rebound_buffer(&self) -> f64 {
        self.rebound_buffer
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }
}

// ============================================================================
// Neural half-center
// ============================================================================

#[derive(Debug, Clone)]
struct NeuralOscillator {
    base_activation: f64,
    activation_range: [f64; 2],
    activation_noise: f64,
    /// dt / tau
    step_e: f64,
    /// dt / tau_h
    step_h: f64,
    w_ee: f64,
    w_ce: f64,
    w_ec: f64,
    w_cc: f64,
    m: f64,
    n: f64,
    g: f64,
    h0: f64,
    output_gain: f64,
    e_l: f64,
    e_r: f64,
    c_l: f64,
    c_r: f64,
    h_el: f64,
    h_er: f64,
    h_cl: f64,
    h_cr: f64,
}

impl NeuralOscillator {
    fn new(cfg: &NeuralTurnerConfig, dt: f64, rng: &mut AgentRng) -> Self {
        let mut neural = Self {
            base_activation: cfg.base_activation,
            activation_range: cfg.activation_range,
            activation_noise: cfg.activation_noise,
            step_e: dt / cfg.tau,
            step_h: dt / cfg.tau_h,
            w_ee: cfg.w_ee,
            w_ce: cfg.w_ce,
            w_ec: cfg.w_ec,
            w_cc: cfg.w_cc,
            m: cfg.m,
            n: cfg.n,
            g: cfg.g,
            h0: cfg.h0,
            output_gain: cfg.output_gain,
            e_l: 0.0,
            e_r: 0.0,
            c_l: 0.0,
            c_r: 0.0,
            h_el: 0.0,
            h_er: 0.0,
            h_cl: 0.0,
            h_cr: 0.0,
        };
        // Break the left/right symmetry, otherwise E_r − E_l stays at zero.
        let spread = cfg.m * 0.1;
        neural.e_l = rng.uniform_range(0.0, spread);
        neural.e_r = rng.uniform_range(0.0, spread);
        neural.c_l = rng.uniform_range(0.0, spread);
        neural.c_r = rng.uniform_range(0.0, spread);
        for _ in 0..cfg.warmup_steps {
            if rng.bernoulli(0.1) {
                neural.integrate(cfg.base_activation);
            }
        }
        neural
    }

    fn step(&mut self, rng: &mut AgentRng, a_in: f64) -> f64 {
        let drive = self.activation(rng, a_in);
        self.integrate(drive);
        (self.e_r - self.e_l) * self.output_gain
    }

    /// Map a signal in [−1, 1] onto the allowed drive range around the
    /// baseline. Stronger signals carry less noise.
    fn activation(&self, rng: &mut AgentRng, a_in: f64) -> f64 {
        let [lo, hi] = self.activation_range;
        let base = self.base_activation;
        let drive = if a_in < 0.0 {
            base + a_in * (base - lo)
        } else {
            base + a_in * (hi - base)
        };
        drive + rng.normal(0.0, self.activation_noise * (1.0 - a_in.abs()))
    }

    fn integrate(&mut self, a: f64) {
        let t = self.step_e;
        let th = self.step_h;
        let (e_l, e_r, c_l, c_r) = (self.e_l, self.e_r, self.c_l, self.c_r);

        self.e_l += t * (-e_l + self.rate(a + self.w_ee * e_l - self.w_ec * c_r, self.h0 + self.g * self.h_el));
        self.e_r += t * (-e_r + self.rate(a + self.w_ee * e_r - self.w_ec * c_l, self.h0 + self.g * self.h_er));
        self.c_l += t * (-c_l + self.rate(a + self.w_ce * e_l - self.w_cc * c_r, self.h0 + self.g * self.h_cl));
        self.c_r += t * (-c_r + self.rate(a + self.w_ce * e_r - self.w_cc * c_l, self.h0 + self.g * self.h_cr));

        self.h_el += th * (-self.h_el + e_l);
        self.h_er += th * (-self.h_er + e_r);
        self.h_cl += th * (-self.h_cl + c_l);
        self.h_cr += th * (-self.h_cr + c_r);
    }

    /// Saturating Naka-Rushton response.
    fn rate(&self, x: f64, h: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        let xn = x.powf(self.n);
        self.m * xn / (xn + h.max(0.0).powf(self.n))
    }
}
