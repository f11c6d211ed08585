//! Online Kalman price/trend state machine.
//!
//! Tracks a 2-state `[price, velocity]` filter per `(market, asset)` key in
//! logit space, producing a directional verdict with hysteresis so the
//! strategy evaluator sees a stable UP/DOWN/FLAT signal rather than a
//! flickering raw t-stat.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPrediction {
    pub direction: Direction,
    pub t_stat: f64,
    pub velocity: f64,
    pub confidence: f64,
    pub reversal: bool,
    pub flipped_from: Option<Direction>,
    pub flipped_ts: Option<f64>,
}

impl TrendPrediction {
    #[must_use]
    pub const fn flat() -> Self {
        Self {
            direction: Direction::Flat,
            t_stat: 0.0,
            velocity: 0.0,
            confidence: 0.0,
            reversal: false,
            flipped_from: None,
            flipped_ts: None,
        }
    }
}

/// 2x2 symmetric-ish matrix, stored row-major, used only for this filter's
/// covariance/transition math.
#[derive(Debug, Clone, Copy)]
struct Mat2([[f64; 2]; 2]);

struct KalmanState {
    x: [f64; 2], // [price(logit), velocity]
    p: Mat2,
    last_ts: f64,
    t_ema: f64,
    dir: Direction,
}

pub struct KalmanParams {
    pub use_logit: bool,
    pub q0: f64,
    pub r_floor: f64,
    pub max_dt: f64,
    pub t_enter: f64,
    pub t_hold: f64,
    pub t_alpha: f64,
    pub reset_z: f64,
    pub reset_inflate: f64,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            use_logit: true,
            q0: 1e-6,
            r_floor: 1e-5,
            max_dt: 1.0,
            t_enter: 2.0,
            t_hold: 1.0,
            t_alpha: 0.3,
            reset_z: 8.0,
            reset_inflate: 10.0,
        }
    }
}

const CLIP: f64 = 1e-3;
const MAX_JAC: f64 = 30.0;

/// Per-`(market, asset)` Kalman trend tracker. Not thread-safe on its own;
/// callers hold it behind the per-market actor's exclusive lock.
pub struct KalmanTrend {
    params: KalmanParams,
    states: HashMap<String, KalmanState>,
}

impl Default for KalmanTrend {
    fn default() -> Self {
        Self::new(KalmanParams::default())
    }
}

impl KalmanTrend {
    #[must_use]
    pub fn new(params: KalmanParams) -> Self {
        Self {
            params,
            states: HashMap::new(),
        }
    }

    fn clip01(p: f64) -> f64 {
        p.max(CLIP).min(1.0 - CLIP)
    }

    fn logit(p: f64) -> f64 {
        let p = Self::clip01(p);
        (p / (1.0 - p)).ln()
    }

    fn jac(p: f64) -> f64 {
        let p = Self::clip01(p);
        let j = 1.0 / (p * (1.0 - p));
        j.min(MAX_JAC)
    }

    fn confidence(t: f64) -> f64 {
        let a = t.abs();
        a / (1.0 + a)
    }

    fn var_from_spread(spread: Option<f64>) -> f64 {
        match spread {
            Some(s) if s.is_finite() && s > 0.0 => (s * 0.5).powi(2) + 1e-5,
            _ => 1e-5,
        }
    }

    /// Update the filter for `key` with a new mid-price observation.
    ///
    /// `ts` and `tick_size` are both optional: `ts` defaults to the event
    /// timestamp callers already normalize at ingress; `tick_size` floors
    /// the measurement variance when known.
    pub fn update(
        &mut self,
        key: &str,
        mid: f64,
        spread: Option<f64>,
        ts: f64,
        tick_size: Option<f64>,
    ) -> TrendPrediction {
        let p = Self::clip01(mid);
        let (z, jac) = if self.params.use_logit {
            (Self::logit(p), Self::jac(p))
        } else {
            (p, 1.0)
        };

        if !self.states.contains_key(key) {
            self.states.insert(
                key.to_string(),
                KalmanState {
                    x: [z, 0.0],
                    p: Mat2([[1e-3, 0.0], [0.0, 1e-2]]),
                    last_ts: ts,
                    t_ema: 0.0,
                    dir: Direction::Flat,
                },
            );
            return TrendPrediction::flat();
        }

        let state = self
            .states
            .get_mut(key)
            .expect("checked contains_key above");

        let dt = (ts - state.last_ts).clamp(0.0, self.params.max_dt);
        state.last_ts = ts;

        let f = [[1.0, dt], [0.0, 1.0]];

        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let q = Mat2([
            [dt3 / 3.0 * self.params.q0, dt2 / 2.0 * self.params.q0],
            [dt2 / 2.0 * self.params.q0, dt * self.params.q0],
        ]);

        let mut var_p = Self::var_from_spread(spread) * (1.0 + 2.0 * dt);
        if let Some(tick) = tick_size {
            if tick > 0.0 {
                var_p = var_p.max(tick * tick / 12.0);
            }
        }
        var_p = var_p.max(self.params.r_floor);
        let r = (jac * jac) * var_p;

        // predict: x = F x; P = F P F^T + Q
        let x_pred = [
            f[0][0] * state.x[0] + f[0][1] * state.x[1],
            f[1][0] * state.x[0] + f[1][1] * state.x[1],
        ];
        let fp = [
            [
                f[0][0] * state.p.0[0][0] + f[0][1] * state.p.0[1][0],
                f[0][0] * state.p.0[0][1] + f[0][1] * state.p.0[1][1],
            ],
            [
                f[1][0] * state.p.0[0][0] + f[1][1] * state.p.0[1][0],
                f[1][0] * state.p.0[0][1] + f[1][1] * state.p.0[1][1],
            ],
        ];
        let mut p_pred = Mat2([
            [
                fp[0][0] * f[0][0] + fp[0][1] * f[0][1] + q.0[0][0],
                fp[0][0] * f[1][0] + fp[0][1] * f[1][1] + q.0[0][1],
            ],
            [
                fp[1][0] * f[0][0] + fp[1][1] * f[0][1] + q.0[1][0],
                fp[1][0] * f[1][0] + fp[1][1] * f[1][1] + q.0[1][1],
            ],
        ]);

        // innovation y = z - H x_pred (H = [1, 0]); S = P[0][0] + R
        let y = z - x_pred[0];
        let s = p_pred.0[0][0] + r;
        if y.abs() / s.sqrt().max(1e-12) > self.params.reset_z {
            for row in &mut p_pred.0 {
                for v in row.iter_mut() {
                    *v *= self.params.reset_inflate;
                }
            }
        }

        // update: K = P H^T / S ; x = x_pred + K y ; P = (I - K H) P
        let s = p_pred.0[0][0] + r;
        let k = [p_pred.0[0][0] / s, p_pred.0[1][0] / s];
        let x_new = [x_pred[0] + k[0] * y, x_pred[1] + k[1] * y];
        let p_new = Mat2([
            [(1.0 - k[0]) * p_pred.0[0][0], (1.0 - k[0]) * p_pred.0[0][1]],
            [
                p_pred.0[1][0] - k[1] * p_pred.0[0][0],
                p_pred.0[1][1] - k[1] * p_pred.0[0][1],
            ],
        ]);

        state.x = x_new;
        state.p = p_new;

        let v = state.x[1];
        let vvar = state.p.0[1][1].max(1e-12);
        let raw_t = v / vvar.sqrt();

        let t_prev = state.t_ema;
        let t = t_prev + self.params.t_alpha * (raw_t - t_prev);
        state.t_ema = t;

        let mut d = Direction::Flat;
        if t >= self.params.t_enter || (t >= self.params.t_hold && state.dir == Direction::Up) {
            d = Direction::Up;
        } else if t <= -self.params.t_enter
            || (t <= -self.params.t_hold && state.dir == Direction::Down)
        {
            d = Direction::Down;
        }

        let previous = state.dir;
        let reversal = d != previous && previous != Direction::Flat;
        let flipped_from = if reversal { Some(previous) } else { None };
        // Held direction feeds only the hold-band hysteresis check above; the
        // reported direction below is the raw reading, FLAT included.
        state.dir = if d == Direction::Flat { previous } else { d };

        TrendPrediction {
            direction: d,
            t_stat: t,
            velocity: v,
            confidence: Self::confidence(t),
            reversal,
            flipped_from,
            flipped_ts: if reversal { Some(ts) } else { None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_flat_with_zero_stats() {
        let mut k = KalmanTrend::default();
        let pred = k.update("m:a", 0.5, Some(0.02), 0.0, None);
        assert_eq!(pred.direction, Direction::Flat);
        assert_eq!(pred.t_stat, 0.0);
    }

    #[test]
    fn sustained_rising_mid_eventually_reports_up() {
        let mut k = KalmanTrend::default();
        let mut pred = k.update("m:a", 0.50, Some(0.01), 0.0, None);
        let mut ts = 1.0;
        let mut mid: f64 = 0.50;
        for _ in 0..40 {
            mid = (mid + 0.02).min(0.95);
            pred = k.update("m:a", mid, Some(0.01), ts, None);
            ts += 1.0;
        }
        assert_eq!(pred.direction, Direction::Up);
        assert!(pred.t_stat >= 1.0);
    }

    #[test]
    fn hysteresis_holds_direction_in_neutral_band() {
        let mut k = KalmanTrend::default();
        k.update("m:a", 0.5, Some(0.01), 0.0, None);
        let mut ts = 1.0;
        let mut mid: f64 = 0.5;
        for _ in 0..40 {
            mid = (mid + 0.02).min(0.95);
            k.update("m:a", mid, Some(0.01), ts, None);
            ts += 1.0;
        }
        // Now hold flat mid; direction should not flip straight to DOWN/FLAT
        // while t_ema is still above t_hold.
        let pred = k.update("m:a", mid, Some(0.01), ts, None);
        assert_ne!(pred.direction, Direction::Down);
    }

    #[test]
    fn decayed_t_stat_reports_flat_again_after_an_uptrend() {
        let mut k = KalmanTrend::default();
        k.update("m:a", 0.50, Some(0.01), 0.0, None);
        let mut ts = 1.0;
        let mut mid: f64 = 0.50;
        for _ in 0..40 {
            mid = (mid + 0.02).min(0.95);
            let pred = k.update("m:a", mid, Some(0.01), ts, None);
            ts += 1.0;
            if pred.direction == Direction::Up {
                break;
            }
        }
        // Hold the price flat long enough for velocity and t_ema to decay
        // well under t_hold; the reported direction must go back to FLAT
        // rather than staying latched on UP forever.
        let mut pred = k.update("m:a", mid, Some(0.01), ts, None);
        for _ in 0..200 {
            ts += 1.0;
            pred = k.update("m:a", mid, Some(0.01), ts, None);
        }
        assert_eq!(pred.direction, Direction::Flat);
    }

    #[test]
    fn dt_is_clamped_to_max_dt() {
        let mut k = KalmanTrend::default();
        k.update("m:a", 0.5, Some(0.01), 0.0, None);
        // Huge time jump should not panic or produce non-finite state.
        let pred = k.update("m:a", 0.6, Some(0.01), 10_000.0, None);
        assert!(pred.t_stat.is_finite());
        assert!(pred.velocity.is_finite());
    }
}
