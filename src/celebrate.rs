//! Celebration effect fired when the found latch engages.

use image::Rgba;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::overlay::Surface;

const PALETTE: [Rgba<u8>; 6] = [
    Rgba([0x26, 0xcc, 0xff, 0xff]),
    Rgba([0xa2, 0x5a, 0xfd, 0xff]),
    Rgba([0xff, 0x5e, 0x7e, 0xff]),
    Rgba([0x88, 0xff, 0x5a, 0xff]),
    Rgba([0xfc, 0xff, 0x42, 0xff]),
    Rgba([0xff, 0xa6, 0x2d, 0xff]),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CelebrationConfig {
    pub particle_count: u32,
    /// Cone width in degrees, centred straight up.
    pub spread: f32,
}

impl Default for CelebrationConfig {
    fn default() -> Self {
        Self {
            particle_count: 400,
            spread: 200.0,
        }
    }
}

/// Fire-and-forget visual effect drawn on the overlay surface.
pub trait Celebration: Send {
    fn celebrate(&mut self, surface: &mut dyn Surface, config: &CelebrationConfig);
}

/// Scatters confetti particles from the bottom centre of the surface.
pub struct ConfettiBurst {
    rng: StdRng,
    bursts: u32,
}

impl ConfettiBurst {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            bursts: 0,
        }
    }

    /// Deterministic particle layout, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bursts: 0,
        }
    }

    /// Number of bursts fired so far.
    pub fn bursts(&self) -> u32 {
        self.bursts
    }
}

impl Default for ConfettiBurst {
    fn default() -> Self {
        Self::new()
    }
}

impl Celebration for ConfettiBurst {
    fn celebrate(&mut self, surface: &mut dyn Surface, config: &CelebrationConfig) {
        self.bursts += 1;
        let (w, h) = (surface.width() as f32, surface.height() as f32);
        if w == 0.0 || h == 0.0 {
            return;
        }
        let origin = (w / 2.0, h);
        let reach = w.max(h) * 0.9;
        let half_spread = config.spread.max(0.0) / 2.0;

        for _ in 0..config.particle_count {
            let angle = (90.0 + self.rng.gen_range(-half_spread..=half_spread)).to_radians();
            let distance = reach * self.rng.gen_range(0.2f32..1.0);
            let color = PALETTE[self.rng.gen_range(0..PALETTE.len())];
            let px = (origin.0 + angle.cos() * distance).round() as i64;
            let py = (origin.1 - angle.sin() * distance).round() as i64;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                surface.plot(px + dx, py + dy, color);
            }
        }
        log::info!(
            "celebration: {} particles, spread {}°",
            config.particle_count,
            config.spread
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayCanvas;

    #[test]
    fn burst_paints_particles_and_counts() {
        let mut canvas = OverlayCanvas::new(200, 150);
        let mut confetti = ConfettiBurst::with_seed(7);
        confetti.celebrate(&mut canvas, &CelebrationConfig::default());
        assert_eq!(confetti.bursts(), 1);
        assert!(canvas.painted_pixels() > 100);
    }

    #[test]
    fn zero_particles_paint_nothing() {
        let mut canvas = OverlayCanvas::new(50, 50);
        let mut confetti = ConfettiBurst::with_seed(1);
        let config = CelebrationConfig {
            particle_count: 0,
            spread: 90.0,
        };
        confetti.celebrate(&mut canvas, &config);
        assert_eq!(canvas.painted_pixels(), 0);
        assert_eq!(confetti.bursts(), 1);
    }

    #[test]
    fn narrow_spread_stays_above_origin() {
        let mut canvas = OverlayCanvas::new(100, 100);
        let mut confetti = ConfettiBurst::with_seed(3);
        let config = CelebrationConfig {
            particle_count: 50,
            spread: 10.0,
        };
        confetti.celebrate(&mut canvas, &config);
        let img = canvas.image();
        for (x, _, p) in img.enumerate_pixels() {
            if p[3] != 0 {
                assert!((35..=65).contains(&x), "particle at x={}", x);
            }
        }
    }
}
