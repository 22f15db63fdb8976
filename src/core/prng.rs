// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It drives trial draws and observation noise, and must stay reproducible per seed.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
    spare_normal: Option<f32>,
}

const ZERO_SEED_REMAP: u64 = 0x9E3779B97F4A7C15;

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { ZERO_SEED_REMAP } else { seed };
        Self {
            state: seed,
            spare_normal: None,
        }
    }

    /// Rebuild a generator from a previously captured [`Prng::state`].
    ///
    /// The cached Box-Muller spare is not part of the state, so the next
    /// normal draw always starts a fresh pair.
    pub fn from_state(state: u64) -> Self {
        Self::new(state)
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    #[inline]
    pub fn next_f32_01(&mut self) -> f32 {
        // Convert to [0,1).
        let x = self.next_u32() >> 8; // 24 bits
        (x as f32) / ((1u32 << 24) as f32)
    }

    #[inline]
    pub fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32_01()
    }

    #[inline]
    pub fn gen_range_usize(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64;
        let v = self.next_u64() % span;
        low + v as usize
    }

    /// Uniformly pick one element. Returns `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.gen_range_usize(0, items.len());
        items.get(idx)
    }

    /// Standard normal draw (Box-Muller). The second value of each pair is cached.
    pub fn next_normal(&mut self) -> f32 {
        if let Some(z) = self.spare_normal.take() {
            return z;
        }

        // u1 in (0,1] so ln(u1) is finite.
        let u1 = 1.0 - self.next_f32_01();
        let u2 = self.next_f32_01();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = std::f32::consts::TAU * u2;

        self.spare_normal = Some(r * theta.sin());
        r * theta.cos()
    }
}
