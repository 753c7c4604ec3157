use std::collections::HashSet;

use rand::Rng;

const ONSETS: &[&str] = &[
    "al", "be", "ca", "dra", "el", "fo", "ga", "hy", "ix", "ka", "lu", "mi", "no", "or", "pe",
    "qua", "ri", "sa", "tau", "ul", "ve", "xe", "ze",
];
const CODAS: &[&str] = &[
    "ron", "lis", "dor", "nix", "ra", "tis", "mar", "sen", "vus", "lon", "tha", "rek", "dan",
];

/// Named attempts before the registry gives up on fresh names and starts
/// numbering a base name instead.
const MAX_FRESH_ATTEMPTS: usize = 32;

/// Registry of names already handed out.
///
/// The random source is passed in on every call rather than held, so a
/// seeded RNG gives the same sequence of names every run.
#[derive(Clone, Debug, Default)]
pub struct NameRegistry {
    used: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Claims a name chosen elsewhere. Returns `false` if it was already taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        self.used.insert(name.to_string())
    }

    pub fn release(&mut self, name: &str) -> bool {
        self.used.remove(name)
    }

    /// Produces a name no earlier call (or reservation) has produced.
    pub fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String {
        let mut base = random_name(rng);
        for _ in 0..MAX_FRESH_ATTEMPTS {
            if self.used.insert(base.clone()) {
                return base;
            }
            base = random_name(rng);
        }

        let mut n = 2usize;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let syllables = rng.gen_range(1..=2);
    let mut name = String::new();
    for _ in 0..syllables {
        name.push_str(ONSETS[rng.gen_range(0..ONSETS.len())]);
    }
    name.push_str(CODAS[rng.gen_range(0..CODAS.len())]);
    capitalize(&name)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
