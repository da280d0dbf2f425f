use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Single-well scan: chi2 rises quadratically away from `centre`.
fn parabola(x: f64, centre: f64, depth: f64) -> f64 {
    1.0 + depth * (x - centre).powi(2)
}

/// Two separated wells, so the curve has two interior minima.
fn double_well(x: f64, left: f64, right: f64) -> f64 {
    let a = parabola(x, left, 8.0);
    let b = parabola(x, right, 8.0) + 0.3;
    a.min(b)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // Scan points: 0.0 → 1.0, step 0.1
    let scan: Vec<f64> = (0..11).map(|i| i as f64 * 0.1).collect();

    let mut names: Vec<String> = Vec::new();
    let mut curves: Vec<Vec<f64>> = Vec::new();

    for d in 1..=4 {
        for y in 1..=3 {
            let name = format!("/ATLAS_2019_I1234567/d{d:02}-x01-y{y:02}.pdf");
            let values: Vec<f64> = match (d + y) % 4 {
                // flat response: no interior minimum
                0 => scan.iter().map(|&x| 2.0 + 3.0 * x).collect(),
                1 => {
                    let left = rng.uniform(0.15, 0.35);
                    let right = rng.uniform(0.65, 0.85);
                    scan.iter().map(|&x| double_well(x, left, right)).collect()
                }
                _ => {
                    let centre = rng.uniform(0.3, 0.7);
                    let depth = rng.uniform(5.0, 40.0);
                    scan.iter().map(|&x| parabola(x, centre, depth)).collect()
                }
            };
            names.push(name);
            curves.push(values);
        }
    }

    let out_dir = Path::new("sample_scan");
    fs::create_dir_all(out_dir).expect("Failed to create sample_scan/");

    // Raw scan file: nSets, nData, then one set per line
    let mut values = format!("{}\n{}\n", curves.len(), scan.len());
    // Names listing: two header lines, then "<name>   <values>"
    let mut listing = format!(
        "Found {} PDF file(s)\nFound {} chi-squared values per plot\n",
        curves.len(),
        scan.len()
    );
    for (name, row) in names.iter().zip(&curves) {
        let row_text = row
            .iter()
            .map(|v| format!("{v:.4}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(values, "{row_text}").expect("write to String");
        writeln!(listing, "{name}   {row_text}").expect("write to String");
    }

    fs::write(out_dir.join("chi2_values.txt"), values).expect("Failed to write chi2_values.txt");
    fs::write(out_dir.join("chi2_histo_values.txt"), listing)
        .expect("Failed to write chi2_histo_values.txt");

    println!(
        "Wrote {} scans ({} points each) to {}",
        curves.len(),
        scan.len(),
        out_dir.display()
    );
}
