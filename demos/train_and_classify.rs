use emomix::{evaluate_files, EmotionMixture, TaggedExample, TrainingConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=emomix=debug shows K-means and EM progress.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Synthetic stand-in for 4 EEG band powers: one blob per emotion.
    let emotions = [("anger", 4.0), ("calm", 0.0), ("joy", -4.0)];
    let mut rng = StdRng::seed_from_u64(17);
    let noise = Normal::new(0.0, 1.0)?;
    let mut draw = |center: f64, n: usize| -> Vec<Vec<f64>> {
        (0..n)
            .map(|_| (0..4).map(|_| center + noise.sample(&mut rng)).collect())
            .collect()
    };

    let config = match std::env::args().nth(1) {
        Some(path) => TrainingConfig::from_json_file(path)?,
        None => TrainingConfig {
            n_components: 3,
            seed: Some(1),
            ..TrainingConfig::default()
        },
    };
    let gmm = config.gmm();

    let mut models = Vec::new();
    let mut held_out = Vec::new();
    for (emotion, center) in emotions {
        models.push(EmotionMixture::train(emotion, &draw(center, 200), &gmm)?);
        for _ in 0..5 {
            held_out.push(TaggedExample::new(emotion, draw(center, 20)));
        }
    }

    for m in &models {
        println!("{}: {} components", m.emotion, m.mixture.len());
    }
    println!();
    print!("{}", evaluate_files(&held_out, &models));
    Ok(())
}
