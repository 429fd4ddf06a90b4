use emomix::fusion::fuse_votes;
use emomix::{
    classify_majority, load_model_dir, save_model_dir, EmotionMixture, ModalityModel,
    TrainingConfig, WeightedEmotionMixture,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing_subscriber::EnvFilter;

fn blobs(rng: &mut StdRng, noise: &Normal<f64>, center: f64, n: usize, dim: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..dim).map(|_| center + noise.sample(&mut *rng)).collect())
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = StdRng::seed_from_u64(9);
    let tight = Normal::new(0.0, 1.0)?;
    let wide = Normal::new(0.0, 3.0)?;
    let config = TrainingConfig {
        n_components: 2,
        seed: Some(2),
        ..TrainingConfig::default()
    };
    let gmm = config.gmm();

    // EEG separates the classes well, speech (13 cepstra) barely.
    let mut eeg = Vec::new();
    let mut speech = Vec::new();
    for (emotion, center) in [("happy", 2.0), ("sad", -2.0)] {
        eeg.push(EmotionMixture::train(emotion, &blobs(&mut rng, &tight, center, 300, 4), &gmm)?);
        speech.push(EmotionMixture::train(emotion, &blobs(&mut rng, &tight, center * 0.2, 300, 13), &gmm)?);
    }
    let eeg = ModalityModel::new(0.7, eeg);
    let speech = ModalityModel::new(0.3, speech);

    // Weighted model sets travel as one JSON file per class.
    let dir = std::env::temp_dir().join("emomix-fusion-demo");
    save_model_dir(&dir, &eeg.to_weighted())?;
    let reloaded: Vec<WeightedEmotionMixture> = load_model_dir(&dir)?;
    let eeg = ModalityModel::from_weighted(&reloaded)?;
    println!("eeg alpha {} ({} classes)", eeg.alpha, eeg.mixtures.len());

    for (emotion, center) in [("happy", 2.0), ("sad", -2.0)] {
        let eeg_frames = blobs(&mut rng, &wide, center, 30, 4);
        // Speech runs at a higher frame rate; fusion truncates to the shorter.
        let speech_frames = blobs(&mut rng, &tight, center * 0.2, 45, 13);

        let eeg_votes = classify_majority(&eeg_frames, &eeg.mixtures);
        let speech_votes = classify_majority(&speech_frames, &speech.mixtures);
        println!(
            "{emotion}: eeg {} ({:.2}), speech {} ({:.2}), fused {}",
            eeg_votes.majority(),
            eeg_votes.fraction(emotion),
            speech_votes.majority(),
            speech_votes.fraction(emotion),
            fuse_votes(&eeg, &eeg_frames, &speech, &speech_frames),
        );
    }
    Ok(())
}
