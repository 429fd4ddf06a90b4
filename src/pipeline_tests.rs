#[cfg(test)]
mod tests {
    use crate::classify::{classify_vector, Decision};
    use crate::cluster::SeedStrategy;
    use crate::config::TrainingConfig;
    use crate::fusion::{fuse_posterior_sequence, fuse_votes};
    use crate::knn::{NearestNeighbor, TaggedExample};
    use crate::model::{
        load_model_dir, save_model_dir, EmotionMixture, ModalityModel, WeightedEmotionMixture,
    };
    use crate::report::{corpus_posterior, evaluate_files};
    use crate::Result;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    const EMOTIONS: [&str; 3] = ["anger", "calm", "joy"];

    fn blob(rng: &mut StdRng, center: f64, n: usize, dim: usize) -> Vec<Vec<f64>> {
        let noise = Normal::new(0.0, 1.0).unwrap();
        (0..n)
            .map(|_| (0..dim).map(|_| center + noise.sample(&mut *rng)).collect())
            .collect()
    }

    /// Training vectors per class plus ten held-out files per class.
    fn corpus(seed: u64, dim: usize) -> (Vec<(String, Vec<Vec<f64>>)>, Vec<TaggedExample>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut train = Vec::new();
        let mut test = Vec::new();
        for (i, emotion) in EMOTIONS.iter().enumerate() {
            let center = 6.0 * i as f64;
            train.push((emotion.to_string(), blob(&mut rng, center, 150, dim)));
            for _ in 0..10 {
                test.push(TaggedExample::new(*emotion, blob(&mut rng, center, 12, dim)));
            }
        }
        (train, test)
    }

    fn train_all(config: &TrainingConfig, train: &[(String, Vec<Vec<f64>>)]) -> Result<Vec<EmotionMixture>> {
        let gmm = config.gmm();
        train
            .iter()
            .map(|(emotion, data)| EmotionMixture::train(emotion.as_str(), data, &gmm))
            .collect()
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            n_components: 2,
            seed: Some(3),
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_train_and_evaluate_files() -> Result<()> {
        let (train, test) = corpus(1, 3);
        let models = train_all(&config(), &train)?;

        for m in &models {
            for g in m.mixture.components() {
                assert!(g.variance.iter().all(|&v| v >= 1e-5));
            }
            let phi: f64 = m.mixture.components().iter().map(|g| g.phi).sum();
            assert!((phi - 1.0).abs() < 1e-9);
        }

        let table = evaluate_files(&test, &models);
        let totals = table.totals();
        assert_eq!(totals.files, 30);
        assert_eq!(totals.correct_files, 30);
        assert_eq!(totals.undecided_files, 0);
        assert!(totals.vector_accuracy() > 0.99);
        for emotion in EMOTIONS {
            assert_eq!(table.row(emotion).unwrap().files, 10);
        }

        let soft = corpus_posterior(&test, &models);
        assert!(!soft.failed());
        assert_eq!(soft.vectors, 360);
        assert!(soft.mean() > 0.99);
        Ok(())
    }

    #[test]
    fn test_farthest_point_seeding_trains_equally_well() -> Result<()> {
        let (train, test) = corpus(2, 4);
        let config = TrainingConfig {
            seed_strategy: SeedStrategy::FarthestPoint,
            ..config()
        };
        let models = train_all(&config, &train)?;
        assert_eq!(evaluate_files(&test, &models).totals().correct_files, 30);
        Ok(())
    }

    #[test]
    fn test_same_seed_same_model() -> Result<()> {
        let (train, _) = corpus(4, 2);
        let a = train_all(&config(), &train)?;
        let b = train_all(&config(), &train)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_saved_models_classify_identically() -> Result<()> {
        let (train, test) = corpus(5, 3);
        let models = train_all(&config(), &train)?;

        let dir = tempfile::tempdir()?;
        save_model_dir(dir.path(), &models)?;
        let loaded: Vec<EmotionMixture> = load_model_dir(dir.path())?;
        assert_eq!(loaded.len(), models.len());

        for (m, l) in models.iter().zip(&loaded) {
            assert_eq!(m.emotion, l.emotion);
            for (g, h) in m.mixture.components().iter().zip(l.mixture.components()) {
                assert!((g.phi - h.phi).abs() <= f64::EPSILON * g.phi.abs());
                for (a, b) in g.mean.iter().zip(&h.mean).chain(g.variance.iter().zip(&h.variance)) {
                    assert!((a - b).abs() <= f64::EPSILON * a.abs().max(1.0));
                }
            }
        }

        for example in &test {
            for x in &example.data {
                assert_eq!(classify_vector(x, &models), classify_vector(x, &loaded));
            }
        }
        Ok(())
    }

    #[test]
    fn test_two_modalities_fuse() -> Result<()> {
        let (eeg_train, eeg_test) = corpus(6, 4);
        let (speech_train, speech_test) = corpus(7, 3);

        let eeg = ModalityModel::new(0.6, train_all(&config(), &eeg_train)?);
        let speech = ModalityModel::new(0.4, train_all(&config(), &speech_train)?);

        let dir = tempfile::tempdir()?;
        save_model_dir(dir.path(), &eeg.to_weighted())?;
        let weighted: Vec<WeightedEmotionMixture> = load_model_dir(dir.path())?;
        let eeg = ModalityModel::from_weighted(&weighted)?;
        assert_eq!(eeg.alpha, 0.6);

        for (a, b) in eeg_test.iter().zip(&speech_test) {
            assert_eq!(a.tag, b.tag);
            let truth = Decision::Label(a.tag.clone());
            // Speech files are one frame shorter; fusion truncates.
            let speech_frames = &b.data[..b.data.len() - 1];
            assert_eq!(fuse_votes(&eeg, &a.data, &speech, speech_frames), truth);

            let tally = fuse_posterior_sequence(&eeg, &a.data, &speech, speech_frames);
            assert_eq!(tally.total(), speech_frames.len());
            assert_eq!(tally.majority(), truth);
        }
        Ok(())
    }

    #[test]
    fn test_nearest_neighbor_baseline_agrees() -> Result<()> {
        let (train, test) = corpus(8, 3);
        let exemplars: Vec<TaggedExample> = train
            .into_iter()
            .map(|(emotion, data)| TaggedExample::new(emotion, data))
            .collect();
        let nn = NearestNeighbor::new(&exemplars)?;
        for example in &test {
            let tally = nn.classify_many(&example.data)?;
            assert_eq!(tally.majority(), Decision::Label(example.tag.clone()));
        }
        Ok(())
    }
}
