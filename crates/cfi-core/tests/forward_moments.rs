use cfi_core::{q_sample, DiffusionConfig, ImageTensor, NoiseGenerator, NoiseSchedule, F};

#[test]
fn q_sample_moments_match_schedule() {
    // At timestep t, x_t | x_0 ~ N(√ᾱ·x₀, 1−ᾱ) elementwise
    let schedule = NoiseSchedule::build(&DiffusionConfig::default()).unwrap();
    let t = 400;
    let x0_value = 0.6;
    let n_draws = 20_000;

    let x0 = ImageTensor::filled([1, 1, 1, 1], x0_value);
    let mut rng = NoiseGenerator::new(42);

    let mut values = Vec::with_capacity(n_draws);
    for _ in 0..n_draws {
        let xt = q_sample(&schedule, &x0, &[t], None, &mut rng).unwrap();
        values.push(xt[0]);
    }

    let mean = values.iter().sum::<F>() / n_draws as F;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<F>() / (n_draws - 1) as F;

    let expected_mean = schedule.sqrt_alpha_bar[t] * x0_value;
    let expected_var = 1.0 - schedule.alpha_bar[t];
    let stderr = (expected_var / n_draws as F).sqrt();

    println!("q_sample moments at t={}:", t);
    println!("Mean: {:.6} (expected: {:.6})", mean, expected_mean);
    println!("Variance: {:.6} (expected: {:.6})", var, expected_var);

    assert!(
        (mean - expected_mean).abs() < 4.0 * stderr,
        "Mean {} deviates more than 4 standard errors from {}",
        mean,
        expected_mean
    );

    let var_rel_error = (var - expected_var).abs() / expected_var;
    assert!(
        var_rel_error < 0.05,
        "Variance relative error {} exceeds 5%",
        var_rel_error
    );
}

#[test]
fn q_sample_with_zero_noise_is_deterministic() {
    let schedule = NoiseSchedule::build(&DiffusionConfig {
        timesteps: 50,
        ..Default::default()
    })
    .unwrap();

    let x0 = ImageTensor::from_vec(
        [1, 1, 2, 2],
        vec![0.1, -0.3, 0.7, -0.9],
    )
    .unwrap();
    let zero = ImageTensor::zeros([1, 1, 2, 2]);
    let mut rng = NoiseGenerator::new(0);

    for t in [0, 10, 49] {
        let xt = q_sample(&schedule, &x0, &[t], Some(&zero), &mut rng).unwrap();
        for i in 0..xt.len() {
            assert_eq!(xt[i], schedule.sqrt_alpha_bar[t] * x0[i]);
        }
    }
}

#[test]
fn q_sample_at_large_t_destroys_signal() {
    // By the end of a long schedule the signal coefficient is tiny
    let schedule = NoiseSchedule::build(&DiffusionConfig::default()).unwrap();
    let t = schedule.len() - 1;
    assert!(schedule.sqrt_alpha_bar[t] < 0.1);
    assert!(schedule.sqrt_one_minus_alpha_bar[t] > 0.99);
}
