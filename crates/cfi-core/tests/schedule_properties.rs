use cfi_core::{DiffusionConfig, NoiseSchedule, ScheduleKind};

fn build(kind: ScheduleKind, timesteps: usize) -> NoiseSchedule {
    NoiseSchedule::build(&DiffusionConfig {
        timesteps,
        beta_start: 1e-4,
        beta_end: 0.02,
        schedule: kind,
    })
    .unwrap()
}

#[test]
fn alpha_bar_decays_monotonically() {
    for kind in [
        ScheduleKind::Linear,
        ScheduleKind::Quadratic,
        ScheduleKind::Cosine,
    ] {
        let schedule = build(kind, 1000);
        for t in 1..schedule.len() {
            assert!(
                schedule.alpha_bar[t] <= schedule.alpha_bar[t - 1],
                "{}: alpha_bar increased at t={} ({} > {})",
                kind,
                t,
                schedule.alpha_bar[t],
                schedule.alpha_bar[t - 1]
            );
        }
        println!(
            "{}: alpha_bar[0]={:.6}, alpha_bar[T-1]={:.6e}",
            kind,
            schedule.alpha_bar[0],
            schedule.alpha_bar[schedule.len() - 1]
        );
    }
}

#[test]
fn sqrt_buffers_satisfy_pythagorean_identity() {
    for kind in [
        ScheduleKind::Linear,
        ScheduleKind::Quadratic,
        ScheduleKind::Cosine,
    ] {
        let schedule = build(kind, 1000);
        for t in 0..schedule.len() {
            let sum = schedule.sqrt_alpha_bar[t].powi(2)
                + schedule.sqrt_one_minus_alpha_bar[t].powi(2);
            assert!(
                (sum - 1.0).abs() < 1e-5,
                "{}: identity violated at t={}: {}",
                kind,
                t,
                sum
            );
        }
    }
}

#[test]
fn betas_stay_in_open_unit_interval() {
    for kind in [
        ScheduleKind::Linear,
        ScheduleKind::Quadratic,
        ScheduleKind::Cosine,
    ] {
        let schedule = build(kind, 1000);
        for (t, &beta) in schedule.betas.iter().enumerate() {
            assert!(
                beta > 0.0 && beta < 1.0,
                "{}: beta[{}] = {} out of (0, 1)",
                kind,
                t,
                beta
            );
        }
    }
}

#[test]
fn cosine_betas_are_clipped() {
    let schedule = build(ScheduleKind::Cosine, 1000);
    for (t, &beta) in schedule.betas.iter().enumerate() {
        assert!(
            (1e-4..=0.999).contains(&beta),
            "cosine beta[{}] = {} outside clip range",
            t,
            beta
        );
    }
    // The tail of the cosine schedule actually hits the upper clip
    assert!(schedule.betas[schedule.len() - 1] > 0.9);
}

#[test]
fn posterior_variance_is_nonnegative() {
    for kind in [
        ScheduleKind::Linear,
        ScheduleKind::Quadratic,
        ScheduleKind::Cosine,
    ] {
        let schedule = build(kind, 500);
        for (t, &v) in schedule.posterior_variance.iter().enumerate() {
            assert!(v >= 0.0, "{}: posterior_variance[{}] = {}", kind, t, v);
            assert!(v.is_finite());
        }
        // log variance is clamped away from -inf
        for &lv in &schedule.posterior_log_variance {
            assert!(lv.is_finite());
        }
    }
}

#[test]
fn linear_t10_reference_scenario() {
    let schedule = build(ScheduleKind::Linear, 10);

    assert_eq!(schedule.betas.len(), 10);
    assert_eq!(schedule.alphas.len(), 10);
    assert_eq!(schedule.alpha_bar.len(), 10);
    assert_eq!(schedule.alpha_bar_prev.len(), 10);
    assert_eq!(schedule.posterior_variance.len(), 10);

    assert!(schedule.alpha_bar[9] < schedule.alpha_bar[0]);
    assert!(schedule.posterior_variance[0] >= 0.0);

    println!(
        "T=10 linear: alpha_bar={:?}",
        schedule
            .alpha_bar
            .iter()
            .map(|a| format!("{:.4}", a))
            .collect::<Vec<_>>()
    );
}
