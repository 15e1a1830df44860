use cfi_core::{DiffusionConfig, NoiseSchedule, ScheduleKind};

/// Compare how fast each schedule kind destroys signal.
fn main() {
    let timesteps = 1000;
    println!("Schedule scan, T={}", timesteps);
    println!();
    println!(
        "{:<10} {:>12} {:>12} {:>12} {:>14}",
        "kind", "beta[0]", "beta[T-1]", "alpha_bar@T/2", "alpha_bar[T-1]"
    );

    for kind in [
        ScheduleKind::Linear,
        ScheduleKind::Quadratic,
        ScheduleKind::Cosine,
    ] {
        let schedule = NoiseSchedule::build(&DiffusionConfig {
            timesteps,
            beta_start: 1e-4,
            beta_end: 0.02,
            schedule: kind,
        })
        .unwrap();

        println!(
            "{:<10} {:>12.6} {:>12.6} {:>12.6} {:>14.6e}",
            kind.to_string(),
            schedule.betas[0],
            schedule.betas[timesteps - 1],
            schedule.alpha_bar[timesteps / 2],
            schedule.alpha_bar[timesteps - 1],
        );
    }

    println!();
    println!("Half-signal timestep (alpha_bar first below 0.5):");
    for kind in [
        ScheduleKind::Linear,
        ScheduleKind::Quadratic,
        ScheduleKind::Cosine,
    ] {
        let schedule = NoiseSchedule::build(&DiffusionConfig {
            timesteps,
            beta_start: 1e-4,
            beta_end: 0.02,
            schedule: kind,
        })
        .unwrap();
        let t_half = schedule
            .alpha_bar
            .iter()
            .position(|&a| a < 0.5)
            .unwrap_or(timesteps);
        println!("  {:<10} t = {}", kind.to_string(), t_half);
    }
}
