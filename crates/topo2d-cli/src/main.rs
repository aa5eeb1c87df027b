//! Command-line driver for the 2-D topology optimization core.
//!
//! The core computes filtered sensitivities; this binary owns everything the
//! core deliberately excludes: the optimality-criteria design update, the
//! optimization loop with its convergence test, per-stage wall-clock
//! reporting and an optional JSON run summary.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use topo2d_io::{read_density_file, write_density_file};
use topo2d_solver::{Passivity, Problem, StageTimings};

use nalgebra::DVector;

fn usage() {
    eprintln!("usage:");
    eprintln!("  topo2d solve <nx> <ny>");
    eprintln!("  topo2d optimize <nx> <ny> [options]");
    eprintln!();
    eprintln!("optimize options:");
    eprintln!("  --volfrac <f>     volume fraction (default 0.5)");
    eprintln!("  --penal <f>       SIMP penalization exponent (default 3.0)");
    eprintln!("  --rmin <f>        filter radius in elements (default 1.5)");
    eprintln!("  --move <f>        OC move limit (default 0.2)");
    eprintln!("  --iters <n>       iteration cap (default 100)");
    eprintln!("  --tol <f>         convergence threshold on change (default 0.01)");
    eprintln!("  --densities <f>   initial density file (row-major text)");
    eprintln!("  --out <f>         write the final density field here");
    eprintln!("  --json <f>        write a JSON run summary here");
    eprintln!("  --render          print the final design as ASCII art");
}

struct OptimizeOptions {
    num_elements_x: usize,
    num_elements_y: usize,
    volume_fraction: f64,
    penalization: f64,
    radius_min: f64,
    move_limit: f64,
    max_iterations: usize,
    tolerance: f64,
    densities: Option<PathBuf>,
    out: Option<PathBuf>,
    json: Option<PathBuf>,
    render: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("solve") => parse_grid(&args[1..]).and_then(|(nx, ny)| run_solve(nx, ny)),
        Some("optimize") => parse_optimize(&args[1..]).and_then(run_optimize),
        _ => {
            usage();
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn parse_grid(args: &[String]) -> Result<(usize, usize), String> {
    if args.len() < 2 {
        return Err("expected <nx> <ny>".into());
    }
    let nx = args[0]
        .parse()
        .map_err(|_| format!("bad element count: {:?}", args[0]))?;
    let ny = args[1]
        .parse()
        .map_err(|_| format!("bad element count: {:?}", args[1]))?;
    Ok((nx, ny))
}

fn parse_optimize(args: &[String]) -> Result<OptimizeOptions, String> {
    let (num_elements_x, num_elements_y) = parse_grid(args)?;
    let mut options = OptimizeOptions {
        num_elements_x,
        num_elements_y,
        volume_fraction: 0.5,
        penalization: 3.0,
        radius_min: 1.5,
        move_limit: 0.2,
        max_iterations: 100,
        tolerance: 0.01,
        densities: None,
        out: None,
        json: None,
        render: false,
    };

    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        if flag == "--render" {
            options.render = true;
            continue;
        }
        let value = rest
            .next()
            .ok_or_else(|| format!("{} needs a value", flag))?;
        match flag.as_str() {
            "--volfrac" => options.volume_fraction = parse_f64(value)?,
            "--penal" => options.penalization = parse_f64(value)?,
            "--rmin" => options.radius_min = parse_f64(value)?,
            "--move" => options.move_limit = parse_f64(value)?,
            "--iters" => {
                options.max_iterations =
                    value.parse().map_err(|_| "bad --iters value".to_string())?
            }
            "--tol" => options.tolerance = parse_f64(value)?,
            "--densities" => options.densities = Some(PathBuf::from(value)),
            "--out" => options.out = Some(PathBuf::from(value)),
            "--json" => options.json = Some(PathBuf::from(value)),
            other => return Err(format!("unknown option: {}", other)),
        }
    }
    Ok(options)
}

fn parse_f64(token: &str) -> Result<f64, String> {
    token
        .parse()
        .map_err(|_| format!("bad numeric value: {:?}", token))
}

fn run_solve(num_elements_x: usize, num_elements_y: usize) -> Result<(), String> {
    let mut problem = Problem::new(num_elements_x, num_elements_y, 1.0, 3.0, 1.5, 0.2)
        .map_err(|err| err.to_string())?;

    let started = Instant::now();
    let info = problem.solve().map_err(|err| err.to_string())?;
    let elapsed = started.elapsed().as_secs_f64();

    println!("elements: {}", problem.mesh.num_elements);
    println!("dofs: {}", problem.mesh.num_dofs);
    println!("free_dofs: {}", problem.mesh.free_dofs.len());
    println!("matrix_nnz: {}", info.matrix_nnz);
    println!("solver: {}", info.solver_name);
    println!("solve_s: {:.4}", elapsed);
    println!(
        "tip_displacement: {:.6e}",
        problem.displacements[problem.mesh.load_dof()]
    );
    Ok(())
}

fn run_optimize(options: OptimizeOptions) -> Result<(), String> {
    let mut problem = Problem::new(
        options.num_elements_x,
        options.num_elements_y,
        options.volume_fraction,
        options.penalization,
        options.radius_min,
        options.move_limit,
    )
    .map_err(|err| err.to_string())?;

    if let Some(path) = &options.densities {
        let field = read_density_file(path, options.num_elements_x, options.num_elements_y)
            .map_err(|err| err.to_string())?;
        problem.load_densities(&field).map_err(|err| err.to_string())?;
    }

    let timestamp = chrono::Utc::now().to_rfc3339();
    let run_started = Instant::now();
    let mut totals = StageTimings::default();
    let mut iterations = 0usize;
    let mut compliance = 0.0;
    let mut change = f64::INFINITY;

    for iteration in 1..=options.max_iterations {
        let output = problem.optimization_step().map_err(|err| err.to_string())?;
        let updated = oc_update(
            &problem.design_variables,
            &problem.stiffness_derivative,
            &problem.volume_derivative,
            &problem.passivity,
            options.volume_fraction,
            options.move_limit,
        );
        let volume = updated.mean();
        problem.design_variables.copy_from(&updated);

        totals.filter_s += output.timings.filter_s;
        totals.interpolation_s += output.timings.interpolation_s;
        totals.solve_s += output.timings.solve_s;
        totals.sensitivity_s += output.timings.sensitivity_s;
        iterations = iteration;
        compliance = output.compliance;
        change = output.change;

        println!(
            "it: {:4}  compliance: {:11.4}  volume: {:6.3}  change: {:7.4}  solve_s: {:.3}",
            iteration, output.compliance, volume, output.change, output.timings.solve_s
        );

        // The change metric compares against the previous step's physical
        // densities, so it only becomes meaningful from the second step on.
        if iteration > 1 && output.change < options.tolerance {
            break;
        }
    }

    let elapsed = run_started.elapsed().as_secs_f64();
    println!("iterations: {}", iterations);
    println!("final_compliance: {:.6}", compliance);
    println!("final_change: {:.6}", change);
    println!("elapsed_s: {:.3}", elapsed);
    println!(
        "stage_s: filter {:.3}, interpolation {:.3}, solve {:.3}, sensitivity {:.3}",
        totals.filter_s, totals.interpolation_s, totals.solve_s, totals.sensitivity_s
    );

    if let Some(path) = &options.out {
        write_density_file(
            path,
            problem.design_variables_physical.as_slice(),
            options.num_elements_x,
            options.num_elements_y,
        )
        .map_err(|err| err.to_string())?;
        println!("wrote: {}", path.display());
    }

    if let Some(path) = &options.json {
        write_summary(
            path, &options, &timestamp, iterations, compliance, change, elapsed, &totals,
        )?;
        println!("wrote: {}", path.display());
    }

    if options.render {
        render(
            problem.design_variables_physical.as_slice(),
            options.num_elements_x,
            options.num_elements_y,
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_summary(
    path: &Path,
    options: &OptimizeOptions,
    timestamp: &str,
    iterations: usize,
    compliance: f64,
    change: f64,
    elapsed: f64,
    totals: &StageTimings,
) -> Result<(), String> {
    let summary = serde_json::json!({
        "timestamp": timestamp,
        "num_elements_x": options.num_elements_x,
        "num_elements_y": options.num_elements_y,
        "volume_fraction": options.volume_fraction,
        "penalization": options.penalization,
        "radius_min": options.radius_min,
        "move_limit": options.move_limit,
        "iterations": iterations,
        "final_compliance": compliance,
        "final_change": change,
        "elapsed_s": elapsed,
        "stage_totals_s": totals,
    });
    let text = serde_json::to_string_pretty(&summary).map_err(|err| err.to_string())?;
    std::fs::write(path, text).map_err(|err| err.to_string())
}

/// Optimality-criteria update with a move limit, bisecting the Lagrange
/// multiplier of the volume constraint.
fn oc_update(
    design: &DVector<f64>,
    compliance_derivative: &DVector<f64>,
    volume_derivative: &DVector<f64>,
    passivity: &[Passivity],
    volume_fraction: f64,
    move_limit: f64,
) -> DVector<f64> {
    let n = design.len();
    let mut lower = 0.0_f64;
    let mut upper = 1e9_f64;
    let mut updated = DVector::zeros(n);

    while (upper - lower) / (upper + lower) > 1e-3 {
        let lagrange = 0.5 * (lower + upper);
        for e in 0..n {
            updated[e] = match passivity[e] {
                Passivity::Solid => 1.0,
                Passivity::Void => 0.0,
                Passivity::Active => {
                    let x = design[e];
                    let scale =
                        (-compliance_derivative[e] / (volume_derivative[e] * lagrange)).max(0.0);
                    (x * scale.sqrt())
                        .clamp((x - move_limit).max(0.0), (x + move_limit).min(1.0))
                }
            };
        }
        if updated.mean() > volume_fraction {
            lower = lagrange;
        } else {
            upper = lagrange;
        }
    }
    updated
}

fn render(densities: &[f64], num_elements_x: usize, num_elements_y: usize) {
    for row in 0..num_elements_y {
        let mut line = String::with_capacity(num_elements_x);
        for col in 0..num_elements_x {
            let solid = densities[col * num_elements_y + row] > 0.5;
            line.push(if solid { '█' } else { ' ' });
        }
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oc_update_respects_volume_and_move_limit() {
        let n = 40;
        let design = DVector::from_element(n, 0.5);
        // Uneven sensitivities so the update actually redistributes.
        let dc = DVector::from_fn(n, |i, _| -1.0 - (i as f64 % 7.0));
        let dv = DVector::from_element(n, 1.0 / (n as f64 * 0.5));
        let passivity = vec![Passivity::Active; n];

        let updated = oc_update(&design, &dc, &dv, &passivity, 0.5, 0.2);

        let volume = updated.mean();
        assert!((volume - 0.5).abs() < 0.01, "volume {}", volume);
        for e in 0..n {
            assert!((0.0..=1.0).contains(&updated[e]));
            assert!((updated[e] - design[e]).abs() <= 0.2 + 1e-12);
        }
    }

    #[test]
    fn oc_update_pins_passive_elements() {
        let design = DVector::from_element(4, 0.5);
        let dc = DVector::from_element(4, -1.0);
        let dv = DVector::from_element(4, 0.5);
        let passivity = [
            Passivity::Active,
            Passivity::Solid,
            Passivity::Void,
            Passivity::Active,
        ];
        let updated = oc_update(&design, &dc, &dv, &passivity, 0.5, 0.2);
        assert_eq!(updated[1], 1.0);
        assert_eq!(updated[2], 0.0);
    }

    #[test]
    fn grid_parsing() {
        let args: Vec<String> = vec!["30".into(), "10".into()];
        assert_eq!(parse_grid(&args), Ok((30, 10)));
        assert!(parse_grid(&args[..1]).is_err());
    }

    #[test]
    fn optimize_options_parse_flags() {
        let args: Vec<String> = [
            "60", "20", "--volfrac", "0.4", "--penal", "3.5", "--iters", "30", "--render",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let options = parse_optimize(&args).unwrap();
        assert_eq!(options.num_elements_x, 60);
        assert_eq!(options.volume_fraction, 0.4);
        assert_eq!(options.penalization, 3.5);
        assert_eq!(options.max_iterations, 30);
        assert!(options.render);
    }
}
