use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use serde::Serialize;
use tracing::info;

use tbn_energy::AssocParams;
use tbn_equilibrium::{CoffeeSolver, EquilibriumSolver, NupackSolver, PolymerInput};

use super::{pick_hilbert_solver, read_to_string};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input .tbn file
    tbn: PathBuf,

    /// Output path for the user-friendly polymer basis listing
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also save a human-readable polymer basis listing
    #[arg(long)]
    user_friendly_polymer_basis: bool,

    #[arg(long)]
    no_concentrations: bool,

    #[arg(long)]
    no_free_energies: bool,

    /// Use 4ti2 instead of Normaliz for the Hilbert basis computation
    #[arg(long)]
    use_4ti2: bool,

    /// Use NUPACK's `concentrations` instead of COFFEE for equilibrium concentrations
    #[arg(long)]
    use_nupack_concentrations: bool,

    /// Association free-energy parameters "G,H" in kcal/mol
    #[arg(long = "deltaG", value_name = "G,H")]
    delta_g: Option<String>,

    /// Temperature in degrees Celsius
    #[arg(long, default_value_t = 37.0)]
    temperature: f64,

    /// Print a JSON summary instead of the human-readable one
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct AnalyzeSummary {
    polymer_count: usize,
    matrix_hash: String,
    used_cache: bool,
    concentration_units: Option<String>,
    notes: Vec<String>,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut notes = Vec::new();

    let content = read_to_string(&args.tbn)?;
    let path_str = args.tbn.display().to_string();
    let vars = HashMap::new();
    let tbn = tbn_io::parse_tbn(&content, &path_str, &vars).context("parsing TBN file")?;
    info!(monomers = tbn.monomers.len(), "parsed TBN file");

    if let Err(violations) = tbn.check_star_limiting() {
        let rows: Vec<String> = violations.iter().map(|(row, excess)| format!("row {row} excess {excess}")).collect();
        bail!("TBN is not star-limiting: {}", rows.join(", "));
    }

    let stem = args.tbn.file_stem().and_then(|s| s.to_str()).unwrap_or("output").to_string();
    let dir = args.tbn.parent().map(PathBuf::from).unwrap_or_default();
    let polymat_path = dir.join(format!("{stem}.tbnpolymat"));
    let basis_output_path = args.output.clone().unwrap_or_else(|| dir.join(format!("{stem}-polymer-basis.txt")));

    let config = super::super::solver_config();
    let solver = pick_hilbert_solver(&config, args.use_4ti2)?;

    let (polymers, used_cache) = match tbn_basis::load_cached(&tbn, &polymat_path) {
        Some(cached) => {
            info!("using cached polymer basis (matrix hashes match)");
            (cached, true)
        }
        None => {
            info!("computing polymer basis via {}", solver.name());
            let computed = tbn_basis::compute_polymer_basis(&tbn, solver.as_ref()).context("computing polymer basis")?;
            (computed, false)
        }
    };
    info!(count = polymers.len(), "polymer basis ready");

    if args.user_friendly_polymer_basis {
        tbn_basis::save_polymer_basis_user_friendly(&tbn, &polymers, &basis_output_path)
            .context("writing polymer basis listing")?;
    }

    let compute_free_energies = !args.no_free_energies;
    let mut compute_concentrations = !args.no_concentrations && compute_free_energies;

    let assoc = args
        .delta_g
        .as_deref()
        .map(parse_delta_g)
        .transpose()
        .context("parsing --deltaG")?;

    let free_energies = if compute_free_energies {
        Some(tbn_energy::compute_free_energies_parallel(tbn.matrix_a(), &polymers, assoc, args.temperature))
    } else {
        notes.push("Free energies not computed (--no-free-energies flag)".to_string());
        None
    };

    if tbn.concentrations().is_none() {
        compute_concentrations = false;
    }

    let concentrations = if compute_concentrations {
        let free_energies = free_energies.as_ref().expect("compute_concentrations implies compute_free_energies");
        let equilibrium_solver: Box<dyn EquilibriumSolver> = if args.use_nupack_concentrations {
            Box::new(NupackSolver::new(config.nupack_concentrations_path.clone()))
        } else {
            Box::new(CoffeeSolver::new(config.coffee_path.clone()))
        };

        if !equilibrium_solver.available() {
            notes.push(format!(
                "{} not found, skipping concentration computation",
                equilibrium_solver.name()
            ));
            None
        } else {
            let inputs: Vec<PolymerInput> = polymers
                .iter()
                .zip(free_energies.iter())
                .map(|(p, &fe)| PolymerInput { monomer_counts: p.monomer_counts.clone(), free_energy: fe })
                .collect();
            let monomer_concentrations = tbn.concentrations().expect("checked above");
            let result = equilibrium_solver
                .compute(&inputs, monomer_concentrations, args.temperature)
                .context("computing equilibrium concentrations")?;
            Some(result)
        }
    } else {
        None
    };

    if compute_free_energies && tbn.concentrations().is_none() {
        notes.push("No monomer concentrations provided, equilibrium concentrations not computed".to_string());
    } else if compute_free_energies && args.no_concentrations {
        notes.push("Equilibrium concentrations not computed (--no-concentrations flag)".to_string());
    }

    tbn_basis::save_polymat(
        &tbn,
        &polymers,
        &polymat_path,
        free_energies.as_deref(),
        concentrations.as_deref(),
        tbn.concentration_units,
    )
    .context("writing .tbnpolymat")?;

    let matrix_hash = tbn.matrix_hash_hex();

    if args.json {
        let summary = AnalyzeSummary {
            polymer_count: polymers.len(),
            matrix_hash,
            used_cache,
            concentration_units: tbn.concentration_units.map(|u| u.token().to_string()),
            notes,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if used_cache {
            println!("Polymer basis: {} polymers (cached)", polymers.len());
        } else {
            println!("Polymer basis computation complete");
            println!("Number of polymers in basis: {}", polymers.len());
        }
        if let Some(units) = tbn.concentration_units {
            println!("Concentration units: {}", units.display_name());
        }
        println!("Results saved to:");
        if args.user_friendly_polymer_basis {
            println!("  - Polymer basis: {}", basis_output_path.display());
        }
        println!("  - Polymer matrix: {}", polymat_path.display());
        for note in &notes {
            println!("Note: {note}");
        }
    }

    Ok(())
}

fn parse_delta_g(s: &str) -> anyhow::Result<AssocParams> {
    let (g, h) = s.split_once(',').with_context(|| format!("expected \"G,H\", got \"{s}\""))?;
    Ok(AssocParams {
        g_assoc: g.trim().parse().context("parsing G")?,
        h_assoc: h.trim().parse().context("parsing H")?,
    })
}
