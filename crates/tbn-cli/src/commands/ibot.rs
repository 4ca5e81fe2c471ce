use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;

use tbn_core::units::Unit;
use tbn_ibot::IBOTAlgorithm;
use tbn_reactions::CanonicalReactionsComputer;

use super::{pick_hilbert_solver, read_to_string};

#[derive(Args)]
pub struct IbotArgs {
    /// Input .tbn file, without a \UNITS declaration
    tbn: PathBuf,

    /// .tbnpolys file listing the on-target polymers
    on_target: PathBuf,

    #[arg(long)]
    use_4ti2: bool,

    /// Generate a .tbn file with synthesized concentrations: base value C and UNIT (pM/nM/uM/mM/M)
    #[arg(long, num_args = 2, value_names = ["C", "UNIT"])]
    generate_tbn: Option<Vec<String>>,

    #[arg(long)]
    output_prefix: Option<String>,

    #[arg(long)]
    output_canonical_reactions: bool,

    /// Compute upper bounds only for the off-target polymers listed in this .tbnpolys file
    #[arg(long, value_name = "TBNPOLYS_FILE")]
    upper_bound_on_polymers: Option<PathBuf>,
}

pub fn run(args: IbotArgs) -> anyhow::Result<()> {
    if args.upper_bound_on_polymers.is_some() && args.generate_tbn.is_some() {
        bail!("--upper-bound-on-polymers cannot be used with --generate-tbn (we don't know all polymer concentrations)");
    }

    let content = read_to_string(&args.tbn)?;
    let path_str = args.tbn.display().to_string();
    let vars = HashMap::new();
    let tbn = tbn_io::parse_tbn(&content, &path_str, &vars).context("parsing TBN file")?;

    if tbn.concentration_units.is_some() {
        bail!("TBN file must not contain concentrations (no \\UNITS)");
    }

    let stem = args.tbn.file_stem().and_then(|s| s.to_str()).unwrap_or("output").to_string();
    let output_prefix = args.output_prefix.clone().unwrap_or(stem);

    let config = super::super::solver_config();
    let solver = pick_hilbert_solver(&config, args.use_4ti2)?;

    let polymers = tbn_basis::compute_polymer_basis(&tbn, solver.as_ref()).context("computing polymer basis")?;
    let polymer_vectors: Vec<Vec<i64>> = polymers.iter().map(|p| p.monomer_counts.clone()).collect();

    let on_target_content = read_to_string(&args.on_target)?;
    let on_target_polymers = tbn_io::tbnpolys::parse_polymers(&on_target_content, &tbn, &args.on_target.display().to_string())
        .context("parsing on-target polymers")?;
    let on_target_vectors: Vec<Vec<i64>> = on_target_polymers.iter().map(|p| p.monomer_counts.clone()).collect();

    let on_target_indices = CanonicalReactionsComputer::find_on_target_indices(&on_target_vectors, &polymer_vectors)
        .context("locating on-target polymers in the polymer basis")?;

    let computer = CanonicalReactionsComputer::setup_matrices(&tbn, polymer_vectors.clone(), on_target_indices.clone());

    let reactions = if let Some(upper_bound_path) = &args.upper_bound_on_polymers {
        let content = read_to_string(upper_bound_path)?;
        let target_polymers = tbn_io::tbnpolys::parse_polymers(&content, &tbn, &upper_bound_path.display().to_string())
            .context("parsing upper-bound target polymers")?;

        let mut target_indices = BTreeSet::new();
        for polymer in &target_polymers {
            match polymer_vectors.iter().position(|v| v == &polymer.monomer_counts) {
                Some(idx) => {
                    target_indices.insert(idx);
                }
                None => eprintln!("Warning: target polymer {:?} not found in polymer basis", polymer.monomer_counts),
            }
        }
        if target_indices.is_empty() {
            bail!("no valid target polymers found in polymer basis");
        }

        computer
            .compute_irreducible_canonical_reactions_for_targets(solver.as_ref(), &target_indices)
            .context("computing irreducible canonical reactions for targets")?
    } else {
        computer
            .compute_irreducible_canonical_reactions(solver.as_ref())
            .context("computing irreducible canonical reactions")?
    };

    if let Some(violating) = computer.check_on_target_detailed_balance(&reactions) {
        bail!("on-target polymers not in detailed balance; violating reaction: {violating}");
    }

    let mut algorithm = IBOTAlgorithm::new(&tbn, polymer_vectors.clone(), on_target_indices.clone(), reactions);
    let concentration_exponents = algorithm.run();

    let suffix = if args.upper_bound_on_polymers.is_some() { "-upper-bounds" } else { "" };
    let output_tbnpolys = PathBuf::from(format!("{output_prefix}-ibot{suffix}.tbnpolys"));
    algorithm.generate_tbnpolys_output(&output_tbnpolys).context("writing IBOT .tbnpolys output")?;

    if args.output_canonical_reactions {
        let output_reactions = PathBuf::from(format!("{output_prefix}-ibot{suffix}-reactions.txt"));
        algorithm.generate_reactions_output(&output_reactions).context("writing canonical reactions output")?;
    }

    if let Some(generate_tbn) = &args.generate_tbn {
        let c: f64 = generate_tbn[0].parse().context("parsing concentration base value C")?;
        let units = Unit::parse(&generate_tbn[1]).context("parsing concentration units")?;
        let output_tbn = PathBuf::from(format!("{output_prefix}-ibot-c{c}.tbn"));
        algorithm.generate_tbn_output(&output_tbn, c, units).context("writing synthesized .tbn file")?;
    }

    let n_on_target = algorithm.on_target_indices().len();
    let n_off_target = polymer_vectors_len(&algorithm) - n_on_target;
    let unique_mus: std::collections::HashSet<_> =
        concentration_exponents.values().map(|v| v.to_bits()).collect();

    println!("IBOT algorithm completed successfully");
    println!("Total polymers: {}", polymer_vectors_len(&algorithm));
    println!("On-target polymers: {n_on_target}");
    println!("Off-target polymers: {n_off_target}");
    println!("Unique concentration exponents: {}", unique_mus.len());

    Ok(())
}

fn polymer_vectors_len(algorithm: &IBOTAlgorithm<'_>) -> usize {
    algorithm.polymers().len()
}
