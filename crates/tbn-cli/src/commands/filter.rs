use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;

use tbn_filter::{parse_constraints_file, PolymerFilter};

use super::read_to_string;

#[derive(Args)]
pub struct FilterArgs {
    /// Input .tbn file (must declare \UNITS and per-monomer concentrations)
    tbn: PathBuf,

    /// Monomer names every matched polymer must contain
    names: Vec<String>,

    /// Maximum number of results to print
    #[arg(long = "num")]
    num: Option<usize>,

    /// Drop polymers below this percent of total concentration
    #[arg(long)]
    percent_limit: Option<f64>,

    /// File of CONTAINS/EXACTLY constraint lines, OR-ed together
    #[arg(long)]
    constraints_file: Option<PathBuf>,
}

pub fn run(args: FilterArgs) -> anyhow::Result<()> {
    if args.constraints_file.is_some() && !args.names.is_empty() {
        bail!("--constraints-file cannot be combined with command-line monomer names");
    }

    let content = read_to_string(&args.tbn)?;
    let path_str = args.tbn.display().to_string();
    let vars = HashMap::new();
    let tbn = tbn_io::parse_tbn(&content, &path_str, &vars).context("parsing TBN file")?;

    let stem = args.tbn.file_stem().and_then(|s| s.to_str()).unwrap_or("output").to_string();
    let dir = args.tbn.parent().map(PathBuf::from).unwrap_or_default();
    let polymat_path = dir.join(format!("{stem}.tbnpolymat"));
    let polymat_content = read_to_string(&polymat_path)?;

    let filter = PolymerFilter::load(tbn, &polymat_content, &polymat_path.display().to_string())
        .context("loading polymer matrix")?;

    let matches = if let Some(constraints_path) = &args.constraints_file {
        let constraints_content = read_to_string(constraints_path)?;
        let constraints = parse_constraints_file(&constraints_content).context("parsing constraints file")?;
        filter.filter_by_constraints(&constraints, args.num)
    } else {
        filter.filter_by_monomers(&args.names, args.percent_limit, args.num)
    };

    print!("{}", filter.format_output(&matches, &args.names, args.percent_limit, args.num));

    Ok(())
}
