use anyhow::Result;
use simplex_mesh::config::Config;
use simplex_mesh::simulation::Simulation;

fn main() -> Result<()> {
    // Logging goes to stderr so the JSON report stays pipeable.
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_yaml_file(&path)?,
        None => Config::default(),
    };

    let mut simulation = Simulation::new(config)?;
    simulation.run();
    simulation.compute_positions();

    let report = simulation.report();
    eprintln!(
        "Nodes anchored: {} / {}",
        report.n_anchored, report.n_nodes
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
