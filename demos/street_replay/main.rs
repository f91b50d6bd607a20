use std::{error::Error, path::Path};

use log::info;
use street_q::{config::SimulationConfig, Simulation};

const NUM_EPISODES: u32 = 1000;

/// Read a headerless CSV of street costs, one grid row per line
fn load_costs(path: &Path) -> Result<Vec<Vec<f32>>, Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    let mut costs = Vec::new();
    for record in rdr.records() {
        let row = record?
            .iter()
            .map(|cell| cell.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()?;
        costs.push(row);
    }
    Ok(costs)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("demos/street_replay/streets.csv"));
    let costs = load_costs(Path::new(&path))?;

    let config = SimulationConfig {
        train_episodes: NUM_EPISODES,
        // Discounting breaks ties between the route and loops over free streets
        gamma: 0.95,
        start: (0, 0),
        goal: (11, 13),
        seed: Some(1101),
        ..Default::default()
    };

    let sim = Simulation::from_config(&config, costs)?;
    info!(
        "Loaded {:?} street grid, listening on {}",
        sim.grid().shape(),
        sim.streamer().local_addr()?
    );

    let report = sim.run()?;
    info!(
        "Replayed {} moves to {} (reward {}, reached goal: {})",
        report.session.moves_sent, report.session.peer, report.route_reward, report.reached_goal
    );

    Ok(())
}
