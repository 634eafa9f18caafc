//! Circuit Dynamics - transient trace of a series RC or RL circuit
//!
//! Charges a capacitor (or energizes an inductor) from a battery through a
//! resistor and prints one tab-separated line per external tick.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug circuit-dynamics rc --capacitance 0.01 --steps 60 > trace.tsv
//! ```

use circuit_dynamics::solver::{DEFAULT_ERROR_THRESHOLD, DEFAULT_MIN_DT};
use circuit_dynamics::{Branch, Circuit, NodeId, Result, Simulator, SimulatorConfig};
use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Scenario {
    /// Battery, resistor and capacitor in series
    Rc,
    /// Battery, resistor and inductor in series
    Rl,
}

/// Transient circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which circuit to simulate
    #[arg(value_enum)]
    scenario: Scenario,

    /// Battery voltage in volts
    #[arg(long, default_value_t = 9.0)]
    voltage: f64,

    /// Series resistance in ohms
    #[arg(long, default_value_t = 10.0)]
    resistance: f64,

    /// Capacitance in farads (rc)
    #[arg(long, default_value_t = 0.01)]
    capacitance: f64,

    /// Inductance in henries (rl)
    #[arg(long, default_value_t = 1.0)]
    inductance: f64,

    /// External tick length in seconds
    #[arg(long, default_value_t = 1.0 / 30.0)]
    dt: f64,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 30)]
    steps: usize,

    /// Subdivision error threshold in amperes
    #[arg(long, default_value_t = DEFAULT_ERROR_THRESHOLD)]
    error_threshold: f64,

    /// Shortest sub-step in seconds
    #[arg(long, default_value_t = DEFAULT_MIN_DT)]
    min_dt: f64,
}

fn build_circuit(args: &Args) -> Circuit {
    let (ground, supply, load) = (NodeId::GROUND, NodeId(1), NodeId(2));

    let mut circuit = Circuit::new();
    circuit.add(Branch::battery("battery", [ground, supply], args.voltage, 0.0));
    circuit.add(Branch::resistor("resistor", [supply, load], args.resistance));
    circuit.add(match args.scenario {
        Scenario::Rc => Branch::capacitor("reactive", [load, ground], args.capacitance),
        Scenario::Rl => Branch::inductor("reactive", [load, ground], args.inductance),
    });
    circuit
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = SimulatorConfig::new()
        .with_error_threshold(args.error_threshold)
        .with_min_dt(args.min_dt);
    let mut simulator = Simulator::with_config(build_circuit(&args), config);

    log::info!(
        "simulating {:?} for {} ticks of {:e}s",
        args.scenario,
        args.steps,
        args.dt
    );

    println!("time\tvoltage\tcurrent\tmna_current\tsub_steps");
    for _ in 0..args.steps {
        simulator.step(args.dt)?;

        let sub_steps = simulator.last_result().map_or(0, |r| r.num_steps());
        if let Some(reactive) = simulator.circuit().find("reactive") {
            println!(
                "{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}",
                simulator.time(),
                reactive.voltage_drop,
                reactive.current,
                reactive.mna_current,
                sub_steps
            );
        }
    }

    Ok(())
}
