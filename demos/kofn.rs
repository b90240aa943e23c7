use clap::Parser;
use log::info;

use faultflow::model::System;
use faultflow::utils::binomial;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of failed channels that trip the voter.
    #[arg(value_name = "INT", default_value = "2")]
    k: u32,

    /// Number of redundant channels.
    #[arg(value_name = "INT", default_value = "4")]
    n: u32,

    /// Feed every channel from a shared power supply.
    #[clap(long)]
    shared_power: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    // Each channel fails on its own sensor fault, optionally also when the
    // shared supply fails; the voter trips when k of the n channels fail.
    let mut system = System::new("Voter");
    let voter = system.add_component("Voter")?;
    let supply = if args.shared_power {
        let supply = system.add_component("Supply")?;
        let lost = system.add_failure_mode("PowerLost")?;
        system.add_error_mode(supply, "SupplyError", "Psu", lost, None)?;
        Some((supply, lost))
    } else {
        None
    };

    let mut inputs = Vec::new();
    for i in 1..=args.n {
        let channel = system.add_component(&format!("Channel{}", i))?;
        let failure = system.add_failure_mode(&format!("Channel{}Down", i))?;
        let activation = match supply {
            Some(_) => format!("Sensor{} || Power{}", i, i),
            None => format!("Sensor{}", i),
        };
        system.add_error_mode(channel, &format!("Channel{}Error", i), &activation, failure, None)?;
        if let Some((supply, lost)) = supply {
            let power = system.faults().require(&format!("Power{}", i))?;
            system.add_propagation_port(supply, lost, power, channel, 1.0)?;
        }
        inputs.push((channel, failure, format!("Vote{}", i)));
    }

    let vote = format!(
        "{}/{}({})",
        args.k,
        args.n,
        inputs.iter().map(|(_, _, name)| name.as_str()).collect::<Vec<_>>().join(",")
    );
    let tripped = system.add_failure_mode("Tripped")?;
    let top = system.add_error_mode(voter, "VoterError", &vote, tripped, None)?;
    for (channel, failure, name) in &inputs {
        let input = system.faults().require(name)?;
        system.add_propagation_port(*channel, *failure, input, voter, 1.0)?;
    }
    info!("activation: {}", system.error_mode(top).activation().to_simple_string(system.faults()));

    let tree = system.fault_tree(top)?;
    let cut_sets = tree.minimal_cut_sets()?;
    println!(
        "{} minimal cut sets (C({}, {}) = {})",
        cut_sets.len(),
        args.n,
        args.k,
        binomial(args.n as u64, args.k as u64)
    );
    for cut_set in &cut_sets {
        println!("  {}", cut_set.display(&tree));
    }

    Ok(())
}
