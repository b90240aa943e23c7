use clap::{Parser, ValueEnum};
use log::info;

use faultflow::error::Result;
use faultflow::mocus::MocusConfig;
use faultflow::model::System;
use faultflow::petri::{DecorationMode, Event, PetriNetTranslator, Scenario};
use faultflow::types::ErrorModeId;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Mode {
    Concurrent,
    Deterministic,
}

impl From<Mode> for DecorationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Concurrent => DecorationMode::Concurrent,
            Mode::Deterministic => DecorationMode::Deterministic,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Error mode to analyse.
    #[arg(long, value_name = "NAME", default_value = "TankRupture")]
    error_mode: String,

    /// Only report cut sets up to this order.
    #[arg(long, value_name = "INT")]
    max_order: Option<usize>,

    /// Print the Petri net.
    #[arg(long)]
    petri: bool,

    /// Force the pressure switch to stick at the given time, decorating the net.
    #[arg(long, value_name = "TIME")]
    switch_at: Option<f64>,

    /// How a forced event is applied to the net.
    #[arg(long, value_enum, default_value = "concurrent")]
    mode: Mode,
}

/// The classic pressure tank: the tank ruptures on its own, or when relay
/// K2 stays closed, which happens on its own or when the pressure switch
/// sticks while relay K1 (or the timer driving it) fails too.
fn pressure_tank() -> Result<(System, ErrorModeId)> {
    let mut system = System::new("PressureTank");
    let tank = system.add_component("Tank")?;
    let k2 = system.add_component("RelayK2")?;
    let k1 = system.add_component("RelayK1")?;
    let switch = system.add_component("PressureSwitch")?;
    let timer = system.add_component("Timer")?;
    system.add_child(tank, k2)?;
    system.add_child(tank, k1)?;
    system.add_child(tank, switch)?;
    system.add_child(tank, timer)?;
    system.set_top_level(tank)?;

    system.add_internal_fault("T", Some("exp(0.00001)"))?;
    system.add_internal_fault("K2", Some("exp(0.0003)"))?;
    system.add_internal_fault("K1", Some("exp(0.0003)"))?;
    system.add_internal_fault("S", Some("exp(0.0001)"))?;
    system.add_internal_fault("R", Some("erlang(2,0.0001)"))?;

    let switch_closed = system.add_failure_mode("SwitchClosed")?;
    let timer_failed = system.add_failure_mode("TimerFailed")?;
    let k1_closed = system.add_failure_mode("K1Closed")?;
    let k2_closed = system.add_failure_mode("K2Closed")?;
    let rupture = system.add_failure_mode("Rupture")?;

    system.add_error_mode(switch, "SwitchStuck", "S", switch_closed, Some("dirac(0)"))?;
    system.add_error_mode(timer, "TimerError", "R", timer_failed, Some("dirac(0)"))?;
    system.add_error_mode(k1, "K1Error", "K1 || TimerSignal", k1_closed, Some("exp(1)"))?;
    system.add_error_mode(
        k2,
        "K2Error",
        "K2 || (SwitchSignal && K1Signal)",
        k2_closed,
        Some("exp(1)"),
    )?;
    let top = system.add_error_mode(tank, "TankRupture", "T || Overpressure", rupture, Some("exp(0.5)"))?;

    let switch_signal = system.faults().require("SwitchSignal")?;
    let timer_signal = system.faults().require("TimerSignal")?;
    let k1_signal = system.faults().require("K1Signal")?;
    let overpressure = system.faults().require("Overpressure")?;
    system.add_propagation_port(switch, switch_closed, switch_signal, k2, 1.0)?;
    system.add_propagation_port(timer, timer_failed, timer_signal, k1, 1.0)?;
    system.add_propagation_port(k1, k1_closed, k1_signal, k2, 1.0)?;
    system.add_propagation_port(k2, k2_closed, overpressure, tank, 0.95)?;

    Ok((system, top))
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let (system, default_top) = pressure_tank()?;
    let top = if args.error_mode == system.error_mode(default_top).name() {
        default_top
    } else {
        system.error_mode_by_name(&args.error_mode)?
    };

    let tree = system.fault_tree(top)?;
    info!(
        "fault tree of `{}`: {} nodes, {} gates, {} basic events, depth {}",
        args.error_mode,
        tree.len(),
        tree.gate_count(),
        tree.basic_events().len(),
        tree.depth()
    );

    let config = MocusConfig {
        max_order: args.max_order,
        ..Default::default()
    };
    let cut_sets = tree.minimal_cut_sets_with_config(&config)?;
    println!("{} minimal cut sets:", cut_sets.len());
    for cut_set in &cut_sets {
        println!("  {}", cut_set.display(&tree));
    }

    if args.petri || args.switch_at.is_some() {
        let mut translator = PetriNetTranslator::new();
        translator.translate(&system)?;

        if let Some(time) = args.switch_at {
            let mut scenario = Scenario::new();
            scenario.add_event(Event::Fault(system.faults().require("S")?), time);
            scenario.accept(&system, &mut translator, args.mode.into())?;
        }

        let net = translator.net();
        println!("places:");
        for place in net.places() {
            println!("  {} [{}]", place.name(), translator.marking().tokens(place.name()));
        }
        println!("transitions:");
        for transition in net.transitions() {
            println!(
                "  {} : {:?} -> {:?} enabling={} delay={} priority={:?}",
                transition.name(),
                net.inputs_of(transition.name()),
                net.outputs_of(transition.name()),
                transition.enabling_function().unwrap_or("-"),
                transition.delay().map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                transition.priority()
            );
        }
    }

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
