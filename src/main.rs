use anyhow::{anyhow, Result};
use std::env;
use std::process::ExitCode;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

mod dashboard;
mod event_log;
mod joystick;
mod state;

use joystick::{discover_joysticks, sources_from_env, Joystick, JoystickSource};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(args: &[String]) -> Result<u8> {
    let prog = args.first().map(String::as_str).unwrap_or("joydeck");
    match args.get(1).map(String::as_str) {
        None => {
            print_help(prog);
            Ok(EXIT_FAILURE)
        }
        Some("--help" | "-h") if args.len() == 2 => {
            print_help(prog);
            Ok(EXIT_SUCCESS)
        }
        Some("--version") if args.len() == 2 => {
            println!("joydeck {}", env!("CARGO_PKG_VERSION"));
            Ok(EXIT_SUCCESS)
        }
        Some("--list" | "-l") if args.len() == 2 => cmd_list(),
        Some("--test" | "-t") if args.len() == 3 => cmd_test(&args[2]),
        Some("--event" | "-e") if args.len() == 3 => cmd_event(&args[2]),
        _ => {
            eprintln!("{prog}: unrecognized arguments: {}", args[1..].join(" "));
            Ok(EXIT_FAILURE)
        }
    }
}

fn cmd_list() -> Result<u8> {
    let sources = discovered_sources()?;
    if sources.is_empty() {
        println!("No joysticks were found");
        return Ok(EXIT_SUCCESS);
    }

    println!("Found {} joystick(s)\n", sources.len());
    for (joy_idx, source) in sources.iter().enumerate() {
        match Joystick::open(source.clone()) {
            Ok(joy) => print_joystick_info(joy_idx as i32, &joy),
            Err(err) => eprintln!("Unable to open joystick {joy_idx}: {err:#}"),
        }
    }
    Ok(EXIT_SUCCESS)
}

fn cmd_test(raw_idx: &str) -> Result<u8> {
    let joy_idx = parse_device_index(raw_idx)?;
    let Some(mut joy) = open_by_index(joy_idx)? else {
        return Ok(EXIT_SUCCESS);
    };
    dashboard::run_dashboard(&mut joy, joy_idx)?;
    Ok(EXIT_SUCCESS)
}

fn cmd_event(raw_idx: &str) -> Result<u8> {
    let joy_idx = parse_device_index(raw_idx)?;
    let Some(mut joy) = open_by_index(joy_idx)? else {
        return Ok(EXIT_SUCCESS);
    };
    print_joystick_info(joy_idx, &joy);
    event_log::run_event_log(&mut joy, joy_idx)?;
    Ok(EXIT_SUCCESS)
}

fn parse_device_index(raw: &str) -> Result<i32> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("JOYSTICKNUM argument must be a number, but was '{raw}'"))
}

fn discovered_sources() -> Result<Vec<JoystickSource>> {
    if let Some(sources) = sources_from_env() {
        return Ok(sources);
    }
    discover_joysticks()
}

/// Open failures are reported but do not fail the invocation; the action
/// is simply skipped.
fn open_by_index(joy_idx: i32) -> Result<Option<Joystick>> {
    let sources = discovered_sources()?;
    let source = usize::try_from(joy_idx)
        .ok()
        .and_then(|idx| sources.get(idx));
    let Some(source) = source else {
        eprintln!("Unable to open joystick {joy_idx}");
        return Ok(None);
    };
    match Joystick::open(source.clone()) {
        Ok(joy) => Ok(Some(joy)),
        Err(err) => {
            eprintln!("Unable to open joystick {joy_idx}: {err:#}");
            Ok(None)
        }
    }
}

fn print_joystick_info(joy_idx: i32, joy: &Joystick) {
    let caps = joy.capabilities();
    println!("Joystick Name:     '{}'", joy.name());
    println!("Joystick Number:   {joy_idx:2}");
    println!("Number of Axes:    {:2}", caps.axes);
    println!("Number of Buttons: {:2}", caps.buttons);
    println!("Number of Hats:    {:2}", caps.hats);
    println!("Number of Balls:   {:2}", caps.balls);
    println!();
}

fn print_help(prog: &str) {
    println!("Usage: {prog} [OPTION]");
    println!("List available joysticks or test a joystick.");
    println!("This program reads joystick state from the Linux evdev interface");
    println!("(/dev/input/event*).");
    println!();
    println!("Options:");
    println!("  -h, --help          Print this help");
    println!("      --version       Print version number and exit");
    println!("  -l, --list          Search for available joysticks and list their properties");
    println!("  -t, --test JOYNUM   Display a graphical representation of the current joystick state");
    println!("  -e, --event JOYNUM  Display the events that are received from the joystick");
    println!();
    println!("Examples:");
    println!("  {prog} --list");
    println!("  {prog} --test 0");
}
