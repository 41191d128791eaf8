//! Audio device enumeration command.

use clap::Args;
use station_sources::{default_device, list_devices};

#[derive(Args)]
pub struct DevicesArgs {
    /// Show only the host's default input/output devices.
    #[arg(long)]
    default_only: bool,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    if args.default_only {
        let (input, output) = default_device()?;

        println!("Default Audio Devices");
        println!("======================\n");

        match input {
            Some(device) => println!("Default Input:  {} ({} Hz)", device.name, device.default_sample_rate),
            None => println!("Default Input:  none"),
        }
        match output {
            Some(device) => println!("Default Output: {} ({} Hz)", device.name, device.default_sample_rate),
            None => println!("Default Output: none"),
        }
        return Ok(());
    }

    let devices = list_devices()?;
    if devices.is_empty() {
        println!("No audio devices found.");
        return Ok(());
    }

    println!("Available Audio Devices");
    println!("========================\n");

    let inputs: Vec<_> = devices.iter().filter(|d| d.is_input).collect();
    if !inputs.is_empty() {
        println!("Input devices (usable as a `device` source):");
        for device in &inputs {
            let also_output = if device.is_output { " (also output)" } else { "" };
            println!("  {} ({} Hz){}", device.name, device.default_sample_rate, also_output);
        }
        println!();
    }

    let outputs: Vec<_> = devices.iter().filter(|d| d.is_output).collect();
    if !outputs.is_empty() {
        println!("Output devices:");
        for device in &outputs {
            let also_input = if device.is_input { " (also input)" } else { "" };
            println!("  {} ({} Hz){}", device.name, device.default_sample_rate, also_input);
        }
        println!();
    }

    println!("Total: {} input(s), {} output(s)", inputs.len(), outputs.len());

    Ok(())
}
