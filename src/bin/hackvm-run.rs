use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hackvm_gen::{exec::ModelExecutor, Cpu, LinearMemory, SimConfig, Trap};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a HackVM image on the reference model"
)]
struct Opts {
    /// Stop after this many DISPLAYs (default: run until HALT)
    #[arg(short, long)]
    frames: Option<u64>,
    #[arg(long, default_value_t = SimConfig::default().max_steps)]
    max_steps: u64,
    /// Print final CPU state as JSON
    #[arg(long)]
    json: bool,
    #[arg(value_name = "BINFILE")]
    input: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let bytes = std::fs::read(&opts.input).with_context(|| format!("reading {}", opts.input))?;
    let mut mem = LinearMemory::new();
    mem.load(&bytes)?;

    let cfg = SimConfig { max_steps: opts.max_steps, ..SimConfig::default() };
    let mut cpu = Cpu::new(cfg);
    cpu.reset(0);

    let exec = ModelExecutor;
    let res = match opts.frames {
        Some(n) => cpu.run_frames(&mut mem, &exec, n),
        None => cpu.run(&mut mem, &exec),
    };
    match res {
        Ok(_) => {}
        Err(trap @ Trap::StepLimit { .. }) => eprintln!("STOP: {trap}"),
        Err(trap) => eprintln!("TRAP: {trap}"),
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&cpu)?);
    } else {
        println!("pc={:#06x} steps={} frames={} halted={}", cpu.pc, cpu.steps, cpu.frames, cpu.halted);
        for (i, r) in cpu.regs.iter().enumerate() {
            println!("  r{i} = {r:#06x}");
        }
    }
    Ok(())
}
