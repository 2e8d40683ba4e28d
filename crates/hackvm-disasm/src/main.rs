use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use hackvm_disasm::{analyze, load_raw_bin, EdgeKind};
use hackvm_gen::disasm::listing;

#[derive(Parser, Debug)]
#[command(author, version, about = "HackVM image lister", long_about=None)]
struct Cli {
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Input binary path
    #[arg(value_name = "BINFILE")]
    input: PathBuf,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Linear listing of the whole image
    List {
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Branch edges and the labels they converge on
    Branches {
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat { Text, Json }

fn emit(out: Option<PathBuf>, text: &str) -> Result<()> {
    if let Some(path) = out { std::fs::write(path, text)?; } else { print!("{}", text); }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let img = load_raw_bin(&cli.input, cli.skip, cli.len)?;

    match cli.cmd {
        Command::List { show_bytes, out } => emit(out, &listing(&img.bytes, show_bytes))?,
        Command::Branches { format, out } => {
            let report = analyze(&img);
            let text = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&report)? + "\n",
                OutputFormat::Text => {
                    use std::fmt::Write as _;
                    let mut buf = String::new();
                    let _ = writeln!(buf, "{} ({} bytes, {} insns)", report.name, report.len, report.insns.len());
                    if let Some(at) = report.bad_at {
                        let _ = writeln!(buf, "  undecodable byte at {at:#06x}");
                    }
                    let _ = writeln!(buf, "Edges:");
                    for e in &report.edges {
                        let kind = match e.kind { EdgeKind::Jump => "jmp", EdgeKind::CondBranch => "cbr", EdgeKind::Call => "call", EdgeKind::Indirect => "ind" };
                        let dir = if e.forward { "fwd" } else { "back" };
                        match e.to {
                            Some(t) => { let _ = writeln!(buf, "  {:#06x} -> {t:#06x} ({kind}, {dir})", e.from); }
                            None => { let _ = writeln!(buf, "  {:#06x} -> ? ({kind})", e.from); }
                        }
                    }
                    let _ = writeln!(buf, "Labels:");
                    for (addr, (name, n)) in &report.labels {
                        let _ = writeln!(buf, "  {addr:#06x} <{name}> x{n}");
                    }
                    buf
                }
            };
            emit(out, &text)?;
        }
    }

    Ok(())
}
