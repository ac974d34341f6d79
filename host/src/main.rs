use canpong_core::NodeConfig;
use host::{load_config, save_report, simulate, SessionOptions, SessionReport};
use std::env;
use std::time::Instant;

const DEFAULT_SESSION_MS: u64 = 20_000;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    println!("🏓 CAN Pong link simulator");
    println!("{}", "=".repeat(70));
    println!();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "simulate" => {
            let mut config_file = None;
            let mut duration_ms = DEFAULT_SESSION_MS;
            let mut options = SessionOptions::default();
            let mut output_file = None;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--config" | "-c" => {
                        config_file = Some(flag_value(&args, i, "--config").to_string());
                        i += 2;
                    }
                    "--ms" => {
                        duration_ms = parse_flag(&args, i, "--ms");
                        i += 2;
                    }
                    "--loss" => {
                        options.loss_permille = parse_flag(&args, i, "--loss");
                        i += 2;
                    }
                    "--seed" => {
                        options.seed = parse_flag(&args, i, "--seed");
                        i += 2;
                    }
                    "--both-commit" => {
                        options.commit_at_ms = [Some(200), Some(200)];
                        i += 1;
                    }
                    other if other.starts_with('-') => {
                        eprintln!("❌ Unknown option: {}", other);
                        print_usage(&args[0]);
                        std::process::exit(1);
                    }
                    other => {
                        output_file = Some(other.to_string());
                        i += 1;
                    }
                }
            }

            simulate_command(config_file.as_deref(), options, duration_ms, output_file.as_deref());
        }

        "check-config" => {
            if args.len() < 3 {
                eprintln!("Usage: {} check-config <config_file>", args[0]);
                eprintln!("Error: Missing required argument");
                std::process::exit(1);
            }

            check_config_command(&args[2]);
        }

        "--help" | "-h" => {
            print_usage(&args[0]);
            std::process::exit(0);
        }

        _ => {
            eprintln!("❌ Unknown command: {}", command);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [options]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  simulate [--config <file>] [--ms <n>] [--loss <permille>] [--seed <n>] [--both-commit] [output_file]");
    eprintln!("      Run two boards against a simulated shared bus");
    eprintln!("      - --config: Optional node configuration (JSON), firmware defaults otherwise");
    eprintln!("      - --ms: Simulated session length in milliseconds (default {})", DEFAULT_SESSION_MS);
    eprintln!("      - --loss: Frame loss per receiver, in thousandths (default 0)");
    eprintln!("      - --seed: Seed of the loss model");
    eprintln!("      - --both-commit: Both players click commit at once (two-leader mode)");
    eprintln!("      - output_file: Optional file to save the session report (JSON)");
    eprintln!("                     Defaults to: canpong-session_<timestamp>.json");
    eprintln!();
    eprintln!("  check-config <config_file>");
    eprintln!("      Validate a node configuration and print the derived frame ids");
    eprintln!();
    eprintln!("Logging is controlled through RUST_LOG, e.g. RUST_LOG=canpong_core=debug");
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            eprintln!("❌ Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn parse_flag<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T
where
    T::Err: std::fmt::Display,
{
    flag_value(args, i, flag).parse().unwrap_or_else(|e| {
        eprintln!("❌ Error: invalid value for {}: {}", flag, e);
        std::process::exit(1);
    })
}

fn simulate_command(
    config_file: Option<&str>,
    options: SessionOptions,
    duration_ms: u64,
    output_file: Option<&str>,
) {
    let config = match config_file {
        Some(path) => load_config(path).unwrap_or_else(|e| {
            eprintln!("❌ Error loading config '{}': {}", path, e);
            std::process::exit(1);
        }),
        None => NodeConfig::default(),
    };

    println!("📋 Simulating pair session");
    println!("  Config: {}", config_file.unwrap_or("firmware defaults"));
    println!("  Group: {}", config.group);
    println!("  Length: {} ms", duration_ms);
    println!("  Loss: {}‰ (seed {})", options.loss_permille, options.seed);
    println!();

    let start = Instant::now();
    let report = simulate(&config, options, duration_ms).unwrap_or_else(|e| {
        eprintln!("❌ Session failed: {}", e);
        std::process::exit(1);
    });
    println!("  Wall time: {:.2}s", start.elapsed().as_secs_f64());
    println!();

    print_report(&report);

    let default_filename = format!("canpong-session_{}.json", chrono::Utc::now().timestamp());
    let file_to_save = output_file.unwrap_or(&default_filename);

    match save_report(&report, file_to_save) {
        Ok(_) => {
            println!();
            println!("💾 Report saved to: {}", file_to_save);
            println!("{}", "=".repeat(70));
        }
        Err(e) => {
            eprintln!("❌ Error saving report: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_report(report: &SessionReport) {
    for (i, node) in report.nodes.iter().enumerate() {
        println!("Node {} ({})", i + 1, node.role);
        println!("  Score (opponent-own): {}-{}", node.score.left, node.score.right);
        println!(
            "  Frames: {} sent, {} applied, {} dropped, {} send failures",
            node.frames_sent, node.frames_applied, node.frames_dropped, node.send_failures
        );
        println!("  Physics ticks: {}  Points: {}  Renders: {}", node.physics_ticks, node.points, node.renders);
        if let Some(digest) = &node.trace_digest {
            println!("  Trace: 0x{} ({} samples)", digest, node.trace_samples);
        }
    }
    println!();
    println!(
        "Bus: {} sent, {} delivered, {} lost, {} rejected",
        report.bus.sent, report.bus.delivered, report.bus.lost, report.bus.rejected
    );
    match report.leaders() {
        1 => println!(
            "✅ One leader, view agreement {}.{}% over {} samples",
            report.view_agreement_permille / 10,
            report.view_agreement_permille % 10,
            report.view_samples
        ),
        0 => println!("⚠️  Nobody claimed leadership"),
        n => println!("⚠️  {} leaders: degraded last-writer-wins mode", n),
    }
}

fn check_config_command(config_file: &str) {
    println!("📋 Checking config");
    println!("  Config file: {}", config_file);
    println!();

    match load_config(config_file) {
        Ok(config) => {
            let ids = config.frame_ids();
            println!("✅ Config is valid");
            println!("  Group {}, node id {}", config.group, config.node_id);
            println!("  Frame ids: paddle {}, ball {}, score {}", ids.paddle, ids.ball, ids.score);
            println!(
                "  Intervals: paddle send {} ms, physics {} ms, paddle move {} ms, render {} ms",
                config.intervals.paddle_send_ms,
                config.intervals.physics_ms,
                config.intervals.paddle_move_ms,
                config.intervals.render_ms
            );
            println!("  Ball payload: {} bytes", config.protocol.ball_layout.payload_len());
            println!("{}", "=".repeat(70));
        }
        Err(e) => {
            eprintln!("❌ Invalid config: {}", e);
            std::process::exit(1);
        }
    }
}
