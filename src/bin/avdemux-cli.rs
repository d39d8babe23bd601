use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use avdemux::{
    AnalyseLevel, AnalyseOptions, FfmpegLogLevel, FileProperties, FormatProfile, FrameCount,
    InputFile, ProgressCallback, ProgressInfo, ProgressStatus, ReadPolicy, StreamProperties,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use ffmpeg_next::Rational;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};

const BIN_NAME: &str = "avdemux-cli";

const CLI_AFTER_HELP: &str = "Examples:\n  avdemux-cli probe input.mp4 --json\n  avdemux-cli probe input.mkv --full --progress\n  avdemux-cli packets input.mp4 --stream 0 --limit 20\n  avdemux-cli packets input.ts --stream 1 --seek-frame 250 -o probesize=5000000\n  avdemux-cli completions zsh > _avdemux-cli";

#[derive(Debug, Parser)]
#[command(
    name = BIN_NAME,
    version,
    about = "Inspect and demultiplex container media files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Format option applied before reading, as KEY=VALUE. Repeatable.
    #[arg(short = 'o', long = "option", global = true)]
    options: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyse a file and print its properties.
    #[command(
        about = "Print file and stream properties",
        visible_alias = "info",
        after_help = "Examples:\n  avdemux-cli probe input.mp4\n  avdemux-cli probe input.mp4 --full --json"
    )]
    Probe {
        /// Input media path.
        input: PathBuf,

        /// Scan the whole file for exact counts instead of the first GOP.
        #[arg(long)]
        full: bool,

        /// Output properties as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Dump the packets of one stream.
    #[command(
        about = "List packets of a stream",
        after_help = "Examples:\n  avdemux-cli packets input.mp4 --stream 0\n  avdemux-cli packets input.mp4 --stream 1 --seek-frame 100 --limit 10 --json"
    )]
    Packets {
        /// Input media path.
        input: PathBuf,

        /// Stream index to read.
        #[arg(long, default_value_t = 0)]
        stream: usize,

        /// Stop after this many packets.
        #[arg(long)]
        limit: Option<u64>,

        /// Seek to this frame of the stream before reading.
        #[arg(long)]
        seek_frame: Option<u64>,

        /// Output one JSON object per packet.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "panic" => Some(FfmpegLogLevel::Panic),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "verbose" => Some(FfmpegLogLevel::Verbose),
        "debug" => Some(FfmpegLogLevel::Debug),
        "trace" => Some(FfmpegLogLevel::Trace),
        _ => None,
    }
}

fn parse_option(value: &str) -> Result<(&str, &str), String> {
    value
        .split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got {value:?}"))
}

fn format_profile(global: &GlobalOptions) -> Result<FormatProfile, Box<dyn std::error::Error>> {
    let pairs = global
        .options
        .iter()
        .map(|option| parse_option(option))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FormatProfile::from_pairs(pairs)?)
}

fn format_rational(value: Option<Rational>) -> String {
    value.map_or_else(
        || "-".to_string(),
        |rational| format!("{}/{}", rational.numerator(), rational.denominator()),
    )
}

fn format_duration(value: Option<Duration>) -> String {
    value.map_or_else(|| "-".to_string(), |duration| format!("{:.3}s", duration.as_secs_f64()))
}

fn format_frame_count(value: Option<FrameCount>) -> String {
    match value {
        Some(FrameCount::Exact(count)) => count.to_string(),
        Some(FrameCount::Estimated(count)) => format!("~{count}"),
        None => "-".to_string(),
    }
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        avdemux::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn open_input(input: &Path, global: &GlobalOptions) -> Result<InputFile, Box<dyn std::error::Error>> {
    let mut file = InputFile::open(input)?;
    let profile = format_profile(global)?;
    if !profile.is_empty() {
        file.set_profile(&profile)?;
    }
    Ok(file)
}

struct BarProgress {
    bar: ProgressBar,
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) -> ProgressStatus {
        self.bar.set_position((info.fraction * 1000.0) as u64);
        self.bar
            .set_message(format!("{} packets", info.packets_scanned));
        ProgressStatus::Continue
    }
}

fn stream_json(stream: &StreamProperties) -> Value {
    json!({
        "index": stream.index,
        "kind": stream.kind.as_str(),
        "codec": stream.codec_name,
        "time_base": stream.time_base.map(|tb| format!("{}/{}", tb.numerator(), tb.denominator())),
        "frame_rate": stream.frame_rate.map(f64::from),
        "sample_rate": stream.sample_rate,
        "duration_seconds": stream.duration.map(|duration| duration.as_secs_f64()),
        "frame_count": stream.frame_count.map(FrameCount::value),
        "frame_count_exact": stream.frame_count.is_some_and(FrameCount::is_exact),
        "bit_rate": stream.bit_rate,
        "keyframes": stream.keyframe_count,
        "first_gop_size": stream.first_gop_size,
        "packets_scanned": stream.packets_scanned,
        "bytes_scanned": stream.bytes_scanned,
        "language": stream.language,
    })
}

fn print_properties(properties: &FileProperties) {
    println!("{} {}", "File:".bold(), properties.filename.display());
    println!("Format: {}", properties.format_name);
    println!("Duration: {}", format_duration(properties.duration));
    if let Some(bit_rate) = properties.bit_rate {
        println!("Bit rate: {} kb/s", bit_rate / 1000);
    }
    println!(
        "Analysis: {:?} ({} packets scanned)",
        properties.level, properties.packets_scanned
    );
    for stream in &properties.streams {
        println!(
            "  {} {} [{}] tb={} rate={} duration={} frames={}",
            format!("#{}", stream.index).cyan().bold(),
            stream.kind,
            stream.codec_name.as_deref().unwrap_or("unknown"),
            format_rational(stream.time_base),
            format_rational(stream.frame_rate),
            format_duration(stream.duration),
            format_frame_count(stream.frame_count),
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;
    avdemux::initialize()?;

    match cli.command {
        Commands::Probe { input, full, json } => {
            let level = if full {
                AnalyseLevel::Full
            } else {
                AnalyseLevel::FirstGop
            };

            let progress_bar = if cli.global.progress {
                let bar = ProgressBar::new(1000);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {percent}% {msg}",
                )?;
                bar.set_style(style.progress_chars("##-"));
                Some(bar)
            } else {
                None
            };

            let mut options = AnalyseOptions::new();
            if let Some(bar) = &progress_bar {
                options = options
                    .with_progress(Arc::new(BarProgress { bar: bar.clone() }))
                    .with_batch_size(64);
            }

            let mut file = open_input(&input, &cli.global)?;
            let properties = file.analyse(&options, level)?;
            if let Some(bar) = progress_bar {
                bar.finish_and_clear();
            }

            if json {
                let payload = json!({
                    "filename": properties.filename.display().to_string(),
                    "format": properties.format_name,
                    "duration_seconds": properties.duration.map(|duration| duration.as_secs_f64()),
                    "bit_rate": properties.bit_rate,
                    "level": format!("{:?}", properties.level),
                    "packets_scanned": properties.packets_scanned,
                    "streams": properties.streams.iter().map(stream_json).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_properties(properties);
            }
        }
        Commands::Packets {
            input,
            stream,
            limit,
            seek_frame,
            json,
        } => {
            let mut file = open_input(&input, &cli.global)?;
            file.set_read_policy(ReadPolicy::BufferedOnly);
            file.set_stream_buffered(stream, true)?;

            if let Some(frame) = seek_frame {
                let timestamp = file.seek_at_frame_in(frame, stream)?;
                if !json {
                    eprintln!(
                        "{} frame {frame} (timestamp {timestamp})",
                        "seeked".green().bold()
                    );
                }
            }

            let limit = limit.unwrap_or(u64::MAX);
            let mut printed = 0_u64;
            'read: while printed < limit && file.read_next_packet(stream)? {
                while let Some(packet) = file.pop_packet(stream)? {
                    if json {
                        let line = json!({
                            "stream": packet.stream_index(),
                            "pts": packet.pts(),
                            "dts": packet.dts(),
                            "duration": packet.duration(),
                            "keyframe": packet.is_keyframe(),
                            "position": packet.position(),
                            "size": packet.size(),
                        });
                        println!("{line}");
                    } else {
                        println!(
                            "{} pts={} dts={} dur={} size={}{}",
                            format!("#{}", packet.stream_index()).cyan(),
                            packet.pts().map_or("-".to_string(), |pts| pts.to_string()),
                            packet.dts().map_or("-".to_string(), |dts| dts.to_string()),
                            packet.duration(),
                            packet.size(),
                            if packet.is_keyframe() {
                                " K".yellow().bold().to_string()
                            } else {
                                String::new()
                            },
                        );
                    }
                    printed += 1;
                    if printed >= limit {
                        break 'read;
                    }
                }
            }

            if !json {
                eprintln!("{} {printed} packet(s)", "read".green().bold());
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, BIN_NAME, &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{BIN_NAME, Cli, format_frame_count, format_rational, parse_log_level, parse_option};
    use avdemux::FrameCount;
    use clap::CommandFactory;
    use ffmpeg_next::Rational;

    #[test]
    fn command_name_matches_binary() {
        assert_eq!(BIN_NAME, env!("CARGO_BIN_NAME"));
        assert_eq!(Cli::command().get_name(), env!("CARGO_BIN_NAME"));
    }

    #[test]
    fn parse_log_level_aliases() {
        assert!(parse_log_level("warn").is_some());
        assert!(parse_log_level("WARNING").is_some());
        assert!(parse_log_level("quiet").is_some());
        assert!(parse_log_level("loud").is_none());
    }

    #[test]
    fn parse_option_pairs() {
        assert_eq!(parse_option("probesize=5000000"), Ok(("probesize", "5000000")));
        assert_eq!(parse_option(" fflags = +genpts "), Ok(("fflags", "+genpts")));
        assert!(parse_option("probesize").is_err());
        assert!(parse_option("=1").is_err());
    }

    #[test]
    fn formats_optional_values() {
        assert_eq!(format_rational(Some(Rational::new(1, 90_000))), "1/90000");
        assert_eq!(format_rational(None), "-");
        assert_eq!(format_frame_count(Some(FrameCount::Estimated(250))), "~250");
        assert_eq!(format_frame_count(Some(FrameCount::Exact(250))), "250");
    }
}
