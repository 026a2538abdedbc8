use std::env;
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub port: Option<u16>,
    pub readings_out: Option<PathBuf>,
    /// Base URL of a running server to poll instead of serving.
    pub watch: Option<String>,
    pub help: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --config (expected a TOML file path)")?;
                if opts.config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected an integer)")?;
                let seed = raw
                    .parse()
                    .map_err(|_| format!("invalid --seed \"{raw}\" (expected an integer)"))?;
                if opts.seed.replace(seed).is_some() {
                    return Err("--seed provided more than once".to_string());
                }
            }
            "--port" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --port (expected 0-65535)")?;
                let port = raw
                    .parse()
                    .map_err(|_| format!("invalid --port \"{raw}\" (expected 0-65535)"))?;
                if opts.port.replace(port).is_some() {
                    return Err("--port provided more than once".to_string());
                }
            }
            "--readings-out" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --readings-out (expected a file path)")?;
                if opts.readings_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--readings-out provided more than once".to_string());
                }
            }
            "--watch" => {
                i += 1;
                let url = args.next_or_err(i, "missing value for --watch (expected a base URL)")?;
                if opts.watch.replace(url.to_string()).is_some() {
                    return Err("--watch provided more than once".to_string());
                }
            }
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.config.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if opts.config.is_none() && opts.preset.is_none() {
        opts.preset = Some("campus".to_string());
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  campus-energy [--config <path> | --preset <name>] [--seed <n>] [--port <n>] \
         [--readings-out <path>]"
    );
    eprintln!("  campus-energy --watch <base-url> [--config <path> | --preset <name>]");
    eprintln!();
    eprintln!("Presets: campus (default), quiet, empty");
    eprintln!("Logging: set RUST_LOG (default: info)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_to_campus_preset() {
        let opts = parse_args_from(Vec::new()).expect("parse should succeed");
        assert_eq!(opts.preset.as_deref(), Some("campus"));
        assert!(opts.config.is_none());
        assert!(!opts.help);
    }

    #[test]
    fn supports_config_cli() {
        let opts = parse_args_from(args(&["--config", "campus.toml"])).expect("parse should succeed");
        assert_eq!(
            opts.config.as_deref().and_then(|p| p.to_str()),
            Some("campus.toml")
        );
        assert!(opts.preset.is_none());
    }

    #[test]
    fn supports_overrides() {
        let opts = parse_args_from(args(&[
            "--preset",
            "quiet",
            "--seed",
            "7",
            "--port",
            "8080",
            "--readings-out",
            "out.csv",
        ]))
        .expect("parse should succeed");
        assert_eq!(opts.preset.as_deref(), Some("quiet"));
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.port, Some(8080));
        assert_eq!(opts.readings_out, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn supports_watch() {
        let opts = parse_args_from(args(&["--watch", "http://127.0.0.1:3000"]))
            .expect("parse should succeed");
        assert_eq!(opts.watch.as_deref(), Some("http://127.0.0.1:3000"));
    }

    #[test]
    fn help_flag() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args_from(args(&["--config", "a.toml", "--preset", "campus"])).is_err());
        assert!(parse_args_from(args(&["--seed", "many"])).is_err());
        assert!(parse_args_from(args(&["--port", "70000"])).is_err());
        assert!(parse_args_from(args(&["--port"])).is_err());
        assert!(parse_args_from(args(&["--seed", "1", "--seed", "2"])).is_err());
        assert!(parse_args_from(args(&["--verbose"])).is_err());
    }
}
