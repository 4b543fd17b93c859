//! Command-line options and resolved settings

use std::collections::HashMap;
use std::ffi::OsString;

use clap::{CommandFactory, Parser, ValueEnum};
use com_frame::DecodeMode;
use com_link::{DeviceTemplate, LinkConfiguration, ScanRange, DEFAULT_BAUD_RATE};
use serde::Serialize;

/// How much diagnostic output goes to stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Lifecycle messages
    Normal,
    /// Scan attempts and link details
    Debug,
}

/// Print framed messages arriving on a serial port
#[derive(Parser, Debug)]
#[command(name = "comprinter", version, about, long_about = None)]
pub struct Cli {
    /// Open this device index instead of scanning
    #[arg(long = "devnum", visible_alias = "device", value_name = "N", env = "COMPRINTER_DEVNUM")]
    pub devnum: Option<u32>,

    /// Baud rate for both directions
    #[arg(
        long = "baudrate",
        visible_alias = "baud",
        value_name = "BPS",
        default_value_t = DEFAULT_BAUD_RATE,
        env = "COMPRINTER_BAUDRATE"
    )]
    pub baudrate: u32,

    /// Only print messages from this source id (enables framed decoding)
    #[arg(long, value_name = "ID", env = "COMPRINTER_ID")]
    pub id: Option<u32>,

    /// Decode frames even when no id filter is set
    #[arg(long, env = "COMPRINTER_FRAMED")]
    pub framed: bool,

    /// Forward decoded characters as synthetic keystrokes
    #[arg(long, env = "COMPRINTER_KEYSTROKES")]
    pub keystrokes: bool,

    /// Diagnostic output level
    #[arg(long, value_enum, default_value_t = Verbosity::Normal, env = "COMPRINTER_VERBOSITY")]
    pub verbosity: Verbosity,

    /// Same as --verbosity quiet
    #[arg(long)]
    pub quiet: bool,

    /// Same as --verbosity debug
    #[arg(long)]
    pub debug: bool,

    /// Highest device index scanned
    #[arg(long, value_name = "N", default_value_t = ScanRange::DEFAULT_MAX)]
    pub scan_max: u32,

    /// Lowest device index scanned
    #[arg(long, value_name = "N", default_value_t = ScanRange::DEFAULT_MIN)]
    pub scan_min: u32,

    /// Port path pattern; `{}` is replaced by the device index
    #[arg(long, value_name = "TEMPLATE", env = "COMPRINTER_DEVICE_TEMPLATE")]
    pub device_template: Option<String>,

    /// Bytes written once after the link is configured (empty to skip)
    #[arg(long, value_name = "TEXT", default_value = "hello")]
    pub handshake: String,

    /// List serial ports and where they fall in the scan, then exit
    #[arg(long)]
    pub list_ports: bool,

    /// Print the resolved settings as JSON and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Effective verbosity; the legacy flags win over `--verbosity`
    pub fn effective_verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            self.verbosity
        }
    }
}

/// Settings resolved from the command line and environment
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub device: Option<u32>,
    pub scan_max: u32,
    pub scan_min: u32,
    pub device_template: String,
    pub baud_rate: u32,
    pub filter: Option<u32>,
    pub mode: DecodeMode,
    pub keystrokes: bool,
    pub verbosity: Verbosity,
    pub handshake: String,
}

impl Settings {
    /// An explicit device narrows the scan to that one index
    pub fn scan_range(&self) -> ScanRange {
        match self.device {
            Some(index) => ScanRange::single(index),
            None => ScanRange::new(self.scan_max, self.scan_min),
        }
    }

    pub fn link_config(&self) -> LinkConfiguration {
        LinkConfiguration::new(self.baud_rate)
    }

    pub fn template(&self) -> DeviceTemplate {
        DeviceTemplate::new(self.device_template.clone())
    }
}

impl From<&Cli> for Settings {
    fn from(cli: &Cli) -> Self {
        Self {
            device: cli.devnum,
            scan_max: cli.scan_max,
            scan_min: cli.scan_min,
            device_template: cli
                .device_template
                .clone()
                .unwrap_or_else(|| DeviceTemplate::platform_default().as_str().to_string()),
            baud_rate: cli.baudrate,
            filter: cli.id,
            mode: DecodeMode::select(cli.id, cli.framed),
            keystrokes: cli.keystrokes,
            verbosity: cli.effective_verbosity(),
            handshake: cli.handshake.clone(),
        }
    }
}

/// Arguments split into what clap should see and what it would reject
#[derive(Debug, Default)]
pub struct NormalizedArgs {
    pub args: Vec<OsString>,
    pub unrecognized: Vec<String>,
}

/// Prepare raw arguments for parsing
///
/// Legacy `/name` spellings of known options become `--name`. Arguments that
/// match no option are set aside so they can be reported without aborting.
/// The value following a known option is passed through untouched.
pub fn normalize_args<I>(raw: I) -> NormalizedArgs
where
    I: IntoIterator<Item = OsString>,
{
    let mut command = Cli::command();
    command.build();

    // option name -> takes a value
    let mut longs: HashMap<String, bool> = HashMap::new();
    let mut shorts: HashMap<char, bool> = HashMap::new();
    for arg in command.get_arguments() {
        let takes_value = arg.get_action().takes_values();
        if let Some(long) = arg.get_long() {
            longs.insert(long.to_string(), takes_value);
        }
        for alias in arg.get_all_aliases().unwrap_or_default() {
            longs.insert(alias.to_string(), takes_value);
        }
        if let Some(short) = arg.get_short() {
            shorts.insert(short, takes_value);
        }
    }

    let mut out = NormalizedArgs::default();
    let mut raw = raw.into_iter();
    if let Some(bin) = raw.next() {
        out.args.push(bin);
    }

    while let Some(arg) = raw.next() {
        let Some(text) = arg.to_str() else {
            out.unrecognized.push(arg.to_string_lossy().into_owned());
            continue;
        };

        let (normalized, expects_value) = if let Some(rest) = text.strip_prefix("--") {
            let (name, inline) = match rest.split_once('=') {
                Some((name, _)) => (name, true),
                None => (rest, false),
            };
            match longs.get(name) {
                Some(&takes) => (Some(text.to_string()), takes && !inline),
                None => (None, false),
            }
        } else if let Some(name) = text.strip_prefix('/') {
            match longs.get(name) {
                Some(&takes) => (Some(format!("--{}", name)), takes),
                None => (None, false),
            }
        } else if let Some(flag) = short_flag(text) {
            match shorts.get(&flag) {
                Some(&takes) => (Some(text.to_string()), takes),
                None => (None, false),
            }
        } else {
            (None, false)
        };

        match normalized {
            Some(arg) => {
                out.args.push(arg.into());
                if expects_value {
                    if let Some(value) = raw.next() {
                        out.args.push(value);
                    }
                }
            }
            None => out.unrecognized.push(text.to_string()),
        }
    }

    out
}

fn short_flag(text: &str) -> Option<char> {
    let mut chars = text.strip_prefix('-')?.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != '-' => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("comprinter")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    fn parse(list: &[&str]) -> (Cli, Vec<String>) {
        let normalized = normalize_args(args(list));
        let cli = Cli::try_parse_from(&normalized.args).unwrap();
        (cli, normalized.unrecognized)
    }

    #[test]
    fn test_defaults() {
        let (cli, unrecognized) = parse(&[]);
        let settings = Settings::from(&cli);

        assert!(unrecognized.is_empty());
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.filter, None);
        assert_eq!(settings.mode, DecodeMode::Raw);
        assert_eq!(settings.verbosity, Verbosity::Normal);
        assert_eq!(settings.scan_range(), ScanRange::default());
        assert_eq!(settings.handshake, "hello");
        assert!(!settings.keystrokes);
    }

    #[test]
    fn test_legacy_slash_options() {
        let (cli, unrecognized) = parse(&["/devnum", "22", "/baudrate", "38400", "/id", "12", "/keystrokes"]);
        let settings = Settings::from(&cli);

        assert!(unrecognized.is_empty());
        assert_eq!(settings.scan_range(), ScanRange::single(22));
        assert_eq!(settings.baud_rate, 38400);
        assert_eq!(settings.mode, DecodeMode::Framed { filter: Some(12) });
        assert!(settings.keystrokes);
    }

    #[test]
    fn test_aliases_and_inline_values() {
        let (cli, _) = parse(&["--device=4", "--baud", "115200"]);
        assert_eq!(cli.devnum, Some(4));
        assert_eq!(cli.baudrate, 115200);
    }

    #[test]
    fn test_unrecognized_options_set_aside() {
        let (cli, unrecognized) = parse(&["/bogus", "--id", "3", "--nope", "stray", "-z"]);
        assert_eq!(cli.id, Some(3));
        assert_eq!(unrecognized, vec!["/bogus", "--nope", "stray", "-z"]);
    }

    #[test]
    fn test_values_passed_through_verbatim() {
        let (cli, unrecognized) = parse(&["--device-template", "/dev/ttyACM{}"]);
        assert!(unrecognized.is_empty());
        assert_eq!(cli.device_template.as_deref(), Some("/dev/ttyACM{}"));
    }

    #[test]
    fn test_verbosity_flags() {
        let (cli, _) = parse(&["/quiet"]);
        assert_eq!(cli.effective_verbosity(), Verbosity::Quiet);

        let (cli, _) = parse(&["/debug"]);
        assert_eq!(cli.effective_verbosity(), Verbosity::Debug);

        let (cli, _) = parse(&["--verbosity", "debug"]);
        assert_eq!(cli.effective_verbosity(), Verbosity::Debug);
    }

    #[test]
    fn test_forced_framing() {
        let (cli, _) = parse(&["--framed"]);
        assert_eq!(Settings::from(&cli).mode, DecodeMode::Framed { filter: None });
    }

    #[test]
    fn test_missing_value_is_error() {
        let normalized = normalize_args(args(&["/devnum"]));
        assert!(Cli::try_parse_from(&normalized.args).is_err());
    }

    #[test]
    fn test_non_numeric_value_is_error() {
        let normalized = normalize_args(args(&["--baudrate", "fast"]));
        assert!(Cli::try_parse_from(&normalized.args).is_err());
    }

    #[test]
    fn test_settings_serialize() {
        let (cli, _) = parse(&["--id", "5", "--device-template", "/dev/ttyS{}"]);
        let json = serde_json::to_value(Settings::from(&cli)).unwrap();

        assert_eq!(json["filter"], 5);
        assert_eq!(json["device_template"], "/dev/ttyS{}");
        assert_eq!(json["verbosity"], "normal");
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
